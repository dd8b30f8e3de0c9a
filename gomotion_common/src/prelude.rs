//! Convenience re-exports for the types most crates in the workspace need.

pub use crate::config::{ConfigError, GomotionConfig};
pub use crate::error::{ControlError, FatalError};
pub use crate::hal::ExtResult;
pub use crate::pose::{JointType, JointVector, LinkParams, Pose, Quat, Vec3};
pub use crate::shm::p2p::{ModuleAbbrev, P2pError, TypedP2pReader, TypedP2pWriter};
pub use crate::shm::segments::*;
pub use crate::shm::semaphore::{SemError, ServoClock};
