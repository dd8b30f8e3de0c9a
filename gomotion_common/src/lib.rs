//! Shared types for the gomotion workspace: pose/quaternion/joint-vector
//! math, the shared-memory wire protocol (§4.1), the configuration schema
//! (§6), and the error taxonomy every loop reports through (§7).
//!
//! # Module structure
//!
//! - [`pose`] — rigid-body pose, quaternion and joint-vector algebra (§3)
//! - [`shm`] — the P2P channel transport and per-channel message shapes (§4.1)
//! - [`config`] — the `GomotionConfig` schema loaded once at boot (§6)
//! - [`error`] — shared error taxonomy (§7)
//! - [`hal`] — the `ext_*` adapter result vocabulary (§4.7)
//! - [`consts`] — workspace-wide numeric limits and defaults
//! - [`log`] — the bounded telemetry log ring (§3 "Log buffer")
//! - [`prelude`] — common re-exports

pub mod config;
pub mod consts;
pub mod error;
pub mod hal;
pub mod log;
pub mod pose;
pub mod prelude;
pub mod shm;
