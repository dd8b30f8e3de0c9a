//! The per-command state table the Trajectory Loop dispatches each cycle
//! (§4.4), mirroring the Servo Loop's serial-diff dispatch (§9 "Command
//! 'new' via serial-number diff → explicit on-entry hook") but over the
//! larger `TrajCmdType` set.

mod machine;

pub use machine::{Dispatch, TrajStateMachine};
