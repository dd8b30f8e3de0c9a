//! Tool Loop (§4.5): a small, non-realtime loop maintaining a vector of
//! named tool outputs (spindle, coolant, ...) with on/off commands.
//!
//! Unlike the Servo and Trajectory loops, Tool has no PID, no kinematics,
//! no queue — it is a single `cmd`/`cfg` → output-vector → `stat`/`set`
//! channel, ticked at its own soft-real-time period.

pub mod config;
pub mod cycle;
pub mod shm;
pub mod state;
