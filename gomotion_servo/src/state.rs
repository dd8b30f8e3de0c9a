//! Per-joint runtime state and the per-command state machine (§4.2 steps 1,3,6).

pub mod axis;
pub mod machine;
