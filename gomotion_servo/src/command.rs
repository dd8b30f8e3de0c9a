//! Command-state-machine support for the Servo Loop (§4.2 step 6: homing).

pub mod homing;
