//! # Servo Loop
//!
//! The innermost control loop of the gomotion controller (§4.2): one
//! instance per joint, periodic, high priority. Each tick reads the
//! ping-pong command/config channel, reads the external adapter, runs the
//! active command state machine, interpolates the commanded setpoint, applies
//! PID or pass-through control, services homing, and publishes stat/set.
//!
//! Joint 0 additionally clocks the Trajectory Loop via a shared semaphore
//! every `cycle_mult` ticks (§4.2, §5).

pub mod command;
pub mod config;
pub mod control;
pub mod cycle;
pub mod shm;
pub mod state;
