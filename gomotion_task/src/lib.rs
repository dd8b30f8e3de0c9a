//! Task Loop (§4.6): a PackML-style state model executing scripts/NC
//! programs, ordering motion and tool sub-commands, implementing
//! hold/suspend/reset/abort, and injecting simulated failures.

pub mod config;
pub mod cycle;
pub mod fault;
pub mod interp;
pub mod program;
pub mod shm;
pub mod state;
pub mod wire;
