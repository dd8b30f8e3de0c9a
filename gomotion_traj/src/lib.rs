//! The Trajectory Loop (§4.3, §4.4): motion queue, jerk-limited segment
//! generator, kinematics dispatch, and the per-cycle command state tables
//! that drive every servo's setpoint each tick.
//!
//! # Module structure
//!
//! - [`kinematics`] — the forward/inverse plug-in dispatch table (§6, §9)
//! - [`profile`] — jerk-limited S-curve timing used by every segment shape (§4.3)
//! - [`queue`] — the motion queue and its segment/interpolation state (§3, §4.3)
//! - [`linalg`] — small fixed-size linear solve used by numeric inverse kinematics
//! - [`state`] — the per-command state table dispatched each cycle (§4.4)
//! - [`shm`] — this loop's channel wiring: owns `traj.{cmd,stat,cfg,set,ref}`
//!   and every servo's `{cmd,cfg}` (write) / `{stat,set}` (read) pair (§4.1)
//! - [`config`] — projects `[TRAJ]`/`[SERVO_n]` into this loop's cfg shapes (§6)
//! - [`cycle`] — the Trajectory Loop tick itself (§4.4)

pub mod config;
pub mod cycle;
pub mod kinematics;
pub mod linalg;
pub mod profile;
pub mod queue;
pub mod rt;
pub mod shm;
pub mod state;
