//! Per-joint runtime state: everything one [`crate::cycle::ServoCycle`] tick
//! needs to carry across ticks for a single joint.

use gomotion_common::shm::segments::ServoCfg;

use crate::command::homing::HomingState;
use crate::control::interp::{InterpKind, Interpolator};
use crate::control::pid::PidState;

use super::machine::ServoStateMachine;

/// All per-joint mutable state, pre-allocated once at servo startup.
pub struct AxisRuntime {
    pub state_machine: ServoStateMachine,
    pub interp: Interpolator,
    pub pid: PidState,
    pub homing: HomingState,
    /// Last tick's scaled input, for the backward-difference velocity
    /// estimate (§4.2 step 2).
    pub last_scaled_input: f64,
}

impl AxisRuntime {
    pub fn new(cfg: &ServoCfg) -> Self {
        Self {
            state_machine: ServoStateMachine::default(),
            interp: Interpolator::new(InterpKind::Linear, cfg.cycle_mult, cfg.cycle_time),
            pid: PidState::default(),
            homing: HomingState::default(),
            last_scaled_input: 0.0,
        }
    }

    /// Re-create the interpolator after a cfg update changes `cycle_mult`
    /// or `cycle_time` (§4.2 step 4 depends on both).
    pub fn reconfigure(&mut self, cfg: &ServoCfg) {
        self.interp = Interpolator::new(InterpKind::Linear, cfg.cycle_mult, cfg.cycle_time);
    }
}
