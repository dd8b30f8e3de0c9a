//! PackML-style state model (§4.6, GLOSSARY "PackML state model"):
//!
//! ```text
//! Idle → Starting → Execute → {Holding ↔ Held} | {Suspending ↔ Suspended} → Completing → Complete
//! Any → Aborting → Aborted → Clearing → Stopped → Resetting → Idle
//! Any → Stopping → Stopped
//! ```
//!
//! Every "-ing" state is transient: it holds for `TRANSITION_TIME` (§4.6)
//! and, for `Holding`/`Suspending`, additionally until the cycle driver
//! reports the affected sub-systems have quiesced (§8 scenario 6: "`Hold`;
//! expect `traj.scale` → 0 ... `joints_act` ceases to change").
//!
//! Transition waits are cycle-counted (decremented by the caller's own
//! `dt`), never wall-clock (§9 open question on `SEND_AND_CHECK`).

use gomotion_common::consts::TRANSITION_TIME_MS;
use gomotion_common::shm::segments::{AdminState, ChannelStatus, PackMlState, TaskCmdType};

const TRANSITION_TIME_S: f64 = TRANSITION_TIME_MS as f64 / 1000.0;

/// What the cycle driver must forward to Traj/Tool as a result of a
/// dispatched command (§4.4 "Abort/Halt/Shutdown forwarded to every
/// servo" — Task forwards the same way one tier up).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Forward {
    #[default]
    None,
    Init,
    Abort,
    Halt,
    Shutdown,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TransitionOutcome {
    /// `false` if `strict` rejected the command outside its canonical
    /// source state (§4.6 "commands are only accepted in their canonical
    /// source states").
    pub accepted: bool,
    /// A fresh command instance just arrived (on-entry hook).
    pub on_entry: bool,
    pub forward: Forward,
}

#[derive(Debug, Clone, Copy)]
pub struct PackMlMachine {
    admin: AdminState,
    packml: PackMlState,
    /// `(terminal_state, remaining_seconds)` while in a transient "-ing"
    /// state.
    pending: Option<(PackMlState, f64)>,
    status: ChannelStatus,
    last_serial: Option<u64>,
    /// Saved timescale to restore on `Unhold`/`Unsuspend` (§4.6).
    saved_scale: Option<f64>,
}

impl Default for PackMlMachine {
    fn default() -> Self {
        Self {
            admin: AdminState::Uninitialized,
            packml: PackMlState::Idle,
            pending: None,
            status: ChannelStatus::Uninitialized,
            last_serial: None,
            saved_scale: None,
        }
    }
}

/// Canonical source states a command is accepted from under `strict`
/// (§4.6).
fn canonical_sources(cmd: TaskCmdType) -> &'static [PackMlState] {
    use PackMlState::*;
    match cmd {
        TaskCmdType::Start => &[Idle],
        TaskCmdType::Hold => &[Execute],
        TaskCmdType::Unhold => &[Held],
        TaskCmdType::Suspend => &[Execute],
        TaskCmdType::Unsuspend => &[Suspended],
        TaskCmdType::Reset => &[Complete, Stopped],
        TaskCmdType::Clear => &[Aborted],
        // Nop/Init/Abort/Halt/Shutdown/Stop are accepted from any state.
        _ => &[],
    }
}

impl PackMlMachine {
    pub fn admin_state(&self) -> AdminState {
        self.admin
    }

    pub fn packml_state(&self) -> PackMlState {
        self.packml
    }

    pub fn status(&self) -> ChannelStatus {
        self.status
    }

    pub fn mark_error(&mut self) {
        self.status = ChannelStatus::Error;
    }

    /// The terminal state this machine is converging toward, if any
    /// transition is in flight. The cycle driver uses this to decide which
    /// sub-system readiness predicate to evaluate.
    pub fn pending_target(&self) -> Option<PackMlState> {
        self.pending.map(|(t, _)| t)
    }

    pub fn take_saved_scale(&mut self) -> Option<f64> {
        self.saved_scale.take()
    }

    pub fn save_scale(&mut self, scale: f64) {
        self.saved_scale = Some(scale);
    }

    /// Dispatch one tick given the current `cmd` (§9 "on-entry hook").
    pub fn dispatch(&mut self, serial_number: u64, cmd_type: TaskCmdType, strict: bool) -> TransitionOutcome {
        let is_new = self.last_serial != Some(serial_number);
        self.last_serial = Some(serial_number);
        if !is_new {
            return TransitionOutcome::default();
        }

        let sources = canonical_sources(cmd_type);
        if strict && !sources.is_empty() && !sources.contains(&self.packml) {
            return TransitionOutcome { accepted: false, on_entry: false, forward: Forward::None };
        }

        use PackMlState::*;
        use TaskCmdType::*;
        let (next_pending, forward) = match cmd_type {
            Nop => {
                self.status = ChannelStatus::Done;
                return TransitionOutcome { accepted: true, on_entry: false, forward: Forward::None };
            }
            Init => {
                self.admin = AdminState::Initialized;
                self.status = ChannelStatus::Done;
                return TransitionOutcome { accepted: true, on_entry: true, forward: Forward::Init };
            }
            Start => (Some((Execute, TRANSITION_TIME_S)), Forward::None),
            Hold => (Some((Held, TRANSITION_TIME_S)), Forward::None),
            Unhold => (Some((Execute, TRANSITION_TIME_S)), Forward::None),
            Suspend => (Some((Suspended, TRANSITION_TIME_S)), Forward::None),
            Unsuspend => (Some((Execute, TRANSITION_TIME_S)), Forward::None),
            Reset => (Some((Idle, TRANSITION_TIME_S)), Forward::None),
            Clear => (Some((Stopped, TRANSITION_TIME_S)), Forward::None),
            Abort => (Some((Aborted, TRANSITION_TIME_S)), Forward::Abort),
            Halt => (Some((Stopped, TRANSITION_TIME_S)), Forward::Halt),
            Stop => (Some((Stopped, TRANSITION_TIME_S)), Forward::Stop),
            Shutdown => {
                self.admin = AdminState::Shutdown;
                self.status = ChannelStatus::Done;
                return TransitionOutcome { accepted: true, on_entry: true, forward: Forward::Shutdown };
            }
        };

        self.status = ChannelStatus::Exec;
        self.packml = self.transient_for(cmd_type);
        self.pending = next_pending;
        TransitionOutcome { accepted: true, on_entry: true, forward }
    }

    fn transient_for(&self, cmd_type: TaskCmdType) -> PackMlState {
        use PackMlState::*;
        match cmd_type {
            TaskCmdType::Start => Starting,
            TaskCmdType::Hold => Holding,
            TaskCmdType::Unhold => Unholding,
            TaskCmdType::Suspend => Suspending,
            TaskCmdType::Unsuspend => Unsuspending,
            TaskCmdType::Reset => Resetting,
            TaskCmdType::Clear => Clearing,
            TaskCmdType::Abort => Aborting,
            TaskCmdType::Halt | TaskCmdType::Stop => Stopping,
            _ => self.packml,
        }
    }

    /// Advance any in-flight "-ing" transition. `subsystem_ready` is the
    /// cycle driver's answer to "have the sub-systems affected by this
    /// transition quiesced" (e.g. `traj.scale == 0 && traj.status == Done`
    /// for `Holding`); transitions with no sub-system dependency should
    /// simply pass `true`.
    pub fn tick(&mut self, dt: f64, subsystem_ready: bool) {
        let Some((target, remaining)) = self.pending else { return };
        let remaining = (remaining - dt).max(0.0);
        if remaining <= 0.0 && subsystem_ready {
            self.packml = target;
            self.pending = None;
            self.status = ChannelStatus::Done;
        } else {
            self.pending = Some((target, remaining));
        }
    }

    /// Internal (non-client) transition driven by interp-list exhaustion
    /// (§4.6: program end moves `Execute → Completing → Complete`).
    pub fn begin_completing(&mut self) {
        if self.packml == PackMlState::Execute {
            self.packml = PackMlState::Completing;
            self.pending = Some((PackMlState::Complete, TRANSITION_TIME_S));
        }
    }

    /// Internal transition driven by MTTF/MTTR failure injection (§4.6,
    /// §9: routed through the same path as a real `Control` error so it is
    /// indistinguishable to callers).
    pub fn force_abort(&mut self) {
        self.packml = PackMlState::Aborting;
        self.pending = Some((PackMlState::Aborted, TRANSITION_TIME_S));
        self.status = ChannelStatus::Exec;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_transitions_through_starting_to_execute() {
        let mut m = PackMlMachine::default();
        let out = m.dispatch(1, TaskCmdType::Start, true);
        assert!(out.accepted);
        assert_eq!(m.packml_state(), PackMlState::Starting);
        m.tick(TRANSITION_TIME_S + 0.01, true);
        assert_eq!(m.packml_state(), PackMlState::Execute);
    }

    #[test]
    fn strict_rejects_hold_outside_execute() {
        let mut m = PackMlMachine::default();
        let out = m.dispatch(1, TaskCmdType::Hold, true);
        assert!(!out.accepted);
        assert_eq!(m.packml_state(), PackMlState::Idle);
    }

    #[test]
    fn permissive_accepts_hold_outside_execute() {
        let mut m = PackMlMachine::default();
        let out = m.dispatch(1, TaskCmdType::Hold, false);
        assert!(out.accepted);
    }

    #[test]
    fn held_waits_for_subsystem_ready() {
        let mut m = PackMlMachine::default();
        m.dispatch(1, TaskCmdType::Start, true);
        m.tick(TRANSITION_TIME_S + 0.01, true);
        m.dispatch(2, TaskCmdType::Hold, true);
        assert_eq!(m.packml_state(), PackMlState::Holding);
        m.tick(TRANSITION_TIME_S + 0.01, false);
        assert_eq!(m.packml_state(), PackMlState::Holding);
        m.tick(0.0, true);
        assert_eq!(m.packml_state(), PackMlState::Held);
    }

    #[test]
    fn abort_forwards_and_reaches_aborted() {
        let mut m = PackMlMachine::default();
        let out = m.dispatch(1, TaskCmdType::Abort, true);
        assert_eq!(out.forward, Forward::Abort);
        m.tick(TRANSITION_TIME_S + 0.01, true);
        assert_eq!(m.packml_state(), PackMlState::Aborted);
    }

    #[test]
    fn idempotent_resend_is_not_on_entry() {
        let mut m = PackMlMachine::default();
        let d1 = m.dispatch(5, TaskCmdType::Start, true);
        assert!(d1.on_entry);
        let d2 = m.dispatch(5, TaskCmdType::Start, true);
        assert!(!d2.on_entry);
    }

    #[test]
    fn program_completion_reaches_complete() {
        let mut m = PackMlMachine::default();
        m.dispatch(1, TaskCmdType::Start, true);
        m.tick(TRANSITION_TIME_S + 0.01, true);
        m.begin_completing();
        assert_eq!(m.packml_state(), PackMlState::Completing);
        m.tick(TRANSITION_TIME_S + 0.01, true);
        assert_eq!(m.packml_state(), PackMlState::Complete);
    }
}
