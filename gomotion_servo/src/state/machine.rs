//! The per-command state machine dispatched from `cmd.cmd_type` each tick
//! (§4.2 step 3, §9 "Command 'new' via serial-number diff → explicit
//! on-entry hook").

use gomotion_common::shm::segments::{AdminState, ChannelStatus, ServoCmdType};

/// Per-joint command dispatcher. Tracks the last-seen `serial_number` to
/// distinguish a brand-new command from an idempotent re-send (§5
/// "Ordering guarantees": "a re-send with the same serial number is
/// idempotent and must be tolerated by consumers").
#[derive(Debug, Clone, Copy)]
pub struct ServoStateMachine {
    admin: AdminState,
    last_serial: Option<u64>,
    active_cmd: ServoCmdType,
    status: ChannelStatus,
}

impl Default for ServoStateMachine {
    fn default() -> Self {
        Self {
            admin: AdminState::Uninitialized,
            last_serial: None,
            active_cmd: ServoCmdType::Nop,
            status: ChannelStatus::Uninitialized,
        }
    }
}

/// What the caller must do this tick as a result of the dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dispatch {
    /// A new command instance just entered; the interpolator/homing state
    /// should run their on-entry hooks.
    pub on_entry: bool,
    /// Motion output should be suppressed this tick (Abort/Halt/Shutdown,
    /// or before Init has completed).
    pub suspend_output: bool,
}

impl ServoStateMachine {
    pub fn admin_state(&self) -> AdminState {
        self.admin
    }

    pub fn status(&self) -> ChannelStatus {
        self.status
    }

    /// Dispatch one tick given the current `cmd`. Returns what the caller
    /// should do with the interpolator/homing/control stages this tick.
    pub fn dispatch(&mut self, serial_number: u64, cmd_type: ServoCmdType) -> Dispatch {
        let is_new = self.last_serial != Some(serial_number);
        self.last_serial = Some(serial_number);

        if !is_new {
            // Idempotent re-send: report whatever terminal status we
            // already settled on, run no transition logic.
            return Dispatch::default();
        }

        self.active_cmd = cmd_type;
        match cmd_type {
            ServoCmdType::Nop => {
                self.status = ChannelStatus::Done;
                Dispatch::default()
            }
            ServoCmdType::Init => {
                self.admin = AdminState::Initialized;
                self.status = ChannelStatus::Done;
                Dispatch::default()
            }
            ServoCmdType::Abort | ServoCmdType::Halt => {
                self.status = ChannelStatus::Done;
                Dispatch { on_entry: false, suspend_output: true }
            }
            ServoCmdType::Shutdown => {
                self.admin = AdminState::Shutdown;
                self.status = ChannelStatus::Done;
                Dispatch { on_entry: false, suspend_output: true }
            }
            ServoCmdType::Servo => {
                self.status = ChannelStatus::Exec;
                Dispatch { on_entry: true, suspend_output: self.admin != AdminState::Initialized }
            }
            ServoCmdType::Stub => {
                self.status = ChannelStatus::Exec;
                Dispatch { on_entry: true, suspend_output: false }
            }
        }
    }

    /// Record a sub-system failure (e.g. invalid cfg) without losing the
    /// admin state (§4.2 "Failure semantics": servos never abort the whole
    /// system).
    pub fn mark_error(&mut self) {
        self.status = ChannelStatus::Error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_transitions_admin_state() {
        let mut m = ServoStateMachine::default();
        m.dispatch(1, ServoCmdType::Init);
        assert_eq!(m.admin_state(), AdminState::Initialized);
        assert_eq!(m.status(), ChannelStatus::Done);
    }

    #[test]
    fn repeated_serial_is_idempotent() {
        let mut m = ServoStateMachine::default();
        let d1 = m.dispatch(5, ServoCmdType::Servo);
        assert!(d1.on_entry);
        let d2 = m.dispatch(5, ServoCmdType::Servo);
        assert!(!d2.on_entry, "re-send with same serial must not re-trigger on-entry");
    }

    #[test]
    fn new_serial_retriggers_on_entry() {
        let mut m = ServoStateMachine::default();
        m.dispatch(1, ServoCmdType::Servo);
        let d = m.dispatch(2, ServoCmdType::Servo);
        assert!(d.on_entry);
    }

    #[test]
    fn servo_before_init_suspends_output() {
        let mut m = ServoStateMachine::default();
        let d = m.dispatch(1, ServoCmdType::Servo);
        assert!(d.suspend_output);
    }

    #[test]
    fn abort_suspends_output_without_changing_admin() {
        let mut m = ServoStateMachine::default();
        m.dispatch(1, ServoCmdType::Init);
        let d = m.dispatch(2, ServoCmdType::Abort);
        assert!(d.suspend_output);
        assert_eq!(m.admin_state(), AdminState::Initialized);
    }

    #[test]
    fn shutdown_transitions_admin_state() {
        let mut m = ServoStateMachine::default();
        m.dispatch(1, ServoCmdType::Init);
        m.dispatch(2, ServoCmdType::Shutdown);
        assert_eq!(m.admin_state(), AdminState::Shutdown);
    }
}
