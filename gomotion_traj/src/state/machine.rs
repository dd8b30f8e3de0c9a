use gomotion_common::shm::segments::{AdminState, ChannelStatus, TrajCmdType};

/// Per-loop command dispatcher for the Trajectory Loop (§4.4), tracking
/// the last-seen `serial_number` the same way the Servo Loop does (§9).
#[derive(Debug, Clone, Copy)]
pub struct TrajStateMachine {
    admin: AdminState,
    last_serial: Option<u64>,
    active_cmd: TrajCmdType,
    status: ChannelStatus,
}

impl Default for TrajStateMachine {
    fn default() -> Self {
        Self {
            admin: AdminState::Uninitialized,
            last_serial: None,
            active_cmd: TrajCmdType::Nop,
            status: ChannelStatus::Uninitialized,
        }
    }
}

/// What the cycle driver must do this tick as a result of the dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dispatch {
    /// A new command instance just entered; the queue/teleop stage should
    /// run its on-entry hook (push a fresh segment, re-anchor a track, ...).
    pub on_entry: bool,
    /// Motion output should be suppressed this tick (Abort/Halt/Shutdown,
    /// or before Init has completed). The loop re-publishes the last known
    /// position rather than advancing the queue.
    pub suspend_output: bool,
}

impl TrajStateMachine {
    pub fn admin_state(&self) -> AdminState {
        self.admin
    }

    pub fn status(&self) -> ChannelStatus {
        self.status
    }

    pub fn active_cmd(&self) -> TrajCmdType {
        self.active_cmd
    }

    /// Dispatch one tick given the current `cmd`.
    pub fn dispatch(&mut self, serial_number: u64, cmd_type: TrajCmdType) -> Dispatch {
        let is_new = self.last_serial != Some(serial_number);
        self.last_serial = Some(serial_number);

        if !is_new {
            return Dispatch::default();
        }

        self.active_cmd = cmd_type;
        use TrajCmdType::*;
        match cmd_type {
            Nop | Here => {
                self.status = ChannelStatus::Done;
                Dispatch::default()
            }
            Init => {
                self.admin = AdminState::Initialized;
                self.status = ChannelStatus::Done;
                Dispatch::default()
            }
            Abort | Halt | Stop => {
                self.status = ChannelStatus::Done;
                Dispatch { on_entry: false, suspend_output: true }
            }
            Shutdown => {
                self.admin = AdminState::Shutdown;
                self.status = ChannelStatus::Done;
                Dispatch { on_entry: false, suspend_output: true }
            }
            MoveUjoint | MoveJoint | MoveWorld | MoveTool | TrackWorld | TrackJoint | TeleopJoint | TeleopWorld
            | TeleopTool => {
                self.status = ChannelStatus::Exec;
                Dispatch { on_entry: true, suspend_output: self.admin != AdminState::Initialized }
            }
        }
    }

    pub fn mark_error(&mut self) {
        self.status = ChannelStatus::Error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_transitions_admin_state() {
        let mut m = TrajStateMachine::default();
        m.dispatch(1, TrajCmdType::Init);
        assert_eq!(m.admin_state(), AdminState::Initialized);
    }

    #[test]
    fn repeated_serial_is_idempotent() {
        let mut m = TrajStateMachine::default();
        let d1 = m.dispatch(5, TrajCmdType::MoveJoint);
        assert!(d1.on_entry);
        let d2 = m.dispatch(5, TrajCmdType::MoveJoint);
        assert!(!d2.on_entry);
    }

    #[test]
    fn new_serial_retriggers_on_entry() {
        let mut m = TrajStateMachine::default();
        m.dispatch(1, TrajCmdType::MoveWorld);
        let d = m.dispatch(2, TrajCmdType::MoveWorld);
        assert!(d.on_entry);
    }

    #[test]
    fn move_before_init_suspends_output() {
        let mut m = TrajStateMachine::default();
        let d = m.dispatch(1, TrajCmdType::MoveJoint);
        assert!(d.suspend_output);
    }

    #[test]
    fn stop_suspends_output_without_admin_change() {
        let mut m = TrajStateMachine::default();
        m.dispatch(1, TrajCmdType::Init);
        let d = m.dispatch(2, TrajCmdType::Stop);
        assert!(d.suspend_output);
        assert_eq!(m.admin_state(), AdminState::Initialized);
    }

    #[test]
    fn shutdown_transitions_admin_state() {
        let mut m = TrajStateMachine::default();
        m.dispatch(1, TrajCmdType::Init);
        m.dispatch(2, TrajCmdType::Shutdown);
        assert_eq!(m.admin_state(), AdminState::Shutdown);
    }
}
