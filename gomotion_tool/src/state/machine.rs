//! Per-loop command dispatcher for the Tool Loop (§4.5), tracking
//! serial-number novelty the same way Traj and Servo do (§9's "on-entry
//! hook" redesign note).

use gomotion_common::shm::segments::{AdminState, ChannelStatus, ToolCmdType};

#[derive(Debug, Clone, Copy)]
pub struct ToolStateMachine {
    admin: AdminState,
    last_serial: Option<u64>,
    status: ChannelStatus,
}

impl Default for ToolStateMachine {
    fn default() -> Self {
        Self { admin: AdminState::Uninitialized, last_serial: None, status: ChannelStatus::Uninitialized }
    }
}

/// What the cycle driver must do this tick as a result of the dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Dispatch {
    /// A new command instance just arrived; run the on-entry action
    /// (apply `On`/`Off` to the output vector).
    pub on_entry: bool,
}

impl ToolStateMachine {
    pub fn admin_state(&self) -> AdminState {
        self.admin
    }

    pub fn status(&self) -> ChannelStatus {
        self.status
    }

    pub fn mark_error(&mut self) {
        self.status = ChannelStatus::Error;
    }

    /// Dispatch one tick given the current `cmd`.
    pub fn dispatch(&mut self, serial_number: u64, cmd_type: ToolCmdType) -> Dispatch {
        let is_new = self.last_serial != Some(serial_number);
        self.last_serial = Some(serial_number);
        if !is_new {
            return Dispatch::default();
        }

        use ToolCmdType::*;
        match cmd_type {
            Nop => {
                self.status = ChannelStatus::Done;
                Dispatch::default()
            }
            Init => {
                self.admin = AdminState::Initialized;
                self.status = ChannelStatus::Done;
                Dispatch::default()
            }
            Abort => {
                self.status = ChannelStatus::Done;
                Dispatch::default()
            }
            Shutdown => {
                self.admin = AdminState::Shutdown;
                self.status = ChannelStatus::Done;
                Dispatch::default()
            }
            On | Off => {
                self.status = ChannelStatus::Done;
                Dispatch { on_entry: true }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_transitions_admin_state() {
        let mut m = ToolStateMachine::default();
        m.dispatch(1, ToolCmdType::Init);
        assert_eq!(m.admin_state(), AdminState::Initialized);
    }

    #[test]
    fn repeated_serial_is_idempotent() {
        let mut m = ToolStateMachine::default();
        let d1 = m.dispatch(5, ToolCmdType::On);
        assert!(d1.on_entry);
        let d2 = m.dispatch(5, ToolCmdType::On);
        assert!(!d2.on_entry);
    }

    #[test]
    fn shutdown_transitions_admin_state() {
        let mut m = ToolStateMachine::default();
        m.dispatch(1, ToolCmdType::Init);
        m.dispatch(2, ToolCmdType::Shutdown);
        assert_eq!(m.admin_state(), AdminState::Shutdown);
    }
}
