//! The Tool Loop cycle (§4.5): each command validates `id` range and
//! updates/zeroes the corresponding output; status publishes the current
//! value vector.

use std::time::{Duration, Instant};

use gomotion_common::consts::MAX_TOOL_OUTPUTS;
use gomotion_common::shm::p2p::P2pError;
use gomotion_common::shm::segments::{AdminState, ToolCfg, ToolCmd, ToolCmdType, ToolSet, ToolStat};
use thiserror::Error;
use tracing::warn;

use crate::shm::ToolChannel;
use crate::state::ToolStateMachine;

#[derive(Debug, Error)]
pub enum ToolCycleError {
    #[error("shared memory error: {0}")]
    Shm(#[from] P2pError),
}

pub struct ToolCycle {
    channel: ToolChannel,
    state_machine: ToolStateMachine,
    cfg: ToolCfg,
    outputs: [f64; MAX_TOOL_OUTPUTS],
    last_cmd_serial: Option<u64>,
}

impl ToolCycle {
    pub fn new(cfg: ToolCfg, stale_threshold: u32) -> Result<Self, ToolCycleError> {
        Ok(Self {
            channel: ToolChannel::open(stale_threshold)?,
            state_machine: ToolStateMachine::default(),
            cfg,
            outputs: [0.0; MAX_TOOL_OUTPUTS],
            last_cmd_serial: None,
        })
    }

    /// One tick: read `cmd`/`cfg`, apply on-entry `On`/`Off`, publish.
    pub fn tick(&mut self) {
        if self.channel.cfg.has_changed() {
            if let Ok(cfg) = self.channel.cfg.read() {
                self.cfg = cfg;
            }
        }

        let cmd = match self.channel.cmd.read() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "tool cmd read failed, holding last state");
                self.publish(0);
                return;
            }
        };

        let dispatch = self.state_machine.dispatch(cmd.serial_number, cmd.cmd_type);
        self.last_cmd_serial = Some(cmd.serial_number);

        if dispatch.on_entry {
            self.apply(&cmd);
        }

        self.publish(cmd.serial_number);
    }

    fn apply(&mut self, cmd: &ToolCmd) {
        let id = cmd.id as usize;
        if id >= self.cfg.num_outputs as usize || id >= MAX_TOOL_OUTPUTS {
            warn!(id, max = self.cfg.num_outputs, "tool output id out of range");
            self.state_machine.mark_error();
            return;
        }
        match cmd.cmd_type {
            ToolCmdType::On => self.outputs[id] = cmd.value,
            ToolCmdType::Off => self.outputs[id] = 0.0,
            _ => {}
        }
    }

    fn publish(&mut self, echo_serial: u64) {
        let stat = ToolStat {
            serial_number: self.channel.stat.next_serial(),
            echo_serial_number: echo_serial,
            status: self.state_machine.status(),
            admin_state: self.state_machine.admin_state(),
            values: self.outputs,
        };
        self.channel.stat.write(stat);

        let set = ToolSet {
            serial_number: self.channel.set.next_serial(),
            echo_serial_number: echo_serial,
            status: self.state_machine.status(),
            admin_state: self.state_machine.admin_state(),
            cfg_echo: self.cfg,
        };
        self.channel.set.write(set);
    }

    /// Run forever at the Tool Loop's own soft-real-time period (§4.5,
    /// §5: no semaphore coupling — Task and Tool each run on their own
    /// period and sample each other through shared memory).
    pub fn run(mut self, cycle_time: Duration) -> ! {
        loop {
            let start = Instant::now();
            self.tick();
            let elapsed = start.elapsed();
            if elapsed < cycle_time {
                std::thread::sleep(cycle_time - elapsed);
            }
        }
    }
}
