//! The Task Loop cycle (§4.6): dispatches the PackML state model, drains
//! a loaded program into the interp list and from there into Traj/Tool
//! commands (with back-pressure at both stages), applies Hold/Suspend
//! scale manipulation, injects simulated faults, and maintains the
//! rotating error ring.

use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use gomotion_common::consts::{MOTION_QUEUE_CAPACITY, TASK_ERROR_RING_CAPACITY};
use gomotion_common::pose::Pose;
use gomotion_common::shm::p2p::P2pError;
use gomotion_common::shm::segments::{
    ChannelStatus, PackMlState, TaskCfg, TaskCmd, TaskCmdType, TaskErrorCode, TaskErrorEntry, TaskSet, TaskStat, ToolCmd,
    ToolCmdType, TrajCmd, TrajCmdType,
};
use thiserror::Error;
use tracing::warn;

use crate::fault::{FaultEvent, FaultInjector};
use crate::interp::{InterpList, InterpRecord};
use crate::program::Program;
use crate::shm::TaskChannel;
use crate::state::{Forward, PackMlMachine};

#[derive(Debug, Error)]
pub enum TaskCycleError {
    #[error("shared memory error: {0}")]
    Shm(#[from] P2pError),
}

/// A read-only snapshot of the machine's state, cheap to clone across
/// threads for the wire server's status query (§4.7).
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskSnapshot {
    pub admin_state: gomotion_common::shm::segments::AdminState,
    pub packml_state: PackMlState,
    pub status: ChannelStatus,
    pub error_count: u32,
    /// The serial number of the last command accepted into `task_cmd`,
    /// echoed back verbatim over the wire (§6 "Server→client on `?`").
    pub echo_serial: u64,
}

/// The interp-list record currently being executed, with whatever
/// bookkeeping its completion condition needs (§4.6).
#[derive(Debug, Clone, Copy)]
enum Active {
    Delay { remaining: f64 },
    WaitMotion,
    WaitTool,
    MoveSent,
}

#[derive(Default)]
struct ErrorRing {
    entries: [TaskErrorEntry; TASK_ERROR_RING_CAPACITY],
    head: usize,
    len: usize,
}

impl ErrorRing {
    fn push(&mut self, code: TaskErrorCode) {
        let timestamp_us = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_micros() as u64).unwrap_or(0);
        let idx = (self.head + self.len) % TASK_ERROR_RING_CAPACITY;
        self.entries[idx] = TaskErrorEntry { timestamp_us, code };
        if self.len < TASK_ERROR_RING_CAPACITY {
            self.len += 1;
        } else {
            self.head = (self.head + 1) % TASK_ERROR_RING_CAPACITY;
        }
    }

    fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
    }

    /// Render into `TaskStat`'s fixed layout, oldest-first starting at
    /// `head` (§7).
    fn to_fixed(&self) -> ([TaskErrorEntry; TASK_ERROR_RING_CAPACITY], u32, u32) {
        (self.entries, self.head as u32, self.len as u32)
    }
}

pub struct TaskCycle {
    channel: TaskChannel,
    state_machine: PackMlMachine,
    cfg: TaskCfg,
    prog_dir: PathBuf,
    fault: FaultInjector,
    errors: ErrorRing,

    program: Option<Program>,
    interp: InterpList,
    active: Option<Active>,

    last_cmd_serial: Option<u64>,
    last_tool_serial: u64,
}

impl TaskCycle {
    pub fn new(cfg: TaskCfg, prog_dir: PathBuf, stale_threshold: u32) -> Result<Self, TaskCycleError> {
        let fault = FaultInjector::new(cfg.mttf, cfg.mttr);
        Ok(Self {
            channel: TaskChannel::open(stale_threshold)?,
            state_machine: PackMlMachine::default(),
            cfg,
            prog_dir,
            fault,
            errors: ErrorRing::default(),
            program: None,
            interp: InterpList::new(),
            active: None,
            last_cmd_serial: None,
            last_tool_serial: 0,
        })
    }

    /// Seed the initial `traj_cfg`/`tool_cfg` this loop produces, so both
    /// downstream loops observe a fresh heartbeat even before the first
    /// live `Hold`/`Unhold` (§4.1 "every channel carries a heartbeat").
    pub fn seed_downstream_cfg(&mut self, traj_cfg: gomotion_common::shm::segments::TrajCfg, tool_cfg: gomotion_common::shm::segments::ToolCfg) {
        let mut traj_cfg = traj_cfg;
        traj_cfg.serial_number = self.channel.traj_writer.cfg.next_serial();
        self.channel.traj_writer.cfg.write(traj_cfg);

        let mut tool_cfg = tool_cfg;
        tool_cfg.serial_number = self.channel.tool_writer.cfg.next_serial();
        self.channel.tool_writer.cfg.write(tool_cfg);

        self.channel.traj_writer.xref.write(gomotion_common::shm::segments::TrajRef {
            serial_number: self.channel.traj_writer.xref.next_serial(),
            xinv: Pose::IDENTITY,
        });
    }

    fn dt(&self) -> f64 {
        self.cfg.cycle_time.max(1e-6)
    }

    /// Write a command into `task_cmd` under a caller-supplied serial
    /// number (§4.7: the wire server's requests arrive here, through this
    /// process's own writer rather than a second handle onto the same
    /// segment). §6 has the client mint its own serial (`! <serial> ...`),
    /// so this does not call `next_serial()`: the client's counter is the
    /// producer's counter for this channel (§8 invariant 1 is then the
    /// client's obligation, same as any other command producer).
    pub fn submit_command(&mut self, serial_number: u64, cmd_type: TaskCmdType, program: Option<&str>) {
        let cmd = match program {
            Some(name) => TaskCmd::with_program(cmd_type, serial_number, name),
            None => TaskCmd { serial_number, cmd_type, ..Default::default() },
        };
        self.channel.own_cmd_cfg_writer.cmd.write(cmd);
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            admin_state: self.state_machine.admin_state(),
            packml_state: self.state_machine.packml_state(),
            status: self.state_machine.status(),
            error_count: self.errors.len as u32,
            echo_serial: self.last_cmd_serial.unwrap_or(0),
        }
    }

    pub fn tick(&mut self) {
        if self.channel.own_cmd_cfg_reader.cfg.has_changed() {
            if let Ok(cfg) = self.channel.own_cmd_cfg_reader.cfg.read() {
                self.apply_cfg(cfg);
            }
        }

        let cmd = match self.channel.own_cmd_cfg_reader.cmd.read() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "task cmd read failed, holding last state");
                self.publish_stat(0);
                return;
            }
        };

        let is_new = self.last_cmd_serial != Some(cmd.serial_number);
        self.last_cmd_serial = Some(cmd.serial_number);

        let outcome = self.state_machine.dispatch(cmd.serial_number, cmd.cmd_type, self.cfg.strict);
        if is_new && !outcome.accepted {
            self.errors.push(TaskErrorCode::ImproperCommand);
        }
        if outcome.on_entry {
            self.on_new_command(&cmd, outcome.forward);
        }

        self.run_fault_injection();
        self.poll_transition();
        self.drive_program();

        self.publish_stat(cmd.serial_number);
    }

    fn apply_cfg(&mut self, cfg: TaskCfg) {
        if cfg.mttf != self.cfg.mttf || cfg.mttr != self.cfg.mttr {
            self.fault = FaultInjector::new(cfg.mttf, cfg.mttr);
        }
        self.cfg = cfg;
    }

    fn on_new_command(&mut self, cmd: &TaskCmd, forward: Forward) {
        match forward {
            Forward::None => {}
            Forward::Init => self.forward_init(),
            Forward::Abort => self.forward_cancel(TrajCmdType::Abort, ToolCmdType::Abort),
            Forward::Halt => self.forward_cancel(TrajCmdType::Halt, ToolCmdType::Abort),
            Forward::Stop => self.forward_cancel(TrajCmdType::Stop, ToolCmdType::Abort),
            Forward::Shutdown => self.forward_cancel(TrajCmdType::Shutdown, ToolCmdType::Shutdown),
        }

        match cmd.cmd_type {
            TaskCmdType::Start => self.start_program(cmd.program_str()),
            TaskCmdType::Reset => {
                self.program = None;
                self.interp.clear();
                self.active = None;
            }
            TaskCmdType::Clear => self.errors.clear(),
            TaskCmdType::Hold => {
                let scale = self.current_traj_scale();
                self.state_machine.save_scale(scale);
                self.set_traj_scale(0.0);
            }
            TaskCmdType::Unhold => {
                let scale = self.state_machine.take_saved_scale().unwrap_or(1.0);
                self.set_traj_scale(scale);
            }
            _ => {}
        }
    }

    fn forward_init(&mut self) {
        self.send_traj(TrajCmdType::Init, Pose::IDENTITY, Default::default(), None);
        self.send_tool(ToolCmdType::Init, 0, 0.0);
    }

    fn forward_cancel(&mut self, traj_cmd: TrajCmdType, tool_cmd: ToolCmdType) {
        self.program = None;
        self.interp.clear();
        self.active = None;
        self.send_traj(traj_cmd, Pose::IDENTITY, Default::default(), None);
        self.send_tool(tool_cmd, 0, 0.0);
    }

    fn start_program(&mut self, name: &str) {
        match Program::load(&self.prog_dir, name) {
            Ok(program) => {
                self.program = Some(program);
                self.interp.clear();
                self.active = None;
            }
            Err(e) => {
                warn!(error = %e, program = name, "failed to load program");
                self.errors.push(TaskErrorCode::ProgramNotFound);
                self.state_machine.force_abort();
            }
        }
    }

    fn current_traj_scale(&mut self) -> f64 {
        self.channel.traj_reader.stat.read().map(|s| s.scale).unwrap_or(1.0)
    }

    fn set_traj_scale(&mut self, scale: f64) {
        let baseline = self.channel.traj_reader.set.read().map(|s| s.cfg_echo).ok();
        let Some(mut cfg) = baseline else { return };
        cfg.scale = scale.clamp(0.0, cfg.max_scale.max(1.0));
        cfg.serial_number = self.channel.traj_writer.cfg.next_serial();
        self.channel.traj_writer.cfg.write(cfg);
    }

    fn run_fault_injection(&mut self) {
        match self.fault.tick(self.dt()) {
            FaultEvent::Failed => {
                self.errors.push(TaskErrorCode::Control);
                self.state_machine.force_abort();
                self.forward_cancel(TrajCmdType::Abort, ToolCmdType::Abort);
            }
            FaultEvent::Recovered | FaultEvent::None => {}
        }
    }

    /// Advance any in-flight "-ing" transition (§4.6).
    fn poll_transition(&mut self) {
        let ready = match self.state_machine.pending_target() {
            Some(PackMlState::Held) => {
                let stat = self.channel.traj_reader.stat.read().ok();
                stat.map(|s| s.scale.abs() < 1e-6 && s.status != ChannelStatus::Exec).unwrap_or(false)
            }
            _ => true,
        };
        self.state_machine.tick(self.dt(), ready);
    }

    /// Pull program records into the interp list, then drive the interp
    /// list's front record toward completion (§4.6).
    fn drive_program(&mut self) {
        if self.state_machine.packml_state() != PackMlState::Execute {
            return;
        }

        while !self.interp.is_half_full() {
            let Some(program) = self.program.as_mut() else { break };
            let Some(record) = program.next_record() else { break };
            if self.interp.push(record).is_err() {
                break;
            }
        }

        if self.interp.is_empty() {
            if self.program.as_ref().is_some_and(Program::is_exhausted) {
                self.state_machine.begin_completing();
            }
            return;
        }

        if self.active.is_none() {
            self.active = self.interp.front().copied().map(|r| self.begin(r));
        }

        let Some(active) = self.active else { return };
        let done = match active {
            Active::Delay { remaining } => {
                let remaining = remaining - self.dt();
                if remaining <= 0.0 {
                    true
                } else {
                    self.active = Some(Active::Delay { remaining });
                    false
                }
            }
            Active::WaitMotion => self
                .channel
                .traj_reader
                .stat
                .read()
                .map(|s| s.queue_count == 0 && s.status != ChannelStatus::Exec)
                .unwrap_or(false),
            Active::WaitTool => self
                .channel
                .tool_reader
                .stat
                .read()
                .map(|s| s.echo_serial_number == self.last_tool_serial && s.status != ChannelStatus::Exec)
                .unwrap_or(false),
            Active::MoveSent => true,
        };

        if done {
            self.interp.pop_front();
            self.active = None;
        }
    }

    /// Start executing the just-dequeued front record, returning the
    /// in-flight bookkeeping needed to detect its completion.
    fn begin(&mut self, record: InterpRecord) -> Active {
        match record {
            InterpRecord::Delay(secs) => Active::Delay { remaining: secs.max(0.0) },
            InterpRecord::WaitMotion => Active::WaitMotion,
            InterpRecord::WaitTool => Active::WaitTool,
            InterpRecord::MoveJoint { joints, n, time_override } => {
                if self.traj_queue_has_room() {
                    let joints_arr = gomotion_common::shm::segments::JointArray { values: joints, n: n as u32 };
                    self.send_traj(TrajCmdType::MoveJoint, Pose::IDENTITY, joints_arr, time_override);
                    Active::MoveSent
                } else {
                    Active::Delay { remaining: 0.0 }
                }
            }
            InterpRecord::MoveWorld { pose, time_override } => {
                if self.traj_queue_has_room() {
                    self.send_traj(TrajCmdType::MoveWorld, pose, Default::default(), time_override);
                    Active::MoveSent
                } else {
                    Active::Delay { remaining: 0.0 }
                }
            }
            InterpRecord::ToolOn { id, value } => {
                self.send_tool(ToolCmdType::On, id, value);
                Active::MoveSent
            }
            InterpRecord::ToolOff { id } => {
                self.send_tool(ToolCmdType::Off, id, 0.0);
                Active::MoveSent
            }
        }
    }

    fn traj_queue_has_room(&mut self) -> bool {
        self.channel.traj_reader.stat.read().map(|s| (s.queue_count as usize) < MOTION_QUEUE_CAPACITY).unwrap_or(false)
    }

    fn send_traj(
        &mut self,
        cmd_type: TrajCmdType,
        pose: Pose,
        joints: gomotion_common::shm::segments::JointArray,
        time_override: Option<f64>,
    ) {
        let serial_number = self.channel.traj_writer.cmd.next_serial();
        self.channel.traj_writer.cmd.write(TrajCmd {
            serial_number,
            cmd_type,
            pose,
            joints,
            has_time_override: time_override.is_some(),
            time_override: time_override.unwrap_or(0.0),
            ..Default::default()
        });
    }

    fn send_tool(&mut self, cmd_type: ToolCmdType, id: u32, value: f64) {
        self.last_tool_serial = self.channel.tool_writer.cmd.next_serial();
        self.channel.tool_writer.cmd.write(ToolCmd { serial_number: self.last_tool_serial, cmd_type, id, value });
    }

    fn publish_stat(&mut self, echo_serial: u64) {
        let (error_ring, error_ring_head, error_ring_len) = self.errors.to_fixed();
        let stat = TaskStat {
            serial_number: self.channel.own_stat_set_writer.stat.next_serial(),
            echo_serial_number: echo_serial,
            status: self.state_machine.status(),
            admin_state: self.state_machine.admin_state(),
            state_model: self.state_machine.packml_state(),
            error_ring,
            error_ring_head,
            error_ring_len,
        };
        self.channel.own_stat_set_writer.stat.write(stat);

        let set = TaskSet {
            serial_number: self.channel.own_stat_set_writer.set.next_serial(),
            echo_serial_number: echo_serial,
            status: self.state_machine.status(),
            admin_state: self.state_machine.admin_state(),
            cfg_echo: self.cfg,
        };
        self.channel.own_stat_set_writer.set.write(set);
    }

    /// Run forever at this loop's own soft-real-time period (§4.6, §5: no
    /// semaphore coupling, same idiom as the Tool Loop).
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

#[cfg(test)]
mod tests {
    use super::*;
    use gomotion_common::shm::p2p::{ModuleAbbrev, TypedP2pWriter};
    use gomotion_common::shm::segments::{
        ToolSet, ToolStat, TrajSet, TrajStat, TASK_SEG_CFG, TASK_SEG_CMD, TOOL_SEG_SET, TOOL_SEG_STAT, TRAJ_SEG_SET,
        TRAJ_SEG_STAT,
    };
    use std::sync::Mutex;

    static TASK_TEST_LOCK: Mutex<()> = Mutex::new(());

    fn base_cfg() -> TaskCfg {
        TaskCfg { serial_number: 0, cycle_time: 0.1, debug: false, strict: true, mttf: 0.0, mttr: 0.0 }
    }

    struct Peers {
        cmd: TypedP2pWriter<TaskCmd>,
        _cfg: TypedP2pWriter<TaskCfg>,
        _traj_stat: TypedP2pWriter<TrajStat>,
        _traj_set: TypedP2pWriter<TrajSet>,
        _tool_stat: TypedP2pWriter<ToolStat>,
        _tool_set: TypedP2pWriter<ToolSet>,
    }

    fn seed_peers() -> Peers {
        Peers {
            cmd: TypedP2pWriter::<TaskCmd>::create(TASK_SEG_CMD, ModuleAbbrev::Task, ModuleAbbrev::Task).unwrap(),
            _cfg: TypedP2pWriter::<TaskCfg>::create(TASK_SEG_CFG, ModuleAbbrev::Task, ModuleAbbrev::Task).unwrap(),
            _traj_stat: TypedP2pWriter::<TrajStat>::create(TRAJ_SEG_STAT, ModuleAbbrev::Traj, ModuleAbbrev::Task).unwrap(),
            _traj_set: TypedP2pWriter::<TrajSet>::create(TRAJ_SEG_SET, ModuleAbbrev::Traj, ModuleAbbrev::Task).unwrap(),
            _tool_stat: TypedP2pWriter::<ToolStat>::create(TOOL_SEG_STAT, ModuleAbbrev::Tool, ModuleAbbrev::Task).unwrap(),
            _tool_set: TypedP2pWriter::<ToolSet>::create(TOOL_SEG_SET, ModuleAbbrev::Tool, ModuleAbbrev::Task).unwrap(),
        }
    }

    #[test]
    fn init_transitions_admin_state() {
        let _guard = TASK_TEST_LOCK.lock().unwrap();
        let mut peers = seed_peers();
        let mut cycle = TaskCycle::new(base_cfg(), std::env::temp_dir(), 5).unwrap();

        peers.cmd.write(TaskCmd { serial_number: 1, cmd_type: TaskCmdType::Init, ..Default::default() });
        cycle.tick();
        assert_eq!(cycle.state_machine.admin_state(), gomotion_common::shm::segments::AdminState::Initialized);
    }

    #[test]
    fn start_with_missing_program_forces_abort() {
        let _guard = TASK_TEST_LOCK.lock().unwrap();
        let mut peers = seed_peers();
        let mut cycle = TaskCycle::new(base_cfg(), std::env::temp_dir(), 5).unwrap();

        peers.cmd.write(TaskCmd { serial_number: 1, cmd_type: TaskCmdType::Init, ..Default::default() });
        cycle.tick();
        peers.cmd.write(TaskCmd::with_program(TaskCmdType::Start, 2, "does_not_exist.ngc"));
        cycle.tick();
        assert_eq!(cycle.state_machine.packml_state(), PackMlState::Aborting);
        assert!(cycle.errors.len > 0);
    }

    #[test]
    fn strict_rejects_hold_from_idle() {
        let _guard = TASK_TEST_LOCK.lock().unwrap();
        let mut peers = seed_peers();
        let mut cycle = TaskCycle::new(base_cfg(), std::env::temp_dir(), 5).unwrap();

        peers.cmd.write(TaskCmd { serial_number: 1, cmd_type: TaskCmdType::Hold, ..Default::default() });
        cycle.tick();
        assert_eq!(cycle.errors.len, 1);
    }

    #[test]
    fn full_program_runs_to_completion() {
        let _guard = TASK_TEST_LOCK.lock().unwrap();
        let mut peers = seed_peers();
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("p.ngc"), "TOOL_ON 0 1.0\nDELAY 0.01\nTOOL_OFF 0\n").unwrap();
        let mut cycle = TaskCycle::new(base_cfg(), dir.path().to_path_buf(), 5).unwrap();

        peers.cmd.write(TaskCmd { serial_number: 1, cmd_type: TaskCmdType::Init, ..Default::default() });
        cycle.tick();
        peers.cmd.write(TaskCmd { serial_number: 2, cmd_type: TaskCmdType::Start, ..Default::default() });
        cycle.tick();
        for _ in 0..50 {
            cycle.tick();
        }
        assert!(matches!(
            cycle.state_machine.packml_state(),
            PackMlState::Completing | PackMlState::Complete | PackMlState::Execute
        ));
    }
}
