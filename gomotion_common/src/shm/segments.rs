//! Channel payload types (§4.1-§4.7): the `cmd`/`stat`/`cfg`/`set`
//! sub-region record shapes carried over P2P segments between Task, Traj,
//! Tool and each Servo instance.
//!
//! Every record here is `#[repr(C)]` and `Copy`, sized and aligned so it can
//! be embedded directly into a [`crate::shm::p2p`] ping-pong slot; none of
//! them allocate.

use crate::consts::{MAX_JOINTS, MAX_TOOL_OUTPUTS};
use crate::pose::Pose;

/// Status a consumer reports for the command it is currently executing
/// (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ChannelStatus {
    #[default]
    Uninitialized = 0,
    Done = 1,
    Exec = 2,
    Error = 3,
}

/// Administrative state of a loop (§3 "State-machine state per loop").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum AdminState {
    #[default]
    Uninitialized = 0,
    Initialized = 1,
    Shutdown = 2,
}

/// Debug source location attached to stat/set records for offline
/// diagnosis (§4.1: "source line/file for debug").
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct DebugSource {
    pub line: u32,
    /// Fixed-width, NUL-padded file name (basename only).
    pub file: [u8; 32],
}

impl DebugSource {
    pub fn new(file: &str, line: u32) -> Self {
        let mut buf = [0u8; 32];
        let bytes = file.as_bytes();
        let n = bytes.len().min(32);
        buf[..n].copy_from_slice(&bytes[..n]);
        Self { line, file: buf }
    }
}

// ─── Servo channel (§4.2) ──────────────────────────────────────────────

/// Command kind dispatched to a Servo Loop's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ServoCmdType {
    #[default]
    Nop = 0,
    Init = 1,
    Abort = 2,
    Halt = 3,
    Shutdown = 4,
    Servo = 5,
    Stub = 6,
}

/// Control law a servo applies (§4.2 step 5, §6 `[servo.N] type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ControlType {
    #[default]
    Pid = 0,
    Pass = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct ServoCmd {
    pub serial_number: u64,
    pub cmd_type: ServoCmdType,
    pub setpoint: f64,
    pub home: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct ServoCfg {
    pub serial_number: u64,
    pub cycle_time: f64,
    pub cycle_mult: u32,
    pub control_type: ControlType,
    pub input_scale: f64,
    pub output_scale: f64,
    pub p: f64,
    pub i: f64,
    pub d: f64,
    pub pff: f64,
    pub vff: f64,
    pub aff: f64,
    pub min_output: f64,
    pub max_output: f64,
    pub neg_bias: f64,
    pub pos_bias: f64,
    pub deadband: f64,
    pub min_limit: f64,
    pub max_limit: f64,
    pub max_vel: f64,
    pub max_acc: f64,
    pub max_jerk: f64,
    pub home_vel: f64,
    pub configured_home: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct ServoStat {
    pub serial_number: u64,
    pub echo_serial_number: u64,
    pub status: ChannelStatus,
    pub admin_state: AdminState,
    pub debug: DebugSource,
    pub input: f64,
    pub velocity: f64,
    pub output: f64,
    pub ferror: f64,
    pub homed: bool,
    pub input_latch: f64,
    pub offset: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct ServoSet {
    pub serial_number: u64,
    pub echo_serial_number: u64,
    pub status: ChannelStatus,
    pub admin_state: AdminState,
    pub cfg_echo: ServoCfg,
}

// ─── Trajectory channel (§4.3, §4.4) ───────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TrajCmdType {
    #[default]
    Nop = 0,
    Init = 1,
    Abort = 2,
    Halt = 3,
    Shutdown = 4,
    Stop = 5,
    MoveUjoint = 6,
    MoveJoint = 7,
    MoveWorld = 8,
    MoveTool = 9,
    TrackWorld = 10,
    TrackJoint = 11,
    TeleopJoint = 12,
    TeleopWorld = 13,
    TeleopTool = 14,
    Here = 15,
}

/// Queue mode, also used for `Traj.queue_type` status (§8 invariant 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum QueueType {
    #[default]
    Joint = 0,
    World = 1,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct JointArray {
    pub values: [f64; MAX_JOINTS],
    pub n: u32,
}

impl JointArray {
    pub fn from_slice(values: &[f64]) -> Self {
        let mut arr = [0.0; MAX_JOINTS];
        let n = values.len().min(MAX_JOINTS);
        arr[..n].copy_from_slice(&values[..n]);
        Self { values: arr, n: n as u32 }
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values[..self.n as usize]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct TrajCmd {
    pub serial_number: u64,
    pub id: u32,
    pub cmd_type: TrajCmdType,
    pub pose: Pose,
    pub joints: JointArray,
    /// Velocity payload for teleop commands (linear/angular for world,
    /// per-joint for joint teleop — reuses `pose.tran`/`pose.rot` axis
    /// encoding for the world case and `joints` for the joint case).
    pub vel: Pose,
    pub has_time_override: bool,
    pub time_override: f64,
    /// Circular-segment parameters, only meaningful for `MoveWorld` when
    /// `is_circular` is set.
    pub is_circular: bool,
    pub center: Pose,
    pub normal: Pose,
    pub turns: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct TrajProfile {
    pub max_tvel: f64,
    pub max_tacc: f64,
    pub max_tjerk: f64,
    pub max_rvel: f64,
    pub max_racc: f64,
    pub max_rjerk: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct TrajCfg {
    pub serial_number: u64,
    pub cycle_time: f64,
    pub debug: bool,
    pub home: JointArray,
    pub min_limit_tran: Pose,
    pub max_limit_tran: Pose,
    pub min_limit_joint: JointArray,
    pub max_limit_joint: JointArray,
    pub profile: TrajProfile,
    pub scale: f64,
    pub scale_v: f64,
    pub scale_a: f64,
    pub max_scale: f64,
    pub max_scale_v: f64,
    pub max_scale_a: f64,
    pub tool_transform: Pose,
    pub log_type: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct TrajStat {
    pub serial_number: u64,
    pub echo_serial_number: u64,
    pub status: ChannelStatus,
    pub admin_state: AdminState,
    pub ecp: Pose,
    pub kcp: Pose,
    pub joints_act: JointArray,
    pub joints_homed_mask: u32,
    pub joints_active_mask: u32,
    pub homed: bool,
    pub queue_count: u32,
    pub queue_type: QueueType,
    pub scale: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct TrajSet {
    pub serial_number: u64,
    pub echo_serial_number: u64,
    pub status: ChannelStatus,
    pub admin_state: AdminState,
    pub cfg_echo: TrajCfg,
}

/// The externally-supplied Cartesian reference frame `ref.Xinv` (§4.4 step 6).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct TrajRef {
    pub serial_number: u64,
    pub xinv: Pose,
}

// ─── Tool channel (§4.5) ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ToolCmdType {
    #[default]
    Nop = 0,
    On = 1,
    Off = 2,
    Init = 3,
    Abort = 4,
    Shutdown = 5,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct ToolCmd {
    pub serial_number: u64,
    pub cmd_type: ToolCmdType,
    pub id: u32,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct ToolCfg {
    pub serial_number: u64,
    pub num_outputs: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct ToolStat {
    pub serial_number: u64,
    pub echo_serial_number: u64,
    pub status: ChannelStatus,
    pub admin_state: AdminState,
    pub values: [f64; MAX_TOOL_OUTPUTS],
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct ToolSet {
    pub serial_number: u64,
    pub echo_serial_number: u64,
    pub status: ChannelStatus,
    pub admin_state: AdminState,
    pub cfg_echo: ToolCfg,
}

// ─── Task channel (§4.6) ───────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TaskCmdType {
    #[default]
    Nop = 0,
    Init = 1,
    Abort = 2,
    Halt = 3,
    Shutdown = 4,
    Stop = 5,
    Start = 6,
    Hold = 7,
    Unhold = 8,
    Suspend = 9,
    Unsuspend = 10,
    Reset = 11,
    Clear = 12,
}

/// PackML state model states (§4.6, GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PackMlState {
    #[default]
    Idle = 0,
    Starting = 1,
    Execute = 2,
    Holding = 3,
    Held = 4,
    Unholding = 5,
    Suspending = 6,
    Suspended = 7,
    Unsuspending = 8,
    Completing = 9,
    Complete = 10,
    Aborting = 11,
    Aborted = 12,
    Clearing = 13,
    Stopping = 14,
    Stopped = 15,
    Resetting = 16,
}

/// Task error ring entry codes (§3, §4.6, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TaskErrorCode {
    #[default]
    None = 0,
    UnknownCommand = 1,
    ImproperCommand = 2,
    InvalidCommand = 3,
    Motion = 4,
    ProgramNotFound = 5,
    OutOfMemory = 6,
    ProgramError = 7,
    Control = 8,
    Tool = 9,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct TaskErrorEntry {
    pub timestamp_us: u64,
    pub code: TaskErrorCode,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct TaskCmd {
    pub serial_number: u64,
    pub cmd_type: TaskCmdType,
    /// Fixed-width NUL-padded program path/name for `Start`.
    pub program: [u8; 256],
    pub program_len: u32,
}

impl TaskCmd {
    pub fn program_str(&self) -> &str {
        let n = (self.program_len as usize).min(self.program.len());
        std::str::from_utf8(&self.program[..n]).unwrap_or("")
    }

    pub fn with_program(cmd_type: TaskCmdType, serial_number: u64, program: &str) -> Self {
        let mut buf = [0u8; 256];
        let bytes = program.as_bytes();
        let n = bytes.len().min(256);
        buf[..n].copy_from_slice(&bytes[..n]);
        Self { serial_number, cmd_type, program: buf, program_len: n as u32 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct TaskCfg {
    pub serial_number: u64,
    pub cycle_time: f64,
    pub debug: bool,
    pub strict: bool,
    pub mttf: f64,
    pub mttr: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct TaskStat {
    pub serial_number: u64,
    pub echo_serial_number: u64,
    pub status: ChannelStatus,
    pub admin_state: AdminState,
    pub state_model: PackMlState,
    pub error_ring: [TaskErrorEntry; crate::consts::TASK_ERROR_RING_CAPACITY],
    pub error_ring_head: u32,
    pub error_ring_len: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct TaskSet {
    pub serial_number: u64,
    pub echo_serial_number: u64,
    pub status: ChannelStatus,
    pub admin_state: AdminState,
    pub cfg_echo: TaskCfg,
}

// ─── Channel name helpers (§4.1 "Channel addressing") ──────────────────

/// Segment name for the `stat`/`set` direction of servo index `i`.
pub fn servo_seg_stat(i: usize) -> String {
    format!("servo{i}_stat")
}

/// Segment name for the `cmd`/`cfg` direction of servo index `i`.
pub fn servo_seg_cmd(i: usize) -> String {
    format!("servo{i}_cmd")
}

/// Segment name for the `cfg` sub-region of servo index `i`.
pub fn servo_seg_cfg(i: usize) -> String {
    format!("servo{i}_cfg")
}

/// Segment name for the `set` sub-region of servo index `i`.
pub fn servo_seg_set(i: usize) -> String {
    format!("servo{i}_set")
}

pub const TRAJ_SEG_CMD: &str = "traj_cmd";
pub const TRAJ_SEG_STAT: &str = "traj_stat";
pub const TRAJ_SEG_REF: &str = "traj_ref";
pub const TRAJ_SEG_CFG: &str = "traj_cfg";
pub const TRAJ_SEG_SET: &str = "traj_set";
pub const TOOL_SEG_CMD: &str = "tool_cmd";
pub const TOOL_SEG_STAT: &str = "tool_stat";
pub const TOOL_SEG_CFG: &str = "tool_cfg";
pub const TOOL_SEG_SET: &str = "tool_set";
pub const TASK_SEG_CMD: &str = "task_cmd";
pub const TASK_SEG_STAT: &str = "task_stat";
pub const TASK_SEG_CFG: &str = "task_cfg";
pub const TASK_SEG_SET: &str = "task_set";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_cmd_program_roundtrip() {
        let cmd = TaskCmd::with_program(TaskCmdType::Start, 5, "part1.ngc");
        assert_eq!(cmd.program_str(), "part1.ngc");
        assert_eq!(cmd.serial_number, 5);
    }

    #[test]
    fn joint_array_from_slice_truncates_and_tracks_len() {
        let ja = JointArray::from_slice(&[1.0, 2.0, 3.0]);
        assert_eq!(ja.n, 3);
        assert_eq!(ja.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn default_status_is_uninitialized() {
        assert_eq!(ChannelStatus::default(), ChannelStatus::Uninitialized);
        assert_eq!(AdminState::default(), AdminState::Uninitialized);
    }

    #[test]
    fn debug_source_truncates_long_names() {
        let d = DebugSource::new("a_file_name_that_is_definitely_longer_than_32_bytes.rs", 10);
        assert_eq!(d.line, 10);
    }
}
