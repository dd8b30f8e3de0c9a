//! Task's producer side: its own `cmd`/`cfg` (written by the wire server,
//! §4.7), its own `stat`/`set` (read by any external client, §4.6), plus
//! Traj's and Tool's `cmd`/`cfg`/`ref` (§4.4 step 4 / §4.5, mirroring how
//! Traj creates every servo's `cmd`/`cfg`).

use gomotion_common::shm::p2p::{ModuleAbbrev, P2pError, TypedP2pWriter};
use gomotion_common::shm::segments::{
    TaskCfg, TaskCmd, TaskSet, TaskStat, ToolCfg, ToolCmd, TrajCfg, TrajCmd, TrajRef, TASK_SEG_CFG, TASK_SEG_CMD,
    TASK_SEG_SET, TASK_SEG_STAT, TOOL_SEG_CFG, TOOL_SEG_CMD, TRAJ_SEG_CFG, TRAJ_SEG_CMD, TRAJ_SEG_REF,
};

pub struct OwnCmdCfgWriter {
    pub cmd: TypedP2pWriter<TaskCmd>,
    pub cfg: TypedP2pWriter<TaskCfg>,
}

impl OwnCmdCfgWriter {
    pub fn create() -> Result<Self, P2pError> {
        Ok(Self {
            cmd: TypedP2pWriter::<TaskCmd>::create(TASK_SEG_CMD, ModuleAbbrev::Task, ModuleAbbrev::Task)?,
            cfg: TypedP2pWriter::<TaskCfg>::create(TASK_SEG_CFG, ModuleAbbrev::Task, ModuleAbbrev::Task)?,
        })
    }
}

pub struct OwnStatSetWriter {
    pub stat: TypedP2pWriter<TaskStat>,
    pub set: TypedP2pWriter<TaskSet>,
}

impl OwnStatSetWriter {
    pub fn create() -> Result<Self, P2pError> {
        Ok(Self {
            stat: TypedP2pWriter::<TaskStat>::create(TASK_SEG_STAT, ModuleAbbrev::Task, ModuleAbbrev::Launcher)?,
            set: TypedP2pWriter::<TaskSet>::create(TASK_SEG_SET, ModuleAbbrev::Task, ModuleAbbrev::Launcher)?,
        })
    }
}

/// Traj's `cmd`/`cfg`/`ref`, created here since Task is Traj's consumer-side
/// producer (§4.1, mirrors `gomotion_traj::shm::writer::ServoCmdCfgWriter`).
pub struct TrajCmdCfgRefWriter {
    pub cmd: TypedP2pWriter<TrajCmd>,
    pub cfg: TypedP2pWriter<TrajCfg>,
    pub xref: TypedP2pWriter<TrajRef>,
}

impl TrajCmdCfgRefWriter {
    pub fn create() -> Result<Self, P2pError> {
        Ok(Self {
            cmd: TypedP2pWriter::<TrajCmd>::create(TRAJ_SEG_CMD, ModuleAbbrev::Task, ModuleAbbrev::Traj)?,
            cfg: TypedP2pWriter::<TrajCfg>::create(TRAJ_SEG_CFG, ModuleAbbrev::Task, ModuleAbbrev::Traj)?,
            xref: TypedP2pWriter::<TrajRef>::create(TRAJ_SEG_REF, ModuleAbbrev::Task, ModuleAbbrev::Traj)?,
        })
    }
}

/// Tool's `cmd`/`cfg`, created here for the same reason (§4.5).
pub struct ToolCmdCfgWriter {
    pub cmd: TypedP2pWriter<ToolCmd>,
    pub cfg: TypedP2pWriter<ToolCfg>,
}

impl ToolCmdCfgWriter {
    pub fn create() -> Result<Self, P2pError> {
        Ok(Self {
            cmd: TypedP2pWriter::<ToolCmd>::create(TOOL_SEG_CMD, ModuleAbbrev::Task, ModuleAbbrev::Tool)?,
            cfg: TypedP2pWriter::<ToolCfg>::create(TOOL_SEG_CFG, ModuleAbbrev::Task, ModuleAbbrev::Tool)?,
        })
    }
}
