//! Task Loop's full shared-memory wiring (§4.1, §4.6): producer of its own
//! `cmd`/`cfg`/`stat`/`set` plus Traj's and Tool's `cmd`/`cfg`(/`ref`);
//! consumer of Traj's and Tool's `stat`/`set`.

use std::time::Duration;

use gomotion_common::shm::p2p::P2pError;

use super::reader::{OwnCmdCfgReader, ToolStatSetReader, TrajStatSetReader};
use super::writer::{OwnCmdCfgWriter, OwnStatSetWriter, ToolCmdCfgWriter, TrajCmdCfgRefWriter};

pub const ATTACH_ATTEMPTS: u32 = 50;
pub const ATTACH_DELAY_MS: u64 = 100;

pub struct TaskChannel {
    pub own_cmd_cfg_writer: OwnCmdCfgWriter,
    pub own_cmd_cfg_reader: OwnCmdCfgReader,
    pub own_stat_set_writer: OwnStatSetWriter,
    pub traj_writer: TrajCmdCfgRefWriter,
    pub traj_reader: TrajStatSetReader,
    pub tool_writer: ToolCmdCfgWriter,
    pub tool_reader: ToolStatSetReader,
}

impl TaskChannel {
    /// Create Task's own channel and both downstream loops' `cmd`/`cfg`,
    /// then attach (with retry) to both downstream loops' `stat`/`set`
    /// (§9: Traj and Tool start before Task).
    pub fn open(stale_threshold: u32) -> Result<Self, P2pError> {
        let own_cmd_cfg_writer = OwnCmdCfgWriter::create()?;
        let own_cmd_cfg_reader = OwnCmdCfgReader::attach(stale_threshold)?;
        let own_stat_set_writer = OwnStatSetWriter::create()?;
        let traj_writer = TrajCmdCfgRefWriter::create()?;
        let tool_writer = ToolCmdCfgWriter::create()?;

        let traj_reader =
            TrajStatSetReader::attach_with_retry(stale_threshold, ATTACH_ATTEMPTS, Duration::from_millis(ATTACH_DELAY_MS))?;
        let tool_reader =
            ToolStatSetReader::attach_with_retry(stale_threshold, ATTACH_ATTEMPTS, Duration::from_millis(ATTACH_DELAY_MS))?;

        Ok(Self {
            own_cmd_cfg_writer,
            own_cmd_cfg_reader,
            own_stat_set_writer,
            traj_writer,
            traj_reader,
            tool_writer,
            tool_reader,
        })
    }
}
