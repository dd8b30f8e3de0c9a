//! One joint's full shared-memory wiring: the `stat`/`set` pair this servo
//! instance owns plus the `cmd`/`cfg` pair Traj owns (§4.1, §4.2).

use std::time::Duration;

use gomotion_common::shm::p2p::P2pError;

use super::reader::CmdCfgReader;
use super::writer::StatSetWriter;

/// How many times to retry attaching `cmd`/`cfg` before giving up (§9: the
/// launcher spawns servos before Traj, so the first several attempts are
/// expected to fail with `NotFound`).
pub const CMD_CFG_ATTACH_ATTEMPTS: u32 = 50;
/// Delay between retries.
pub const CMD_CFG_ATTACH_DELAY_MS: u64 = 100;

pub struct ServoChannel {
    /// `cmd`/`cfg`, attached read-only; Traj is the producer.
    pub reader: CmdCfgReader,
    /// `stat`/`set`, created here; this servo instance is the producer.
    pub writer: StatSetWriter,
}

impl ServoChannel {
    /// Create this joint's `stat`/`set` segments, then attach to Traj's
    /// `cmd`/`cfg` segments with retry.
    pub fn open(joint: usize, stale_threshold: u32) -> Result<Self, P2pError> {
        let writer = StatSetWriter::create(joint)?;
        let reader = CmdCfgReader::attach_with_retry(
            joint,
            stale_threshold,
            CMD_CFG_ATTACH_ATTEMPTS,
            Duration::from_millis(CMD_CFG_ATTACH_DELAY_MS),
        )?;
        Ok(Self { reader, writer })
    }
}
