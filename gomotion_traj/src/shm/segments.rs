//! The Trajectory Loop's full shared-memory wiring (§4.1, §4.4): its own
//! channel (consumer of `cmd`/`cfg`/`ref`, producer of `stat`/`set`) plus
//! every servo's channel from the opposite side it sees in `gomotion_servo`
//! (producer of `cmd`/`cfg`, consumer of `stat`/`set`).

use std::time::Duration;

use gomotion_common::shm::p2p::P2pError;

use super::reader::{OwnCmdCfgRefReader, ServoStatSetReader};
use super::writer::{OwnStatSetWriter, ServoCmdCfgWriter};

/// Attempts/delay used attaching to segments a peer may not have created
/// yet (§9 leaf-first boot order).
pub const ATTACH_ATTEMPTS: u32 = 50;
pub const ATTACH_DELAY_MS: u64 = 100;

pub struct TrajChannel {
    pub own_reader: OwnCmdCfgRefReader,
    pub own_writer: OwnStatSetWriter,
    pub servo_writers: Vec<ServoCmdCfgWriter>,
    pub servo_readers: Vec<ServoStatSetReader>,
}

impl TrajChannel {
    /// Create this loop's own `stat`/`set` and every servo's `cmd`/`cfg`,
    /// then attach (with retry) to Task's `cmd`/`cfg`/`ref` and every
    /// servo's `stat`/`set` (§9: servos start first, Task starts last).
    pub fn open(num_joints: usize, stale_threshold: u32) -> Result<Self, P2pError> {
        let own_writer = OwnStatSetWriter::create()?;

        let mut servo_writers = Vec::with_capacity(num_joints);
        let mut servo_readers = Vec::with_capacity(num_joints);
        for joint in 0..num_joints {
            servo_writers.push(ServoCmdCfgWriter::create(joint)?);
            servo_readers.push(ServoStatSetReader::attach_with_retry(
                joint,
                stale_threshold,
                ATTACH_ATTEMPTS,
                Duration::from_millis(ATTACH_DELAY_MS),
            )?);
        }

        let own_reader = OwnCmdCfgRefReader::attach_with_retry(
            stale_threshold,
            ATTACH_ATTEMPTS,
            Duration::from_millis(ATTACH_DELAY_MS),
        )?;

        Ok(Self { own_reader, own_writer, servo_writers, servo_readers })
    }
}
