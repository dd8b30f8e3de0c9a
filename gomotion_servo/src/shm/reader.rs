//! Servo's consumer side of its channel: `cmd`/`cfg`, written by the
//! Trajectory Loop (§4.1, §4.4 step 4: "the table writes a fresh `Servo`
//! command to every servo"). Attached here, not created — Traj owns the
//! producer side, so a fresh servo instance must retry until Traj has
//! created both segments (§9 leaf-first boot order: servos start first).

use std::thread;
use std::time::Duration;

use gomotion_common::shm::p2p::{P2pError, TypedP2pReader};
use gomotion_common::shm::segments::{servo_seg_cfg, servo_seg_cmd, ServoCfg, ServoCmd};

pub struct CmdCfgReader {
    pub cmd: TypedP2pReader<ServoCmd>,
    pub cfg: TypedP2pReader<ServoCfg>,
}

impl CmdCfgReader {
    /// Attach to both segments for `joint`. Fails with `P2pError::NotFound`
    /// if Traj has not created them yet.
    pub fn attach(joint: usize, stale_threshold: u32) -> Result<Self, P2pError> {
        Ok(Self {
            cmd: TypedP2pReader::<ServoCmd>::attach(&servo_seg_cmd(joint), stale_threshold)?,
            cfg: TypedP2pReader::<ServoCfg>::attach(&servo_seg_cfg(joint), stale_threshold)?,
        })
    }

    /// As [`Self::attach`], but retries on `NotFound` up to `attempts` times,
    /// sleeping `delay` between tries. Traj is spawned after every servo
    /// instance (§9), so the first several attempts are expected to fail.
    pub fn attach_with_retry(
        joint: usize,
        stale_threshold: u32,
        attempts: u32,
        delay: Duration,
    ) -> Result<Self, P2pError> {
        let mut last_err = None;
        for attempt in 0..attempts.max(1) {
            match Self::attach(joint, stale_threshold) {
                Ok(reader) => return Ok(reader),
                Err(err @ P2pError::NotFound { .. }) => {
                    last_err = Some(err);
                    if attempt + 1 < attempts {
                        thread::sleep(delay);
                    }
                }
                Err(err) => return Err(err),
            }
        }
        Err(last_err.unwrap_or(P2pError::NotFound { name: servo_seg_cmd(joint) }))
    }
}
