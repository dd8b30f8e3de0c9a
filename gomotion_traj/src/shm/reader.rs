//! Traj's consumer side: its own `cmd`/`cfg`/`ref` (written by Task, §4.1)
//! plus every servo's `stat`/`set` (written by that servo, §4.2 step 7).

use std::thread;
use std::time::Duration;

use gomotion_common::shm::p2p::{P2pError, TypedP2pReader};
use gomotion_common::shm::segments::{
    servo_seg_set, servo_seg_stat, ServoSet, ServoStat, TrajCfg, TrajCmd, TrajRef, TRAJ_SEG_CFG, TRAJ_SEG_CMD,
    TRAJ_SEG_REF,
};

/// Traj's own `cmd`/`cfg`/`ref`, attached with retry — Task may not have
/// created them yet at boot (§9: Task is spawned last).
pub struct OwnCmdCfgRefReader {
    pub cmd: TypedP2pReader<TrajCmd>,
    pub cfg: TypedP2pReader<TrajCfg>,
    pub xref: TypedP2pReader<TrajRef>,
}

impl OwnCmdCfgRefReader {
    pub fn attach_with_retry(stale_threshold: u32, attempts: u32, delay: Duration) -> Result<Self, P2pError> {
        let cmd = retry(|| TypedP2pReader::<TrajCmd>::attach(TRAJ_SEG_CMD, stale_threshold), attempts, delay)?;
        let cfg = retry(|| TypedP2pReader::<TrajCfg>::attach(TRAJ_SEG_CFG, stale_threshold), attempts, delay)?;
        let xref = retry(|| TypedP2pReader::<TrajRef>::attach(TRAJ_SEG_REF, stale_threshold), attempts, delay)?;
        Ok(Self { cmd, cfg, xref })
    }
}

/// One servo's `stat`/`set`, read by Traj (§4.4 step 1: "read every
/// servo's `stat`"). Attached with retry since every servo creates these
/// before Traj starts (§9), but the creation itself is not instantaneous.
pub struct ServoStatSetReader {
    pub stat: TypedP2pReader<ServoStat>,
    pub set: TypedP2pReader<ServoSet>,
}

impl ServoStatSetReader {
    pub fn attach_with_retry(
        joint: usize,
        stale_threshold: u32,
        attempts: u32,
        delay: Duration,
    ) -> Result<Self, P2pError> {
        let stat = retry(|| TypedP2pReader::<ServoStat>::attach(&servo_seg_stat(joint), stale_threshold), attempts, delay)?;
        let set = retry(|| TypedP2pReader::<ServoSet>::attach(&servo_seg_set(joint), stale_threshold), attempts, delay)?;
        Ok(Self { stat, set })
    }
}

fn retry<T>(mut f: impl FnMut() -> Result<T, P2pError>, attempts: u32, delay: Duration) -> Result<T, P2pError> {
    let mut last_err = None;
    for attempt in 0..attempts.max(1) {
        match f() {
            Ok(v) => return Ok(v),
            Err(err @ P2pError::NotFound { .. }) => {
                last_err = Some(err);
                if attempt + 1 < attempts {
                    thread::sleep(delay);
                }
            }
            Err(err) => return Err(err),
        }
    }
    Err(last_err.expect("attempts >= 1"))
}
