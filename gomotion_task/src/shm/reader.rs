//! Task's consumer side: its own `cmd`/`cfg` loop-back read (the cycle
//! driver reads what the wire server just wrote) plus Traj's and Tool's
//! `stat`/`set`, attached with retry since both start before Task (§9).

use std::thread;
use std::time::Duration;

use gomotion_common::shm::p2p::{P2pError, TypedP2pReader};
use gomotion_common::shm::segments::{
    TaskCfg, TaskCmd, ToolSet, ToolStat, TrajSet, TrajStat, TASK_SEG_CFG, TASK_SEG_CMD, TOOL_SEG_SET, TOOL_SEG_STAT,
    TRAJ_SEG_SET, TRAJ_SEG_STAT,
};

pub struct OwnCmdCfgReader {
    pub cmd: TypedP2pReader<TaskCmd>,
    pub cfg: TypedP2pReader<TaskCfg>,
}

impl OwnCmdCfgReader {
    pub fn attach(stale_threshold: u32) -> Result<Self, P2pError> {
        Ok(Self {
            cmd: TypedP2pReader::<TaskCmd>::attach(TASK_SEG_CMD, stale_threshold)?,
            cfg: TypedP2pReader::<TaskCfg>::attach(TASK_SEG_CFG, stale_threshold)?,
        })
    }
}

pub struct TrajStatSetReader {
    pub stat: TypedP2pReader<TrajStat>,
    pub set: TypedP2pReader<TrajSet>,
}

impl TrajStatSetReader {
    pub fn attach_with_retry(stale_threshold: u32, attempts: u32, delay: Duration) -> Result<Self, P2pError> {
        let stat = retry(|| TypedP2pReader::<TrajStat>::attach(TRAJ_SEG_STAT, stale_threshold), attempts, delay)?;
        let set = retry(|| TypedP2pReader::<TrajSet>::attach(TRAJ_SEG_SET, stale_threshold), attempts, delay)?;
        Ok(Self { stat, set })
    }
}

pub struct ToolStatSetReader {
    pub stat: TypedP2pReader<ToolStat>,
    pub set: TypedP2pReader<ToolSet>,
}

impl ToolStatSetReader {
    pub fn attach_with_retry(stale_threshold: u32, attempts: u32, delay: Duration) -> Result<Self, P2pError> {
        let stat = retry(|| TypedP2pReader::<ToolStat>::attach(TOOL_SEG_STAT, stale_threshold), attempts, delay)?;
        let set = retry(|| TypedP2pReader::<ToolSet>::attach(TOOL_SEG_SET, stale_threshold), attempts, delay)?;
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
