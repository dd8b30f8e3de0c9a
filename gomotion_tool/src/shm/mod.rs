//! Tool Loop's shared-memory wiring (§4.1, §4.5): a single channel, unlike
//! Servo/Traj which fan out to N peers. Tool only ever consumes `cmd`/`cfg`
//! (written by Task) and produces `stat`/`set`.

use gomotion_common::shm::p2p::{ModuleAbbrev, P2pError, TypedP2pReader, TypedP2pWriter};
use gomotion_common::shm::segments::{
    ToolCfg, ToolCmd, ToolSet, ToolStat, TOOL_SEG_CFG, TOOL_SEG_CMD, TOOL_SEG_SET, TOOL_SEG_STAT,
};
use std::thread;
use std::time::Duration;

pub const ATTACH_ATTEMPTS: u32 = 50;
pub const ATTACH_DELAY_MS: u64 = 100;

pub struct ToolChannel {
    pub cmd: TypedP2pReader<ToolCmd>,
    pub cfg: TypedP2pReader<ToolCfg>,
    pub stat: TypedP2pWriter<ToolStat>,
    pub set: TypedP2pWriter<ToolSet>,
}

impl ToolChannel {
    /// Create this loop's own `stat`/`set`, then attach (with retry) to
    /// Task's `cmd`/`cfg` — Task may not have created them yet at boot
    /// (§9: Task is spawned last).
    pub fn open(stale_threshold: u32) -> Result<Self, P2pError> {
        let stat = TypedP2pWriter::<ToolStat>::create(TOOL_SEG_STAT, ModuleAbbrev::Tool, ModuleAbbrev::Task)?;
        let set = TypedP2pWriter::<ToolSet>::create(TOOL_SEG_SET, ModuleAbbrev::Tool, ModuleAbbrev::Task)?;
        let cmd = retry(|| TypedP2pReader::<ToolCmd>::attach(TOOL_SEG_CMD, stale_threshold))?;
        let cfg = retry(|| TypedP2pReader::<ToolCfg>::attach(TOOL_SEG_CFG, stale_threshold))?;
        Ok(Self { cmd, cfg, stat, set })
    }
}

fn retry<T>(mut f: impl FnMut() -> Result<T, P2pError>) -> Result<T, P2pError> {
    let mut last_err = None;
    for attempt in 0..ATTACH_ATTEMPTS {
        match f() {
            Ok(v) => return Ok(v),
            Err(err @ P2pError::NotFound { .. }) => {
                last_err = Some(err);
                if attempt + 1 < ATTACH_ATTEMPTS {
                    thread::sleep(Duration::from_millis(ATTACH_DELAY_MS));
                }
            }
            Err(err) => return Err(err),
        }
    }
    Err(last_err.expect("ATTACH_ATTEMPTS >= 1"))
}
