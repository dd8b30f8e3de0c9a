//! Traj's producer side: its own `stat`/`set` (read by Task and any other
//! client, §4.1) plus every servo's `cmd`/`cfg` (read by that servo,
//! §4.4 step 4: "write a fresh Servo command to every servo").

use gomotion_common::shm::p2p::{ModuleAbbrev, P2pError, TypedP2pWriter};
use gomotion_common::shm::segments::{
    servo_seg_cfg, servo_seg_cmd, ServoCfg, ServoCmd, TrajSet, TrajStat, TRAJ_SEG_SET, TRAJ_SEG_STAT,
};

pub struct OwnStatSetWriter {
    pub stat: TypedP2pWriter<TrajStat>,
    pub set: TypedP2pWriter<TrajSet>,
}

impl OwnStatSetWriter {
    pub fn create() -> Result<Self, P2pError> {
        Ok(Self {
            stat: TypedP2pWriter::<TrajStat>::create(TRAJ_SEG_STAT, ModuleAbbrev::Traj, ModuleAbbrev::Task)?,
            set: TypedP2pWriter::<TrajSet>::create(TRAJ_SEG_SET, ModuleAbbrev::Traj, ModuleAbbrev::Task)?,
        })
    }
}

/// One servo's `cmd`/`cfg`, created here since Traj is the producer for
/// every servo channel's consumer side (§4.1).
pub struct ServoCmdCfgWriter {
    pub cmd: TypedP2pWriter<ServoCmd>,
    pub cfg: TypedP2pWriter<ServoCfg>,
}

impl ServoCmdCfgWriter {
    pub fn create(joint: usize) -> Result<Self, P2pError> {
        Ok(Self {
            cmd: TypedP2pWriter::<ServoCmd>::create(&servo_seg_cmd(joint), ModuleAbbrev::Traj, ModuleAbbrev::Servo)?,
            cfg: TypedP2pWriter::<ServoCfg>::create(&servo_seg_cfg(joint), ModuleAbbrev::Traj, ModuleAbbrev::Servo)?,
        })
    }
}
