//! Servo's producer side of its channel: `stat`/`set`, created at startup
//! and owned by this servo instance alone (§4.1, §4.2 step 7: "publish
//! stat/set").

use gomotion_common::shm::p2p::{ModuleAbbrev, P2pError, TypedP2pWriter};
use gomotion_common::shm::segments::{servo_seg_set, servo_seg_stat, ServoSet, ServoStat};

pub struct StatSetWriter {
    pub stat: TypedP2pWriter<ServoStat>,
    pub set: TypedP2pWriter<ServoSet>,
}

impl StatSetWriter {
    /// Create (or re-create) both segments for `joint`. Called once per
    /// servo instance at boot, before Traj/Tool/Task are spawned (§9).
    pub fn create(joint: usize) -> Result<Self, P2pError> {
        Ok(Self {
            stat: TypedP2pWriter::<ServoStat>::create(
                &servo_seg_stat(joint),
                ModuleAbbrev::Servo,
                ModuleAbbrev::Traj,
            )?,
            set: TypedP2pWriter::<ServoSet>::create(
                &servo_seg_set(joint),
                ModuleAbbrev::Servo,
                ModuleAbbrev::Traj,
            )?,
        })
    }
}
