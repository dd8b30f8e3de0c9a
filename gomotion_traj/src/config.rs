//! Builds the Trajectory Loop's [`TrajCfg`] from the shared
//! [`GomotionConfig`] (§6 `[TRAJ]` plus every `[SERVO_n]`'s joint limits).

use gomotion_common::config::GomotionConfig;
use gomotion_common::error::ControlError;
use gomotion_common::pose::JointVector;
use gomotion_common::shm::segments::{JointArray, TrajCfg, TrajProfile};

/// Project `[TRAJ]` plus every axis's joint limit pair into a [`TrajCfg`].
pub fn build_traj_cfg(config: &GomotionConfig) -> Result<TrajCfg, ControlError> {
    if config.traj.cycle_time <= 0.0 {
        return Err(ControlError::InvalidConfig("traj cycle_time must be positive".to_string()));
    }

    let n = config.servo_axes.len();
    let mut min_joint = JointVector::zeros(n);
    let mut max_joint = JointVector::zeros(n);
    let mut home = JointVector::zeros(n);
    for (i, axis) in config.servo_axes.iter().enumerate() {
        min_joint.set(i, axis.min_limit);
        max_joint.set(i, axis.max_limit);
        home.set(i, axis.home);
    }

    Ok(TrajCfg {
        serial_number: 0,
        cycle_time: config.traj.cycle_time,
        debug: config.traj.debug,
        home: JointArray::from_slice(home.as_slice()),
        min_limit_tran: config.traj.min_limit.to_pose(),
        max_limit_tran: config.traj.max_limit.to_pose(),
        min_limit_joint: JointArray::from_slice(min_joint.as_slice()),
        max_limit_joint: JointArray::from_slice(max_joint.as_slice()),
        profile: TrajProfile {
            max_tvel: config.traj.max_tvel,
            max_tacc: config.traj.max_tacc,
            max_tjerk: config.traj.max_tjerk,
            max_rvel: config.traj.max_rvel,
            max_racc: config.traj.max_racc,
            max_rjerk: config.traj.max_rjerk,
        },
        scale: 1.0,
        scale_v: 1.0,
        scale_a: 1.0,
        max_scale: config.traj.max_scale,
        max_scale_v: config.traj.max_scale_v,
        max_scale_a: config.traj.max_scale_a,
        tool_transform: config.traj.tool_transform.to_pose(),
        log_type: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[gomotion]
length_units_per_m = 1000.0
angle_units_per_rad = 1.0

[task]
shm_key = 101
cycle_time = 0.01

[tool]
shm_key = 102

[traj]
shm_key = 103
cycle_time = 0.008
kinematics = "trivial"
max_tvel = 2.0
max_tacc = 10.0
max_tjerk = 100.0

[servo]
shm_key = 104
sem_key = 105

[[servo_axes]]
quantity = "length"
type = "pid"
cycle_time = 0.001
min_limit = -10.0
max_limit = 10.0
home = 1.0

[[servo_axes]]
quantity = "length"
type = "pid"
cycle_time = 0.001
min_limit = -5.0
max_limit = 5.0

[go_log]
shm_key = 106

[go_io]
shm_key = 107
"#;

    #[test]
    fn builds_cfg_projecting_joint_limits() {
        let config = GomotionConfig::from_toml_str(SAMPLE).unwrap();
        let cfg = build_traj_cfg(&config).unwrap();
        assert_eq!(cfg.min_limit_joint.as_slice(), &[-10.0, -5.0]);
        assert_eq!(cfg.max_limit_joint.as_slice(), &[10.0, 5.0]);
        assert_eq!(cfg.home.as_slice(), &[1.0, 0.0]);
        assert_eq!(cfg.profile.max_tvel, 2.0);
    }

    #[test]
    fn rejects_non_positive_cycle_time() {
        let mut config = GomotionConfig::from_toml_str(SAMPLE).unwrap();
        config.traj.cycle_time = 0.0;
        assert!(build_traj_cfg(&config).is_err());
    }
}
