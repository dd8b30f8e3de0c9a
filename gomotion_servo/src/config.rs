//! Builds a joint's [`ServoCfg`] from the shared [`GomotionConfig`] (§6
//! `[SERVO_n]`). Loading and validating the INI-as-TOML file itself lives in
//! `gomotion_common::config`; this module only projects one axis section
//! into the wire shape the servo cmd/cfg channel carries.

use gomotion_common::config::{AxisControlType, GomotionConfig};
use gomotion_common::error::ControlError;
use gomotion_common::shm::segments::{ControlType, ServoCfg};

/// Project axis `index`'s `[SERVO_n]` section plus the global cycle_mult
/// (servo cycle_time vs. traj cycle_time) into a [`ServoCfg`].
pub fn build_servo_cfg(config: &GomotionConfig, index: usize) -> Result<ServoCfg, ControlError> {
    let axis = config.servo_axes.get(index).ok_or(ControlError::IdOutOfRange {
        id: index,
        max: config.servo_axes.len(),
    })?;

    if axis.cycle_time <= 0.0 {
        return Err(ControlError::InvalidConfig(format!(
            "servo {index}: cycle_time must be positive, got {}",
            axis.cycle_time
        )));
    }
    if config.traj.cycle_time <= 0.0 {
        return Err(ControlError::InvalidConfig(
            "traj cycle_time must be positive".to_string(),
        ));
    }
    let cycle_mult = (config.traj.cycle_time / axis.cycle_time).round().max(1.0) as u32;

    Ok(ServoCfg {
        serial_number: 0,
        cycle_time: axis.cycle_time,
        cycle_mult,
        control_type: match axis.control_type {
            AxisControlType::Pid => ControlType::Pid,
            AxisControlType::Pass => ControlType::Pass,
        },
        input_scale: axis.input_scale,
        output_scale: axis.output_scale,
        p: axis.p,
        i: axis.i,
        d: axis.d,
        pff: axis.pff,
        vff: axis.vff,
        aff: axis.aff,
        min_output: axis.min_output,
        max_output: axis.max_output,
        neg_bias: axis.neg_bias,
        pos_bias: axis.pos_bias,
        deadband: axis.deadband,
        min_limit: axis.min_limit,
        max_limit: axis.max_limit,
        max_vel: axis.max_vel,
        max_acc: axis.max_acc,
        max_jerk: axis.max_jerk,
        home_vel: axis.home_vel,
        configured_home: axis.home,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use gomotion_common::config::GomotionConfig;

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

[servo]
shm_key = 104
sem_key = 105

[[servo_axes]]
quantity = "length"
type = "pid"
cycle_time = 0.001
input_scale = 1.0
output_scale = 1.0
p = 10.0

[go_log]
shm_key = 106

[go_io]
shm_key = 107
"#;

    #[test]
    fn builds_cfg_with_derived_cycle_mult() {
        let config = GomotionConfig::from_toml_str(SAMPLE).unwrap();
        let cfg = build_servo_cfg(&config, 0).unwrap();
        assert_eq!(cfg.cycle_mult, 8);
        assert_eq!(cfg.control_type, gomotion_common::shm::segments::ControlType::Pid);
        assert_eq!(cfg.p, 10.0);
    }

    #[test]
    fn out_of_range_index_errors() {
        let config = GomotionConfig::from_toml_str(SAMPLE).unwrap();
        assert!(build_servo_cfg(&config, 5).is_err());
    }
}
