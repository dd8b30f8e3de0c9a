//! Builds the Task Loop's [`TaskCfg`] from the shared [`GomotionConfig`]
//! (§6 `[TASK]`).

use gomotion_common::config::GomotionConfig;
use gomotion_common::error::ControlError;
use gomotion_common::shm::segments::TaskCfg;

pub fn build_task_cfg(config: &GomotionConfig) -> Result<TaskCfg, ControlError> {
    if config.task.cycle_time <= 0.0 {
        return Err(ControlError::InvalidConfig("task cycle_time must be positive".to_string()));
    }
    if config.task.mttf < 0.0 || config.task.mttr < 0.0 {
        return Err(ControlError::InvalidConfig("task mttf/mttr must be non-negative".to_string()));
    }

    Ok(TaskCfg {
        serial_number: 0,
        cycle_time: config.task.cycle_time,
        debug: config.task.debug,
        strict: config.task.strict,
        mttf: config.task.mttf,
        mttr: config.task.mttr,
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
strict = true
mttf = 120.0
mttr = 5.0

[tool]
shm_key = 102

[traj]
shm_key = 103
cycle_time = 0.008
kinematics = "trivial"

[servo]
shm_key = 104
sem_key = 105

[go_log]
shm_key = 106

[go_io]
shm_key = 107
"#;

    #[test]
    fn builds_cfg_projecting_task_section() {
        let config = GomotionConfig::from_toml_str(SAMPLE).unwrap();
        let cfg = build_task_cfg(&config).unwrap();
        assert!(cfg.strict);
        assert_eq!(cfg.mttf, 120.0);
        assert_eq!(cfg.mttr, 5.0);
    }

    #[test]
    fn rejects_non_positive_cycle_time() {
        let mut config = GomotionConfig::from_toml_str(SAMPLE).unwrap();
        config.task.cycle_time = 0.0;
        assert!(build_task_cfg(&config).is_err());
    }

    #[test]
    fn rejects_negative_mttf() {
        let mut config = GomotionConfig::from_toml_str(SAMPLE).unwrap();
        config.task.mttf = -1.0;
        assert!(build_task_cfg(&config).is_err());
    }
}
