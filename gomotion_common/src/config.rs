//! Configuration schema and loader (§6 "Configuration (INI file)").
//!
//! The original system is configured through an INI file; no INI-parsing
//! crate exists anywhere in this workspace's adopted stack, so the schema is
//! expressed as TOML via `serde` + `toml` instead, preserving the original
//! section/key structure one-for-one (lower-cased, see `DESIGN.md` §1).
//! Each section maps onto a `[SECTION]` block from §6, and `[SERVO_n]`
//! becomes one entry of `servo_axes` indexed by position.

use serde::Deserialize;
use thiserror::Error;

use crate::pose::{Pose, Quat, Vec3};

/// Errors raised while loading or validating a [`GomotionConfig`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("failed to read configuration file '{path}': {reason}")]
    Read { path: String, reason: String },
    #[error("failed to parse configuration: {0}")]
    Parse(String),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Six reals `x y z r p y` as used by `HOME`/`MIN_LIMIT`/`MAX_LIMIT`/
/// `TOOL_TRANSFORM` (§6). Deserializes from a TOML array of six floats and
/// converts to a [`Pose`] via [`SixReals::to_pose`].
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(try_from = "[f64; 6]")]
pub struct SixReals(pub [f64; 6]);

impl Default for SixReals {
    fn default() -> Self {
        SixReals([0.0; 6])
    }
}

impl TryFrom<[f64; 6]> for SixReals {
    type Error = std::convert::Infallible;
    fn try_from(v: [f64; 6]) -> Result<Self, Self::Error> {
        Ok(SixReals(v))
    }
}

impl SixReals {
    pub fn to_pose(self) -> Pose {
        let [x, y, z, r, p, yaw] = self.0;
        Pose::new(Vec3::new(x, y, z), Quat::from_rpy(r, p, yaw))
    }
}

/// `[GOMOTION]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct GomotionSection {
    pub length_units_per_m: f64,
    pub angle_units_per_rad: f64,
    pub ext_init_string: String,
}

impl Default for GomotionSection {
    fn default() -> Self {
        Self { length_units_per_m: 1.0, angle_units_per_rad: 1.0, ext_init_string: String::new() }
    }
}

/// `[TASK]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct TaskSection {
    pub shm_key: i32,
    pub cycle_time: f64,
    pub debug: bool,
    pub strict: bool,
    pub prog_dir: String,
    pub parameter_file_name: String,
    pub tool_file_name: String,
    pub mttf: f64,
    pub mttr: f64,
    pub tcp_port: u16,
}

impl Default for TaskSection {
    fn default() -> Self {
        Self {
            shm_key: 0,
            cycle_time: 0.1,
            debug: false,
            strict: false,
            prog_dir: String::from("."),
            parameter_file_name: String::new(),
            tool_file_name: String::new(),
            mttf: 0.0,
            mttr: 0.0,
            tcp_port: 5007,
        }
    }
}

/// `[TOOL]`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct ToolSection {
    pub shm_key: i32,
}

/// `[TRAJ]`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct TrajSection {
    pub shm_key: i32,
    pub cycle_time: f64,
    pub debug: bool,
    pub kinematics: String,
    pub home: SixReals,
    pub min_limit: SixReals,
    pub max_limit: SixReals,
    pub tool_transform: SixReals,
    pub max_tvel: f64,
    pub max_tacc: f64,
    pub max_tjerk: f64,
    pub max_rvel: f64,
    pub max_racc: f64,
    pub max_rjerk: f64,
    pub max_scale: f64,
    pub max_scale_v: f64,
    pub max_scale_a: f64,
}

impl Default for TrajSection {
    fn default() -> Self {
        Self {
            shm_key: 0,
            cycle_time: 0.01,
            debug: false,
            kinematics: String::from("trivial"),
            home: SixReals::default(),
            min_limit: SixReals([-1e9; 6]),
            max_limit: SixReals([1e9; 6]),
            tool_transform: SixReals::default(),
            max_tvel: 1.0,
            max_tacc: 10.0,
            max_tjerk: 100.0,
            max_rvel: 1.0,
            max_racc: 10.0,
            max_rjerk: 100.0,
            max_scale: 2.0,
            max_scale_v: 1.0,
            max_scale_a: 10.0,
        }
    }
}

/// `[SERVO]` — the section naming the per-axis `[SERVO_n]` blocks.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct ServoSection {
    pub shm_key: i32,
    /// Axis count. `0` means "use the number of configured `servo_axes`
    /// entries" (§6: "defaults to the count of `SERVO_n` sections").
    pub howmany: u32,
    pub sem_key: i32,
}

/// `[GO_LOG]`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct GoLogSection {
    pub shm_key: i32,
}

/// `[GO_IO]`.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct GoIoSection {
    pub shm_key: i32,
}

/// `QUANTITY` (§6 `[SERVO_n]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AxisQuantity {
    #[default]
    Length,
    Angle,
}

/// `TYPE` (§6 `[SERVO_n]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum AxisControlType {
    #[default]
    Pid,
    Pass,
}

/// One `[SERVO_n]` section: per-axis kinematic link parameters, PID gains,
/// scaling, limits and profile (§6).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct ServoAxisSection {
    pub quantity: AxisQuantity,
    #[serde(rename = "TYPE")]
    pub control_type: AxisControlType,
    pub dh_parameters: Option<[f64; 4]>,
    pub pp_parameters: Option<[f64; 6]>,
    pub urdf_parameters: Option<[f64; 9]>,
    pub pk_parameters: Option<[f64; 6]>,
    pub mass: f64,
    pub inertia: [f64; 9],
    pub cycle_time: f64,
    pub home: f64,
    pub input_scale: f64,
    pub output_scale: f64,
    #[serde(rename = "P")]
    pub p: f64,
    #[serde(rename = "I")]
    pub i: f64,
    #[serde(rename = "D")]
    pub d: f64,
    pub pff: f64,
    pub vff: f64,
    pub aff: f64,
    pub min_output: f64,
    pub max_output: f64,
    pub neg_bias: f64,
    pub pos_bias: f64,
    pub deadband: f64,
    pub min_limit: f64,
    pub max_limit: f64,
    pub max_vel: f64,
    pub max_acc: f64,
    pub max_jerk: f64,
    pub home_vel: f64,
}

impl Default for ServoAxisSection {
    fn default() -> Self {
        Self {
            quantity: AxisQuantity::Length,
            control_type: AxisControlType::Pid,
            dh_parameters: None,
            pp_parameters: None,
            urdf_parameters: None,
            pk_parameters: None,
            mass: 0.0,
            inertia: [0.0; 9],
            cycle_time: 0.001,
            home: 0.0,
            input_scale: 1.0,
            output_scale: 1.0,
            p: 0.0,
            i: 0.0,
            d: 0.0,
            pff: 0.0,
            vff: 0.0,
            aff: 0.0,
            min_output: -1e9,
            max_output: 1e9,
            neg_bias: 0.0,
            pos_bias: 0.0,
            deadband: 0.0,
            min_limit: -1e9,
            max_limit: 1e9,
            max_vel: 1.0,
            max_acc: 10.0,
            max_jerk: 100.0,
            home_vel: 0.0,
        }
    }
}

/// The complete machine configuration (§6), read once at launch and
/// pushed to every loop's `cfg` channel at boot (§1 "persistence beyond
/// settings pushed once at boot" is a non-goal).
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "lowercase", default)]
pub struct GomotionConfig {
    pub gomotion: GomotionSection,
    pub task: TaskSection,
    pub tool: ToolSection,
    pub traj: TrajSection,
    pub servo: ServoSection,
    pub go_log: GoLogSection,
    pub go_io: GoIoSection,
    /// `[SERVO_0]`, `[SERVO_1]`, ... in order; deserialized from a
    /// `[[servo_axes]]` array-of-tables in the TOML rendering.
    pub servo_axes: Vec<ServoAxisSection>,
}

impl GomotionConfig {
    /// Parse from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from a file path.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read { path: path.display().to_string(), reason: e.to_string() })?;
        let cfg = Self::from_toml_str(&text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Effective axis count (§6: `HOWMANY` defaults to the number of
    /// configured axis sections).
    pub fn axis_count(&self) -> usize {
        if self.servo.howmany > 0 {
            self.servo.howmany as usize
        } else {
            self.servo_axes.len()
        }
    }

    /// Validate cross-field and range invariants that `serde` defaults
    /// cannot express. Mirrors §7's "invalid configuration values"
    /// sub-system-failure tier, but performed once at boot so a bad
    /// configuration refuses to start any loop (§7 "Fatal" tier).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gomotion.length_units_per_m <= 0.0 {
            return Err(ConfigError::Invalid("LENGTH_UNITS_PER_M must be positive".into()));
        }
        if self.gomotion.angle_units_per_rad <= 0.0 {
            return Err(ConfigError::Invalid("ANGLE_UNITS_PER_RAD must be positive".into()));
        }
        let axis_count = self.axis_count();
        if axis_count == 0 {
            return Err(ConfigError::Invalid("no SERVO_n axes configured".into()));
        }
        if axis_count > crate::consts::MAX_JOINTS {
            return Err(ConfigError::Invalid(format!(
                "axis_count {axis_count} exceeds MAX_JOINTS {}",
                crate::consts::MAX_JOINTS
            )));
        }
        if self.servo_axes.len() < axis_count {
            return Err(ConfigError::Invalid(format!(
                "HOWMANY={axis_count} but only {} SERVO_n sections present",
                self.servo_axes.len()
            )));
        }
        for (i, axis) in self.servo_axes.iter().take(axis_count).enumerate() {
            if axis.cycle_time <= 0.0 {
                return Err(ConfigError::Invalid(format!("SERVO_{i}: CYCLE_TIME must be positive")));
            }
            if axis.min_limit > axis.max_limit {
                return Err(ConfigError::Invalid(format!("SERVO_{i}: MIN_LIMIT > MAX_LIMIT")));
            }
            if axis.max_vel < 0.0 || axis.max_acc < 0.0 || axis.max_jerk < 0.0 {
                return Err(ConfigError::Invalid(format!("SERVO_{i}: MAX_VEL/ACC/JERK must be non-negative")));
            }
        }
        if self.traj.cycle_time <= 0.0 {
            return Err(ConfigError::Invalid("TRAJ CYCLE_TIME must be positive".into()));
        }
        if self.traj.max_scale <= 0.0 || self.traj.max_scale_v <= 0.0 || self.traj.max_scale_a <= 0.0 {
            return Err(ConfigError::Invalid("TRAJ MAX_SCALE/SCALE_V/SCALE_A must be positive".into()));
        }
        if self.task.cycle_time <= 0.0 {
            return Err(ConfigError::Invalid("TASK CYCLE_TIME must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [gomotion]
        length_units_per_m = 1.0
        angle_units_per_rad = 1.0

        [task]
        shm_key = 101
        cycle_time = 0.1

        [traj]
        shm_key = 102
        cycle_time = 0.01
        kinematics = "trivial"
        max_tvel = 1.0
        max_tacc = 10.0
        max_tjerk = 100.0
        max_rvel = 1.0
        max_racc = 10.0
        max_rjerk = 100.0
        max_scale = 2.0
        max_scale_v = 1.0
        max_scale_a = 10.0

        [servo]
        shm_key = 103
        sem_key = 104

        [[servo_axes]]
        cycle_time = 0.001
        min_limit = -10.0
        max_limit = 10.0
        max_vel = 1.0
        max_acc = 10.0
        max_jerk = 100.0

        [[servo_axes]]
        cycle_time = 0.001
        min_limit = -10.0
        max_limit = 10.0
        max_vel = 1.0
        max_acc = 10.0
        max_jerk = 100.0
    "#;

    #[test]
    fn parses_and_validates_sample() {
        let cfg = GomotionConfig::from_toml_str(SAMPLE).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.axis_count(), 2);
    }

    #[test]
    fn rejects_non_positive_cycle_time() {
        let mut cfg = GomotionConfig::from_toml_str(SAMPLE).unwrap();
        cfg.servo_axes[0].cycle_time = 0.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_howmany_mismatch() {
        let mut cfg = GomotionConfig::from_toml_str(SAMPLE).unwrap();
        cfg.servo.howmany = 5;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn six_reals_to_pose() {
        let sr = SixReals([1.0, 2.0, 3.0, 0.0, 0.0, 0.0]);
        let pose = sr.to_pose();
        assert_eq!(pose.tran.x, 1.0);
        assert_eq!(pose.tran.y, 2.0);
        assert_eq!(pose.tran.z, 3.0);
    }
}
