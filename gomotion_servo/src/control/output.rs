//! Dispatches the active control law for one joint and writes the result
//! through the external adapter (§4.2 step 5).

use gomotion_common::error::ControlError;
use gomotion_common::shm::segments::ControlType;
use gomotion_hal::ExtAdapter;

use super::pid::{PidGains, PidState, Setpoint, pid_compute};

/// Apply one tick of control for a single joint.
///
/// Returns the `(output, following_error)` pair that feeds into the stat
/// record; `ferror` is `setpoint.position - measured` regardless of which
/// control law ran, so it stays meaningful for diagnostics even under
/// pass-through.
pub fn apply_control(
    control_type: ControlType,
    pid_state: &mut PidState,
    gains: &PidGains,
    setpoint: Setpoint,
    measured: f64,
    dt: f64,
    joint: usize,
    adapter: &mut dyn ExtAdapter,
) -> Result<(f64, f64), ControlError> {
    let ferror = setpoint.position - measured;
    let output = match control_type {
        ControlType::Pid => {
            let out = pid_compute(pid_state, gains, setpoint, measured, dt);
            let result = adapter.write_vel(joint, out);
            if !result.is_ok() {
                return Err(ControlError::InvalidConfig(format!(
                    "joint {joint}: ext_write_vel failed: {result:?}"
                )));
            }
            out
        }
        ControlType::Pass => {
            let result = adapter.write_pos(joint, setpoint.position);
            if !result.is_ok() {
                return Err(ControlError::InvalidConfig(format!(
                    "joint {joint}: ext_write_pos failed: {result:?}"
                )));
            }
            setpoint.position
        }
    };
    Ok((output, ferror))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gomotion_hal::drivers::simulation::SimulationDriver;

    fn sp(position: f64) -> Setpoint {
        Setpoint { position, velocity: 0.0, acceleration: 0.0 }
    }

    fn gains() -> PidGains {
        PidGains {
            p: 1.0,
            i: 0.0,
            d: 0.0,
            pff: 0.0,
            vff: 0.0,
            aff: 0.0,
            min_output: -100.0,
            max_output: 100.0,
            pos_bias: 0.0,
            neg_bias: 0.0,
            deadband: 0.0,
        }
    }

    #[test]
    fn pid_path_calls_write_vel() {
        let mut sim = SimulationDriver::new(1);
        sim.joint_enable(0);
        let mut state = PidState::default();
        let (out, ferror) =
            apply_control(ControlType::Pid, &mut state, &gains(), sp(1.0), 0.0, 0.001, 0, &mut sim)
                .unwrap();
        assert!((out - 1.0).abs() < 1e-9);
        assert!((ferror - 1.0).abs() < 1e-9);
    }

    #[test]
    fn pass_path_calls_write_pos() {
        let mut sim = SimulationDriver::new(1);
        sim.joint_enable(0);
        let mut state = PidState::default();
        let (out, _) =
            apply_control(ControlType::Pass, &mut state, &gains(), sp(2.5), 0.0, 0.001, 0, &mut sim)
                .unwrap();
        assert!((out - 2.5).abs() < 1e-9);
        let (_, pos) = sim.read_pos(0);
        assert!((pos - 2.5).abs() < 1e-9);
    }

    #[test]
    fn disabled_joint_reports_error() {
        let mut sim = SimulationDriver::new(1);
        let mut state = PidState::default();
        let result =
            apply_control(ControlType::Pid, &mut state, &gains(), sp(1.0), 0.0, 0.001, 0, &mut sim);
        assert!(result.is_err());
    }
}
