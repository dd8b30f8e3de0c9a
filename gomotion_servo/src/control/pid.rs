//! PID controller with backward-Euler integration, feed-forward, separate
//! positive/negative output bias, a symmetric dead-band, and anti-windup by
//! integral-accumulation inhibition (§4.2 step 5, §9 "PID gain packs + biases
//! + dead-band → a value type").
//!
//! Zero `i` disables the integral term; zero `d` disables the derivative
//! term. This is the control law used when `[SERVO_n] TYPE = PID`; `PASS`
//! bypasses this module entirely (see [`crate::control::output`]).

/// Gains and limits for one axis, taken verbatim from `[SERVO_n]` (§6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidGains {
    pub p: f64,
    pub i: f64,
    pub d: f64,
    /// Position feed-forward gain.
    pub pff: f64,
    /// Velocity feed-forward gain.
    pub vff: f64,
    /// Acceleration feed-forward gain.
    pub aff: f64,
    pub min_output: f64,
    pub max_output: f64,
    /// Added to the output whenever it would be positive.
    pub pos_bias: f64,
    /// Added to the output whenever it would be negative.
    pub neg_bias: f64,
    /// Error magnitudes at or below this are treated as zero.
    pub deadband: f64,
}

/// Integral/derivative memory carried across cycles. Reset on axis
/// re-activation (a new `Servo` command entry) so a stale integral from a
/// previous command cannot kick the joint.
#[derive(Debug, Clone, Copy, Default)]
pub struct PidState {
    integral: f64,
    prev_error: f64,
}

impl PidState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Setpoint triple produced by the interpolator: position, velocity and
/// acceleration references for the feed-forward terms.
#[derive(Debug, Clone, Copy, Default)]
pub struct Setpoint {
    pub position: f64,
    pub velocity: f64,
    pub acceleration: f64,
}

/// Run one PID cycle. Returns the clamped output (before it is sent to
/// `ext_write_vel`).
pub fn pid_compute(
    state: &mut PidState,
    gains: &PidGains,
    setpoint: Setpoint,
    measured: f64,
    dt: f64,
) -> f64 {
    if dt <= 0.0 {
        return 0.0;
    }

    let mut error = setpoint.position - measured;
    if error.abs() <= gains.deadband {
        error = 0.0;
    }

    let p_term = gains.p * error;

    // Anti-windup: compute the trial output with the *current* integral
    // first; if it would saturate, freeze the integral rather than let it
    // keep growing against a clamp it cannot move past.
    let trial_i = if gains.i != 0.0 {
        state.integral + gains.i * error * dt
    } else {
        0.0
    };
    let ff = gains.pff * setpoint.position + gains.vff * setpoint.velocity
        + gains.aff * setpoint.acceleration;
    let d_term = if gains.d != 0.0 {
        gains.d * (error - state.prev_error) / dt
    } else {
        0.0
    };
    state.prev_error = error;

    let trial_output = p_term + trial_i + d_term + ff;
    if gains.i != 0.0 {
        if trial_output >= gains.min_output && trial_output <= gains.max_output {
            state.integral = trial_i;
        }
        // else: saturated, inhibit this cycle's accumulation.
    }

    let i_term = state.integral * if gains.i != 0.0 { 1.0 } else { 0.0 };
    let mut output = p_term + i_term + d_term + ff;

    output = if output >= 0.0 {
        output + gains.pos_bias
    } else {
        output + gains.neg_bias
    };

    output.clamp(gains.min_output, gains.max_output)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 0.001;

    fn gains(p: f64, i: f64, d: f64) -> PidGains {
        PidGains {
            p,
            i,
            d,
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

    fn sp(position: f64) -> Setpoint {
        Setpoint { position, velocity: 0.0, acceleration: 0.0 }
    }

    #[test]
    fn pure_proportional() {
        let mut s = PidState::default();
        let out = pid_compute(&mut s, &gains(10.0, 0.0, 0.0), sp(1.0), 0.0, DT);
        assert!((out - 10.0).abs() < 1e-12);
    }

    #[test]
    fn deadband_zeroes_small_error() {
        let mut s = PidState::default();
        let mut g = gains(10.0, 0.0, 0.0);
        g.deadband = 0.5;
        let out = pid_compute(&mut s, &g, sp(0.3), 0.0, DT);
        assert_eq!(out, 0.0);
    }

    #[test]
    fn integral_accumulates_under_constant_error() {
        let mut s = PidState::default();
        let g = gains(0.0, 100.0, 0.0);
        for _ in 0..10 {
            pid_compute(&mut s, &g, sp(1.0), 0.0, DT);
        }
        assert!((s.integral - 1.0).abs() < 1e-10);
    }

    #[test]
    fn anti_windup_freezes_integral_once_saturated() {
        let mut s = PidState::default();
        let mut g = gains(0.0, 1000.0, 0.0);
        g.max_output = 10.0;
        for _ in 0..10_000 {
            pid_compute(&mut s, &g, sp(100.0), 0.0, DT);
        }
        // Integral stops growing the instant the trial output would exceed
        // max_output, so it should settle very close to the clamp, not at
        // the unconstrained value of 1000*100*0.001*10000 = 1_000_000.
        assert!(s.integral <= 10.0 + 1e-9, "integral ran away: {}", s.integral);
    }

    #[test]
    fn bias_applied_by_sign_of_output() {
        let mut s = PidState::default();
        let mut g = gains(1.0, 0.0, 0.0);
        g.pos_bias = 2.0;
        g.neg_bias = -3.0;
        let out_pos = pid_compute(&mut s, &g, sp(5.0), 0.0, DT);
        assert!((out_pos - 7.0).abs() < 1e-9);
        s.reset();
        let out_neg = pid_compute(&mut s, &g, sp(-5.0), 0.0, DT);
        assert!((out_neg - (-8.0)).abs() < 1e-9);
    }

    #[test]
    fn feedforward_adds_to_output() {
        let mut s = PidState::default();
        let mut g = gains(0.0, 0.0, 0.0);
        g.pff = 1.0;
        g.vff = 2.0;
        g.aff = 0.5;
        let out = pid_compute(
            &mut s,
            &g,
            Setpoint { position: 1.0, velocity: 2.0, acceleration: 4.0 },
            0.0,
            DT,
        );
        assert!((out - (1.0 + 4.0 + 2.0)).abs() < 1e-9);
    }

    #[test]
    fn reset_clears_state() {
        let mut s = PidState::default();
        let g = gains(1.0, 100.0, 1.0);
        for _ in 0..100 {
            pid_compute(&mut s, &g, sp(5.0), 0.0, DT);
        }
        assert!(s.integral.abs() > 0.0);
        s.reset();
        assert_eq!(s.integral, 0.0);
        assert_eq!(s.prev_error, 0.0);
    }

    #[test]
    fn zero_dt_returns_zero() {
        let mut s = PidState::default();
        let out = pid_compute(&mut s, &gains(10.0, 0.0, 0.0), sp(5.0), 0.0, 0.0);
        assert_eq!(out, 0.0);
    }
}
