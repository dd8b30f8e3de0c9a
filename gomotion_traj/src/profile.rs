//! Jerk-limited segment timing (§4.3 "Segment generation semantics").
//!
//! Every segment shape (per-axis joint move, translational arc-length,
//! rotational SLERP, circular sweep) reduces to one scalar displacement
//! plus a `(vmax, amax, jmax)` limit triple. This module supplies that
//! scalar profile: a quintic "S-curve" blend whose peak velocity,
//! acceleration and jerk are bounded analytically from its duration, so the
//! minimum duration that respects all three limits can be solved in closed
//! form rather than by search.
//!
//! This is a single jerk-*bounded* polynomial blend (continuous jerk within
//! the segment, a bounded jump at the very endpoints) rather than the
//! classical 7-segment bang-bang-jerk trapezoid. It is deliberately chosen
//! over the 7-segment construction for this design: the closed-form peak
//! formulas below make "stretch duration to `T`, all axes finish together"
//! (§4.3) and "explicit `time` override scales the profile uniformly" (§4.3)
//! exactly the same operation — evaluate the one blend at a longer `T`.

use gomotion_common::consts::EPSILON;

/// The blend's peak-velocity coefficient: `max_s |d(blend)/ds| = 15/8`.
const PEAK_VEL_COEFF: f64 = 15.0 / 8.0;
/// The blend's peak-acceleration coefficient: `max_s |d2(blend)/ds2| = 10/sqrt(3)`.
const PEAK_ACC_COEFF: f64 = 5.773_502_691_896_258; // 10/sqrt(3)
/// The blend's peak-jerk coefficient, attained at `s = 0` and `s = 1`.
const PEAK_JERK_COEFF: f64 = 60.0;

/// `blend(s) = 10s^3 - 15s^4 + 6s^5`: 0 at `s=0`, 1 at `s=1`, with zero
/// first and second derivative at both endpoints.
fn blend(s: f64) -> f64 {
    let s2 = s * s;
    let s3 = s2 * s;
    let s4 = s3 * s;
    let s5 = s4 * s;
    10.0 * s3 - 15.0 * s4 + 6.0 * s5
}

fn blend_d1(s: f64) -> f64 {
    let s2 = s * s;
    let s3 = s2 * s;
    let s4 = s3 * s;
    30.0 * s2 - 60.0 * s3 + 30.0 * s4
}

fn blend_d2(s: f64) -> f64 {
    let s2 = s * s;
    let s3 = s2 * s;
    60.0 * s - 180.0 * s2 + 120.0 * s3
}

/// Minimum duration (seconds) for a scalar displacement of magnitude
/// `distance.abs()` to respect `vmax`/`amax`/`jmax` under the blend above.
/// Returns `0.0` for (near-)zero displacement.
pub fn min_duration(distance: f64, vmax: f64, amax: f64, jmax: f64) -> f64 {
    let d = distance.abs();
    if d < EPSILON {
        return 0.0;
    }
    let vmax = vmax.max(EPSILON);
    let amax = amax.max(EPSILON);
    let jmax = jmax.max(EPSILON);
    let t_v = PEAK_VEL_COEFF * d / vmax;
    let t_a = (PEAK_ACC_COEFF * d / amax).sqrt();
    let t_j = (PEAK_JERK_COEFF * d / jmax).cbrt();
    t_v.max(t_a).max(t_j)
}

/// Sample `(position, velocity, acceleration)` at time `t` into a segment of
/// `duration` covering signed scalar `distance` from a zero-relative start.
/// `t` is clamped into `[0, duration]`.
pub fn sample(distance: f64, duration: f64, t: f64) -> (f64, f64, f64) {
    if duration <= EPSILON {
        return (distance, 0.0, 0.0);
    }
    let s = (t / duration).clamp(0.0, 1.0);
    let pos = distance * blend(s);
    let vel = distance * blend_d1(s) / duration;
    let acc = distance * blend_d2(s) / (duration * duration);
    (pos, vel, acc)
}

/// Eased progress fraction `blend(t/duration) ∈ [0, 1]`, used to drive
/// SLERP and circular-sweep angle progress in lockstep with the
/// translational profile (§4.3).
pub fn fraction(duration: f64, t: f64) -> f64 {
    if duration <= EPSILON {
        return 1.0;
    }
    blend((t / duration).clamp(0.0, 1.0))
}

/// `d(fraction)/dt` at time `t`, i.e. the instantaneous rate the eased
/// progress fraction is changing at, in `1/s`. Used to capture a moving
/// segment's current rate when retargeting it into a [`decel_sample`] ramp
/// (§4.3 `stop()`).
pub fn fraction_rate(duration: f64, t: f64) -> f64 {
    if duration <= EPSILON {
        return 0.0;
    }
    let s = (t / duration).clamp(0.0, 1.0);
    blend_d1(s) / duration
}

/// `∫ blend(u) du` from `0` to `s`.
fn blend_integral(s: f64) -> f64 {
    let s2 = s * s;
    let s3 = s2 * s;
    let s4 = s3 * s;
    let s5 = s4 * s;
    let s6 = s5 * s;
    2.5 * s4 - 3.0 * s5 + s6
}

/// Duration (seconds) of a jerk-limited ramp from scalar rate `v0` down to
/// rest, respecting `amax`/`jmax` (§4.3 `stop()`: "jerk-limited
/// deceleration to rest"). Shares the blend's peak coefficients with
/// [`min_duration`], just applied to a ramp that starts already in motion
/// rather than one that starts and ends at rest.
pub fn decel_duration(v0: f64, amax: f64, jmax: f64) -> f64 {
    let v0 = v0.abs();
    if v0 < EPSILON {
        return 0.0;
    }
    let amax = amax.max(EPSILON);
    let jmax = jmax.max(EPSILON);
    let t_a = PEAK_VEL_COEFF * v0 / amax;
    let t_j = (PEAK_ACC_COEFF * v0 / jmax).sqrt();
    t_a.max(t_j)
}

/// Sample `(displacement, rate)` at time `t` of a ramp that starts at rate
/// `v0` and decays to `0` over `duration`, following
/// `rate(s) = v0 * (1 - blend(s))`. `displacement` is the integral of
/// `rate` from `0` to `t`.
pub fn decel_sample(v0: f64, duration: f64, t: f64) -> (f64, f64) {
    if duration <= EPSILON {
        return (0.0, 0.0);
    }
    let s = (t / duration).clamp(0.0, 1.0);
    let rate = v0 * (1.0 - blend(s));
    let disp = v0 * duration * (s - blend_integral(s));
    (disp, rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance_has_zero_duration() {
        assert_eq!(min_duration(0.0, 1.0, 1.0, 1.0), 0.0);
    }

    #[test]
    fn longer_duration_never_exceeds_limits() {
        let d = 2.0;
        let (vmax, amax, jmax) = (1.0, 5.0, 50.0);
        let t = min_duration(d, vmax, amax, jmax);
        let steps = 200;
        let mut peak_v = 0.0_f64;
        let mut peak_a = 0.0_f64;
        for i in 0..=steps {
            let tt = t * i as f64 / steps as f64;
            let (_, v, a) = sample(d, t, tt);
            peak_v = peak_v.max(v.abs());
            peak_a = peak_a.max(a.abs());
        }
        assert!(peak_v <= vmax * 1.01, "peak_v={peak_v} vmax={vmax}");
        assert!(peak_a <= amax * 1.01, "peak_a={peak_a} amax={amax}");
    }

    #[test]
    fn endpoints_are_exact() {
        let (p0, v0, _) = sample(5.0, 2.0, 0.0);
        let (p1, v1, _) = sample(5.0, 2.0, 2.0);
        assert!((p0 - 0.0).abs() < 1e-12);
        assert!((p1 - 5.0).abs() < 1e-9);
        assert!(v0.abs() < 1e-9);
        assert!(v1.abs() < 1e-9);
    }

    #[test]
    fn stretching_duration_scales_down_peaks() {
        let d = 1.0;
        let t0 = min_duration(d, 1.0, 10.0, 100.0);
        let t1 = t0 * 2.0;
        let (_, v0, _) = sample(d, t0, t0 / 2.0);
        let (_, v1, _) = sample(d, t1, t1 / 2.0);
        assert!(v1 < v0);
    }

    #[test]
    fn fraction_reaches_unity_at_duration() {
        assert!((fraction(2.0, 2.0) - 1.0).abs() < 1e-12);
        assert!((fraction(2.0, 0.0) - 0.0).abs() < 1e-12);
    }

    #[test]
    fn zero_rate_has_zero_decel_duration() {
        assert_eq!(decel_duration(0.0, 5.0, 50.0), 0.0);
    }

    #[test]
    fn decel_sample_starts_at_v0_and_ends_at_rest() {
        let v0 = 2.0;
        let t = decel_duration(v0, 5.0, 50.0);
        let (_, r0) = decel_sample(v0, t, 0.0);
        let (_, r1) = decel_sample(v0, t, t);
        assert!((r0 - v0).abs() < 1e-9);
        assert!(r1.abs() < 1e-9);
    }

    #[test]
    fn decel_sample_never_exceeds_limits() {
        let v0 = 3.0;
        let (amax, jmax) = (5.0, 50.0);
        let t = decel_duration(v0, amax, jmax);
        let steps = 200;
        let mut peak_a = 0.0_f64;
        for i in 0..=steps {
            let tt = t * i as f64 / steps as f64;
            let h = 1e-6;
            let (_, r0) = decel_sample(v0, t, (tt - h).max(0.0));
            let (_, r1) = decel_sample(v0, t, (tt + h).min(t));
            let a = (r1 - r0) / (2.0 * h);
            peak_a = peak_a.max(a.abs());
        }
        assert!(peak_a <= amax * 1.05, "peak_a={peak_a} amax={amax}");
    }
}
