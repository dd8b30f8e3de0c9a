//! Setpoint interpolator (§4.2 step 4): subdivides the slower-rate Trajectory
//! Loop setpoint across the faster servo ticks between two `Servo` commands.
//!
//! At entry of each new command the endpoint is updated and the parametric
//! position `s` is reset to 0; `s` then advances by `1/cycle_mult` on every
//! tick so it reaches 1.0 exactly `cycle_mult` ticks later, the moment the
//! next Trajectory Loop setpoint is expected to arrive. Three shapes are
//! supported; `linear` is what the canonical build runs.

use super::pid::Setpoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpKind {
    #[default]
    Linear,
    Cubic,
    Quintic,
}

/// Blends `start → end` over `s ∈ [0, 1]`, also producing the velocity and
/// acceleration references the PID feed-forward terms consume.
#[derive(Debug, Clone, Copy)]
pub struct Interpolator {
    kind: InterpKind,
    start: f64,
    end: f64,
    s: f64,
    /// Per-tick increment of `s`, i.e. `1 / cycle_mult`.
    ds: f64,
    cycle_time: f64,
}

impl Interpolator {
    pub fn new(kind: InterpKind, cycle_mult: u32, cycle_time: f64) -> Self {
        let cycle_mult = cycle_mult.max(1);
        Self {
            kind,
            start: 0.0,
            end: 0.0,
            s: 1.0,
            ds: 1.0 / cycle_mult as f64,
            cycle_time,
        }
    }

    /// On-entry hook for a new `Servo` command (§9: "Command new via
    /// serial-number diff → explicit on-entry hook"). Re-anchors the
    /// interpolator at the current setpoint and resets `s`.
    pub fn on_new_setpoint(&mut self, new_end: f64) {
        self.start = self.value_at(self.s);
        self.end = new_end;
        self.s = 0.0;
    }

    /// Advance one servo tick and return the blended position/velocity/
    /// acceleration.
    pub fn tick(&mut self) -> Setpoint {
        let s = self.s;
        let position = self.value_at(s);
        let (blend_ds, blend_dds) = self.derivative_at(s);
        // d(s)/dt = ds / cycle_time: s advances by `ds` every tick of `cycle_time`.
        let s_dot = self.ds / self.cycle_time.max(1e-12);
        let velocity = (self.end - self.start) * blend_ds * s_dot;
        let acceleration = (self.end - self.start) * blend_dds * s_dot * s_dot;
        self.s = (self.s + self.ds).min(1.0);
        Setpoint { position, velocity, acceleration }
    }

    fn value_at(&self, s: f64) -> f64 {
        let s = s.clamp(0.0, 1.0);
        let blend = match self.kind {
            InterpKind::Linear => s,
            InterpKind::Cubic => 3.0 * s * s - 2.0 * s * s * s,
            InterpKind::Quintic => s * s * s * (10.0 - 15.0 * s + 6.0 * s * s),
        };
        self.start + (self.end - self.start) * blend
    }

    /// `(d(blend)/ds, d²(blend)/ds²)`, used only to shape the feed-forward
    /// velocity/acceleration references, not to decide position.
    fn derivative_at(&self, s: f64) -> (f64, f64) {
        let s = s.clamp(0.0, 1.0);
        match self.kind {
            InterpKind::Linear => (1.0, 0.0),
            InterpKind::Cubic => (6.0 * s - 6.0 * s * s, 6.0 - 12.0 * s),
            InterpKind::Quintic => (
                30.0 * s * s - 60.0 * s * s * s + 30.0 * s * s * s * s,
                60.0 * s - 180.0 * s * s + 120.0 * s * s * s,
            ),
        }
    }

    pub fn current_value(&self) -> f64 {
        self.value_at(self.s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_reaches_endpoint_after_cycle_mult_ticks() {
        let mut interp = Interpolator::new(InterpKind::Linear, 4, 0.001);
        interp.on_new_setpoint(1.0);
        for _ in 0..4 {
            interp.tick();
        }
        assert!((interp.current_value() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn linear_midpoint_is_halfway() {
        let mut interp = Interpolator::new(InterpKind::Linear, 4, 0.001);
        interp.on_new_setpoint(4.0);
        interp.tick();
        interp.tick();
        assert!((interp.current_value() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn on_new_setpoint_reanchors_from_current_position() {
        let mut interp = Interpolator::new(InterpKind::Linear, 2, 0.001);
        interp.on_new_setpoint(2.0);
        interp.tick(); // s=0.5, value=1.0
        interp.on_new_setpoint(5.0);
        // start should now be 1.0, not 0.0
        assert!((interp.value_at(0.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn cubic_is_smooth_at_endpoints() {
        let mut interp = Interpolator::new(InterpKind::Cubic, 1, 0.001);
        interp.on_new_setpoint(1.0);
        let (d0, _) = interp.derivative_at(0.0);
        let (d1, _) = interp.derivative_at(1.0);
        assert!(d0.abs() < 1e-9);
        assert!(d1.abs() < 1e-9);
    }
}
