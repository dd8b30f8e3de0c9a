//! Simulated failure injection (§4.6: `MTTF`/`MTTR` drive an exponentially
//! distributed time-to-failure and a matching repair time, routed through
//! the same `Control` error path as a real sub-system fault so Task cannot
//! tell the difference, §9).

use rand::rngs::ThreadRng;
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultEvent {
    None,
    /// A simulated failure just occurred; the cycle driver should force an
    /// abort exactly as it would for a real `TaskErrorCode::Control`.
    Failed,
    /// The simulated repair period just elapsed.
    Recovered,
}

pub struct FaultInjector {
    mttf: f64,
    mttr: f64,
    rng: ThreadRng,
    time_to_failure: f64,
    recovering_for: Option<f64>,
}

impl FaultInjector {
    /// `mttf`/`mttr` of `<= 0` disables injection entirely (§6 default:
    /// both zero, the common case for a machine not under fault-injection
    /// test).
    pub fn new(mttf: f64, mttr: f64) -> Self {
        let mut rng = rand::thread_rng();
        let time_to_failure = next_interval(&mut rng, mttf);
        Self { mttf, mttr, rng, time_to_failure, recovering_for: None }
    }

    pub fn tick(&mut self, dt: f64) -> FaultEvent {
        if let Some(remaining) = self.recovering_for {
            let remaining = remaining - dt;
            if remaining <= 0.0 {
                self.recovering_for = None;
                self.time_to_failure = next_interval(&mut self.rng, self.mttf);
                return FaultEvent::Recovered;
            }
            self.recovering_for = Some(remaining);
            return FaultEvent::None;
        }

        if self.mttf <= 0.0 {
            return FaultEvent::None;
        }

        self.time_to_failure -= dt;
        if self.time_to_failure <= 0.0 {
            self.recovering_for = Some(next_interval(&mut self.rng, self.mttr));
            return FaultEvent::Failed;
        }
        FaultEvent::None
    }
}

/// Exponentially-distributed interval with mean `mean` via inverse
/// transform sampling; `mean <= 0` yields `f64::INFINITY` (never fires).
fn next_interval(rng: &mut ThreadRng, mean: f64) -> f64 {
    if mean <= 0.0 {
        return f64::INFINITY;
    }
    let u: f64 = rng.gen_range(f64::EPSILON..1.0);
    -mean * u.ln()
}
