//! A software simulator implementing [`ExtAdapter`] with first-order
//! position/velocity integration per joint, an adjustable home-switch
//! position, and a fixed-length homing approach. Good enough to drive the
//! boot/joint-move/homing scenarios in §8 without real hardware.

use gomotion_common::hal::ExtResult;
use tracing::debug;

use crate::ext::ExtAdapter;

#[derive(Debug, Clone, Copy)]
struct AxisSim {
    position: f64,
    velocity: f64,
    enabled: bool,
    /// Raw position at which the home switch trips.
    home_switch_at: f64,
    homing: bool,
    at_home: bool,
}

impl Default for AxisSim {
    fn default() -> Self {
        Self {
            position: 0.0,
            velocity: 0.0,
            enabled: false,
            home_switch_at: 0.0,
            homing: false,
            at_home: false,
        }
    }
}

/// In-process joint simulator.
///
/// A single instance is shared by every joint's servo thread (the registry
/// only ever constructs one), so callers that aren't already serialized by
/// construction (i.e. anything beyond one servo thread per joint index)
/// must wrap it in a `Mutex` before sharing — see the crate-level doc
/// comment.
pub struct SimulationDriver {
    axes: Vec<AxisSim>,
    /// Position advances this many units per second per unit of commanded
    /// velocity; a crude but adequate stand-in for a real drive's response.
    dt: f64,
}

impl SimulationDriver {
    pub fn new(num_joints: usize) -> Self {
        Self { axes: vec![AxisSim::default(); num_joints.max(1)], dt: 0.001 }
    }

    /// Advance every axis's physics by `dt` seconds. Called by the servo
    /// loop's test harness / the standalone simulator loop once per tick;
    /// a real driver would instead poll actual hardware here.
    pub fn step(&mut self, dt: f64) {
        self.dt = dt;
        for axis in &mut self.axes {
            if axis.enabled {
                axis.position += axis.velocity * dt;
            }
            if axis.homing {
                axis.velocity = (axis.home_switch_at - axis.position).signum() * 0.1;
                if (axis.position - axis.home_switch_at).abs() < 1e-4 {
                    axis.at_home = true;
                    axis.homing = false;
                    axis.velocity = 0.0;
                }
            }
        }
    }

    fn axis(&mut self, joint: usize) -> Option<&mut AxisSim> {
        self.axes.get_mut(joint)
    }
}

impl ExtAdapter for SimulationDriver {
    fn ext_init(&mut self) -> ExtResult {
        debug!(axes = self.axes.len(), "simulation driver initialized");
        ExtResult::Ok
    }

    fn ext_quit(&mut self) -> ExtResult {
        ExtResult::Ok
    }

    fn joint_init(&mut self, joint: usize) -> ExtResult {
        match self.axis(joint) {
            Some(_) => ExtResult::Ok,
            None => ExtResult::BadId,
        }
    }

    fn joint_enable(&mut self, joint: usize) -> ExtResult {
        match self.axis(joint) {
            Some(a) => {
                a.enabled = true;
                ExtResult::Ok
            }
            None => ExtResult::BadId,
        }
    }

    fn joint_disable(&mut self, joint: usize) -> ExtResult {
        match self.axis(joint) {
            Some(a) => {
                a.enabled = false;
                a.velocity = 0.0;
                ExtResult::Ok
            }
            None => ExtResult::BadId,
        }
    }

    fn joint_quit(&mut self, joint: usize) -> ExtResult {
        self.joint_disable(joint)
    }

    fn read_pos(&mut self, joint: usize) -> (ExtResult, f64) {
        match self.axis(joint) {
            Some(a) => (ExtResult::Ok, a.position),
            None => (ExtResult::BadId, 0.0),
        }
    }

    fn write_pos(&mut self, joint: usize, pos: f64) -> ExtResult {
        let dt = self.dt.max(1e-9);
        match self.axes.get_mut(joint) {
            Some(a) if a.enabled => {
                a.velocity = (pos - a.position) / dt;
                a.position = pos;
                ExtResult::Ok
            }
            Some(_) => ExtResult::Fail,
            None => ExtResult::BadId,
        }
    }

    fn write_vel(&mut self, joint: usize, vel: f64) -> ExtResult {
        match self.axis(joint) {
            Some(a) if a.enabled => {
                a.velocity = vel;
                ExtResult::Ok
            }
            Some(_) => ExtResult::Fail,
            None => ExtResult::BadId,
        }
    }

    fn joint_home(&mut self, joint: usize) -> ExtResult {
        match self.axis(joint) {
            Some(a) => {
                a.homing = true;
                a.at_home = false;
                ExtResult::Ok
            }
            None => ExtResult::BadId,
        }
    }

    fn is_home(&mut self, joint: usize) -> (ExtResult, bool) {
        match self.axis(joint) {
            Some(a) => (ExtResult::Ok, a.at_home),
            None => (ExtResult::BadId, false),
        }
    }

    fn home_latch(&mut self, joint: usize) -> (ExtResult, f64) {
        match self.axis(joint) {
            Some(a) => (ExtResult::Ok, a.position),
            None => (ExtResult::BadId, 0.0),
        }
    }

    fn num_di(&self) -> usize {
        0
    }
    fn num_do(&self) -> usize {
        0
    }
    fn num_ai(&self) -> usize {
        0
    }
    fn num_ao(&self) -> usize {
        0
    }

    fn read_di(&mut self, _out: &mut [bool]) -> ExtResult {
        ExtResult::Ok
    }
    fn write_do(&mut self, _values: &[bool]) -> ExtResult {
        ExtResult::Ok
    }
    fn read_ai(&mut self, _out: &mut [f64]) -> ExtResult {
        ExtResult::Ok
    }
    fn write_ao(&mut self, _values: &[f64]) -> ExtResult {
        ExtResult::Ok
    }

    fn set_parameters(&mut self, joint: usize, _values: &[f64]) -> ExtResult {
        match self.axis(joint) {
            Some(_) => ExtResult::Ok,
            None => ExtResult::BadId,
        }
    }

    fn trigger_in(&mut self, _input: usize) -> (ExtResult, bool) {
        (ExtResult::Ok, false)
    }
}
