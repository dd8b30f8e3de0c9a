//! The `ext_*` adapter trait (§4.7).

use gomotion_common::hal::ExtResult;

/// The external I/O adapter contract every driver implements.
///
/// All methods are non-blocking: a real implementation must poll its device
/// and return the best currently-known answer rather than wait for fresh
/// data (§4.7, §5 "Suspension points": no long-running operation may be
/// invoked from within a state table).
pub trait ExtAdapter: Send {
    /// One-time adapter startup (open device, allocate buffers).
    fn ext_init(&mut self) -> ExtResult;
    /// One-time adapter teardown.
    fn ext_quit(&mut self) -> ExtResult;

    /// Prepare a single joint for use (allocate per-joint device state).
    fn joint_init(&mut self, joint: usize) -> ExtResult;
    /// Enable drive power on a joint.
    fn joint_enable(&mut self, joint: usize) -> ExtResult;
    /// Disable drive power on a joint (e.g. on `Halt`/`Abort`).
    fn joint_disable(&mut self, joint: usize) -> ExtResult;
    /// Release per-joint device state.
    fn joint_quit(&mut self, joint: usize) -> ExtResult;

    /// Read the joint's raw (unscaled) position feedback.
    fn read_pos(&mut self, joint: usize) -> (ExtResult, f64);
    /// Write an absolute position command (pass-through control type).
    fn write_pos(&mut self, joint: usize, pos: f64) -> ExtResult;
    /// Write a velocity command (PID control type output).
    fn write_vel(&mut self, joint: usize, vel: f64) -> ExtResult;

    /// Start or continue the joint's homing sequence.
    fn joint_home(&mut self, joint: usize) -> ExtResult;
    /// Poll whether the homing sequence has reached the home switch.
    fn is_home(&mut self, joint: usize) -> (ExtResult, bool);
    /// Read the raw position to latch as `input_latch` at the home event.
    fn home_latch(&mut self, joint: usize) -> (ExtResult, f64);

    /// Number of aggregate digital inputs/outputs and analog inputs/outputs.
    fn num_di(&self) -> usize;
    fn num_do(&self) -> usize;
    fn num_ai(&self) -> usize;
    fn num_ao(&self) -> usize;

    /// Read the full digital input bank.
    fn read_di(&mut self, out: &mut [bool]) -> ExtResult;
    /// Write the full digital output bank.
    fn write_do(&mut self, values: &[bool]) -> ExtResult;
    /// Read the full analog input bank.
    fn read_ai(&mut self, out: &mut [f64]) -> ExtResult;
    /// Write the full analog output bank.
    fn write_ao(&mut self, values: &[f64]) -> ExtResult;

    /// Push driver-specific tuning values (e.g. kinematics link parameters
    /// forwarded for a physical-axis calibration) for one joint.
    fn set_parameters(&mut self, joint: usize, values: &[f64]) -> ExtResult;

    /// Poll a single named trigger input (e.g. a cycle-start button).
    fn trigger_in(&mut self, input: usize) -> (ExtResult, bool);
}

/// Constructs a boxed [`ExtAdapter`] implementation. Stored in
/// [`crate::DriverRegistry`] keyed by the driver's name.
pub type ExtDriverFactory = fn() -> Box<dyn ExtAdapter>;
