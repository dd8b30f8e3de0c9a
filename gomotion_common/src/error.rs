//! Shared error taxonomy (§7: Transient / Sub-system / Fatal / Simulated).
//!
//! Each loop crate defines its own narrower error enum at its public
//! boundary; this module holds the pieces common to all of them so the
//! taxonomy stays consistent workspace-wide.

use thiserror::Error;

/// A sub-system failure reported upward from a loop's own computation,
/// per §7's "sub-system failure" tier. These never abort the whole system
/// on their own — they are folded into a channel's `Error` status and the
/// supervising tier decides what to do next.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ControlError {
    /// A configuration value was invalid (non-positive cycle time, mismatched
    /// units, out-of-range id, ...).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The kinematics plug-in could not solve a singular or out-of-domain
    /// pose/joint vector.
    #[error("kinematics error: {0}")]
    Kinematics(String),

    /// An append or track request would cross a configured position limit.
    #[error("position limit exceeded on joint {joint}: commanded {commanded}, limit {limit}")]
    LimitExceeded {
        /// Index of the joint whose limit was crossed.
        joint: usize,
        /// The value that was rejected (or clamped).
        commanded: f64,
        /// The limit it was checked against.
        limit: f64,
    },

    /// `append`/`set_type` was attempted in a mode (world/joint) that
    /// conflicts with the queue's current mode while non-empty.
    #[error("motion queue mode mismatch: queue is not empty and in a different mode")]
    QueueModeMismatch,

    /// A command was addressed to a joint or tool id outside the configured
    /// range.
    #[error("id {id} out of range (max {max})")]
    IdOutOfRange {
        /// The id that was rejected.
        id: usize,
        /// The largest valid id.
        max: usize,
    },

    /// Simulated fault injected by the Task Loop's MTTF/MTTR model (§4.6,
    /// §9). Routed through the same path as a real `Control` error so
    /// callers cannot distinguish it.
    #[error("simulated control fault")]
    SimulatedFault,
}

/// A fatal, loop-refuses-to-start error (§7's "Fatal within one loop" tier).
#[derive(Debug, Error)]
pub enum FatalError {
    /// A shared-memory region could not be created or attached.
    #[error("shared memory error: {0}")]
    Shm(#[from] crate::shm::p2p::P2pError),

    /// The configured external I/O driver failed to initialize.
    #[error("driver init failed: {0}")]
    DriverInit(String),

    /// The configured kinematics name did not match any known plug-in
    /// variant (§6, §9).
    #[error("kinematics selection not found: {0}")]
    KinematicsNotFound(String),

    /// Configuration failed validation before any loop was allowed to start.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}
