//! External I/O adapter contract (§4.7, §6 "Kinematics plug-in interface"
//! sibling): the `ext_*` surface every driver (`gomotion_hal`) implements
//! and every consumer (`gomotion_servo`) calls against.
//!
//! This module holds only the shared result/status vocabulary; the trait
//! itself lives in `gomotion_hal` since only that crate's drivers implement
//! it, but servo and the launcher both need to name its result type.

/// Outcome of a non-blocking `ext_*` call (§4.7: "All calls are
/// non-blocking and return a result code").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtResult {
    /// The call completed successfully.
    Ok,
    /// The call failed; the adapter could not service the request.
    Fail,
    /// The requested id/joint index was out of the adapter's configured
    /// range.
    BadId,
    /// The adapter has not been initialized (`ext_init` not yet called).
    NotInitialized,
}

impl ExtResult {
    pub const fn is_ok(self) -> bool {
        matches!(self, ExtResult::Ok)
    }
}
