//! SHM (Shared Memory) constants.
//!
//! These constants define the fundamental parameters for the gomotion shared memory system.
//! They are the single source of truth - all other crates should import from here.
//!
//! Note: The P2P magic constant lives in `gomotion_common::shm::p2p::GOMOTION_P2P_MAGIC`.
//! The P2P protocol is the sole SHM transport.

/// Minimum shared memory segment size in bytes.
///
/// Set to 4KB (one memory page) as the smallest practical segment size.
/// Segments smaller than this would have excessive overhead.
pub const SHM_MIN_SIZE: usize = 4096;

/// Maximum shared memory segment size in bytes.
///
/// Set to 1GB as a reasonable upper limit to prevent excessive memory usage.
/// This limit can be increased if needed for specific use cases.
pub const SHM_MAX_SIZE: usize = 1_073_741_824; // 1GB

/// CPU cache line size in bytes.
///
/// Used for memory alignment to prevent false sharing between threads.
/// 64 bytes is the standard cache line size on most modern x86-64 processors.
pub const CACHE_LINE_SIZE: usize = 64;
