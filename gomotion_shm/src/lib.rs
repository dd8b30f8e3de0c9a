//! Shared-memory lifecycle engine.
//!
//! A lock-free, single-writer/multi-reader shared-memory segment layer:
//! segment creation/attach, the ping-pong torn-read guard, process-death
//! cleanup and orphan detection, and a lightweight health-monitoring feed.
//! The wire-level message shapes (servo/traj/tool/task cmd/stat/cfg/set
//! records) live in `gomotion_common::shm` — this crate only knows about
//! raw byte segments, not their contents.
//!
//! ```rust,no_run
//! use gomotion_shm::{SegmentReader, SegmentWriter, SHM_MIN_SIZE};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut writer = SegmentWriter::create("servo_0.stat", SHM_MIN_SIZE)?;
//! writer.write(b"status bytes")?;
//!
//! let mut reader = SegmentReader::attach("servo_0.stat")?;
//! let data = reader.read()?;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod discovery;
pub mod error;
pub mod lifecycle;
pub mod monitoring;
pub mod platform;
pub mod reader;
pub mod segment;
pub mod version;
pub mod writer;

pub use discovery::{SegmentDiscovery, SegmentInfo};
pub use error::{ShmError, ShmResult};
pub use lifecycle::{SegmentCleanup, SegmentMetadata, ShmLifecycleManager};
pub use monitoring::{Alert, AlertHandler, ConsoleAlertHandler, MemoryMonitor, MonitoringConfig};
pub use reader::SegmentReader;
pub use segment::{SHM_MAX_SIZE, SHM_MIN_SIZE, SegmentHeader, SharedMemorySegment};
pub use version::VersionCounter;
pub use writer::SegmentWriter;

/// Initialize tracing for RT-safe logging.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
