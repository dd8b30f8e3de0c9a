//! System-wide constants for the gomotion workspace.
//!
//! Single source of truth for numeric limits and default paths.
//! Imported by all crates — no duplication permitted.

/// Maximum number of joints/axes a single machine may have (§2: "N ≤ 7").
pub const MAX_JOINTS: usize = 7;

/// Maximum number of digital inputs.
pub const MAX_DI: usize = 1024;

/// Maximum number of digital outputs.
pub const MAX_DO: usize = 1024;

/// Maximum number of analog inputs.
pub const MAX_AI: usize = 64;

/// Maximum number of analog outputs.
pub const MAX_AO: usize = 64;

/// Maximum number of named tool outputs held by the Tool Loop.
pub const MAX_TOOL_OUTPUTS: usize = 16;

/// Default system cycle time in microseconds (1 kHz = 1000 µs).
pub const CYCLE_TIME_US_DEFAULT: u64 = 1000;

/// Default Tool Loop cycle time in seconds (§2: "small, non-realtime
/// loop"; §6 `[TOOL]` carries only `SHM_KEY`, so this is not configurable
/// via the INI-derived schema).
pub const TOOL_CYCLE_TIME_DEFAULT: f64 = 0.05;

/// Minimum allowed cycle time [µs] for runtime config.
pub const CYCLE_TIME_US_MIN: u32 = 100;

/// Maximum allowed cycle time [µs] for runtime config.
pub const CYCLE_TIME_US_MAX: u32 = 100_000;

/// Capacity of the Trajectory Loop's motion queue (§3: "bounded ring ... capacity ≈10").
pub const MOTION_QUEUE_CAPACITY: usize = 10;

/// Capacity of the Task→Traj interp list (§9 redesign: bounded SPSC ring, not
/// literally unbounded; back-pressure engages at half capacity per §4.6).
pub const INTERP_LIST_CAPACITY: usize = 64;

/// Capacity of the Task Loop's rotating error ring (§7: "≥10 entries").
pub const TASK_ERROR_RING_CAPACITY: usize = 16;

/// Capacity of a servo's telemetry log ring (§3 Log buffer).
pub const LOG_RING_CAPACITY: usize = 512;

/// `TRANSITION_TIME` used by the PackML state model (§4.6), in milliseconds.
pub const TRANSITION_TIME_MS: u64 = 1000;

/// Default `CONNECT_WAIT_TIME` the launcher polls heartbeats for before
/// declaring a startup failure, in milliseconds (§5).
pub const CONNECT_WAIT_TIME_MS: u64 = 5000;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/gomotion/gomotion.toml";

/// Small tolerance used by round-trip / singularity checks (§8).
pub const EPSILON: f64 = 1e-6;
