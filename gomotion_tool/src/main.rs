//! Tool Loop binary.
//!
//! One process, one thread, ticking at its own soft-real-time period —
//! no semaphore coupling to Servo/Traj (§4.5, §5).

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use gomotion_common::config::GomotionConfig;
use gomotion_common::consts::{DEFAULT_CONFIG_PATH, TOOL_CYCLE_TIME_DEFAULT};
use gomotion_tool::config::build_tool_cfg;
use gomotion_tool::cycle::ToolCycle;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "gomotion Tool Loop: named tool output vector")]
struct Args {
    /// Path to the gomotion TOML configuration.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Consecutive unchanged reads before `cmd`/`cfg` is considered stale.
    #[arg(long, default_value_t = 1000)]
    stale_threshold: u32,

    /// Cycle period in seconds (§4.5: "small, non-realtime loop").
    #[arg(long, default_value_t = TOOL_CYCLE_TIME_DEFAULT)]
    cycle_time: f64,
}

fn main() {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let args = Args::parse();

    let config = match GomotionConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, path = %args.config.display(), "failed to load configuration");
            std::process::exit(1);
        }
    };
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "invalid configuration");
        std::process::exit(1);
    }

    let cfg = build_tool_cfg(&config);
    let cycle = match ToolCycle::new(cfg, args.stale_threshold) {
        Ok(cycle) => cycle,
        Err(e) => {
            tracing::error!(error = %e, "failed to open tool channel");
            std::process::exit(1);
        }
    };

    tracing::info!(num_outputs = cfg.num_outputs, "tool loop started");
    cycle.run(Duration::from_secs_f64(args.cycle_time.max(1e-3)));
}
