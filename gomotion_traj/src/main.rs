//! Trajectory Loop binary.
//!
//! One process, one thread, clocked entirely by the semaphore Servo 0
//! posts (§5 "No other sleep in Traj"). The thread itself may additionally
//! run at `SCHED_FIFO` priority when built with the `rt` feature, matching
//! the Servo Loop's own RT setup.

use std::path::PathBuf;

use clap::Parser;
use gomotion_common::config::GomotionConfig;
use gomotion_common::consts::DEFAULT_CONFIG_PATH;
use gomotion_traj::config::build_traj_cfg;
use gomotion_traj::cycle::TrajCycle;
use gomotion_traj::rt::rt_setup;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "gomotion Trajectory Loop: one thread, clocked by Servo 0")]
struct Args {
    /// Path to the gomotion TOML configuration.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Consecutive unchanged reads before a `cmd`/`cfg`/`ref`/servo
    /// channel is considered stale (`gomotion_common::shm::p2p`).
    #[arg(long, default_value_t = 1000)]
    stale_threshold: u32,

    /// CPU core this thread is pinned to, when built with the `rt` feature.
    #[arg(long, default_value_t = 0)]
    rt_cpu: usize,

    /// `SCHED_FIFO` priority for this thread, when built with `rt`.
    #[arg(long, default_value_t = 79)]
    rt_priority: i32,
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

    let cfg = match build_traj_cfg(&config) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "failed to build traj cfg");
            std::process::exit(1);
        }
    };

    if let Err(e) = rt_setup(args.rt_cpu, args.rt_priority) {
        tracing::warn!(error = %e, "rt setup failed, continuing unprivileged");
    }

    let num_joints = config.axis_count();
    let cycle = match TrajCycle::new(cfg, &config.traj.kinematics, num_joints, config.servo.sem_key, args.stale_threshold) {
        Ok(cycle) => cycle,
        Err(e) => {
            tracing::error!(error = %e, "failed to open traj channel");
            std::process::exit(1);
        }
    };

    tracing::info!(num_joints, kinematics = %config.traj.kinematics, "trajectory loop started");
    cycle.run();
}
