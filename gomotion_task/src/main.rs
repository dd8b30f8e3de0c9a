//! Task Loop binary (§4.6, §4.7): PackML state model, program execution,
//! and the TCP wire front-end, all driven from one non-realtime cycle
//! thread — no semaphore coupling to Servo/Traj (§5, same idiom as the
//! Tool Loop).

use std::path::PathBuf;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use clap::Parser;
use gomotion_common::config::GomotionConfig;
use gomotion_common::consts::DEFAULT_CONFIG_PATH;
use gomotion_task::config::build_task_cfg;
use gomotion_task::cycle::TaskCycle;
use gomotion_task::wire;
use gomotion_tool::config::build_tool_cfg;
use gomotion_traj::config::build_traj_cfg;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "gomotion Task Loop: PackML state model and program execution")]
struct Args {
    /// Path to the gomotion TOML configuration.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Consecutive unchanged reads before a channel is considered stale.
    #[arg(long, default_value_t = 1000)]
    stale_threshold: u32,
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

    let task_cfg = match build_task_cfg(&config) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "invalid [task] configuration");
            std::process::exit(1);
        }
    };
    let traj_cfg = match build_traj_cfg(&config) {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::error!(error = %e, "invalid [traj] configuration");
            std::process::exit(1);
        }
    };
    let tool_cfg = build_tool_cfg(&config);

    let prog_dir = PathBuf::from(&config.task.prog_dir);
    let mut cycle = match TaskCycle::new(task_cfg, prog_dir, args.stale_threshold) {
        Ok(cycle) => cycle,
        Err(e) => {
            tracing::error!(error = %e, "failed to open task channel");
            std::process::exit(1);
        }
    };
    cycle.seed_downstream_cfg(traj_cfg, tool_cfg);

    let (tx, rx) = mpsc::channel::<wire::WireCommand>();
    let snapshot = Arc::new(Mutex::new(cycle.snapshot()));
    let bind_addr = format!("127.0.0.1:{}", config.task.tcp_port);
    if let Err(e) = wire::spawn(bind_addr.clone(), tx, Arc::clone(&snapshot)) {
        tracing::error!(error = %e, addr = %bind_addr, "failed to start wire server");
        std::process::exit(1);
    }

    tracing::info!(port = config.task.tcp_port, strict = task_cfg.strict, "task loop started");

    let cycle_time = Duration::from_secs_f64(task_cfg.cycle_time.max(1e-3));
    loop {
        let start = Instant::now();

        while let Ok(wc) = rx.try_recv() {
            cycle.submit_command(wc.serial, wc.cmd_type, wc.program.as_deref());
        }
        cycle.tick();
        *snapshot.lock().expect("snapshot mutex poisoned") = cycle.snapshot();

        let elapsed = start.elapsed();
        if elapsed < cycle_time {
            std::thread::sleep(cycle_time - elapsed);
        }
    }
}
