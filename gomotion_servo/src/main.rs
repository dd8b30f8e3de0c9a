//! Servo Loop binary.
//!
//! One process, one in-process thread per configured joint (§5 "Servo ×N as
//! one process" — see `DESIGN.md` open question 3). Joint 0 additionally
//! owns the named semaphore that clocks the Trajectory Loop; every other
//! joint runs the identical cycle with `clock: None`.
//!
//! All joints share one `ExtAdapter` instance behind a mutex, matching
//! [`gomotion_hal::drivers::simulation::SimulationDriver`]'s documented
//! contract ("a single instance is shared by every joint's servo thread").

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use clap::Parser;
use gomotion_common::config::GomotionConfig;
use gomotion_common::consts::{DEFAULT_CONFIG_PATH, MAX_JOINTS};
use gomotion_common::shm::semaphore::ServoClock;
use gomotion_hal::driver_registry::DriverRegistry;
use gomotion_hal::drivers::simulation::SimulationDriver;
use gomotion_hal::ExtAdapter;
use gomotion_servo::config::build_servo_cfg;
use gomotion_servo::cycle::{rt_setup, ServoCycle};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "gomotion Servo Loop: one in-process thread per joint")]
struct Args {
    /// Path to the gomotion TOML configuration.
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// External I/O driver to load from the registry.
    #[arg(long, default_value = "simulation")]
    driver: String,

    /// Consecutive unchanged reads before a `cmd`/`cfg` channel is
    /// considered stale (`gomotion_common::shm::p2p`).
    #[arg(long, default_value_t = 1000)]
    stale_threshold: u32,

    /// First CPU core joint threads are pinned to, one core per joint, when
    /// built with the `rt` feature.
    #[arg(long, default_value_t = 1)]
    rt_cpu_base: usize,

    /// `SCHED_FIFO` priority for joint threads, when built with `rt`.
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,
}

fn simulation_driver() -> Box<dyn ExtAdapter> {
    Box::new(SimulationDriver::new(MAX_JOINTS))
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

    let mut registry = DriverRegistry::new();
    registry.register("simulation", simulation_driver);
    let driver = match registry.create(&args.driver) {
        Some(d) => d,
        None => {
            tracing::error!(
                driver = %args.driver,
                available = ?registry.list_drivers(),
                "unknown ext driver"
            );
            std::process::exit(1);
        }
    };
    let adapter: Arc<Mutex<Box<dyn ExtAdapter>>> = Arc::new(Mutex::new(driver));
    {
        let mut guard = adapter.lock().expect("ext adapter mutex poisoned");
        if !guard.ext_init().is_ok() {
            tracing::error!("ext_init failed");
            std::process::exit(1);
        }
    }

    let axis_count = config.axis_count();
    let mut handles = Vec::with_capacity(axis_count);

    for joint in 0..axis_count {
        let cfg = match build_servo_cfg(&config, joint) {
            Ok(cfg) => cfg,
            Err(e) => {
                tracing::error!(joint, error = %e, "failed to build servo cfg");
                std::process::exit(1);
            }
        };

        let clock = if joint == 0 {
            match ServoClock::create(config.servo.sem_key) {
                Ok(clock) => Some(clock),
                Err(e) => {
                    tracing::error!(error = %e, "failed to create servo clock semaphore");
                    std::process::exit(1);
                }
            }
        } else {
            None
        };

        let adapter = Arc::clone(&adapter);
        let stale_threshold = args.stale_threshold;
        let rt_cpu = args.rt_cpu_base + joint;
        let rt_priority = args.rt_priority;

        let handle = std::thread::Builder::new()
            .name(format!("servo-{joint}"))
            .spawn(move || {
                if let Err(e) = rt_setup(rt_cpu, rt_priority) {
                    tracing::warn!(joint, error = %e, "rt setup failed, continuing unprivileged");
                }
                match ServoCycle::new(joint, cfg, adapter, stale_threshold, clock) {
                    Ok(cycle) => cycle.run(),
                    Err(e) => {
                        tracing::error!(joint, error = %e, "failed to open servo channel");
                        std::process::exit(1);
                    }
                }
            })
            .expect("failed to spawn servo thread");
        handles.push(handle);
    }

    tracing::info!(axis_count, "servo loop started");
    for handle in handles {
        let _ = handle.join();
    }
}
