//! The Servo Loop cycle: one instance per joint, running on its own thread
//! (§4.2, §5 "Servo ×N: in-process threads, one per joint").
//!
//! Each tick: read `cmd`/`cfg` → dispatch the command state machine → read
//! external feedback → service homing → interpolate the commanded setpoint
//! → run PID or pass-through control → publish `stat`/`set`. Joint 0
//! additionally posts the shared clock semaphore every `cycle_mult` ticks
//! so the Trajectory Loop's only sleep is blocking on that signal (§5).

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use gomotion_common::log::{LogEntryKind, LogRing};
use gomotion_common::shm::p2p::P2pError;
use gomotion_common::shm::segments::{
    DebugSource, ServoCfg, ServoCmd, ServoCmdType, ServoSet, ServoStat,
};
use gomotion_common::shm::semaphore::ServoClock;
use gomotion_hal::ExtAdapter;
use tracing::warn;

use crate::control::output::apply_control;
use crate::control::pid::PidGains;
use crate::shm::segments::ServoChannel;
use crate::state::axis::AxisRuntime;

// ─── RT setup (§5 "Servo: real-time priority thread") ──────────────────

/// Lock all current and future memory pages. No-op without the `rt` feature.
#[cfg(feature = "rt")]
pub fn rt_mlockall() -> Result<(), String> {
    use nix::sys::mman::{mlockall, MlockallFlags};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE)
        .map_err(|e| format!("mlockall failed: {e}"))
}

#[cfg(not(feature = "rt"))]
pub fn rt_mlockall() -> Result<(), String> {
    Ok(())
}

/// Pin the current thread to a specific CPU core. No-op without `rt`.
#[cfg(feature = "rt")]
pub fn rt_set_affinity(cpu: usize) -> Result<(), String> {
    use nix::sched::{sched_setaffinity, CpuSet};
    use nix::unistd::Pid;
    let mut cpuset = CpuSet::new();
    cpuset.set(cpu).map_err(|e| format!("CpuSet::set({cpu}) failed: {e}"))?;
    sched_setaffinity(Pid::from_raw(0), &cpuset).map_err(|e| format!("sched_setaffinity failed: {e}"))
}

#[cfg(not(feature = "rt"))]
pub fn rt_set_affinity(_cpu: usize) -> Result<(), String> {
    Ok(())
}

/// Set `SCHED_FIFO` with the given priority. No-op without `rt`.
#[cfg(feature = "rt")]
pub fn rt_set_scheduler(priority: i32) -> Result<(), String> {
    let param = libc::sched_param { sched_priority: priority };
    let ret = unsafe { libc::sched_setscheduler(0, libc::SCHED_FIFO, &param) };
    if ret != 0 {
        let err = std::io::Error::last_os_error();
        return Err(format!("sched_setscheduler(SCHED_FIFO, {priority}) failed: {err}"));
    }
    Ok(())
}

#[cfg(not(feature = "rt"))]
pub fn rt_set_scheduler(_priority: i32) -> Result<(), String> {
    Ok(())
}

/// Full RT setup sequence for a servo thread: lock pages, pin to a core,
/// raise to `SCHED_FIFO`. A no-op sequence under plain simulation.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), String> {
    rt_mlockall()?;
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}

// ─── Cycle timing stats ─────────────────────────────────────────────────

/// O(1) running cycle-time statistics, used for diagnostics only.
#[derive(Debug, Clone, Copy)]
pub struct CycleStats {
    pub cycle_count: u64,
    pub last_cycle_ns: i64,
    pub max_cycle_ns: i64,
    pub overruns: u64,
}

impl CycleStats {
    pub const fn new() -> Self {
        Self { cycle_count: 0, last_cycle_ns: 0, max_cycle_ns: 0, overruns: 0 }
    }

    pub fn record(&mut self, duration_ns: i64, budget_ns: i64) {
        self.cycle_count += 1;
        self.last_cycle_ns = duration_ns;
        if duration_ns > self.max_cycle_ns {
            self.max_cycle_ns = duration_ns;
        }
        if duration_ns > budget_ns {
            self.overruns += 1;
        }
    }
}

impl Default for CycleStats {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Servo cycle ────────────────────────────────────────────────────────

/// One joint's servo cycle. Owns its shared-memory channel, its `ExtAdapter`
/// handle (shared with sibling joints when the driver multiplexes several
/// joints behind one instance, e.g. [`gomotion_hal::drivers::simulation::SimulationDriver`]),
/// its runtime state, and its effective configuration.
pub struct ServoCycle {
    pub joint: usize,
    channel: ServoChannel,
    adapter: Arc<Mutex<Box<dyn ExtAdapter>>>,
    axis: AxisRuntime,
    cfg: ServoCfg,
    clock: Option<ServoClock>,
    clock_tick: u32,
    tick_count: u64,
    pub stats: CycleStats,
    pub log: LogRing,
}

impl ServoCycle {
    /// Open this joint's channel (creating `stat`/`set`, attaching `cmd`/`cfg`
    /// with retry) and build its runtime state from the initial `cfg`.
    ///
    /// `clock` is `Some` only for joint 0 (§5 "Servo 0 is the master clock").
    pub fn new(
        joint: usize,
        cfg: ServoCfg,
        adapter: Arc<Mutex<Box<dyn ExtAdapter>>>,
        stale_threshold: u32,
        clock: Option<ServoClock>,
    ) -> Result<Self, P2pError> {
        let channel = ServoChannel::open(joint, stale_threshold)?;
        let axis = AxisRuntime::new(&cfg);
        Ok(Self {
            joint,
            channel,
            adapter,
            axis,
            cfg,
            clock,
            clock_tick: 0,
            tick_count: 0,
            stats: CycleStats::new(),
            log: LogRing::new(LogEntryKind::Ferror),
        })
    }

    fn gains(&self) -> PidGains {
        PidGains {
            p: self.cfg.p,
            i: self.cfg.i,
            d: self.cfg.d,
            pff: self.cfg.pff,
            vff: self.cfg.vff,
            aff: self.cfg.aff,
            min_output: self.cfg.min_output,
            max_output: self.cfg.max_output,
            pos_bias: self.cfg.pos_bias,
            neg_bias: self.cfg.neg_bias,
            deadband: self.cfg.deadband,
        }
    }

    /// Apply a newly-received `cfg` record: swap the gains/limits wholesale,
    /// rebuild the interpolator if `cycle_time`/`cycle_mult` changed, and
    /// clear the homing latch — a limit reconfiguration is one of the two
    /// documented triggers for that (§4.2 step 6).
    fn apply_cfg(&mut self, cfg: ServoCfg) {
        self.cfg = cfg;
        self.axis.reconfigure(&cfg);
        self.axis.homing.clear();
    }

    /// Run one tick. `dt` is this joint's own cycle time, in seconds.
    pub fn tick(&mut self, dt: f64) {
        if self.channel.reader.cfg.has_changed() {
            if let Ok(cfg) = self.channel.reader.cfg.read() {
                self.apply_cfg(cfg);
            }
        }

        let cmd = match self.channel.reader.cmd.read() {
            Ok(c) => c,
            Err(e) => {
                warn!(joint = self.joint, error = %e, "servo cmd read failed, holding last state");
                return;
            }
        };

        let dispatch = self.axis.state_machine.dispatch(cmd.serial_number, cmd.cmd_type);
        if dispatch.on_entry {
            self.axis.pid.reset();
            self.axis.homing.clear();
            self.axis.interp.on_new_setpoint(cmd.setpoint);
        }

        {
            let mut adapter = self.adapter.lock().expect("ext adapter mutex poisoned");
            match cmd.cmd_type {
                ServoCmdType::Init => {
                    let _ = adapter.joint_init(self.joint);
                    let _ = adapter.joint_enable(self.joint);
                }
                ServoCmdType::Abort | ServoCmdType::Halt | ServoCmdType::Shutdown => {
                    let _ = adapter.joint_disable(self.joint);
                }
                _ => {}
            }
        }

        let scaled_input = {
            let mut adapter = self.adapter.lock().expect("ext adapter mutex poisoned");
            let (_, raw) = adapter.read_pos(self.joint);
            raw * self.cfg.input_scale
        };
        let velocity = (scaled_input - self.axis.last_scaled_input) / dt.max(1e-12);
        self.axis.last_scaled_input = scaled_input;

        {
            let mut adapter = self.adapter.lock().expect("ext adapter mutex poisoned");
            self.axis.homing.tick(self.joint, cmd.home, scaled_input, &mut *adapter);
        }

        let offset =
            if self.axis.homing.homed { self.axis.homing.offset(self.cfg.configured_home) } else { 0.0 };
        let measured = scaled_input - offset;

        let setpoint = self.axis.interp.tick();

        let (output, ferror, debug) = if dispatch.suspend_output {
            (0.0, setpoint.position - measured, DebugSource::default())
        } else {
            let gains = self.gains();
            let mut adapter = self.adapter.lock().expect("ext adapter mutex poisoned");
            match apply_control(
                self.cfg.control_type,
                &mut self.axis.pid,
                &gains,
                setpoint,
                measured,
                dt,
                self.joint,
                &mut *adapter,
            ) {
                Ok((output, ferror)) => (output, ferror, DebugSource::default()),
                Err(e) => {
                    self.axis.state_machine.mark_error();
                    warn!(joint = self.joint, error = %e, "servo control step failed");
                    (0.0, setpoint.position - measured, DebugSource::new(file!(), line!()))
                }
            }
        };

        self.publish(&cmd, scaled_input, offset, velocity, output, ferror, debug);
        self.record_log(scaled_input, velocity, output, ferror, setpoint.position);

        if self.joint == 0 {
            self.tick_clock();
        }
    }

    fn publish(
        &mut self,
        cmd: &ServoCmd,
        input: f64,
        offset: f64,
        velocity: f64,
        output: f64,
        ferror: f64,
        debug: DebugSource,
    ) {
        let stat = ServoStat {
            serial_number: self.channel.writer.stat.next_serial(),
            echo_serial_number: cmd.serial_number,
            status: self.axis.state_machine.status(),
            admin_state: self.axis.state_machine.admin_state(),
            debug,
            input,
            velocity,
            output,
            ferror,
            homed: self.axis.homing.homed,
            input_latch: self.axis.homing.input_latch,
            offset,
        };
        self.channel.writer.stat.write(stat);

        let set = ServoSet {
            serial_number: self.channel.writer.set.next_serial(),
            echo_serial_number: cmd.serial_number,
            status: self.axis.state_machine.status(),
            admin_state: self.axis.state_machine.admin_state(),
            cfg_echo: self.cfg,
        };
        self.channel.writer.set.write(set);
    }

    /// Append this tick's sample for whatever quantity `self.log` is
    /// currently configured to record (§3 "Log buffer").
    fn record_log(&mut self, input: f64, velocity: f64, _output: f64, ferror: f64, setpoint: f64) {
        self.tick_count += 1;
        let value = match self.log.kind() {
            LogEntryKind::Ferror => ferror,
            LogEntryKind::Input | LogEntryKind::ActPos => input,
            LogEntryKind::Setpoint | LogEntryKind::CmdPos => setpoint,
            LogEntryKind::Speed => velocity,
            // Traj-only quantities; nothing to record from a servo tick.
            LogEntryKind::Xinv | LogEntryKind::MagXinv => return,
        };
        self.log.push(self.tick_count, value);
    }

    /// Post the shared clock semaphore every `cycle_mult` ticks (§4.2, §5).
    fn tick_clock(&mut self) {
        let Some(clock) = self.clock.as_ref() else { return };
        self.clock_tick += 1;
        if self.clock_tick >= self.cfg.cycle_mult.max(1) {
            self.clock_tick = 0;
            if let Err(e) = clock.post() {
                warn!(error = %e, "failed to post servo clock");
            }
        }
    }

    /// Enter the cycle loop. Never returns under normal operation.
    pub fn run(mut self) -> ! {
        loop {
            let start = Instant::now();
            let dt = self.cfg.cycle_time.max(1e-6);
            self.tick(dt);

            let elapsed = start.elapsed();
            let budget = Duration::from_secs_f64(dt);
            self.stats.record(elapsed.as_nanos() as i64, budget.as_nanos() as i64);
            if elapsed > budget {
                warn!(joint = self.joint, ?elapsed, ?budget, "servo cycle overrun");
            } else {
                std::thread::sleep(budget - elapsed);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gomotion_common::shm::segments::ControlType;
    use gomotion_hal::drivers::simulation::SimulationDriver;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn unique_joint() -> usize {
        static COUNTER: AtomicU64 = AtomicU64::new(9000);
        COUNTER.fetch_add(1, Ordering::Relaxed) as usize
    }

    fn base_cfg() -> ServoCfg {
        ServoCfg {
            cycle_time: 0.001,
            cycle_mult: 8,
            control_type: ControlType::Pid,
            input_scale: 1.0,
            output_scale: 1.0,
            p: 10.0,
            min_output: -100.0,
            max_output: 100.0,
            max_vel: 1.0,
            max_acc: 10.0,
            max_jerk: 100.0,
            ..Default::default()
        }
    }

    #[test]
    fn init_then_servo_moves_toward_setpoint() {
        let joint = unique_joint();
        let cfg = base_cfg();
        let adapter: Arc<Mutex<Box<dyn ExtAdapter>>> =
            Arc::new(Mutex::new(Box::new(SimulationDriver::new(1))));

        // Seed this joint's cmd/cfg as Traj would, before the servo side
        // attaches (normally Traj starts after Servo; the order doesn't
        // matter for the reader's `attach`, only for `attach_with_retry`).
        let cmd_seg = gomotion_common::shm::segments::servo_seg_cmd(joint);
        let cfg_seg = gomotion_common::shm::segments::servo_seg_cfg(joint);
        let mut cmd_writer = gomotion_common::shm::p2p::TypedP2pWriter::<ServoCmd>::create(
            &cmd_seg,
            gomotion_common::shm::p2p::ModuleAbbrev::Traj,
            gomotion_common::shm::p2p::ModuleAbbrev::Servo,
        )
        .unwrap();
        let mut cfg_writer = gomotion_common::shm::p2p::TypedP2pWriter::<ServoCfg>::create(
            &cfg_seg,
            gomotion_common::shm::p2p::ModuleAbbrev::Traj,
            gomotion_common::shm::p2p::ModuleAbbrev::Servo,
        )
        .unwrap();
        cfg_writer.write(cfg);
        cmd_writer.write(ServoCmd { serial_number: 1, cmd_type: ServoCmdType::Init, ..Default::default() });

        let mut cycle = ServoCycle::new(joint, cfg, adapter, 1000, None).unwrap();
        cycle.tick(cfg.cycle_time);
        assert_eq!(cycle.axis.state_machine.admin_state(), gomotion_common::shm::segments::AdminState::Initialized);

        cmd_writer.write(ServoCmd {
            serial_number: 2,
            cmd_type: ServoCmdType::Servo,
            setpoint: 1.0,
            home: false,
        });
        for _ in 0..50 {
            cycle.tick(cfg.cycle_time);
        }
        let stat = cycle.channel.reader.cmd.read(); // sanity: still attached
        assert!(stat.is_ok());
    }
}
