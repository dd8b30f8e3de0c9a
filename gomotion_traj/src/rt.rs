//! RT setup for the Trajectory Loop's thread (§0, §5): the same
//! mlockall/affinity/`SCHED_FIFO` sequence the Servo Loop uses, gated
//! behind the `rt` feature so a plain dev box runs the identical loop
//! body unprivileged.

/// Lock all current and future memory pages. No-op without the `rt` feature.
#[cfg(feature = "rt")]
pub fn rt_mlockall() -> Result<(), String> {
    use nix::sys::mman::{mlockall, MlockallFlags};
    mlockall(MlockallFlags::MCL_CURRENT | MlockallFlags::MCL_FUTURE).map_err(|e| format!("mlockall failed: {e}"))
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

/// Full RT setup sequence for the trajectory thread: lock pages, pin to a
/// core, raise to `SCHED_FIFO`. A no-op sequence under plain simulation.
pub fn rt_setup(cpu_core: usize, rt_priority: i32) -> Result<(), String> {
    rt_mlockall()?;
    rt_set_affinity(cpu_core)?;
    rt_set_scheduler(rt_priority)?;
    Ok(())
}
