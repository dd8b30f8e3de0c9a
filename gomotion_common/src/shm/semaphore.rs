//! Named POSIX semaphore wrapping the Servo⇄Trajectory clock signal (§4.2,
//! §5): "Servo 0 is the master clock: after writing its outputs it signals
//! a semaphore; Traj blocks on that semaphore. No other sleep in Traj."
//!
//! Servo 0 and Traj run as separate OS processes (§9's leaf-first launcher
//! spawn order), so an in-process `std::sync` primitive cannot cross that
//! boundary; a named semaphore under `/dev/shm`-backed POSIX IPC is the
//! standard way to signal across processes on Linux.

use std::ffi::CString;
use thiserror::Error;

/// Errors raised creating/opening/using the servo clock semaphore.
#[derive(Debug, Error)]
pub enum SemError {
    #[error("sem_open failed for '{name}': errno {errno}")]
    Open { name: String, errno: i32 },
    #[error("sem_post failed: errno {0}")]
    Post(i32),
    #[error("sem_wait failed: errno {0}")]
    Wait(i32),
    #[error("sem_trywait: would block")]
    WouldBlock,
    #[error("invalid semaphore name '{0}' (must not contain NUL)")]
    InvalidName(String),
}

/// A named, counting POSIX semaphore (`sem_open`/`sem_post`/`sem_wait`).
///
/// One process creates it (`create`), others attach (`open`); Linux cleans
/// up the underlying kernel object when the last process unlinks it, so the
/// launcher calls [`ServoClock::unlink`] on shutdown (§3 "Lifecycle").
pub struct ServoClock {
    sem: *mut libc::sem_t,
    name: CString,
}

// SAFETY: POSIX named semaphores are designed for concurrent multi-process
// use; `sem_post`/`sem_wait` are async-signal-safe and thread-safe.
unsafe impl Send for ServoClock {}
unsafe impl Sync for ServoClock {}

fn sem_name(key: i32) -> Result<CString, SemError> {
    let name = format!("/gomotion_servo_clock_{key}");
    CString::new(name.clone()).map_err(|_| SemError::InvalidName(name))
}

impl ServoClock {
    /// Create (or re-create) the semaphore, initial count 0. Called once by
    /// the launcher or by Servo 0 before any other process attaches.
    pub fn create(sem_key: i32) -> Result<Self, SemError> {
        let name = sem_name(sem_key)?;
        // Clear any stale semaphore left by a previous crashed run.
        unsafe { libc::sem_unlink(name.as_ptr()) };
        let sem = unsafe { libc::sem_open(name.as_ptr(), libc::O_CREAT | libc::O_EXCL, 0o600, 0) };
        if sem == libc::SEM_FAILED {
            return Err(SemError::Open { name: name.to_string_lossy().into_owned(), errno: errno() });
        }
        Ok(Self { sem, name })
    }

    /// Attach to an existing semaphore by key (Traj's side).
    pub fn open(sem_key: i32) -> Result<Self, SemError> {
        let name = sem_name(sem_key)?;
        let sem = unsafe { libc::sem_open(name.as_ptr(), 0) };
        if sem == libc::SEM_FAILED {
            return Err(SemError::Open { name: name.to_string_lossy().into_owned(), errno: errno() });
        }
        Ok(Self { sem, name })
    }

    /// Signal the clock (Servo 0, every `cycle_mult` ticks).
    pub fn post(&self) -> Result<(), SemError> {
        let rc = unsafe { libc::sem_post(self.sem) };
        if rc != 0 {
            return Err(SemError::Post(errno()));
        }
        Ok(())
    }

    /// Block until signalled (Traj's only sleep per §5).
    pub fn wait(&self) -> Result<(), SemError> {
        let rc = unsafe { libc::sem_wait(self.sem) };
        if rc != 0 {
            return Err(SemError::Wait(errno()));
        }
        Ok(())
    }

    /// Non-blocking poll variant, used by bounded-patience waits (§9 "the
    /// design above prefers deterministic cycle-counted waits").
    pub fn try_wait(&self) -> Result<(), SemError> {
        let rc = unsafe { libc::sem_trywait(self.sem) };
        if rc == 0 {
            return Ok(());
        }
        if errno() == libc::EAGAIN {
            return Err(SemError::WouldBlock);
        }
        Err(SemError::Wait(errno()))
    }

    /// Remove the kernel semaphore object (launcher teardown, §3).
    pub fn unlink(&self) {
        unsafe { libc::sem_unlink(self.name.as_ptr()) };
    }
}

impl Drop for ServoClock {
    fn drop(&mut self) {
        unsafe { libc::sem_close(self.sem) };
    }
}

fn errno() -> i32 {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(-1)
}
