//! # External I/O adapter (§4.7)
//!
//! The driver layer `gomotion_servo` calls directly, in-process: per-joint
//! `init/enable/disable/quit`, `read_pos/write_pos/write_vel`,
//! `joint_home/is_home/home_latch`, aggregate analog/digital I/O,
//! `set_parameters`, `trigger_in`. Every call is non-blocking and returns an
//! [`gomotion_common::hal::ExtResult`]; implementations may back a simulator,
//! a serial "Smart Motor", a socket-based device emulation, or a PCI DAQ.
//!
//! This crate only ships the contract ([`ext`]) and a [`DriverRegistry`] for
//! selecting an implementation by name, plus one reference implementation
//! ([`drivers::simulation::SimulationDriver`]). The per-joint mutex called
//! for in §5 ("External I/O inside servos: a per-joint mutex wraps driver
//! calls that are not themselves reentrant") is the caller's responsibility:
//! `gomotion_servo` holds each joint's `ExtAdapter` handle behind its own
//! thread-local ownership, so no lock is needed when each joint's servo
//! instance is the sole caller of its own channel; `Mutex` is only required
//! if a single adapter instance is shared across joints, which
//! [`drivers::simulation::SimulationDriver`] is (see its doc comment).

pub mod driver_registry;
pub mod drivers;
pub mod ext;

pub use driver_registry::DriverRegistry;
pub use ext::{ExtAdapter, ExtDriverFactory};
pub use gomotion_common::hal::ExtResult;
