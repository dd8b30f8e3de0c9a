//! `ext_*` driver implementations.
//!
//! - [`simulation`] — in-memory first-order joint simulator used for dev,
//!   tests, and the trivial-kinematics boot scenario (§8 scenario 1).
//!
//! Add a new implementation as a sibling module, implement [`crate::ext::ExtAdapter`],
//! and register its factory with [`crate::DriverRegistry::register`].

pub mod simulation;

/// Populate a fresh registry with every built-in driver.
pub fn register_all_drivers(registry: &mut crate::DriverRegistry) {
    registry.register("simulation", || Box::new(simulation::SimulationDriver::new(1)));
}
