//! Registry of named `ext_*` driver factories, selected by the `KINEMATICS`-
//! style string match used throughout §6 ("Plug-in selection is by string
//! match"); here it picks the I/O adapter rather than a kinematics plug-in,
//! but the pattern — constructor-injection, no global state — is the same.

use std::collections::HashMap;

use crate::ext::{ExtAdapter, ExtDriverFactory};

/// Registry of available `ext_*` driver constructors.
///
/// Built once at launcher startup and handed to each servo instance by
/// value or shared reference; no global mutable singleton (§9).
pub struct DriverRegistry {
    factories: HashMap<&'static str, ExtDriverFactory>,
}

impl DriverRegistry {
    pub fn new() -> Self {
        Self { factories: HashMap::new() }
    }

    /// Register a driver factory under `name`.
    ///
    /// # Panics
    /// Panics if `name` is already registered.
    pub fn register(&mut self, name: &'static str, factory: ExtDriverFactory) {
        if self.factories.contains_key(name) {
            panic!("driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    pub fn get_factory(&self, name: &str) -> Option<ExtDriverFactory> {
        self.factories.get(name).copied()
    }

    /// Construct a new driver instance by name.
    pub fn create(&self, name: &str) -> Option<Box<dyn ExtAdapter>> {
        self.get_factory(name).map(|f| f())
    }

    pub fn list_drivers(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
