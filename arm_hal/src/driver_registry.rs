//! Driver registry for actuator bus adapters.
//!
//! Provides a `DriverRegistry` struct for registering and retrieving bus
//! factories by name. Constructed at startup and passed by value; there is
//! no global registry.

use arm_common::bus::{ActuatorBus, BusError, BusFactory};
use arm_common::config::ArmConfig;
use std::collections::HashMap;
use tracing::info;

/// Registry of available bus adapters.
pub struct DriverRegistry {
    factories: HashMap<&'static str, BusFactory>,
}

impl DriverRegistry {
    /// Registry without any driver.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry pre-populated with every built-in adapter.
    pub fn with_builtin_drivers() -> Self {
        let mut registry = Self::new();
        crate::drivers::register_all(&mut registry);
        registry
    }

    /// Register a bus factory.
    ///
    /// # Panics
    /// Panics if a driver with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: BusFactory) {
        if self.factories.contains_key(name) {
            panic!("Driver '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a bus factory by name.
    pub fn get_factory(&self, name: &str) -> Option<BusFactory> {
        self.factories.get(name).copied()
    }

    /// Create the bus named by `config.bus.driver`.
    ///
    /// # Errors
    /// Returns `BusError::DriverNotFound` if no driver with that name is
    /// registered, or whatever the factory returns when the port cannot be
    /// opened.
    pub fn create_bus(&self, config: &ArmConfig) -> Result<Box<dyn ActuatorBus>, BusError> {
        let name = config.bus.driver.as_str();
        let factory = self
            .get_factory(name)
            .ok_or_else(|| BusError::DriverNotFound(name.to_string()))?;
        let bus = factory(config)?;
        info!(driver = bus.name(), "Actuator bus created");
        Ok(bus)
    }

    /// Registered driver names, unordered.
    pub fn list_drivers(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for DriverRegistry {
    fn default() -> Self {
        Self::new()
    }
}
