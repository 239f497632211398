//! Actuator bus adapters.
//!
//! - [`simulation`] - In-process servo chain for development and testing
//! - [`dynamixel`] - Dynamixel Protocol 1.0 over a half-duplex serial port
//!
//! # Adding New Drivers
//!
//! 1. Create a new submodule under `drivers/`
//! 2. Implement the `ActuatorBus` trait from `arm_common::bus`
//! 3. Register its factory in [`register_all`]

pub mod dynamixel;
pub mod simulation;

use crate::driver_registry::DriverRegistry;

/// Register every built-in adapter.
pub fn register_all(registry: &mut DriverRegistry) {
    registry.register(simulation::DRIVER_NAME, simulation::create_bus);
    registry.register(dynamixel::DRIVER_NAME, dynamixel::create_bus);
}
