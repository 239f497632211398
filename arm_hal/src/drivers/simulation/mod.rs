//! Simulation driver module.
//!
//! Software servo chain for development and testing without physical
//! hardware. Every configured joint (primary and leader) is one simulated
//! actuator starting at its default pose.

mod bus;

pub use bus::{SimFault, SimulatedBus};

use arm_common::bus::{ActuatorBus, BusError};
use arm_common::config::ArmConfig;

/// Registry name of the simulation driver.
pub const DRIVER_NAME: &str = "simulation";

/// Factory function to create a simulated bus for `config`.
pub fn create_bus(config: &ArmConfig) -> Result<Box<dyn ActuatorBus>, BusError> {
    Ok(Box::new(SimulatedBus::from_config(config)))
}
