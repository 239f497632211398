//! Dynamixel Protocol 1.0 driver module.
//!
//! Half-duplex TTL/RS-485 servos (AX/MX series) on one serial port. The
//! adapter is expected to switch direction itself (USB2AX, U2D2, ...).

mod bus;
pub mod packet;

pub use bus::{BusPort, DynamixelBus};

use arm_common::bus::{ActuatorBus, BusError};
use arm_common::config::ArmConfig;

/// Registry name of the Dynamixel driver.
pub const DRIVER_NAME: &str = "dynamixel";

/// Factory function to open the port named in `[bus]`.
pub fn create_bus(config: &ArmConfig) -> Result<Box<dyn ActuatorBus>, BusError> {
    Ok(Box::new(DynamixelBus::open(&config.bus, config.arm.resolution)?))
}
