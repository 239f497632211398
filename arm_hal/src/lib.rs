//! # Arm HAL Library
//!
//! Actuator bus adapters with a pluggable driver architecture.
//!
//! Adapters implement the `ActuatorBus` trait defined in
//! `arm_common::bus` and are created by name through a [`DriverRegistry`].
//!
//! # Module Structure
//!
//! - [`driver_registry`] - Driver factory registration
//! - [`drivers`] - Bus adapter implementations
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       arm_hal                                │
//! │  ┌──────────────────┐        ┌────────────────────────────┐  │
//! │  │ Driver Registry  │──────► │ ActuatorBus (trait object) │  │
//! │  │ name → factory   │        └─────────────┬──────────────┘  │
//! │  └──────────────────┘                      │                 │
//! │                            ┌───────────────┴──────────┐      │
//! │                            ▼                          ▼      │
//! │                    SimulatedBus               DynamixelBus   │
//! │                    (in-process)           (half-duplex UART) │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]

pub mod driver_registry;
pub mod drivers;

// Re-export key types for convenience
pub use crate::driver_registry::DriverRegistry;
pub use crate::drivers::dynamixel::DynamixelBus;
pub use crate::drivers::simulation::{SimFault, SimulatedBus};
