//! Actuator bus trait and error types.
//!
//! This module defines:
//! - `ActuatorBus` trait - Interface for pluggable bus adapters
//! - `BusEffect` enum - One intended bus operation, produced by the dispatcher
//! - `BusError` enum - Error types for bus operations
//! - `BusFactory` type alias - Factory function type

use thiserror::Error;

use crate::config::ArmConfig;
use crate::joint::{JointId, Position};

/// Error types for bus operations.
///
/// None of these are fatal once the control loop is running: the last
/// known-good value is kept and the failure becomes a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// Actuator did not answer within the reply timeout.
    #[error("joint {0}: no reply")]
    NoReply(JointId),

    /// Reply was truncated, mis-addressed or failed its checksum.
    #[error("joint {joint}: malformed reply ({detail})")]
    MalformedReply { joint: JointId, detail: String },

    /// Reading outside the configured position domain.
    #[error("joint {joint}: reading {value} outside 0..={max}")]
    OutOfDomain {
        joint: JointId,
        value: u32,
        max: Position,
    },

    /// Actuator reported a non-zero error byte.
    #[error("joint {joint}: device error 0x{code:02X}")]
    DeviceError { joint: JointId, code: u8 },

    /// Underlying port failure.
    #[error("bus I/O error: {0}")]
    Io(String),

    /// Adapter could not be brought up.
    #[error("bus initialization failed: {0}")]
    InitFailed(String),

    /// No adapter registered under this name.
    #[error("bus driver not found: {0}")]
    DriverNotFound(String),
}

/// One intended bus operation.
///
/// The dispatcher and the mirror only ever produce these; an executor
/// performs them against an [`ActuatorBus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEffect {
    SetGoalPosition { joint: JointId, position: Position },
    SetTorqueEnabled { joint: JointId, enabled: bool },
    SetProfileVelocity { joint: JointId, velocity: u16 },
    ReadPresentPosition { joint: JointId },
}

impl BusEffect {
    /// Joint addressed by this effect.
    #[inline]
    pub const fn joint(&self) -> JointId {
        match *self {
            Self::SetGoalPosition { joint, .. }
            | Self::SetTorqueEnabled { joint, .. }
            | Self::SetProfileVelocity { joint, .. }
            | Self::ReadPresentPosition { joint } => joint,
        }
    }

    #[inline]
    pub const fn is_read(&self) -> bool {
        matches!(self, Self::ReadPresentPosition { .. })
    }
}

/// Factory function type for creating bus instances.
///
/// Receives the whole mechanism configuration: hardware adapters read the
/// `[bus]` section, the simulation seeds one actuator per configured joint.
pub type BusFactory = fn(&ArmConfig) -> Result<Box<dyn ActuatorBus>, BusError>;

/// Interface for actuator bus adapters (simulation, Dynamixel, ...).
///
/// All operations are synchronous: a call returns once the actuator has
/// acknowledged or the reply timeout has elapsed.
///
/// # Lifecycle
///
/// 1. Construction through a [`BusFactory`] (opens the port)
/// 2. Per-joint operations, called from the control loop only
/// 3. `shutdown()` when the control loop exits
pub trait ActuatorBus: Send {
    /// Adapter identifier (e.g. "simulation", "dynamixel").
    fn name(&self) -> &'static str;

    /// Write a goal position.
    fn set_goal_position(&mut self, joint: JointId, position: Position) -> Result<(), BusError>;

    /// Read the present position.
    fn present_position(&mut self, joint: JointId) -> Result<Position, BusError>;

    /// Enable or disable holding torque.
    fn set_torque_enabled(&mut self, joint: JointId, enabled: bool) -> Result<(), BusError>;

    /// Write the velocity limit used when moving towards a goal.
    fn set_profile_velocity(&mut self, joint: JointId, velocity: u16) -> Result<(), BusError>;

    /// Release the port.
    /// Default: nothing to release.
    fn shutdown(&mut self) -> Result<(), BusError> {
        Ok(())
    }

    /// Perform one [`BusEffect`]. Reads return the measured position.
    fn perform(&mut self, effect: &BusEffect) -> Result<Option<Position>, BusError> {
        match *effect {
            BusEffect::SetGoalPosition { joint, position } => {
                self.set_goal_position(joint, position).map(|()| None)
            }
            BusEffect::SetTorqueEnabled { joint, enabled } => {
                self.set_torque_enabled(joint, enabled).map(|()| None)
            }
            BusEffect::SetProfileVelocity { joint, velocity } => {
                self.set_profile_velocity(joint, velocity).map(|()| None)
            }
            BusEffect::ReadPresentPosition { joint } => self.present_position(joint).map(Some),
        }
    }
}

impl<B: ActuatorBus + ?Sized> ActuatorBus for Box<B> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn set_goal_position(&mut self, joint: JointId, position: Position) -> Result<(), BusError> {
        (**self).set_goal_position(joint, position)
    }

    fn present_position(&mut self, joint: JointId) -> Result<Position, BusError> {
        (**self).present_position(joint)
    }

    fn set_torque_enabled(&mut self, joint: JointId, enabled: bool) -> Result<(), BusError> {
        (**self).set_torque_enabled(joint, enabled)
    }

    fn set_profile_velocity(&mut self, joint: JointId, velocity: u16) -> Result<(), BusError> {
        (**self).set_profile_velocity(joint, velocity)
    }

    fn shutdown(&mut self) -> Result<(), BusError> {
        (**self).shutdown()
    }

    fn perform(&mut self, effect: &BusEffect) -> Result<Option<Position>, BusError> {
        (**self).perform(effect)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct EchoBus {
        goal: Position,
        torque: bool,
    }

    impl ActuatorBus for EchoBus {
        fn name(&self) -> &'static str {
            "echo"
        }

        fn set_goal_position(&mut self, _joint: JointId, position: Position) -> Result<(), BusError> {
            self.goal = position;
            Ok(())
        }

        fn present_position(&mut self, joint: JointId) -> Result<Position, BusError> {
            if joint.get() == 99 {
                return Err(BusError::NoReply(joint));
            }
            Ok(self.goal)
        }

        fn set_torque_enabled(&mut self, _joint: JointId, enabled: bool) -> Result<(), BusError> {
            self.torque = enabled;
            Ok(())
        }

        fn set_profile_velocity(&mut self, _joint: JointId, _velocity: u16) -> Result<(), BusError> {
            Ok(())
        }
    }

    #[test]
    fn perform_routes_effects() {
        let mut bus = EchoBus::default();
        let j = JointId::new(3);
        assert_eq!(
            bus.perform(&BusEffect::SetGoalPosition { joint: j, position: 640 }),
            Ok(None)
        );
        assert_eq!(bus.perform(&BusEffect::ReadPresentPosition { joint: j }), Ok(Some(640)));
        bus.perform(&BusEffect::SetTorqueEnabled { joint: j, enabled: true })
            .unwrap();
        assert!(bus.torque);
    }

    #[test]
    fn boxed_bus_forwards() {
        let mut bus: Box<dyn ActuatorBus> = Box::new(EchoBus::default());
        assert_eq!(bus.name(), "echo");
        let err = bus
            .perform(&BusEffect::ReadPresentPosition { joint: JointId::new(99) })
            .unwrap_err();
        assert_eq!(err, BusError::NoReply(JointId::new(99)));
    }

    #[test]
    fn effect_joint_and_kind() {
        let e = BusEffect::SetProfileVelocity { joint: JointId::new(5), velocity: 100 };
        assert_eq!(e.joint(), JointId::new(5));
        assert!(!e.is_read());
        assert!(BusEffect::ReadPresentPosition { joint: JointId::new(1) }.is_read());
    }

    #[test]
    fn error_display() {
        let err = BusError::DeviceError { joint: JointId::new(2), code: 0x20 };
        assert_eq!(err.to_string(), "joint 2: device error 0x20");
    }
}
