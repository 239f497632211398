//! Simulated actuator bus.
//!
//! Each actuator holds a present position, a goal and a torque flag:
//!
//! - with torque enabled a goal write moves the actuator there at once;
//! - with torque disabled goal writes are stored but nothing moves, and the
//!   actuator can be displaced with [`SimulatedBus::move_by_hand`] (the
//!   back-drivable leader arm).
//!
//! Faults can be injected per joint for one operation or until cleared.
//! Every call, failed or not, is appended to an ordered call log.

use std::collections::BTreeMap;

use arm_common::bus::{ActuatorBus, BusEffect, BusError};
use arm_common::config::ArmConfig;
use arm_common::joint::{JointId, Position, PositionDomain};
use tracing::{debug, trace};

/// Injectable failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimFault {
    /// The actuator stays silent; every operation fails.
    NoReply,
    /// Reads return a corrupted status packet. Writes succeed.
    MalformedReply,
    /// Reads return this raw value, which may lie outside the domain.
    RawReading(u32),
}

#[derive(Debug, Clone, Copy)]
struct ArmedFault {
    fault: SimFault,
    persistent: bool,
}

#[derive(Debug, Clone)]
struct SimActuator {
    position: Position,
    goal: Position,
    torque_enabled: bool,
    profile_velocity: u16,
    fault: Option<ArmedFault>,
}

impl SimActuator {
    fn at(position: Position) -> Self {
        Self {
            position,
            goal: position,
            torque_enabled: false,
            profile_velocity: 0,
            fault: None,
        }
    }
}

/// In-process servo chain implementing [`ActuatorBus`].
#[derive(Debug, Clone)]
pub struct SimulatedBus {
    domain: PositionDomain,
    actuators: BTreeMap<JointId, SimActuator>,
    calls: Vec<BusEffect>,
}

impl SimulatedBus {
    /// Empty chain; add actuators with [`Self::add_joint`].
    pub fn new(domain: PositionDomain) -> Self {
        Self {
            domain,
            actuators: BTreeMap::new(),
            calls: Vec::new(),
        }
    }

    /// One actuator per configured joint, resting at its default pose with
    /// torque disabled.
    pub fn from_config(config: &ArmConfig) -> Self {
        let mut bus = Self::new(config.arm.resolution);
        for joint in config.joints.iter().chain(config.leader.iter()) {
            bus.add_joint(joint.id, joint.default);
        }
        debug!(actuators = bus.actuators.len(), "Simulated bus initialized");
        bus
    }

    /// Add (or reset) one actuator at `position`.
    pub fn add_joint(&mut self, joint: JointId, position: Position) {
        let position = self.domain.saturate(i64::from(position));
        self.actuators.insert(joint, SimActuator::at(position));
    }

    /// Displace an actuator by external force.
    ///
    /// Only a limp actuator (torque disabled) moves. Returns whether the
    /// actuator moved.
    pub fn move_by_hand(&mut self, joint: JointId, position: Position) -> bool {
        let domain = self.domain;
        match self.actuators.get_mut(&joint) {
            Some(act) if !act.torque_enabled => {
                act.position = domain.saturate(i64::from(position));
                true
            }
            _ => false,
        }
    }

    /// Arm a fault for the next affected operation, or for every operation
    /// until [`Self::clear_fault`] when `persistent`.
    pub fn inject_fault(&mut self, joint: JointId, fault: SimFault, persistent: bool) {
        if let Some(act) = self.actuators.get_mut(&joint) {
            act.fault = Some(ArmedFault { fault, persistent });
        }
    }

    /// Remove any armed fault on `joint`.
    pub fn clear_fault(&mut self, joint: JointId) {
        if let Some(act) = self.actuators.get_mut(&joint) {
            act.fault = None;
        }
    }

    /// Present position of `joint`, bypassing faults and the call log.
    pub fn position(&self, joint: JointId) -> Option<Position> {
        self.actuators.get(&joint).map(|a| a.position)
    }

    /// Last goal written to `joint`.
    pub fn goal(&self, joint: JointId) -> Option<Position> {
        self.actuators.get(&joint).map(|a| a.goal)
    }

    /// Torque flag of `joint`.
    pub fn torque_enabled(&self, joint: JointId) -> Option<bool> {
        self.actuators.get(&joint).map(|a| a.torque_enabled)
    }

    /// Profile velocity of `joint`.
    pub fn profile_velocity(&self, joint: JointId) -> Option<u16> {
        self.actuators.get(&joint).map(|a| a.profile_velocity)
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> &[BusEffect] {
        &self.calls
    }

    /// Forget the call log.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Look up `joint` and consume its fault if it applies to this kind
    /// of operation.
    fn actuator(&mut self, joint: JointId, is_read: bool) -> Result<&mut SimActuator, BusError> {
        let act = self
            .actuators
            .get_mut(&joint)
            .ok_or(BusError::NoReply(joint))?;

        let Some(armed) = act.fault else {
            return Ok(act);
        };
        let applies = match armed.fault {
            SimFault::NoReply => true,
            SimFault::MalformedReply | SimFault::RawReading(_) => is_read,
        };
        if !applies {
            return Ok(act);
        }
        if !armed.persistent {
            act.fault = None;
        }

        match armed.fault {
            SimFault::NoReply => Err(BusError::NoReply(joint)),
            SimFault::MalformedReply => Err(BusError::MalformedReply {
                joint,
                detail: "checksum mismatch".to_string(),
            }),
            SimFault::RawReading(value) => {
                let max = self.domain.max();
                if value > u32::from(max) {
                    return Err(BusError::OutOfDomain { joint, value, max });
                }
                // In-domain raw readings are reported as the actuator position.
                act.position = value as Position;
                Ok(act)
            }
        }
    }
}

impl ActuatorBus for SimulatedBus {
    fn name(&self) -> &'static str {
        super::DRIVER_NAME
    }

    fn set_goal_position(&mut self, joint: JointId, position: Position) -> Result<(), BusError> {
        self.calls.push(BusEffect::SetGoalPosition { joint, position });
        let max = self.domain.max();
        if position > max {
            return Err(BusError::OutOfDomain {
                joint,
                value: u32::from(position),
                max,
            });
        }
        let act = self.actuator(joint, false)?;
        act.goal = position;
        if act.torque_enabled {
            act.position = position;
        }
        trace!(%joint, position, "sim goal");
        Ok(())
    }

    fn present_position(&mut self, joint: JointId) -> Result<Position, BusError> {
        self.calls.push(BusEffect::ReadPresentPosition { joint });
        let act = self.actuator(joint, true)?;
        Ok(act.position)
    }

    fn set_torque_enabled(&mut self, joint: JointId, enabled: bool) -> Result<(), BusError> {
        self.calls.push(BusEffect::SetTorqueEnabled { joint, enabled });
        let act = self.actuator(joint, false)?;
        act.torque_enabled = enabled;
        if enabled {
            act.position = act.goal;
        }
        Ok(())
    }

    fn set_profile_velocity(&mut self, joint: JointId, velocity: u16) -> Result<(), BusError> {
        self.calls.push(BusEffect::SetProfileVelocity { joint, velocity });
        let act = self.actuator(joint, false)?;
        act.profile_velocity = velocity;
        Ok(())
    }
}
