//! Actuator state: the single authoritative record of the mechanism.
//!
//! Created once at startup from the default pose, mutated only by the
//! dispatcher, the mirror and the executor, all on the control loop
//! thread. Maps are keyed by joint and iterated in group order, never in
//! map order.

pub mod machine;

use std::collections::BTreeMap;

use arm_common::joint::{JointGroup, JointId, Position};
use arm_common::protocol::command::ModeRequest;

use crate::config::Mechanism;
use machine::{ModeStateMachine, TransitionResult};

pub use machine::ControlMode;

/// Per-process actuator record.
#[derive(Debug, Clone)]
pub struct ActuatorState {
    /// Goal last commanded, per joint.
    commanded: BTreeMap<JointId, Position>,
    /// Last good reading, per joint. Absent until first read.
    measured: BTreeMap<JointId, Position>,
    /// Holding-torque flag, per joint.
    torque: BTreeMap<JointId, bool>,
    modes: ModeStateMachine,
}

impl ActuatorState {
    /// Default pose commanded, nothing measured, torque off, `Idle`.
    pub fn new(mechanism: &Mechanism) -> Self {
        let commanded: BTreeMap<_, _> = mechanism.default_pose.iter().copied().collect();
        let torque = mechanism
            .primary
            .iter()
            .chain(mechanism.leader.iter().flat_map(JointGroup::iter))
            .map(|joint| (joint, false))
            .collect();
        Self {
            commanded,
            measured: BTreeMap::new(),
            torque,
            modes: ModeStateMachine::new(mechanism.is_dual_group()),
        }
    }

    // ─── Positions ──────────────────────────────────────────────────

    #[inline]
    pub fn commanded(&self, joint: JointId) -> Option<Position> {
        self.commanded.get(&joint).copied()
    }

    pub fn set_commanded(&mut self, joint: JointId, position: Position) {
        self.commanded.insert(joint, position);
    }

    #[inline]
    pub fn measured(&self, joint: JointId) -> Option<Position> {
        self.measured.get(&joint).copied()
    }

    pub fn set_measured(&mut self, joint: JointId, position: Position) {
        self.measured.insert(joint, position);
    }

    /// Commanded positions of `group`, in group order. Joints never
    /// commanded read as 0.
    pub fn commanded_pose(&self, group: &JointGroup) -> Vec<Position> {
        group
            .iter()
            .map(|joint| self.commanded(joint).unwrap_or(0))
            .collect()
    }

    /// Measured positions of `group`, in group order. A joint never read
    /// successfully reports its commanded position.
    pub fn measured_pose(&self, group: &JointGroup) -> Vec<Position> {
        group
            .iter()
            .map(|joint| {
                self.measured(joint)
                    .or_else(|| self.commanded(joint))
                    .unwrap_or(0)
            })
            .collect()
    }

    // ─── Torque ─────────────────────────────────────────────────────

    pub fn set_torque(&mut self, joint: JointId, enabled: bool) {
        self.torque.insert(joint, enabled);
    }

    #[inline]
    pub fn joint_torque(&self, joint: JointId) -> bool {
        self.torque.get(&joint).copied().unwrap_or(false)
    }

    /// True only when every joint of `group` holds torque.
    pub fn torque_enabled(&self, group: &JointGroup) -> bool {
        !group.is_empty() && group.iter().all(|joint| self.joint_torque(joint))
    }

    // ─── Mode ───────────────────────────────────────────────────────

    #[inline]
    pub fn mode(&self) -> ControlMode {
        self.modes.mode()
    }

    pub fn request_mode(&mut self, request: ModeRequest) -> TransitionResult {
        self.modes.request(request)
    }
}
