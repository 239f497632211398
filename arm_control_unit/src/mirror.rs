//! Leader-follower mirroring.
//!
//! Each mirroring cycle is two phases around the bus:
//!
//! 1. [`leader_reads`]: one present-position read per leader joint;
//!    the executor folds the results into `measured`.
//! 2. [`follow`]: leader joint *k*'s last good reading becomes primary
//!    joint *k*'s goal, unclamped.
//!
//! A leader joint that has never been read successfully leaves its primary
//! joint untouched.

use arm_common::bus::BusEffect;
use arm_common::consts::MAX_JOINTS;
use arm_common::joint::{JointId, Position};
use arm_common::protocol::status::StatusLine;
use heapless::Vec as FixedVec;
use tracing::trace;

use crate::config::Mechanism;
use crate::state::ActuatorState;

/// `(primary, position)` goals produced by one mirroring pass.
pub type MirrorGoals = FixedVec<(JointId, Position), MAX_JOINTS>;

/// Reads of the leader group, in index order.
pub fn leader_reads(mechanism: &Mechanism) -> Vec<BusEffect> {
    mechanism
        .leader
        .iter()
        .flat_map(|group| group.iter())
        .map(|joint| BusEffect::ReadPresentPosition { joint })
        .collect()
}

/// Copy leader readings onto the primary group.
///
/// Updates `commanded` for every mirrored joint and returns the goals to
/// write. Leader joints without a reading are skipped.
pub fn follow(state: &mut ActuatorState, mechanism: &Mechanism) -> MirrorGoals {
    let mut goals = MirrorGoals::new();
    for (leader, primary) in mechanism.mirror_pairs() {
        let Some(position) = state.measured(leader) else {
            trace!(%leader, "leader not yet read");
            continue;
        };
        state.set_commanded(primary, position);
        // Group sizes are capped at MAX_JOINTS by validation.
        if goals.push((primary, position)).is_err() {
            break;
        }
    }
    goals
}

/// Goal writes for a [`follow`] result.
pub fn goal_effects(goals: &MirrorGoals) -> Vec<BusEffect> {
    goals
        .iter()
        .map(|&(joint, position)| BusEffect::SetGoalPosition { joint, position })
        .collect()
}

/// `ID11: v, ID12: v, ...` dump of the leader readings.
pub fn leader_dump(state: &ActuatorState, mechanism: &Mechanism) -> StatusLine {
    let pairs = mechanism
        .leader
        .iter()
        .flat_map(|group| group.iter())
        .filter_map(|joint| state.measured(joint).map(|p| (joint, p)))
        .collect();
    StatusLine::JointDump(pairs)
}
