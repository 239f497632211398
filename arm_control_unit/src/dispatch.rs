//! Command dispatcher.
//!
//! Interprets one decoded [`Command`] against the actuator state and the
//! joint limit table. Dispatch performs no I/O: it updates the state and
//! returns the bus effects to perform plus any diagnostics. Nothing here
//! can fail the loop.

use arm_common::bus::BusEffect;
use arm_common::joint::{JointId, Position};
use arm_common::protocol::command::{Command, PositionTargets, TorqueRequest};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Mechanism;
use crate::state::ActuatorState;
use crate::state::machine::TransitionResult;

/// Why part or all of a command was not applied. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// Joint is not part of the primary group.
    #[error("joint {0} is not in the primary group")]
    UnknownJoint(JointId),

    /// Primary joint without a limit entry; skipped.
    #[error("joint {0} has no limit entry")]
    MissingLimit(JointId),

    #[error("positions ignored while mirroring")]
    IgnoredWhileMirroring,

    #[error("mode change rejected: {0}")]
    ModeRejected(&'static str),

    #[error("unrecognized command '{0}'")]
    Unrecognized(String),
}

/// Everything one command produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Bus operations to perform, in order.
    pub effects: Vec<BusEffect>,
    pub diagnostics: Vec<DispatchError>,
    /// Emit a `Positions:` line this iteration.
    pub report_requested: bool,
}

impl DispatchOutcome {
    fn diagnostic(error: DispatchError) -> Self {
        Self {
            diagnostics: vec![error],
            ..Self::default()
        }
    }

    /// True if at least one goal position is written.
    pub fn sets_goals(&self) -> bool {
        self.effects
            .iter()
            .any(|e| matches!(e, BusEffect::SetGoalPosition { .. }))
    }
}

/// Apply `cmd` to `state`.
pub fn apply(cmd: Command, state: &mut ActuatorState, mechanism: &Mechanism) -> DispatchOutcome {
    debug!(command = cmd.name(), mode = state.mode().as_str(), "dispatch");
    match cmd {
        Command::SetPositions(targets) => set_positions(&targets, state, mechanism),
        Command::SetTorque(request) => set_torque(&request, state, mechanism),
        Command::SetMode(request) => match state.request_mode(request) {
            TransitionResult::Ok(mode) => {
                info!(mode = mode.as_str(), "Mode changed");
                if mode.accepts_positions() {
                    reclamp_commanded(state, mechanism);
                }
                DispatchOutcome::default()
            }
            TransitionResult::Rejected(reason) => {
                DispatchOutcome::diagnostic(DispatchError::ModeRejected(reason))
            }
        },
        Command::RequestFeedback => DispatchOutcome {
            effects: mechanism
                .primary
                .iter()
                .map(|joint| BusEffect::ReadPresentPosition { joint })
                .collect(),
            diagnostics: Vec::new(),
            report_requested: true,
        },
        Command::Unrecognized(raw) => DispatchOutcome::diagnostic(DispatchError::Unrecognized(raw)),
    }
}

/// Goal for `raw` on `joint`: clamped into its limit, or only saturated
/// into the position domain in the raw sub-mode.
pub fn goal_for(joint: JointId, raw: i64, mechanism: &Mechanism) -> Result<Position, DispatchError> {
    let limit = mechanism
        .limits
        .limit_of(joint)
        .ok_or(DispatchError::MissingLimit(joint))?;
    if mechanism.clamping {
        Ok(limit.clamp(raw))
    } else {
        Ok(mechanism.domain.saturate(raw))
    }
}

/// Mirroring stores raw leader readings as the commanded pose. Bring them
/// back inside the limits before anything re-sends them.
fn reclamp_commanded(state: &mut ActuatorState, mechanism: &Mechanism) {
    for joint in mechanism.primary.iter() {
        let Some(current) = state.commanded(joint) else {
            continue;
        };
        let Ok(position) = goal_for(joint, i64::from(current), mechanism) else {
            continue;
        };
        if position != current {
            debug!(%joint, current, position, "commanded goal re-clamped");
            state.set_commanded(joint, position);
        }
    }
}

fn set_positions(
    targets: &PositionTargets,
    state: &mut ActuatorState,
    mechanism: &Mechanism,
) -> DispatchOutcome {
    if !state.mode().accepts_positions() {
        return DispatchOutcome::diagnostic(DispatchError::IgnoredWhileMirroring);
    }

    let mut outcome = DispatchOutcome::default();
    for &(joint, raw) in targets {
        if !mechanism.primary.contains(joint) {
            outcome.diagnostics.push(DispatchError::UnknownJoint(joint));
            continue;
        }
        let position = match goal_for(joint, raw, mechanism) {
            Ok(position) => position,
            Err(e) => {
                outcome.diagnostics.push(e);
                continue;
            }
        };
        if i64::from(position) != raw {
            debug!(%joint, raw, position, "goal clamped");
        }
        state.set_commanded(joint, position);
        outcome
            .effects
            .push(BusEffect::SetGoalPosition { joint, position });
    }
    outcome
}

fn set_torque(
    request: &TorqueRequest,
    state: &mut ActuatorState,
    mechanism: &Mechanism,
) -> DispatchOutcome {
    let mut outcome = DispatchOutcome::default();
    let flags: Vec<(JointId, bool)> = match request {
        TorqueRequest::All(enabled) => mechanism.primary.iter().map(|j| (j, *enabled)).collect(),
        TorqueRequest::PerJoint(flags) => flags.clone(),
    };

    for (joint, enabled) in flags {
        if !mechanism.primary.contains(joint) {
            outcome.diagnostics.push(DispatchError::UnknownJoint(joint));
            continue;
        }
        state.set_torque(joint, enabled);
        outcome
            .effects
            .push(BusEffect::SetTorqueEnabled { joint, enabled });
    }
    info!(
        enabled = state.torque_enabled(&mechanism.primary),
        "Torque updated"
    );
    outcome
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use arm_common::config::{ArmConfig, Preset};
    use arm_common::protocol::command::ModeRequest;
    use arm_common::protocol::decode::CommandDecoder;

    use crate::state::ControlMode;

    fn setup(preset: Preset) -> (Mechanism, ActuatorState, CommandDecoder) {
        let mech = Mechanism::from_config(&ArmConfig::preset(preset)).unwrap();
        let state = ActuatorState::new(&mech);
        let decoder = CommandDecoder::new(mech.primary.ids());
        (mech, state, decoder)
    }

    fn goals(outcome: &DispatchOutcome) -> Vec<Position> {
        outcome
            .effects
            .iter()
            .filter_map(|e| match e {
                BusEffect::SetGoalPosition { position, .. } => Some(*position),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn in_range_positions_pass_unchanged() {
        let (mech, mut state, dec) = setup(Preset::Seven);
        let cmd = dec.decode("0,1023,180,165,512,512,0,370").unwrap();
        let outcome = apply(cmd, &mut state, &mech);
        assert_eq!(goals(&outcome), vec![1023, 180, 165, 512, 512, 0, 370]);
        assert_eq!(outcome.effects.len(), 7);
        assert!(outcome.diagnostics.is_empty());
        assert_eq!(
            state.commanded_pose(&mech.primary),
            vec![1023, 180, 165, 512, 512, 0, 370]
        );
    }

    #[test]
    fn out_of_range_saturates_per_joint() {
        let (mech, mut state, dec) = setup(Preset::Seven);
        let cmd = dec.decode("0,2000,0,0,0,0,0,0").unwrap();
        let outcome = apply(cmd, &mut state, &mech);
        // j2 [180,845] j3 [165,1023] j4/j5 [512,1023] j7 [370,695]
        assert_eq!(goals(&outcome), vec![1023, 180, 165, 512, 512, 0, 370]);
        assert_eq!(state.commanded(JointId::new(1)), Some(1023));
    }

    #[test]
    fn every_joint_clamped_against_its_own_limit() {
        let (mech, mut state, dec) = setup(Preset::Six);
        let cmd = dec.decode("0,-1,-1,-1,5000,5000,5000").unwrap();
        let outcome = apply(cmd, &mut state, &mech);
        assert_eq!(goals(&outcome), vec![0, 380, 512, 1023, 1023, 695]);
    }

    #[test]
    fn raw_sub_mode_saturates_into_domain_only() {
        let (mech, mut state, dec) = setup(Preset::DualSeven);
        let cmd = dec.decode("0,2000,0,0,0,0,0,-3").unwrap();
        let outcome = apply(cmd, &mut state, &mech);
        assert_eq!(goals(&outcome), vec![1023, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn torque_broadcast_in_joint_order() {
        let (mech, mut state, dec) = setup(Preset::Six);
        let off = apply(dec.decode("1,0,0,0,0,0,0").unwrap(), &mut state, &mech);
        assert!(!state.torque_enabled(&mech.primary));
        let on = apply(dec.decode("1,1,0,0,0,0,0").unwrap(), &mut state, &mech);
        assert!(state.torque_enabled(&mech.primary));

        for (outcome, enabled) in [(&off, false), (&on, true)] {
            let expected: Vec<BusEffect> = (1..=6)
                .map(|n| BusEffect::SetTorqueEnabled { joint: JointId::new(n), enabled })
                .collect();
            assert_eq!(outcome.effects, expected);
        }
    }

    #[test]
    fn labeled_torque_is_per_joint() {
        let (mech, mut state, dec) = setup(Preset::Six);
        let outcome = apply(dec.decode("Torque:1,1,1,1,1,1").unwrap(), &mut state, &mech);
        assert_eq!(outcome.effects.len(), 6);
        assert!(state.torque_enabled(&mech.primary));

        apply(dec.decode("Torque:1,0,1,1,1,1").unwrap(), &mut state, &mech);
        assert!(!state.torque_enabled(&mech.primary));
        assert!(!state.joint_torque(JointId::new(2)));
        assert!(state.joint_torque(JointId::new(3)));
    }

    #[test]
    fn set_mode_has_no_effects() {
        let (mech, mut state, _) = setup(Preset::Four);
        let outcome = apply(Command::SetMode(ModeRequest::Passive), &mut state, &mech);
        assert!(outcome.effects.is_empty());
        assert_eq!(state.mode(), ControlMode::PassiveFeedback);
    }

    #[test]
    fn leaving_mirror_reclamps_commanded_pose() {
        let mut config = ArmConfig::preset(Preset::DualSeven);
        config.arm.clamping = true;
        let mech = Mechanism::from_config(&config).unwrap();
        let mut state = ActuatorState::new(&mech);
        apply(Command::SetMode(ModeRequest::Passive), &mut state, &mech);
        // Leader readings as the mirror leaves them.
        state.set_commanded(JointId::new(2), 10);
        state.set_commanded(JointId::new(7), 1000);

        let outcome = apply(Command::SetMode(ModeRequest::Active), &mut state, &mech);
        assert!(outcome.effects.is_empty());
        assert_eq!(state.mode(), ControlMode::Active);
        assert_eq!(state.commanded(JointId::new(2)), Some(180));
        assert_eq!(state.commanded(JointId::new(7)), Some(695));
    }

    #[test]
    fn leaving_mirror_in_raw_sub_mode_keeps_readings() {
        let (mech, mut state, _) = setup(Preset::DualSeven);
        apply(Command::SetMode(ModeRequest::Passive), &mut state, &mech);
        state.set_commanded(JointId::new(2), 10);
        apply(Command::SetMode(ModeRequest::Active), &mut state, &mech);
        assert_eq!(state.commanded(JointId::new(2)), Some(10));
    }

    #[test]
    fn request_feedback_reads_every_joint() {
        let (mech, mut state, _) = setup(Preset::Four);
        let outcome = apply(Command::RequestFeedback, &mut state, &mech);
        assert!(outcome.report_requested);
        assert_eq!(outcome.effects.len(), 4);
        assert!(outcome.effects.iter().all(BusEffect::is_read));
    }

    #[test]
    fn mirroring_ignores_positions() {
        let (mech, mut state, dec) = setup(Preset::DualSeven);
        apply(Command::SetMode(ModeRequest::Passive), &mut state, &mech);
        let before = state.commanded_pose(&mech.primary);
        let outcome = apply(dec.decode("0,1,2,3,4,5,6,7").unwrap(), &mut state, &mech);
        assert!(outcome.effects.is_empty());
        assert_eq!(outcome.diagnostics, vec![DispatchError::IgnoredWhileMirroring]);
        assert_eq!(state.commanded_pose(&mech.primary), before);
    }

    #[test]
    fn unrecognized_is_diagnostic_only() {
        let (mech, mut state, dec) = setup(Preset::Four);
        let before = state.clone();
        let outcome = apply(dec.decode("7,1,2,3,4").unwrap(), &mut state, &mech);
        assert!(outcome.effects.is_empty());
        assert!(matches!(outcome.diagnostics.as_slice(), [DispatchError::Unrecognized(_)]));
        assert_eq!(state.commanded_pose(&mech.primary), before.commanded_pose(&mech.primary));
    }

    #[test]
    fn foreign_joint_is_skipped() {
        let (mech, mut state, _) = setup(Preset::Four);
        let targets = vec![(JointId::new(1), 10), (JointId::new(9), 10)];
        let outcome = apply(Command::SetPositions(targets), &mut state, &mech);
        assert_eq!(outcome.effects.len(), 1);
        assert_eq!(outcome.diagnostics, vec![DispatchError::UnknownJoint(JointId::new(9))]);
    }

    #[test]
    fn missing_limit_is_skipped() {
        let (mut mech, mut state, _) = setup(Preset::Four);
        mech.limits = arm_common::joint::JointLimitTable::new();
        let outcome = apply(
            Command::SetPositions(vec![(JointId::new(2), 600)]),
            &mut state,
            &mech,
        );
        assert!(outcome.effects.is_empty());
        assert_eq!(outcome.diagnostics, vec![DispatchError::MissingLimit(JointId::new(2))]);
        assert_eq!(state.commanded(JointId::new(2)), Some(380));
    }
}
