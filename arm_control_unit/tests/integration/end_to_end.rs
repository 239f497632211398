//! Integration test: framed records in, bus calls and status lines out.

use arm_common::bus::BusEffect;
use arm_common::config::Preset;
use arm_common::joint::{JointId, Position};
use arm_control_unit::state::ControlMode;

use super::runner;

fn goal_calls(calls: &[BusEffect]) -> Vec<Position> {
    calls
        .iter()
        .filter_map(|c| match c {
            BusEffect::SetGoalPosition { position, .. } => Some(*position),
            _ => None,
        })
        .collect()
}

#[test]
fn in_range_pose_passes_unchanged() {
    let mut r = runner(Preset::Seven);
    r.transport_mut().push_bytes(b"0,1023,180,165,512,512,0,370*");

    let report = r.step();
    assert!(report.consumed_record);
    assert!(report.diagnostics.is_empty());
    assert_eq!(goal_calls(r.bus().calls()), vec![1023, 180, 165, 512, 512, 0, 370]);
    assert_eq!(r.bus().calls().len(), 7);
    assert_eq!(report.status.as_deref(), Some("1023,180,165,512,512,0,370"));
}

#[test]
fn out_of_range_saturates_at_max() {
    let mut r = runner(Preset::Seven);
    r.transport_mut().push_bytes(b"0,2000,0,0,0,0,0,0*");
    r.step();
    assert_eq!(r.state().commanded(JointId::new(1)), Some(1023));
    assert_eq!(goal_calls(r.bus().calls()), vec![1023, 180, 165, 512, 512, 0, 370]);
}

#[test]
fn labeled_torque_enables_six_joints() {
    let mut r = runner(Preset::Six);
    r.transport_mut().push_bytes(b"Torque:1,1,1,1,1,1*");
    r.step();

    let expected: Vec<BusEffect> = (1..=6)
        .map(|n| BusEffect::SetTorqueEnabled { joint: JointId::new(n), enabled: true })
        .collect();
    assert_eq!(r.bus().calls(), expected.as_slice());
    assert!(r.state().torque_enabled(&r.mechanism().primary));
}

#[test]
fn torque_off_then_on_in_joint_order() {
    let mut r = runner(Preset::Six);
    r.transport_mut().push_bytes(b"1,0,0,0,0,0,0*1,1,0,0,0,0,0*");
    r.step();
    assert!(!r.state().torque_enabled(&r.mechanism().primary));
    r.step();
    assert!(r.state().torque_enabled(&r.mechanism().primary));

    let order: Vec<(u8, bool)> = r
        .bus()
        .calls()
        .iter()
        .filter_map(|c| match c {
            BusEffect::SetTorqueEnabled { joint, enabled } => Some((joint.get(), *enabled)),
            _ => None,
        })
        .collect();
    let expected: Vec<(u8, bool)> = (1..=6)
        .map(|n| (n, false))
        .chain((1..=6).map(|n| (n, true)))
        .collect();
    assert_eq!(order, expected);
}

#[test]
fn malformed_record_is_diagnostic_only() {
    let mut r = runner(Preset::Four);
    r.transport_mut().push_bytes(b"abc*");

    let report = r.step();
    assert!(report.consumed_record);
    assert!(r.bus().calls().is_empty());
    assert_eq!(report.diagnostics, vec!["Error:malformed number 'abc'".to_string()]);
    assert_eq!(report.status.as_deref(), Some("512,380,700,695"));
    assert_eq!(r.state().mode(), ControlMode::Idle);
}

#[test]
fn wrong_arity_leaves_state_untouched() {
    let mut r = runner(Preset::Six);
    let before = r.state().commanded_pose(&r.mechanism().primary);
    r.transport_mut().push_bytes(b"0,1,2,3,4,5*");

    let report = r.step();
    assert_eq!(
        report.diagnostics,
        vec!["Error:arity mismatch: expected 6 values, got 5".to_string()]
    );
    assert_eq!(r.state().commanded_pose(&r.mechanism().primary), before);
    assert!(r.bus().calls().is_empty());
}

#[test]
fn unknown_word_reports_unknown_command() {
    let mut r = runner(Preset::Four);
    r.transport_mut().push_bytes(b"Grip:1,2,3,4*");
    let report = r.step();
    assert_eq!(report.diagnostics, vec!["Error:unknown command 'Grip'".to_string()]);
    assert!(r.bus().calls().is_empty());
}

#[test]
fn one_record_per_iteration() {
    let mut r = runner(Preset::Four);
    r.transport_mut().push_bytes(b"0,10,400,600,400*0,20,400,600,400*0,30,400,600,400*");
    assert_eq!(r.transport().pending(), 3);

    for (i, expected) in [10, 20, 30].into_iter().enumerate() {
        let report = r.step();
        assert!(report.consumed_record);
        assert_eq!(r.state().commanded(JointId::new(1)), Some(expected));
        assert_eq!(r.transport().pending(), 2 - i);
    }
    assert!(!r.step().consumed_record);
}

#[test]
fn partial_frame_waits_for_terminator() {
    let mut r = runner(Preset::Four);
    r.transport_mut().push_bytes(b"0,100,");
    assert!(!r.step().consumed_record);
    r.transport_mut().push_bytes(b"400,600,400*");
    assert!(r.step().consumed_record);
    assert_eq!(r.state().commanded(JointId::new(1)), Some(100));
}

#[test]
fn feedback_request_reports_measured_positions() {
    let mut r = runner(Preset::Four);
    r.bus_mut().move_by_hand(JointId::new(1), 300);
    r.transport_mut().push_bytes(b"3,0,0,0,0*");

    let report = r.step();
    assert_eq!(report.status.as_deref(), Some("Positions:300,380,700,695"));
    assert!(r.bus().calls().iter().all(BusEffect::is_read));
}

#[test]
fn passive_feedback_streams_every_cycle() {
    let mut r = runner(Preset::Four);
    r.transport_mut().push_bytes(b"2,1,0,0,0*");
    let first = r.step();
    assert_eq!(r.state().mode(), ControlMode::PassiveFeedback);
    assert_eq!(first.status.as_deref(), Some("Feedback:512,380,700,695"));

    r.bus_mut().move_by_hand(JointId::new(4), 400);
    let second = r.step();
    assert!(!second.consumed_record);
    assert_eq!(second.status.as_deref(), Some("Feedback:512,380,700,400"));
}

#[test]
fn active_mode_holds_commanded_pose() {
    let mut r = runner(Preset::Four);
    r.transport_mut().push_bytes(b"2,0,0,0,0*0,100,500,600,500*");
    r.step();
    r.step();
    r.bus_mut().clear_calls();

    r.step();
    assert_eq!(goal_calls(r.bus().calls()), vec![100, 500, 600, 500]);
}

#[test]
fn sent_lines_put_diagnostics_before_status() {
    let mut r = runner(Preset::Four);
    r.transport_mut().push_bytes(b"9,0,0,0,0*");
    r.step();
    let sent = r.transport_mut().take_sent();
    assert_eq!(sent.len(), 2);
    assert!(sent[0].starts_with("Error:unrecognized command"));
    assert_eq!(sent[1], "512,380,700,695");
}
