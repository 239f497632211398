//! Integration test: leader-follower teleoperation on the dual seven-joint rig.

use arm_common::bus::BusEffect;
use arm_common::config::{ArmConfig, Preset};
use arm_common::joint::JointId;
use arm_control_unit::state::ControlMode;

use super::{SimRunner, runner, runner_for};

fn mirroring_runner() -> SimRunner {
    let mut r = runner(Preset::DualSeven);
    r.startup();
    r.transport_mut().push_bytes(b"2,1,0,0,0,0,0,0*");
    r.step();
    assert_eq!(r.state().mode(), ControlMode::LeaderFollowerMirror);
    r.bus_mut().clear_calls();
    r.transport_mut().take_sent();
    r
}

#[test]
fn hand_moved_leader_drives_primary_unclamped() {
    let mut r = mirroring_runner();
    // j2 limit is [180,845] and j7 is [370,695]; mirrored values ignore both.
    let readings = [5, 10, 1023, 0, 1, 1000, 100];
    for (k, value) in readings.iter().enumerate() {
        assert!(r.bus_mut().move_by_hand(JointId::new(11 + k as u8), *value));
    }

    r.step();
    for (k, value) in readings.iter().enumerate() {
        let primary = JointId::new(1 + k as u8);
        assert_eq!(r.state().commanded(primary), Some(*value));
        assert_eq!(r.bus().goal(primary), Some(*value));
        assert_eq!(r.bus().position(primary), Some(*value));
    }
}

#[test]
fn clamped_rig_returns_to_limits_after_mirroring() {
    let mut config = ArmConfig::preset(Preset::DualSeven);
    config.arm.clamping = true;
    let mut r = runner_for(&config);
    r.startup();
    r.transport_mut().push_bytes(b"2,1,0,0,0,0,0,0*");
    r.step();
    assert_eq!(r.state().mode(), ControlMode::LeaderFollowerMirror);

    // j2 limit is [180,845]; the mirror itself ignores it.
    let j2 = JointId::new(2);
    assert!(r.bus_mut().move_by_hand(JointId::new(12), 10));
    r.step();
    assert_eq!(r.bus().goal(j2), Some(10));

    r.transport_mut().push_bytes(b"2,0,0,0,0,0,0,0*");
    r.step();
    assert_eq!(r.state().mode(), ControlMode::Active);
    assert_eq!(r.state().commanded(j2), Some(180));
    assert_eq!(r.bus().goal(j2), Some(180));

    r.bus_mut().clear_calls();
    r.step();
    assert!(r.bus().calls().contains(&BusEffect::SetGoalPosition { joint: j2, position: 180 }));
    assert_eq!(r.bus().goal(j2), Some(180));
}

#[test]
fn each_cycle_reads_leaders_then_writes_primaries() {
    let mut r = mirroring_runner();
    r.step();

    let calls = r.bus().calls();
    assert_eq!(calls.len(), 14);
    assert!(calls[..7].iter().all(|c| c.is_read() && c.joint().get() > 10));
    assert!(
        calls[7..]
            .iter()
            .all(|c| matches!(c, BusEffect::SetGoalPosition { .. }) && c.joint().get() <= 7)
    );
}

#[test]
fn status_is_leader_dump() {
    let mut r = mirroring_runner();
    r.bus_mut().move_by_hand(JointId::new(11), 510);
    r.bus_mut().move_by_hand(JointId::new(12), 515);

    let report = r.step();
    let status = report.status.unwrap();
    assert!(status.starts_with("ID11: 510, ID12: 515, ID13: "), "{status}");
    assert_eq!(status.matches("ID").count(), 7);
}

#[test]
fn set_positions_ignored_while_mirroring() {
    let mut r = mirroring_runner();
    r.bus_mut().move_by_hand(JointId::new(11), 600);
    r.step();
    let before = r.state().commanded_pose(&r.mechanism().primary);
    r.bus_mut().clear_calls();

    r.transport_mut().push_bytes(b"0,1,2,3,4,5,6,7*");
    let report = r.step();
    assert_eq!(
        report.diagnostics,
        vec!["Error:positions ignored while mirroring".to_string()]
    );
    assert_eq!(r.state().commanded_pose(&r.mechanism().primary), before);
    // Only the mirror pass touched the bus.
    assert_eq!(r.bus().calls().len(), 14);
    assert_eq!(r.bus().goal(JointId::new(1)), Some(600));
}

#[test]
fn active_request_leaves_mirroring() {
    let mut r = mirroring_runner();
    r.transport_mut().push_bytes(b"2,0,0,0,0,0,0,0*0,512,512,512,512,512,512,512*");
    r.step();
    assert_eq!(r.state().mode(), ControlMode::Active);
    r.step();
    assert_eq!(r.state().commanded(JointId::new(4)), Some(512));
}

#[test]
fn single_group_passive_request_streams_feedback() {
    let mut r = runner(Preset::Seven);
    r.transport_mut().push_bytes(b"2,1,0,0,0,0,0,0*");
    r.step();
    assert_eq!(r.state().mode(), ControlMode::PassiveFeedback);
}
