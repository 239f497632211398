//! Integration test: bus faults and framing faults never stop the loop.

use arm_common::config::Preset;
use arm_common::joint::JointId;
use arm_control_unit::state::ControlMode;
use arm_hal::SimFault;

use super::runner;

#[test]
fn failed_feedback_read_keeps_last_good_value() {
    let mut r = runner(Preset::Four);
    r.startup();
    let j3 = JointId::new(3);
    assert_eq!(r.state().measured(j3), Some(700));

    r.bus_mut().inject_fault(j3, SimFault::NoReply, false);
    r.transport_mut().push_bytes(b"3,0,0,0,0*");
    let report = r.step();

    assert_eq!(report.execution.failures.len(), 1);
    assert_eq!(report.diagnostics, vec!["Error:joint 3: no reply".to_string()]);
    assert_eq!(r.state().measured(j3), Some(700));
    assert_eq!(report.status.as_deref(), Some("Positions:512,380,700,695"));
}

#[test]
fn out_of_domain_reading_is_rejected() {
    let mut r = runner(Preset::Four);
    r.startup();
    let j1 = JointId::new(1);
    r.bus_mut().inject_fault(j1, SimFault::RawReading(4000), false);
    r.transport_mut().push_bytes(b"3,0,0,0,0*");

    let report = r.step();
    assert_eq!(
        report.diagnostics,
        vec!["Error:joint 1: reading 4000 outside 0..=1023".to_string()]
    );
    assert_eq!(r.state().measured(j1), Some(512));
}

#[test]
fn persistent_fault_recovers_on_next_cycle_after_clear() {
    let mut r = runner(Preset::Four);
    r.startup();
    r.transport_mut().push_bytes(b"2,1,0,0,0*");
    r.step();
    assert_eq!(r.state().mode(), ControlMode::PassiveFeedback);

    let j2 = JointId::new(2);
    r.bus_mut().inject_fault(j2, SimFault::MalformedReply, true);
    for _ in 0..3 {
        let report = r.step();
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.status.as_deref(), Some("Feedback:512,380,700,695"));
    }

    r.bus_mut().clear_fault(j2);
    let report = r.step();
    assert!(report.diagnostics.is_empty());
    assert!(report.execution.is_clean());
}

#[test]
fn failed_goal_is_retried_by_reissue() {
    let mut r = runner(Preset::Four);
    r.startup();
    let j4 = JointId::new(4);
    r.bus_mut().inject_fault(j4, SimFault::NoReply, false);
    r.transport_mut().push_bytes(b"2,0,0,0,0*0,512,512,512,400*");
    r.step();
    // The one-shot fault ate the mode-change re-issue of joint 4.
    r.step();
    assert_eq!(r.bus().goal(j4), Some(400));

    r.bus_mut().inject_fault(j4, SimFault::NoReply, false);
    r.transport_mut().push_bytes(b"0,512,512,512,450*");
    let report = r.step();
    assert_eq!(report.execution.failures.len(), 1);
    assert_eq!(r.state().commanded(j4), Some(450));
    assert_eq!(r.bus().goal(j4), Some(400));

    r.step();
    assert_eq!(r.bus().goal(j4), Some(450));
}

#[test]
fn startup_failures_are_reported_not_fatal() {
    let mut r = runner(Preset::Four);
    r.bus_mut().inject_fault(JointId::new(2), SimFault::NoReply, true);
    let report = r.startup();
    // Torque, goal and read of joint 2.
    assert_eq!(report.failures.len(), 3);
    assert_eq!(r.transport().sent().len(), 3);
    assert!(r.transport().sent().iter().all(|l| l.starts_with("Error:")));

    r.bus_mut().clear_fault(JointId::new(2));
    assert!(r.step().diagnostics.is_empty());
}

#[test]
fn overlong_record_is_discarded_with_diagnostic() {
    let mut r = runner(Preset::Four);
    let mut junk = vec![b'9'; 200];
    junk.extend_from_slice(b"*0,100,400,600,400*");
    r.transport_mut().push_bytes(&junk);

    let first = r.step();
    assert!(first.consumed_record);
    assert_eq!(
        first.diagnostics,
        vec!["Error:record exceeds 128 bytes, discarded".to_string()]
    );
    assert_eq!(r.state().commanded(JointId::new(1)), Some(512));

    let second = r.step();
    assert!(second.diagnostics.is_empty());
    assert_eq!(r.state().commanded(JointId::new(1)), Some(100));
}

#[test]
fn invalid_utf8_is_a_decode_diagnostic() {
    let mut r = runner(Preset::Four);
    r.transport_mut().push_bytes(&[0xff, 0xfe, b'*']);
    let report = r.step();
    assert_eq!(report.diagnostics, vec!["Error:record is not valid UTF-8".to_string()]);
    assert!(r.bus().calls().is_empty());
}

#[test]
fn noise_between_records_is_ignored() {
    let mut r = runner(Preset::Four);
    r.transport_mut().push_bytes(b"\r\n*\n0,100,400,600,400*\r\n");
    let report = r.step();
    assert!(report.diagnostics.is_empty());
    assert_eq!(r.state().commanded(JointId::new(1)), Some(100));
}
