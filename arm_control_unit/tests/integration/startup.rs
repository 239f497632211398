//! Integration test: startup sequence and configuration loading.
//!
//! Validates: TOML on disk → validated config → runner → startup brings
//! every joint to its default pose with the right torque state.

use std::io::Write;
use std::path::PathBuf;

use arm_common::bus::{ActuatorBus, BusEffect};
use arm_common::config::{ArmConfig, ConfigError, Preset, TransportKind};
use arm_common::joint::JointId;
use arm_control_unit::config::{ConfigOverrides, load_config};
use arm_control_unit::cycle::{CycleError, CycleRunner};
use arm_control_unit::state::ControlMode;
use arm_control_unit::transport::ScriptedTransport;
use arm_hal::{DriverRegistry, SimulatedBus};
use tempfile::NamedTempFile;

use super::{runner, runner_for};

fn shipped(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config").join(name)
}

#[test]
fn shipped_configs_validate() {
    for name in ["six.toml", "seven.toml", "dual_seven.toml"] {
        let config = ArmConfig::load_validated(&shipped(name))
            .unwrap_or_else(|e| panic!("{name}: {e}"));
        assert!(!config.joints.is_empty());
    }
}

#[test]
fn shipped_dual_config_matches_preset() {
    let file = ArmConfig::load_validated(&shipped("dual_seven.toml")).unwrap();
    let preset = ArmConfig::preset(Preset::DualSeven);
    assert_eq!(file.joints, preset.joints);
    assert_eq!(file.leader, preset.leader);
    assert!(!file.arm.clamping);
}

#[test]
fn seven_config_targets_hardware() {
    let config = ArmConfig::load_validated(&shipped("seven.toml")).unwrap();
    assert_eq!(config.bus.driver, "dynamixel");
    assert_eq!(config.bus.profile_velocity, Some(200));
    assert_eq!(config.transport.kind, TransportKind::Serial);
}

#[test]
fn startup_reaches_default_pose() {
    let mut r = runner(Preset::Seven);
    let report = r.startup();
    assert!(report.is_clean());
    assert_eq!(r.state().mode(), ControlMode::Idle);

    for (joint, position) in &r.mechanism().default_pose.clone() {
        assert_eq!(r.bus().goal(*joint), Some(*position));
        assert_eq!(r.bus().torque_enabled(*joint), Some(true));
        assert_eq!(r.state().measured(*joint), Some(*position));
    }
    assert!(r.transport().sent().is_empty());
}

#[test]
fn startup_applies_profile_velocity_first() {
    let mut config = ArmConfig::preset(Preset::Four);
    config.bus.profile_velocity = Some(150);
    let mut r = runner_for(&config);
    r.startup();

    let calls = r.bus().calls();
    assert!(
        calls[..4]
            .iter()
            .all(|c| matches!(c, BusEffect::SetProfileVelocity { velocity: 150, .. }))
    );
    assert_eq!(r.bus().profile_velocity(JointId::new(3)), Some(150));
}

#[test]
fn startup_releases_leader_group() {
    let mut r = runner(Preset::DualSeven);
    r.startup();
    for n in 11..=17 {
        let leader = JointId::new(n);
        assert_eq!(r.bus().torque_enabled(leader), Some(false));
        assert!(r.bus_mut().move_by_hand(leader, 100));
    }
    for n in 1..=7 {
        assert!(!r.bus_mut().move_by_hand(JointId::new(n), 100));
    }
}

#[test]
fn file_config_drives_runner() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[arm]
name = "two-joint test rig"

[control]
cycle_time_ms = 5

[[joints]]
id = 1
min = 100
max = 900
default = 500

[[joints]]
id = 2
min = 0
max = 1023
default = 10
"#
    )
    .unwrap();

    let config = load_config(Some(file.path()), None, &ConfigOverrides::default()).unwrap();
    let mut r = runner_for(&config);
    assert_eq!(r.cycle_time().as_millis(), 5);
    r.transport_mut().push_bytes(b"0,5000,-5*");
    let report = r.step();
    assert_eq!(report.status.as_deref(), Some("900,0"));
}

#[test]
fn invalid_config_is_rejected_before_loop() {
    let mut config = ArmConfig::preset(Preset::DualSeven);
    config.leader.pop();
    let bus = SimulatedBus::from_config(&config);
    let result = CycleRunner::new(&config, bus, ScriptedTransport::new(64));
    assert!(matches!(
        result,
        Err(CycleError::Config(ConfigError::ValidationError(_)))
    ));
}

#[test]
fn registry_builds_simulated_bus_for_runner() {
    let config = ArmConfig::preset(Preset::Six);
    let bus = DriverRegistry::with_builtin_drivers().create_bus(&config).unwrap();
    let mut r = CycleRunner::new(&config, bus, ScriptedTransport::new(64)).unwrap();
    assert!(r.startup().is_clean());
    assert_eq!(r.bus().name(), "simulation");
    r.shutdown().unwrap();
}
