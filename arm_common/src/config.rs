//! Configuration loading, presets and startup validation.
//!
//! A mechanism is described by one TOML file (or a built-in [`Preset`]):
//! the primary joint table, an optional leader table, the actuator bus and
//! the host command channel. Everything that can be wrong with a table is
//! rejected here, before the control loop starts.
//!
//! # Usage
//!
//! ```rust,no_run
//! use arm_common::config::{ArmConfig, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = ArmConfig::load_validated(Path::new("config/seven.toml"))?;
//!     println!("{} joints", config.joints.len());
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

use crate::consts::{
    CYCLE_TIME_MS_MAX, CYCLE_TIME_MS_MIN, DEFAULT_BUS_BAUD_RATE, DEFAULT_CYCLE_TIME_MS,
    DEFAULT_HOST_BAUD_RATE, DEFAULT_MAX_FRAME_LEN, DEFAULT_REPLY_TIMEOUT_MS,
    FRAME_BUFFER_CAPACITY, MAX_JOINTS,
};
use crate::joint::{JointGroup, JointId, JointLimit, JointLimitTable, Position, PositionDomain};

/// Why a mechanism configuration could not be loaded.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// No file at the given path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// A startup invariant does not hold.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Verbosity of the `tracing` subscriber.
///
/// Written lowercase in TOML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Per-byte bus traffic.
    Trace,
    /// Per-command dispatch decisions.
    Debug,
    /// Startup, mode changes, shutdown.
    #[default]
    Info,
    /// Bus and transport failures.
    Warn,
    /// Fatal startup errors only.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common fields shared by every binary in the workspace.
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "arm-bench-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Default verbosity when `RUST_LOG` is unset.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Instance name, shown in the startup log.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_service_name() -> String {
    "arm_control_unit".to_string()
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: default_service_name(),
        }
    }
}

impl SharedConfig {
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load any deserializable section tree from a TOML file.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

// ─── Sections ───────────────────────────────────────────────────────

/// `[arm]`: mechanism-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArmSection {
    /// Human-readable mechanism name.
    #[serde(default = "default_arm_name")]
    pub name: String,

    /// Bus position register width.
    #[serde(default)]
    pub resolution: PositionDomain,

    /// Clamp commanded goals into joint limits. `false` selects the raw
    /// sub-mode used for leader-follower rigs.
    #[serde(default = "default_true")]
    pub clamping: bool,
}

fn default_arm_name() -> String {
    "arm".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ArmSection {
    fn default() -> Self {
        Self {
            name: default_arm_name(),
            resolution: PositionDomain::default(),
            clamping: true,
        }
    }
}

/// `[control]`: control loop pacing and output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlSection {
    /// Loop period [ms].
    #[serde(default = "default_cycle_time_ms")]
    pub cycle_time_ms: u32,

    /// Emit a status line on every iteration.
    #[serde(default = "default_true")]
    pub status_every_cycle: bool,

    /// In `Active` mode, re-send the commanded pose every iteration.
    #[serde(default = "default_true")]
    pub reissue_goals: bool,
}

fn default_cycle_time_ms() -> u32 {
    DEFAULT_CYCLE_TIME_MS
}

impl Default for ControlSection {
    fn default() -> Self {
        Self {
            cycle_time_ms: DEFAULT_CYCLE_TIME_MS,
            status_every_cycle: true,
            reissue_goals: true,
        }
    }
}

/// One `[[joints]]` / `[[leader]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JointConfig {
    /// Bus address.
    pub id: JointId,
    /// Human-readable name (e.g. "Shoulder").
    #[serde(default)]
    pub name: String,
    /// Lower limit (inclusive).
    pub min: Position,
    /// Upper limit (inclusive).
    pub max: Position,
    /// Neutral pose commanded at startup.
    pub default: Position,
}

impl JointConfig {
    pub fn new(id: u8, name: &str, min: Position, max: Position, default: Position) -> Self {
        Self {
            id: JointId::new(id),
            name: name.to_string(),
            min,
            max,
            default,
        }
    }

    #[inline]
    pub fn limit(&self) -> JointLimit {
        JointLimit::new(self.min, self.max)
    }
}

/// `[bus]`: actuator bus adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BusConfig {
    /// Registered driver name (`"simulation"`, `"dynamixel"`).
    #[serde(default = "default_bus_driver")]
    pub driver: String,

    /// Serial device of the bus (hardware drivers only).
    #[serde(default)]
    pub port: Option<String>,

    #[serde(default = "default_bus_baud")]
    pub baud_rate: u32,

    /// Profile velocity applied to every primary joint at startup.
    #[serde(default)]
    pub profile_velocity: Option<u16>,

    /// Time to wait for a status packet [ms].
    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,
}

fn default_bus_driver() -> String {
    "simulation".to_string()
}

fn default_bus_baud() -> u32 {
    DEFAULT_BUS_BAUD_RATE
}

fn default_reply_timeout_ms() -> u64 {
    DEFAULT_REPLY_TIMEOUT_MS
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            driver: default_bus_driver(),
            port: None,
            baud_rate: DEFAULT_BUS_BAUD_RATE,
            profile_velocity: None,
            reply_timeout_ms: DEFAULT_REPLY_TIMEOUT_MS,
        }
    }
}

/// Host command channel kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Records on stdin, status on stdout.
    #[default]
    Stdio,
    /// Records and status on one serial device.
    Serial,
}

/// `[transport]`: host command channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransportConfig {
    #[serde(default)]
    pub kind: TransportKind,

    #[serde(default)]
    pub port: Option<String>,

    #[serde(default = "default_host_baud")]
    pub baud_rate: u32,

    /// Longest accepted record, terminator excluded.
    #[serde(default = "default_max_frame_len")]
    pub max_frame_len: usize,
}

fn default_host_baud() -> u32 {
    DEFAULT_HOST_BAUD_RATE
}

fn default_max_frame_len() -> usize {
    DEFAULT_MAX_FRAME_LEN
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            port: None,
            baud_rate: DEFAULT_HOST_BAUD_RATE,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

// ─── Top-Level Config ───────────────────────────────────────────────

/// Complete mechanism configuration.
///
/// Immutable once the control loop has started.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArmConfig {
    #[serde(default)]
    pub shared: SharedConfig,

    #[serde(default)]
    pub arm: ArmSection,

    #[serde(default)]
    pub control: ControlSection,

    /// Primary (powered, goal-driven) group in wire order.
    pub joints: Vec<JointConfig>,

    /// Leader (passive, mirrored) group in pairing order.
    #[serde(default)]
    pub leader: Vec<JointConfig>,

    #[serde(default)]
    pub bus: BusConfig,

    #[serde(default)]
    pub transport: TransportConfig,
}

impl ArmConfig {
    /// Load from a TOML file and run startup validation.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML string and run startup validation.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Built-in mechanism table.
    pub fn preset(preset: Preset) -> Self {
        let (name, joints, leader, clamping) = match preset {
            Preset::Four => ("four-joint", four_joint_table(), Vec::new(), true),
            Preset::Six => ("six-joint", six_joint_table(), Vec::new(), true),
            Preset::Seven => ("seven-joint", seven_joint_table(), Vec::new(), true),
            Preset::DualSeven => {
                let leader = seven_joint_table()
                    .into_iter()
                    .map(|j| JointConfig {
                        id: JointId::new(j.id.get() + 10),
                        ..j
                    })
                    .collect();
                ("dual-seven", seven_joint_table(), leader, false)
            }
        };
        Self {
            shared: SharedConfig::default(),
            arm: ArmSection {
                name: name.to_string(),
                resolution: PositionDomain::Narrow,
                clamping,
            },
            control: ControlSection::default(),
            joints,
            leader,
            bus: BusConfig::default(),
            transport: TransportConfig::default(),
        }
    }

    /// Check every startup invariant of the joint tables and sections.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        let c = &self.control;
        if c.cycle_time_ms < CYCLE_TIME_MS_MIN || c.cycle_time_ms > CYCLE_TIME_MS_MAX {
            return Err(ConfigError::ValidationError(format!(
                "cycle_time_ms {} out of range [{}, {}]",
                c.cycle_time_ms, CYCLE_TIME_MS_MIN, CYCLE_TIME_MS_MAX
            )));
        }

        let t = &self.transport;
        if t.max_frame_len == 0 || t.max_frame_len > FRAME_BUFFER_CAPACITY {
            return Err(ConfigError::ValidationError(format!(
                "max_frame_len {} out of range [1, {}]",
                t.max_frame_len, FRAME_BUFFER_CAPACITY
            )));
        }
        if t.kind == TransportKind::Serial && t.port.is_none() {
            return Err(ConfigError::ValidationError(
                "serial transport requires a port".to_string(),
            ));
        }

        if self.joints.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one primary joint is required".to_string(),
            ));
        }
        for (group, joints) in [("joints", &self.joints), ("leader", &self.leader)] {
            if joints.len() > MAX_JOINTS {
                return Err(ConfigError::ValidationError(format!(
                    "{group}: {} entries exceed the maximum of {MAX_JOINTS}",
                    joints.len()
                )));
            }
            for joint in joints.iter() {
                self.validate_joint(group, joint)?;
            }
        }

        let mut seen = HashSet::new();
        for joint in self.joints.iter().chain(self.leader.iter()) {
            if !seen.insert(joint.id) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate joint id {}",
                    joint.id
                )));
            }
        }

        if !self.leader.is_empty() && self.leader.len() != self.joints.len() {
            return Err(ConfigError::ValidationError(format!(
                "leader group has {} joints, primary group has {}",
                self.leader.len(),
                self.joints.len()
            )));
        }

        let table = self.limit_table();
        if let Some(missing) = table.first_missing(self.primary_group().ids()) {
            return Err(ConfigError::ValidationError(format!(
                "joint {missing} has no limit entry"
            )));
        }

        Ok(())
    }

    fn validate_joint(&self, group: &str, joint: &JointConfig) -> Result<(), ConfigError> {
        let domain = self.arm.resolution;
        if joint.id.get() == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{group}: joint id 0 is reserved"
            )));
        }
        if joint.min > joint.max {
            return Err(ConfigError::ValidationError(format!(
                "{group}: joint {} min {} > max {}",
                joint.id, joint.min, joint.max
            )));
        }
        if joint.max > domain.max() {
            return Err(ConfigError::ValidationError(format!(
                "{group}: joint {} max {} outside position domain 0..={}",
                joint.id,
                joint.max,
                domain.max()
            )));
        }
        if !joint.limit().contains(i64::from(joint.default)) {
            return Err(ConfigError::ValidationError(format!(
                "{group}: joint {} default {} outside [{}, {}]",
                joint.id, joint.default, joint.min, joint.max
            )));
        }
        Ok(())
    }

    /// Primary group in wire order.
    pub fn primary_group(&self) -> JointGroup {
        JointGroup::new(self.joints.iter().map(|j| j.id))
    }

    /// Leader group, if this is a dual-group mechanism.
    pub fn leader_group(&self) -> Option<JointGroup> {
        if self.leader.is_empty() {
            None
        } else {
            Some(JointGroup::new(self.leader.iter().map(|j| j.id)))
        }
    }

    /// Limit table covering both groups.
    pub fn limit_table(&self) -> JointLimitTable {
        JointLimitTable::from_entries(
            self.joints
                .iter()
                .chain(self.leader.iter())
                .map(|j| (j.id, j.limit())),
        )
    }

    /// Neutral pose of the primary group.
    pub fn default_pose(&self) -> Vec<(JointId, Position)> {
        self.joints.iter().map(|j| (j.id, j.default)).collect()
    }

    #[inline]
    pub fn is_dual_group(&self) -> bool {
        !self.leader.is_empty()
    }
}

// ─── Presets ────────────────────────────────────────────────────────

/// Built-in mechanism tables from calibrated mechanical travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    Four,
    Six,
    Seven,
    /// Seven powered joints (ids 1..=7) mirroring seven passive ones (11..=17).
    DualSeven,
}

impl Preset {
    pub const ALL: [Preset; 4] = [Self::Four, Self::Six, Self::Seven, Self::DualSeven];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Four => "four",
            Self::Six => "six",
            Self::Seven => "seven",
            Self::DualSeven => "dual-seven",
        }
    }
}

impl FromStr for Preset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ConfigError::ValidationError(format!("unknown preset '{s}'")))
    }
}

fn four_joint_table() -> Vec<JointConfig> {
    vec![
        JointConfig::new(1, "Base", 0, 1023, 512),
        JointConfig::new(2, "Shoulder", 380, 1023, 380),
        JointConfig::new(3, "Elbow", 512, 1023, 700),
        JointConfig::new(4, "Hand", 370, 695, 695),
    ]
}

fn six_joint_table() -> Vec<JointConfig> {
    vec![
        JointConfig::new(1, "Base", 0, 1023, 512),
        JointConfig::new(2, "Shoulder", 380, 1023, 380),
        JointConfig::new(3, "Upper_Arm", 512, 1023, 800),
        JointConfig::new(4, "Elbow", 512, 1023, 700),
        JointConfig::new(5, "Wrist", 0, 1023, 512),
        JointConfig::new(6, "Hand", 370, 695, 695),
    ]
}

fn seven_joint_table() -> Vec<JointConfig> {
    vec![
        JointConfig::new(1, "Base", 0, 1023, 512),
        JointConfig::new(2, "Shoulder", 180, 845, 512),
        JointConfig::new(3, "Upper_Arm", 165, 1023, 380),
        JointConfig::new(4, "Elbow", 512, 1023, 800),
        JointConfig::new(5, "Forearm", 512, 1023, 700),
        JointConfig::new(6, "Wrist", 0, 1023, 512),
        JointConfig::new(7, "Hand", 370, 695, 512),
    ]
}
