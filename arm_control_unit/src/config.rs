//! Runtime view of the mechanism configuration.
//!
//! Loads an `ArmConfig` (file or preset), applies command-line overrides,
//! validates it, and flattens it into the lookup structures the cycle
//! needs: joint groups, the limit table and loop pacing.

use std::path::Path;
use std::time::Duration;

use arm_common::config::{ArmConfig, ConfigError, ConfigLoader, Preset, TransportKind};
use arm_common::joint::{JointGroup, JointId, JointLimitTable, Position, PositionDomain};
use tracing::info;

// ─── Loading ────────────────────────────────────────────────────────

/// Values given on the command line that replace file settings.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// `[bus] driver`.
    pub driver: Option<String>,
    /// `[bus] port`.
    pub bus_port: Option<String>,
    /// `[transport] port`; also selects the serial transport.
    pub host_port: Option<String>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut ArmConfig) {
        if let Some(driver) = &self.driver {
            config.bus.driver = driver.clone();
        }
        if let Some(port) = &self.bus_port {
            config.bus.port = Some(port.clone());
        }
        if let Some(port) = &self.host_port {
            config.transport.kind = TransportKind::Serial;
            config.transport.port = Some(port.clone());
        }
    }
}

/// Load from `path` if given, else from `preset`, else the seven-joint
/// preset. Overrides are applied before validation.
pub fn load_config(
    path: Option<&Path>,
    preset: Option<Preset>,
    overrides: &ConfigOverrides,
) -> Result<ArmConfig, ConfigError> {
    let mut config = match (path, preset) {
        (Some(path), _) => ArmConfig::load(path)?,
        (None, Some(preset)) => ArmConfig::preset(preset),
        (None, None) => ArmConfig::preset(Preset::Seven),
    };
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

// ─── Mechanism ──────────────────────────────────────────────────────

/// Validated, immutable mechanism description.
#[derive(Debug, Clone)]
pub struct Mechanism {
    pub name: String,
    /// Powered, goal-driven joints in wire order.
    pub primary: JointGroup,
    /// Passive joints mirrored onto `primary`, index for index.
    pub leader: Option<JointGroup>,
    pub limits: JointLimitTable,
    pub domain: PositionDomain,
    /// `false` selects the raw sub-mode: goals are only saturated into
    /// `domain`.
    pub clamping: bool,
    pub default_pose: Vec<(JointId, Position)>,
    pub profile_velocity: Option<u16>,
}

impl Mechanism {
    pub fn from_config(config: &ArmConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mechanism = Self {
            name: config.arm.name.clone(),
            primary: config.primary_group(),
            leader: config.leader_group(),
            limits: config.limit_table(),
            domain: config.arm.resolution,
            clamping: config.arm.clamping,
            default_pose: config.default_pose(),
            profile_velocity: config.bus.profile_velocity,
        };
        info!(
            name = %mechanism.name,
            joints = mechanism.primary.len(),
            dual_group = mechanism.is_dual_group(),
            clamping = mechanism.clamping,
            "Mechanism loaded"
        );
        Ok(mechanism)
    }

    #[inline]
    pub fn is_dual_group(&self) -> bool {
        self.leader.is_some()
    }

    /// `(leader, primary)` pairs in index order. Empty without a leader.
    pub fn mirror_pairs(&self) -> impl Iterator<Item = (JointId, JointId)> + '_ {
        self.leader
            .iter()
            .flat_map(|leader| leader.iter().zip(self.primary.iter()))
    }
}

// ─── Loop Settings ──────────────────────────────────────────────────

/// Pacing and output policy of the control loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    pub cycle_time: Duration,
    pub status_every_cycle: bool,
    pub reissue_goals: bool,
}

impl LoopSettings {
    pub fn from_config(config: &ArmConfig) -> Self {
        let c = &config.control;
        Self {
            cycle_time: Duration::from_millis(u64::from(c.cycle_time_ms)),
            status_every_cycle: c.status_every_cycle,
            reissue_goals: c.reissue_goals,
        }
    }
}
