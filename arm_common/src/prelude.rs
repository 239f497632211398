//! Prelude module for common re-exports.
//!
//! This module provides convenient re-exports of commonly used types
//! so that consumers can do `use arm_common::prelude::*;` and get
//! the most important types without listing individual paths.
//!
//! # Usage
//!
//! ```rust
//! use arm_common::prelude::*;
//! ```

use std::time::Duration;

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ArmConfig, BusConfig, ConfigError, ConfigLoader, JointConfig, Preset, SharedConfig,
    TransportConfig, TransportKind,
};

// ─── System Constants ───────────────────────────────────────────────
pub use crate::consts::{FRAME_TERMINATOR, MAX_JOINTS};

// ─── Joint Model ────────────────────────────────────────────────────
pub use crate::joint::{JointGroup, JointId, JointLimit, JointLimitTable, Position, PositionDomain};

// ─── Protocol ───────────────────────────────────────────────────────
pub use crate::protocol::command::{Command, ModeRequest, PositionTargets, TorqueRequest};
pub use crate::protocol::decode::{CommandDecoder, DecodeError};
pub use crate::protocol::framing::{FrameAssembler, FramingError};
pub use crate::protocol::status::StatusLine;

// ─── Actuator Bus ───────────────────────────────────────────────────
pub use crate::bus::{ActuatorBus, BusEffect, BusError, BusFactory};

/// Default control loop period as Duration.
pub const DEFAULT_CYCLE_TIME: Duration =
    Duration::from_millis(crate::consts::DEFAULT_CYCLE_TIME_MS as u64);
