//! Arm Common Library
//!
//! Shared joint model, wire protocol and configuration for every crate in
//! the servo arm workspace.
//!
//! # Module Structure
//!
//! - [`consts`] - Position domains, frame terminator, defaults
//! - [`joint`] - Joint identifiers, limits and groups
//! - [`config`] - TOML configuration, presets and startup validation
//! - [`protocol`] - Inbound command decoding and outbound status lines
//! - [`bus`] - Actuator bus trait and bus effects
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use arm_common::prelude::*;
//!
//! let config = ArmConfig::preset(Preset::Seven);
//! let decoder = CommandDecoder::new(config.primary_group().ids());
//! let cmd = decoder.decode("0,1023,180,165,512,512,0,370").unwrap();
//! assert!(matches!(cmd, Command::SetPositions(_)));
//! ```

pub mod bus;
pub mod config;
pub mod consts;
pub mod joint;
pub mod prelude;
pub mod protocol;
