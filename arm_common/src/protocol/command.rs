//! Typed inbound commands.
//!
//! A `Command` is transient: one per decoded record, consumed by the
//! dispatcher in the same loop iteration.

use crate::joint::JointId;

/// Leading selector of the unlabeled CSV form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CommandKind {
    SetPositions = 0,
    SetTorque = 1,
    SetMode = 2,
    RequestFeedback = 3,
}

impl CommandKind {
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::SetPositions),
            1 => Some(Self::SetTorque),
            2 => Some(Self::SetMode),
            3 => Some(Self::RequestFeedback),
            _ => None,
        }
    }

    /// Parse the raw selector value of a record.
    #[inline]
    pub fn from_raw(value: i64) -> Option<Self> {
        u8::try_from(value).ok().and_then(Self::from_u8)
    }
}

/// Torque change carried by a `SetTorque` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TorqueRequest {
    /// Same flag broadcast to every joint of the primary group.
    All(bool),
    /// One flag per joint.
    PerJoint(Vec<(JointId, bool)>),
}

/// Mode requested by a `SetMode` command.
///
/// On a dual-group mechanism `Passive` selects leader-follower mirroring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeRequest {
    /// Command-driven operation.
    Active,
    /// Stream measured positions (or mirror, on a dual-group mechanism).
    Passive,
}

impl ModeRequest {
    #[inline]
    pub const fn from_flag(enabled: bool) -> Self {
        if enabled { Self::Passive } else { Self::Active }
    }
}

/// Raw, unclamped goal per joint. Clamping is the dispatcher's job.
pub type PositionTargets = Vec<(JointId, i64)>;

/// One decoded inbound record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetPositions(PositionTargets),
    SetTorque(TorqueRequest),
    SetMode(ModeRequest),
    RequestFeedback,
    /// Lexically valid record whose selector matched no known command.
    Unrecognized(String),
}

impl Command {
    /// Short name for logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SetPositions(_) => "SetPositions",
            Self::SetTorque(_) => "SetTorque",
            Self::SetMode(_) => "SetMode",
            Self::RequestFeedback => "RequestFeedback",
            Self::Unrecognized(_) => "Unrecognized",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_raw() {
        assert_eq!(CommandKind::from_raw(0), Some(CommandKind::SetPositions));
        assert_eq!(CommandKind::from_raw(3), Some(CommandKind::RequestFeedback));
        assert_eq!(CommandKind::from_raw(4), None);
        assert_eq!(CommandKind::from_raw(-1), None);
        assert_eq!(CommandKind::from_raw(256), None);
    }

    #[test]
    fn mode_from_flag() {
        assert_eq!(ModeRequest::from_flag(true), ModeRequest::Passive);
        assert_eq!(ModeRequest::from_flag(false), ModeRequest::Active);
    }
}
