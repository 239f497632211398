//! Joint identifiers, position domains, limits and groups.
//!
//! This module is the Joint Limit Table: pure data describing which joints
//! exist, which range each one may be commanded into, and how joints are
//! grouped (primary / leader). It has no behavior beyond lookup and
//! saturation.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::consts::{POSITION_MAX_NARROW, POSITION_MAX_WIDE};

/// Absolute angular position in bus-native units.
pub type Position = u16;

// ─── Joint Identifier ───────────────────────────────────────────────

/// Bus address of one physical actuator.
///
/// Assigned once in configuration and never changed at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JointId(u8);

impl JointId {
    /// Wrap a raw bus address.
    #[inline]
    pub const fn new(raw: u8) -> Self {
        Self(raw)
    }

    /// Raw bus address.
    #[inline]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for JointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ─── Position Domain ────────────────────────────────────────────────

/// Width of the bus position register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionDomain {
    /// 10-bit register, 0..=1023.
    #[default]
    Narrow,
    /// 12-bit register, 0..=4095.
    Wide,
}

impl PositionDomain {
    /// Largest representable position.
    #[inline]
    pub const fn max(self) -> Position {
        match self {
            Self::Narrow => POSITION_MAX_NARROW,
            Self::Wide => POSITION_MAX_WIDE,
        }
    }

    /// True if `value` is representable in this domain.
    #[inline]
    pub fn contains(self, value: i64) -> bool {
        (0..=i64::from(self.max())).contains(&value)
    }

    /// Saturate an arbitrary integer into the domain.
    #[inline]
    pub fn saturate(self, value: i64) -> Position {
        value.clamp(0, i64::from(self.max())) as Position
    }
}

// ─── Joint Limit ────────────────────────────────────────────────────

/// Inclusive safe range for one joint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JointLimit {
    pub min: Position,
    pub max: Position,
}

impl JointLimit {
    pub const fn new(min: Position, max: Position) -> Self {
        Self { min, max }
    }

    /// Full range of a position domain.
    pub const fn full(domain: PositionDomain) -> Self {
        Self {
            min: 0,
            max: domain.max(),
        }
    }

    /// `min <= max`.
    #[inline]
    pub const fn is_ordered(&self) -> bool {
        self.min <= self.max
    }

    /// True if `value` lies in the closed interval.
    #[inline]
    pub fn contains(&self, value: i64) -> bool {
        value >= i64::from(self.min) && value <= i64::from(self.max)
    }

    /// Saturating clamp into `[min, max]`.
    ///
    /// Values already in range are returned unchanged.
    #[inline]
    pub fn clamp(&self, value: i64) -> Position {
        if value < i64::from(self.min) {
            self.min
        } else if value > i64::from(self.max) {
            self.max
        } else {
            value as Position
        }
    }
}

// ─── Joint Limit Table ──────────────────────────────────────────────

/// Immutable mapping from joint to its safe range.
///
/// Built once from configuration. Lookup is linear; tables hold at most
/// a few dozen entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JointLimitTable {
    entries: Vec<(JointId, JointLimit)>,
}

impl JointLimitTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(joint, limit)` pairs. A later duplicate replaces an
    /// earlier entry.
    pub fn from_entries(entries: impl IntoIterator<Item = (JointId, JointLimit)>) -> Self {
        let mut table = Self::new();
        for (joint, limit) in entries {
            table.insert(joint, limit);
        }
        table
    }

    pub fn insert(&mut self, joint: JointId, limit: JointLimit) {
        match self.entries.iter_mut().find(|(id, _)| *id == joint) {
            Some(entry) => entry.1 = limit,
            None => self.entries.push((joint, limit)),
        }
    }

    /// Limit of `joint`, or `None` if the table has no entry for it.
    #[inline]
    pub fn limit_of(&self, joint: JointId) -> Option<JointLimit> {
        self.entries
            .iter()
            .find(|(id, _)| *id == joint)
            .map(|(_, limit)| *limit)
    }

    /// First joint in `joints` that has no entry, if any.
    pub fn first_missing<'a>(&self, joints: impl IntoIterator<Item = &'a JointId>) -> Option<JointId> {
        joints
            .into_iter()
            .copied()
            .find(|joint| self.limit_of(*joint).is_none())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(JointId, JointLimit)> {
        self.entries.iter()
    }
}

// ─── Joint Group ────────────────────────────────────────────────────

/// Ordered set of joints addressed together.
///
/// Index order is significant: it is the order of values on the wire and
/// the pairing order between a leader and a primary group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JointGroup {
    ids: Vec<JointId>,
}

impl JointGroup {
    pub fn new(ids: impl IntoIterator<Item = JointId>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }

    #[inline]
    pub fn ids(&self) -> &[JointId] {
        &self.ids
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, joint: JointId) -> bool {
        self.ids.contains(&joint)
    }

    /// Index of `joint` within the group.
    pub fn index_of(&self, joint: JointId) -> Option<usize> {
        self.ids.iter().position(|id| *id == joint)
    }

    pub fn iter(&self) -> impl Iterator<Item = JointId> + '_ {
        self.ids.iter().copied()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
