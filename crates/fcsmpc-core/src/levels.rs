//! Converter level counts.

use std::fmt;

use crate::error::{Error, Result};

/// Number of voltage levels a converter phase leg can produce.
///
/// Levels are normalized to per-unit switch positions: a two-level leg switches
/// between `-1` and `1`, a three-level (neutral-point-clamped) leg additionally
/// reaches the midpoint `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConverterLevels {
    /// Two-level converter, phase levels `{-1, 1}`.
    Two,
    /// Three-level converter, phase levels `{-1, 0, 1}`.
    Three,
}

const TWO_LEVEL: [i8; 2] = [-1, 1];
const THREE_LEVEL: [i8; 3] = [-1, 0, 1];

impl ConverterLevels {
    /// Create from a level count, failing for anything other than 2 or 3.
    pub fn new(count: u8) -> Result<Self> {
        match count {
            2 => Ok(Self::Two),
            3 => Ok(Self::Three),
            other => Err(Error::InvalidLevelCount(other)),
        }
    }

    /// Number of levels per phase.
    pub fn count(self) -> u8 {
        match self {
            Self::Two => 2,
            Self::Three => 3,
        }
    }

    /// Per-phase levels in ascending order.
    pub fn phase_levels(self) -> &'static [i8] {
        match self {
            Self::Two => &TWO_LEVEL,
            Self::Three => &THREE_LEVEL,
        }
    }

    /// Whether `level` is a valid single-phase switch position.
    pub fn contains(self, level: i8) -> bool {
        self.phase_levels().contains(&level)
    }

    /// Whether the converter has an intermediate level that must not be skipped.
    pub fn has_intermediate_level(self) -> bool {
        matches!(self, Self::Three)
    }

    /// Single-phase levels reachable in one step from `previous`, ascending.
    ///
    /// A three-level leg may not jump between `-1` and `1` directly.
    pub fn reachable_from(self, previous: i8) -> &'static [i8] {
        match (self, previous) {
            (Self::Two, _) => &TWO_LEVEL,
            (Self::Three, -1) => &THREE_LEVEL[..2],
            (Self::Three, 1) => &THREE_LEVEL[1..],
            (Self::Three, _) => &THREE_LEVEL,
        }
    }
}

impl TryFrom<u8> for ConverterLevels {
    type Error = Error;

    fn try_from(count: u8) -> Result<Self> {
        Self::new(count)
    }
}

impl fmt::Display for ConverterLevels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-level", self.count())
    }
}
