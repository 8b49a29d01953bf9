//! Three-phase switch positions.

use std::fmt;
use std::ops::Index;

use nalgebra::Vector3;

use crate::levels::ConverterLevels;

/// Switch position of the three phase legs (a, b, c) in normalized levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SwitchPosition(pub [i8; 3]);

impl SwitchPosition {
    /// All phases at level zero.
    pub const ZERO: Self = Self([0, 0, 0]);

    /// Create a switch position from per-phase levels.
    pub const fn new(a: i8, b: i8, c: i8) -> Self {
        Self([a, b, c])
    }

    /// Per-phase levels.
    pub fn phases(&self) -> [i8; 3] {
        self.0
    }

    /// Whether every phase level is valid for `levels`.
    pub fn is_valid_for(&self, levels: ConverterLevels) -> bool {
        self.0.iter().all(|&level| levels.contains(level))
    }

    /// Whether this position may seed a solve for `levels`.
    ///
    /// Any valid position qualifies, and so does [`ZERO`](Self::ZERO), the startup
    /// position before the first switching decision.
    pub fn is_valid_seed_for(&self, levels: ConverterLevels) -> bool {
        *self == Self::ZERO || self.is_valid_for(levels)
    }

    /// Per-phase difference `self - previous` as floating point.
    pub fn delta(&self, previous: &SwitchPosition) -> [f64; 3] {
        let phase = |p: usize| f64::from(i16::from(self.0[p]) - i16::from(previous.0[p]));
        [phase(0), phase(1), phase(2)]
    }

    /// Position as a floating-point column vector.
    pub fn to_vector(&self) -> Vector3<f64> {
        Vector3::new(
            f64::from(self.0[0]),
            f64::from(self.0[1]),
            f64::from(self.0[2]),
        )
    }
}

impl From<[i8; 3]> for SwitchPosition {
    fn from(phases: [i8; 3]) -> Self {
        Self(phases)
    }
}

impl Index<usize> for SwitchPosition {
    type Output = i8;

    fn index(&self, phase: usize) -> &i8 {
        &self.0[phase]
    }
}

impl fmt::Display for SwitchPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.0[0], self.0[1], self.0[2])
    }
}
