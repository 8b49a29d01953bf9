//! Switching constraints.

use crate::levels::ConverterLevels;
use crate::switch::SwitchPosition;

/// Checks the three-level no-direct-jump rule.
///
/// A three-level phase leg must pass through the neutral point when moving between
/// its extreme levels, so a transition `-1 -> 1` (or `1 -> -1`) on any phase in a
/// single step is forbidden. Two-level converters have no such restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstraintChecker {
    levels: ConverterLevels,
}

impl ConstraintChecker {
    pub fn new(levels: ConverterLevels) -> Self {
        Self { levels }
    }

    pub fn levels(&self) -> ConverterLevels {
        self.levels
    }

    /// Whether moving from `previous` to `candidate` violates the rule on any phase.
    #[inline]
    pub fn violates(&self, candidate: &SwitchPosition, previous: &SwitchPosition) -> bool {
        switching_constraint_violated(self.levels, candidate, previous)
    }

    /// Whether every transition of `sequence`, starting from `seed`, is allowed.
    pub fn sequence_is_valid(&self, seed: &SwitchPosition, sequence: &[SwitchPosition]) -> bool {
        let mut previous = seed;
        for candidate in sequence {
            if self.violates(candidate, previous) {
                return false;
            }
            previous = candidate;
        }
        true
    }
}

/// Free-function form of [`ConstraintChecker::violates`].
#[inline]
pub fn switching_constraint_violated(
    levels: ConverterLevels,
    candidate: &SwitchPosition,
    previous: &SwitchPosition,
) -> bool {
    if !levels.has_intermediate_level() {
        return false;
    }
    candidate
        .0
        .iter()
        .zip(previous.0.iter())
        .any(|(&u, &u_prev)| (i16::from(u) - i16::from(u_prev)).abs() >= 2)
}
