//! Enumeration of three-phase switch combinations.

use crate::levels::ConverterLevels;
use crate::switch::SwitchPosition;

/// All three-phase switch positions of a converter.
///
/// Combinations are stored in lexicographic order with levels ascending and phase
/// `a` most significant, e.g. `[-1,-1,-1], [-1,-1,1], [-1,1,-1], ...` for a
/// two-level converter. Every solver iterates candidates in this order, which
/// makes tie-breaking between equal-cost sequences deterministic.
#[derive(Debug, Clone)]
pub struct SwitchSpace {
    levels: ConverterLevels,
    combinations: Vec<SwitchPosition>,
}

impl SwitchSpace {
    pub fn new(levels: ConverterLevels) -> Self {
        let phase = levels.phase_levels();
        let mut combinations = Vec::with_capacity(phase.len().pow(3));
        for &a in phase {
            for &b in phase {
                for &c in phase {
                    combinations.push(SwitchPosition::new(a, b, c));
                }
            }
        }
        Self {
            levels,
            combinations,
        }
    }

    pub fn levels(&self) -> ConverterLevels {
        self.levels
    }

    /// Valid single-phase levels.
    pub fn phase_levels(&self) -> &'static [i8] {
        self.levels.phase_levels()
    }

    /// All `nl^3` three-phase combinations.
    pub fn combinations(&self) -> &[SwitchPosition] {
        &self.combinations
    }

    pub fn len(&self) -> usize {
        self.combinations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.combinations.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SwitchPosition> {
        self.combinations.iter()
    }

    /// Position of `position` in the enumeration order, if it belongs to this space.
    pub fn index_of(&self, position: &SwitchPosition) -> Option<usize> {
        self.combinations.iter().position(|p| p == position)
    }

    /// Number of switching sequences over a horizon of `horizon` steps.
    ///
    /// Returns `None` on overflow.
    pub fn sequence_count(&self, horizon: usize) -> Option<usize> {
        let exponent = u32::try_from(horizon).ok()?;
        self.len().checked_pow(exponent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_level_space() {
        let space = SwitchSpace::new(ConverterLevels::Two);
        assert_eq!(space.len(), 8);
        assert_eq!(space.combinations()[0], SwitchPosition::new(-1, -1, -1));
        assert_eq!(space.combinations()[1], SwitchPosition::new(-1, -1, 1));
        assert_eq!(space.combinations()[4], SwitchPosition::new(1, -1, -1));
        assert_eq!(space.combinations()[7], SwitchPosition::new(1, 1, 1));
    }

    #[test]
    fn three_level_space() {
        let space = SwitchSpace::new(ConverterLevels::Three);
        assert_eq!(space.len(), 27);
        assert_eq!(space.phase_levels(), &[-1, 0, 1]);
        assert_eq!(space.index_of(&SwitchPosition::ZERO), Some(13));
        assert!(space.iter().all(|p| p.is_valid_for(ConverterLevels::Three)));
    }

    #[test]
    fn sequence_count() {
        let space = SwitchSpace::new(ConverterLevels::Three);
        assert_eq!(space.sequence_count(1), Some(27));
        assert_eq!(space.sequence_count(2), Some(729));
        assert_eq!(space.sequence_count(64), None);
    }
}
