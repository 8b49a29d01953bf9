//! Solver results.

use fcsmpc_core::SwitchPosition;

/// Counters describing how much work a solve performed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Search-tree nodes expanded, i.e. state predictions plus stage-cost evaluations.
    pub nodes_visited: usize,
    /// Complete sequences that reached the last prediction step.
    pub sequences_evaluated: usize,
    /// Candidate nodes rejected by the switching constraint.
    pub constraint_rejections: usize,
    /// Candidate nodes discarded because their partial cost reached the bound.
    pub pruned: usize,
    /// Whether a node budget stopped the search early.
    pub budget_exhausted: bool,
}

/// Optimal switching sequence found by a solver.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Switch position to apply at the current step.
    pub switch_position: SwitchPosition,
    /// The full minimum-cost switching sequence over the horizon.
    pub sequence: Vec<SwitchPosition>,
    /// Total cost of `sequence`.
    pub cost: f64,
    /// Search statistics.
    pub stats: SearchStats,
}

impl Solution {
    pub(crate) fn from_sequence(
        sequence: Vec<SwitchPosition>,
        cost: f64,
        stats: SearchStats,
    ) -> Self {
        Self {
            switch_position: sequence[0],
            sequence,
            cost,
            stats,
        }
    }

    /// Prediction horizon of the solution.
    pub fn horizon(&self) -> usize {
        self.sequence.len()
    }
}
