//! Exhaustive enumeration of switching sequences.

use nalgebra::DVector;

use fcsmpc_core::SwitchSpace;
use fcsmpc_core::error::{Error, Result};

use crate::cost::{CostEvaluator, MpcWeights};
use crate::problem::MpcProblem;
use crate::result::{SearchStats, Solution};

/// Exhaustive search over all `nl^(3 Np)` switching sequences.
///
/// Sequences are visited in lexicographic order (step 0 most significant). States
/// and accumulated costs of the common prefix are cached, so moving to the next
/// sequence only re-propagates the steps that changed. A sequence with any
/// forbidden transition gets infinite cost. The first sequence reaching the
/// minimum wins ties.
///
/// This is the reference solver: guaranteed optimal, but only tractable for small
/// horizons.
#[derive(Debug, Clone)]
pub struct EnumerationSolver {
    cost: CostEvaluator,
}

impl EnumerationSolver {
    pub fn new(weights: MpcWeights) -> Result<Self> {
        Ok(Self {
            cost: CostEvaluator::new(weights)?,
        })
    }

    pub fn cost_evaluator(&self) -> &CostEvaluator {
        &self.cost
    }

    /// Solve the problem by visiting every switching sequence.
    pub fn solve(&self, problem: &MpcProblem<'_>) -> Result<Solution> {
        self.cost.check_output_dim(problem.model().output_dim())?;

        let np = problem.horizon();
        let space = SwitchSpace::new(problem.levels());
        let combos = space.combinations();
        let checker = problem.constraint_checker();
        let prediction = problem.prediction();
        let trajectory = problem.trajectory();
        let seed = problem.previous();

        // states[l] is the state before step l, costs[l] the cost accumulated before it
        let mut states = vec![problem.state().clone(); np + 1];
        let mut costs = vec![0.0_f64; np + 1];
        let mut y = DVector::zeros(problem.model().output_dim());
        let mut indices = vec![0_usize; np];
        let mut best: Option<(f64, Vec<usize>)> = None;
        let mut stats = SearchStats::default();
        let mut dirty = 0;

        loop {
            for depth in dirty..np {
                let u = &combos[indices[depth]];
                let u_prev = if depth == 0 {
                    &seed
                } else {
                    &combos[indices[depth - 1]]
                };

                if costs[depth].is_infinite() {
                    costs[depth + 1] = f64::INFINITY;
                    continue;
                }
                if checker.violates(u, u_prev) {
                    stats.constraint_rejections += 1;
                    costs[depth + 1] = f64::INFINITY;
                    continue;
                }

                let (head, tail) = states.split_at_mut(depth + 1);
                prediction.predict_into(&head[depth], u, depth, &mut tail[0]);
                prediction.output_into(&tail[0], &mut y);
                let stage = self
                    .cost
                    .stage(depth, &y, trajectory.reference(depth), u, u_prev)?;
                costs[depth + 1] = costs[depth] + stage;
                stats.nodes_visited += 1;
            }

            stats.sequences_evaluated += 1;
            let total = costs[np];
            if total.is_finite() && best.as_ref().is_none_or(|(best_cost, _)| total < *best_cost) {
                best = Some((total, indices.clone()));
            }

            match advance(&mut indices, combos.len()) {
                Some(depth) => dirty = depth,
                None => break,
            }
        }

        let Some((cost, best_indices)) = best else {
            debug_assert!(false, "the fallback sequence is always feasible");
            return Err(Error::Infeasible);
        };

        let sequence = best_indices.iter().map(|&i| combos[i]).collect();
        let solution = Solution::from_sequence(sequence, cost, stats);

        log::debug!(
            "enumeration: {} sequences, {} nodes, {} rejected, u = {}, J = {:.6e}",
            stats.sequences_evaluated,
            stats.nodes_visited,
            stats.constraint_rejections,
            solution.switch_position,
            cost
        );

        Ok(solution)
    }
}

/// Advance the mixed-radix counter `indices` (last digit fastest).
///
/// Returns the most significant digit that changed, or `None` after the last value.
fn advance(indices: &mut [usize], radix: usize) -> Option<usize> {
    for depth in (0..indices.len()).rev() {
        indices[depth] += 1;
        if indices[depth] < radix {
            return Some(depth);
        }
        indices[depth] = 0;
    }
    None
}
