//! Depth-first branch-and-bound search.

use nalgebra::DVector;

use fcsmpc_core::error::{Error, Result};
use fcsmpc_core::{ConstraintChecker, SwitchPosition, SwitchSpace};

use crate::cost::{CostEvaluator, MpcWeights};
use crate::horizon::HorizonTrajectory;
use crate::prediction::PredictionModel;
use crate::problem::MpcProblem;
use crate::result::{SearchStats, Solution};

/// Branch-and-bound solver.
///
/// Explores the switching-sequence tree depth first in the same lexicographic order
/// as [`EnumerationSolver`](crate::EnumerationSolver), keeping the best complete
/// sequence found so far (the incumbent). Because every stage cost is
/// non-negative, a partial sequence whose accumulated cost already reaches the
/// incumbent cost can be discarded together with all its extensions. The result
/// is the same optimum as exhaustive enumeration.
///
/// An optional node budget bounds the worst-case work: once exhausted, the search
/// stops and returns the incumbent, or the fallback sequence (usually holding the
/// previous position) if no complete sequence was reached yet.
#[derive(Debug, Clone)]
pub struct BranchAndBoundSolver {
    cost: CostEvaluator,
    node_budget: Option<usize>,
}

impl BranchAndBoundSolver {
    pub fn new(weights: MpcWeights) -> Result<Self> {
        Ok(Self {
            cost: CostEvaluator::new(weights)?,
            node_budget: None,
        })
    }

    /// Limit the number of expanded nodes per solve.
    pub fn with_node_budget(mut self, budget: usize) -> Self {
        self.node_budget = Some(budget);
        self
    }

    pub fn node_budget(&self) -> Option<usize> {
        self.node_budget
    }

    pub fn cost_evaluator(&self) -> &CostEvaluator {
        &self.cost
    }

    pub fn solve(&self, problem: &MpcProblem<'_>) -> Result<Solution> {
        self.cost.check_output_dim(problem.model().output_dim())?;

        let horizon = problem.horizon();
        let space = SwitchSpace::new(problem.levels());
        let mut search = Search {
            combos: space.combinations(),
            checker: problem.constraint_checker(),
            prediction: problem.prediction(),
            cost: &self.cost,
            trajectory: problem.trajectory(),
            horizon,
            y: DVector::zeros(problem.model().output_dim()),
            path: vec![0; horizon],
            stats: SearchStats::default(),
            budget: self.node_budget,
        };

        let mut states = vec![problem.state().clone(); horizon + 1];
        let mut incumbent = Incumbent {
            cost: f64::INFINITY,
            path: None,
        };
        search.branch(0, &mut states, &problem.previous(), 0.0, &mut incumbent)?;
        let stats = search.stats;

        let solution = match incumbent.path {
            Some(path) => {
                if stats.budget_exhausted {
                    log::warn!(
                        "branch-and-bound: node budget exhausted after {} nodes, returning incumbent (J = {:.6e})",
                        stats.nodes_visited,
                        incumbent.cost
                    );
                }
                let sequence = path.iter().map(|&i| space.combinations()[i]).collect();
                Solution::from_sequence(sequence, incumbent.cost, stats)
            }
            None if stats.budget_exhausted => {
                let fallback = problem.fallback_sequence();
                log::warn!(
                    "branch-and-bound: node budget {:?} exhausted before any complete sequence, applying {}",
                    self.node_budget,
                    fallback[0]
                );
                let cost = problem.evaluate(&self.cost, &fallback)?;
                Solution::from_sequence(fallback, cost, stats)
            }
            None => {
                debug_assert!(false, "the fallback sequence is always feasible");
                return Err(Error::Infeasible);
            }
        };

        log::debug!(
            "branch-and-bound: {} nodes, {} pruned, {} rejected, {} incumbent updates, u = {}, J = {:.6e}",
            stats.nodes_visited,
            stats.pruned,
            stats.constraint_rejections,
            stats.sequences_evaluated,
            solution.switch_position,
            solution.cost
        );

        Ok(solution)
    }
}

/// Best complete sequence found so far.
struct Incumbent {
    cost: f64,
    path: Option<Vec<usize>>,
}

/// Search context shared by every level of the recursion.
struct Search<'s, 'p> {
    combos: &'s [SwitchPosition],
    checker: ConstraintChecker,
    prediction: PredictionModel<'p>,
    cost: &'s CostEvaluator,
    trajectory: &'p HorizonTrajectory,
    horizon: usize,
    y: DVector<f64>,
    path: Vec<usize>,
    stats: SearchStats,
    budget: Option<usize>,
}

impl Search<'_, '_> {
    /// Expand all children of the node at `depth`.
    ///
    /// `states[0]` holds the state before step `depth`; `states[1..]` is scratch
    /// space for the deeper levels.
    fn branch(
        &mut self,
        depth: usize,
        states: &mut [DVector<f64>],
        u_prev: &SwitchPosition,
        cost_so_far: f64,
        incumbent: &mut Incumbent,
    ) -> Result<()> {
        let combos = self.combos;
        let (current, rest) = states.split_at_mut(1);
        let x = &current[0];

        for (index, u) in combos.iter().enumerate() {
            if self.checker.violates(u, u_prev) {
                self.stats.constraint_rejections += 1;
                continue;
            }
            if self
                .budget
                .is_some_and(|budget| self.stats.nodes_visited >= budget)
            {
                self.stats.budget_exhausted = true;
                return Ok(());
            }

            self.prediction.predict_into(x, u, depth, &mut rest[0]);
            self.prediction.output_into(&rest[0], &mut self.y);
            let stage = self.cost.stage(
                depth,
                &self.y,
                self.trajectory.reference(depth),
                u,
                u_prev,
            )?;
            self.stats.nodes_visited += 1;

            let cost = cost_so_far + stage;
            if cost >= incumbent.cost {
                self.stats.pruned += 1;
                continue;
            }

            self.path[depth] = index;
            if depth + 1 == self.horizon {
                log::trace!(
                    "branch-and-bound: incumbent {:.6e} -> {:.6e}",
                    incumbent.cost,
                    cost
                );
                self.stats.sequences_evaluated += 1;
                incumbent.cost = cost;
                incumbent.path = Some(self.path.clone());
            } else {
                self.branch(depth + 1, rest, u, cost, incumbent)?;
                if self.stats.budget_exhausted {
                    return Ok(());
                }
            }
        }

        Ok(())
    }
}
