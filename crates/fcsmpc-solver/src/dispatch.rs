//! Solver selection.
//!
//! Provides a unified configuration for selecting:
//! - Search algorithm (enumeration, branch-and-bound, sphere decoding)
//! - Node budget for the branch-and-bound search

use std::fmt;

use fcsmpc_core::error::{Error, Result};

use crate::bnb::BranchAndBoundSolver;
use crate::cost::MpcWeights;
use crate::enumeration::EnumerationSolver;
use crate::problem::MpcProblem;
use crate::result::Solution;
use crate::sphere::SphereDecoderSolver;

/// Common interface of the switching-sequence solvers.
pub trait MpcSolver: fmt::Debug {
    /// Algorithm implemented by this solver.
    fn kind(&self) -> SolverKind;

    /// Find the minimum-cost switching sequence for `problem`.
    fn solve(&self, problem: &MpcProblem<'_>) -> Result<Solution>;
}

impl MpcSolver for EnumerationSolver {
    fn kind(&self) -> SolverKind {
        SolverKind::Enumeration
    }

    fn solve(&self, problem: &MpcProblem<'_>) -> Result<Solution> {
        EnumerationSolver::solve(self, problem)
    }
}

impl MpcSolver for BranchAndBoundSolver {
    fn kind(&self) -> SolverKind {
        SolverKind::BranchAndBound
    }

    fn solve(&self, problem: &MpcProblem<'_>) -> Result<Solution> {
        BranchAndBoundSolver::solve(self, problem)
    }
}

impl MpcSolver for SphereDecoderSolver {
    fn kind(&self) -> SolverKind {
        SolverKind::SphereDecoder
    }

    fn solve(&self, problem: &MpcProblem<'_>) -> Result<Solution> {
        SphereDecoderSolver::solve(self, problem)
    }
}

/// Search algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SolverKind {
    /// Visit every switching sequence.
    Enumeration,
    /// Depth-first search pruned by the incumbent cost.
    #[default]
    BranchAndBound,
    /// Closest-point lattice search (squared-euclidean effort only).
    SphereDecoder,
}

impl SolverKind {
    /// All solver kinds, in comparison order.
    pub const ALL: [SolverKind; 3] = [
        SolverKind::Enumeration,
        SolverKind::BranchAndBound,
        SolverKind::SphereDecoder,
    ];

    /// Parse from a string.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "enum" | "enumeration" | "exhaustive" => Some(Self::Enumeration),
            "bnb" | "branch_and_bound" | "branch-and-bound" => Some(Self::BranchAndBound),
            "sphere" | "sphere_decoder" | "sphere-decoder" => Some(Self::SphereDecoder),
            _ => None,
        }
    }

    /// Short name, as accepted by [`from_name`](Self::from_name).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Enumeration => "enum",
            Self::BranchAndBound => "bnb",
            Self::SphereDecoder => "sphere",
        }
    }

    /// Build a solver of this kind with default settings.
    pub fn build(self, weights: MpcWeights) -> Result<Box<dyn MpcSolver>> {
        SolverConfig::new(self).build(weights)
    }
}

impl fmt::Display for SolverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Enumeration => "Enumeration",
            Self::BranchAndBound => "Branch-and-bound",
            Self::SphereDecoder => "Sphere decoder",
        };
        f.write_str(name)
    }
}

/// Solver configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolverConfig {
    /// Search algorithm.
    pub kind: SolverKind,
    /// Maximum nodes expanded per solve (branch-and-bound only).
    pub node_budget: Option<usize>,
}

impl SolverConfig {
    pub fn new(kind: SolverKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    /// Exhaustive enumeration.
    pub fn enumeration() -> Self {
        Self::new(SolverKind::Enumeration)
    }

    /// Branch-and-bound without a node budget.
    pub fn branch_and_bound() -> Self {
        Self::new(SolverKind::BranchAndBound)
    }

    /// Sphere decoding.
    pub fn sphere_decoder() -> Self {
        Self::new(SolverKind::SphereDecoder)
    }

    /// Set the node budget.
    pub fn with_node_budget(mut self, budget: usize) -> Self {
        self.node_budget = Some(budget);
        self
    }

    /// Construct the configured solver.
    pub fn build(&self, weights: MpcWeights) -> Result<Box<dyn MpcSolver>> {
        if self.node_budget.is_some() && self.kind != SolverKind::BranchAndBound {
            return Err(Error::InvalidConfig(format!(
                "node budget is only supported by branch-and-bound, not {}",
                self.kind
            )));
        }

        let solver: Box<dyn MpcSolver> = match self.kind {
            SolverKind::Enumeration => Box::new(EnumerationSolver::new(weights)?),
            SolverKind::BranchAndBound => {
                let solver = BranchAndBoundSolver::new(weights)?;
                match self.node_budget {
                    Some(budget) => Box::new(solver.with_node_budget(budget)),
                    None => Box::new(solver),
                }
            }
            SolverKind::SphereDecoder => Box::new(SphereDecoderSolver::new(weights)?),
        };
        log::debug!("solver dispatch: {}", self.describe());
        Ok(solver)
    }

    /// Get a human-readable description of the configured solver.
    pub fn describe(&self) -> String {
        match self.node_budget {
            Some(budget) => format!("{} (node budget {})", self.kind, budget),
            None => self.kind.to_string(),
        }
    }
}
