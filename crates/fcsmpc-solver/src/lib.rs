//! Switching-sequence solvers for finite-control-set model predictive control.
//!
//! Given a discrete plant model, the current state, a reference trajectory and the
//! previously applied switch position, a solver searches the converter's switch
//! positions over the prediction horizon and returns the first position of the
//! minimum-cost sequence.
//!
//! # Solvers
//!
//! - [`EnumerationSolver`] - exhaustive search, the ground-truth reference
//! - [`BranchAndBoundSolver`] - depth-first search pruning on the incumbent cost
//! - [`SphereDecoderSolver`] - lattice reformulation with radius pruning
//!
//! All three return identical optima (up to floating-point ties) and break ties
//! toward the first sequence in the lexicographic order of
//! [`SwitchSpace`](fcsmpc_core::SwitchSpace).
//!
//! # Module Structure
//!
//! - [`horizon`] - Reference and disturbance trajectories over the horizon
//! - [`prediction`] - One-step state propagation
//! - [`cost`] - Stage cost weights and evaluation
//! - [`problem`] - Validated per-step problem data
//! - [`result`] - Solution and search statistics
//! - [`dispatch`] - Solver selection

pub mod bnb;
pub mod cost;
pub mod dispatch;
pub mod enumeration;
pub mod horizon;
pub mod prediction;
pub mod problem;
pub mod result;
pub mod sphere;

pub use bnb::BranchAndBoundSolver;
pub use cost::{CostEvaluator, EffortNorm, MpcWeights};
pub use dispatch::{MpcSolver, SolverConfig, SolverKind};
pub use enumeration::EnumerationSolver;
pub use horizon::HorizonTrajectory;
pub use prediction::PredictionModel;
pub use problem::MpcProblem;
pub use result::{SearchStats, Solution};
pub use sphere::SphereDecoderSolver;

pub use fcsmpc_core::{Error, Result};
