//! Per-step MPC problem data.

use nalgebra::DVector;

use fcsmpc_core::error::{Error, Result};
use fcsmpc_core::{ConstraintChecker, ConverterLevels, DiscreteStateSpace, SwitchPosition};

use crate::cost::CostEvaluator;
use crate::horizon::HorizonTrajectory;
use crate::prediction::PredictionModel;

/// Everything a solver needs for one control step.
///
/// Borrowed from the outer control loop and validated once on construction, so
/// the search kernels can skip shape checks. The plant state is never modified.
#[derive(Debug, Clone, Copy)]
pub struct MpcProblem<'a> {
    model: &'a DiscreteStateSpace,
    levels: ConverterLevels,
    state: &'a DVector<f64>,
    trajectory: &'a HorizonTrajectory,
    previous: SwitchPosition,
}

impl<'a> MpcProblem<'a> {
    pub fn new(
        model: &'a DiscreteStateSpace,
        levels: ConverterLevels,
        state: &'a DVector<f64>,
        trajectory: &'a HorizonTrajectory,
        previous: SwitchPosition,
    ) -> Result<Self> {
        if state.len() != model.state_dim() {
            return Err(Error::DimensionMismatch {
                context: "state vector length",
                expected: model.state_dim(),
                actual: state.len(),
            });
        }
        if trajectory.reference_dim() != model.output_dim() {
            return Err(Error::DimensionMismatch {
                context: "reference dimension",
                expected: model.output_dim(),
                actual: trajectory.reference_dim(),
            });
        }
        if model.has_disturbance() && trajectory.disturbance_dim() != model.disturbance_dim() {
            return Err(Error::DimensionMismatch {
                context: "disturbance dimension",
                expected: model.disturbance_dim(),
                actual: trajectory.disturbance_dim(),
            });
        }
        if !previous.is_valid_seed_for(levels) {
            return Err(Error::InvalidSwitchPosition {
                position: previous,
                levels: levels.count(),
            });
        }

        Ok(Self {
            model,
            levels,
            state,
            trajectory,
            previous,
        })
    }

    pub fn model(&self) -> &'a DiscreteStateSpace {
        self.model
    }

    pub fn levels(&self) -> ConverterLevels {
        self.levels
    }

    pub fn state(&self) -> &'a DVector<f64> {
        self.state
    }

    pub fn trajectory(&self) -> &'a HorizonTrajectory {
        self.trajectory
    }

    /// Previously applied switch position (seed of the horizon).
    pub fn previous(&self) -> SwitchPosition {
        self.previous
    }

    /// Prediction horizon `Np`.
    pub fn horizon(&self) -> usize {
        self.trajectory.horizon()
    }

    pub fn prediction(&self) -> PredictionModel<'a> {
        PredictionModel::new(self.model, self.trajectory)
    }

    pub fn constraint_checker(&self) -> ConstraintChecker {
        ConstraintChecker::new(self.levels)
    }

    /// Sequence that keeps the previous switch position over the whole horizon.
    pub fn hold_sequence(&self) -> Vec<SwitchPosition> {
        vec![self.previous; self.horizon()]
    }

    /// A sequence that is always feasible: the hold sequence, or the lowest
    /// position held over the horizon when the seed is the two-level startup
    /// position.
    pub fn fallback_sequence(&self) -> Vec<SwitchPosition> {
        if self.previous.is_valid_for(self.levels) {
            return self.hold_sequence();
        }
        let lowest = self.levels.phase_levels()[0];
        vec![SwitchPosition::new(lowest, lowest, lowest); self.horizon()]
    }

    /// Total cost of `sequence`, or infinity if it breaks the switching constraint.
    pub fn evaluate(&self, cost: &CostEvaluator, sequence: &[SwitchPosition]) -> Result<f64> {
        if sequence.len() != self.horizon() {
            return Err(Error::DimensionMismatch {
                context: "switching sequence length",
                expected: self.horizon(),
                actual: sequence.len(),
            });
        }
        cost.check_output_dim(self.model.output_dim())?;
        if !self
            .constraint_checker()
            .sequence_is_valid(&self.previous, sequence)
        {
            return Ok(f64::INFINITY);
        }

        let prediction = self.prediction();
        let mut x = self.state.clone();
        let mut next = DVector::zeros(self.model.state_dim());
        let mut y = DVector::zeros(self.model.output_dim());
        let mut u_prev = self.previous;
        let mut total = 0.0;

        for (step, u) in sequence.iter().enumerate() {
            prediction.predict_into(&x, u, step, &mut next);
            prediction.output_into(&next, &mut y);
            total += cost.stage(step, &y, self.trajectory.reference(step), u, &u_prev)?;
            std::mem::swap(&mut x, &mut next);
            u_prev = *u;
        }

        Ok(total)
    }
}
