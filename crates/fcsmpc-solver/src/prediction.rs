//! One-step state propagation.

use nalgebra::DVector;

use fcsmpc_core::{DiscreteStateSpace, SwitchPosition};

use crate::horizon::HorizonTrajectory;

/// Advances the plant state one discrete step for a candidate switch position.
///
/// Shapes are validated once by [`MpcProblem`](crate::MpcProblem); the kernels
/// here assume consistent dimensions and panic otherwise.
#[derive(Debug, Clone, Copy)]
pub struct PredictionModel<'a> {
    model: &'a DiscreteStateSpace,
    trajectory: &'a HorizonTrajectory,
}

impl<'a> PredictionModel<'a> {
    pub fn new(model: &'a DiscreteStateSpace, trajectory: &'a HorizonTrajectory) -> Self {
        Self { model, trajectory }
    }

    pub fn model(&self) -> &'a DiscreteStateSpace {
        self.model
    }

    /// `A x + B1 u + B2 d[step]` as a new vector.
    pub fn predict(&self, x: &DVector<f64>, u: &SwitchPosition, step: usize) -> DVector<f64> {
        let mut next = DVector::zeros(self.model.state_dim());
        self.predict_into(x, u, step, &mut next);
        next
    }

    /// `A x + B1 u + B2 d[step]` written into `out`.
    pub fn predict_into(
        &self,
        x: &DVector<f64>,
        u: &SwitchPosition,
        step: usize,
        out: &mut DVector<f64>,
    ) {
        out.gemv(1.0, self.model.a(), x, 0.0);

        let b1 = self.model.b1();
        for (phase, &level) in u.0.iter().enumerate() {
            if level != 0 {
                out.axpy(f64::from(level), &b1.column(phase), 1.0);
            }
        }

        if self.model.has_disturbance() {
            let d = self.trajectory.disturbance(step);
            debug_assert!(d.is_some(), "disturbance missing for prediction step {step}");
            if let Some(d) = d {
                out.gemv(1.0, self.model.b2(), d, 1.0);
            }
        }
    }

    /// Output `C x` written into `out`.
    pub fn output_into(&self, x: &DVector<f64>, out: &mut DVector<f64>) {
        out.gemv(1.0, self.model.c(), x, 0.0);
    }

    /// Output `C x` as a new vector.
    pub fn output(&self, x: &DVector<f64>) -> DVector<f64> {
        self.model.c() * x
    }
}
