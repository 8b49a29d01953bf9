//! Reference and disturbance trajectories over the prediction horizon.

use nalgebra::{DVector, Vector2};

use fcsmpc_core::error::{Error, Result};
use fcsmpc_core::frames::rotation;

/// Per-step references and disturbances for one solve.
///
/// `reference(l)` is the desired output after applying the switch position of step
/// `l`; `disturbance(l)` is the disturbance acting during step `l`.
#[derive(Debug, Clone, PartialEq)]
pub struct HorizonTrajectory {
    references: Vec<DVector<f64>>,
    disturbances: Vec<DVector<f64>>,
}

impl HorizonTrajectory {
    /// Build from explicit per-step vectors.
    ///
    /// `disturbances` is either empty (no disturbance) or holds one vector per step.
    pub fn new(references: Vec<DVector<f64>>, disturbances: Vec<DVector<f64>>) -> Result<Self> {
        if references.is_empty() {
            return Err(Error::InvalidHorizon(0));
        }
        if !disturbances.is_empty() && disturbances.len() != references.len() {
            return Err(Error::DimensionMismatch {
                context: "disturbance trajectory length",
                expected: references.len(),
                actual: disturbances.len(),
            });
        }
        check_uniform(&references, "reference dimension")?;
        check_uniform(&disturbances, "disturbance dimension")?;

        Ok(Self {
            references,
            disturbances,
        })
    }

    /// Hold `reference` constant for `horizon` steps, without disturbance.
    pub fn constant(reference: DVector<f64>, horizon: usize) -> Result<Self> {
        Self::new(vec![reference; horizon], Vec::new())
    }

    /// Rotate a two-dimensional alpha-beta reference by `delta_theta` per step.
    ///
    /// Sinusoidal references in the stationary frame advance by `w * Ts` each
    /// sample; step 0 uses `reference` unrotated.
    pub fn rotating(reference: Vector2<f64>, delta_theta: f64, horizon: usize) -> Result<Self> {
        Self::new(rotate_sequence(reference, delta_theta, horizon), Vec::new())
    }

    /// Attach a disturbance held constant over the horizon.
    pub fn with_constant_disturbance(self, disturbance: DVector<f64>) -> Result<Self> {
        let horizon = self.horizon();
        Self::new(self.references, vec![disturbance; horizon])
    }

    /// Attach a two-dimensional disturbance rotating by `delta_theta` per step,
    /// as a stiff grid voltage does in the alpha-beta frame.
    pub fn with_rotating_disturbance(
        self,
        disturbance: Vector2<f64>,
        delta_theta: f64,
    ) -> Result<Self> {
        let horizon = self.horizon();
        Self::new(
            self.references,
            rotate_sequence(disturbance, delta_theta, horizon),
        )
    }

    /// Prediction horizon `Np`.
    pub fn horizon(&self) -> usize {
        self.references.len()
    }

    pub fn reference(&self, step: usize) -> &DVector<f64> {
        &self.references[step]
    }

    pub fn references(&self) -> &[DVector<f64>] {
        &self.references
    }

    /// Disturbance for `step`, or `None` when the trajectory carries none.
    pub fn disturbance(&self, step: usize) -> Option<&DVector<f64>> {
        self.disturbances.get(step)
    }

    pub fn disturbances(&self) -> &[DVector<f64>] {
        &self.disturbances
    }

    pub fn reference_dim(&self) -> usize {
        self.references[0].len()
    }

    /// Disturbance dimension, zero when there is none.
    pub fn disturbance_dim(&self) -> usize {
        self.disturbances.first().map_or(0, |d| d.len())
    }
}

fn check_uniform(vectors: &[DVector<f64>], context: &'static str) -> Result<()> {
    if let Some(first) = vectors.first() {
        let expected = first.len();
        if let Some(bad) = vectors.iter().find(|v| v.len() != expected) {
            return Err(Error::DimensionMismatch {
                context,
                expected,
                actual: bad.len(),
            });
        }
    }
    Ok(())
}

fn rotate_sequence(initial: Vector2<f64>, delta_theta: f64, steps: usize) -> Vec<DVector<f64>> {
    let step_rotation = rotation(delta_theta);
    let mut current = initial;
    let mut out = Vec::with_capacity(steps);
    for _ in 0..steps {
        out.push(DVector::from_column_slice(current.as_slice()));
        current = step_rotation * current;
    }
    out
}
