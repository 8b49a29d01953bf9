//! Stage cost weights and evaluation.
//!
//! The stage cost of prediction step `l` is
//!
//! ```text
//! J_l = (y_l - r_l)' Q (y_l - r_l) + lambda_u * effort(u_l - u_{l-1})
//! ```
//!
//! where `y_l = C x_{l+1}` is the predicted output after applying `u_l` and
//! `u_{-1}` is the previously applied switch position.

use std::fmt;

use nalgebra::{DMatrix, DVector};

use fcsmpc_core::SwitchPosition;
use fcsmpc_core::error::{Error, Result};
use fcsmpc_core::frames::abc_to_alpha_beta;

/// Relative tolerance used for the symmetry check of `Q`.
const SYMMETRY_TOL: f64 = 1e-9;

/// Largest negative eigenvalue of `Q` still treated as zero.
const PSD_TOL: f64 = 1e-10;

/// Norm applied to the switch-position change in the control-effort term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EffortNorm {
    /// Squared Euclidean norm over the three phases.
    #[default]
    SquaredEuclidean,
    /// Squared norm of the alpha-beta (reduced Clarke) projection of the change.
    ///
    /// Ignores common-mode changes, which do not affect the phase currents.
    AlphaBeta,
    /// Sum of absolute per-phase changes, i.e. the number of commutations
    /// weighted by their size.
    AbsoluteSum,
}

impl EffortNorm {
    /// Parse from a string.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "squared" | "squared_euclidean" | "l2" => Some(Self::SquaredEuclidean),
            "alpha_beta" | "alphabeta" | "ab" => Some(Self::AlphaBeta),
            "absolute" | "absolute_sum" | "l1" => Some(Self::AbsoluteSum),
            _ => None,
        }
    }

    /// Evaluate the norm of `u - u_prev`.
    #[inline]
    pub fn evaluate(&self, u: &SwitchPosition, u_prev: &SwitchPosition) -> f64 {
        let delta = u.delta(u_prev);
        match self {
            Self::SquaredEuclidean => delta.iter().map(|d| d * d).sum(),
            Self::AlphaBeta => abc_to_alpha_beta(delta).norm_squared(),
            Self::AbsoluteSum => delta.iter().map(|d| d.abs()).sum(),
        }
    }
}

impl fmt::Display for EffortNorm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SquaredEuclidean => "squared-euclidean",
            Self::AlphaBeta => "alpha-beta",
            Self::AbsoluteSum => "absolute-sum",
        };
        f.write_str(name)
    }
}

/// Cost function weights.
#[derive(Debug, Clone, PartialEq)]
pub struct MpcWeights {
    /// Output tracking weight (symmetric positive semi-definite).
    pub q: DMatrix<f64>,
    /// Control-effort weight `lambda_u >= 0`.
    pub lambda_u: f64,
    /// Norm used for the control-effort term.
    pub effort: EffortNorm,
}

impl MpcWeights {
    pub fn new(q: DMatrix<f64>, lambda_u: f64) -> Self {
        Self {
            q,
            lambda_u,
            effort: EffortNorm::default(),
        }
    }

    /// Identity tracking weight for an output of dimension `output_dim`.
    pub fn identity(output_dim: usize, lambda_u: f64) -> Self {
        Self::new(DMatrix::identity(output_dim, output_dim), lambda_u)
    }

    /// Set the control-effort norm.
    pub fn with_effort(mut self, effort: EffortNorm) -> Self {
        self.effort = effort;
        self
    }

    /// Check `lambda_u` and `Q`.
    pub fn validate(&self) -> Result<()> {
        if !self.lambda_u.is_finite() || self.lambda_u < 0.0 {
            return Err(Error::InvalidWeight(format!(
                "lambda_u must be finite and >= 0, got {}",
                self.lambda_u
            )));
        }

        let q = &self.q;
        if q.nrows() != q.ncols() {
            return Err(Error::DimensionMismatch {
                context: "tracking weight columns",
                expected: q.nrows(),
                actual: q.ncols(),
            });
        }
        if q.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidWeight(
                "tracking weight has non-finite entries".to_string(),
            ));
        }

        let scale = q.amax().max(1.0);
        for i in 0..q.nrows() {
            for j in (i + 1)..q.ncols() {
                if (q[(i, j)] - q[(j, i)]).abs() > SYMMETRY_TOL * scale {
                    return Err(Error::InvalidWeight(format!(
                        "tracking weight is not symmetric at ({}, {})",
                        i, j
                    )));
                }
            }
        }

        let min_eig = q
            .clone()
            .symmetric_eigenvalues()
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        if min_eig < -PSD_TOL * scale {
            return Err(Error::InvalidWeight(format!(
                "tracking weight is not positive semi-definite (min eigenvalue {:.3e})",
                min_eig
            )));
        }

        Ok(())
    }
}

/// Evaluates stage costs for a fixed set of weights.
///
/// Accumulation over the horizon is left to the solvers.
#[derive(Debug, Clone)]
pub struct CostEvaluator {
    weights: MpcWeights,
}

impl CostEvaluator {
    /// Create an evaluator, validating the weights.
    pub fn new(weights: MpcWeights) -> Result<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &MpcWeights {
        &self.weights
    }

    /// Output dimension the tracking weight expects.
    pub fn output_dim(&self) -> usize {
        self.weights.q.nrows()
    }

    /// Check that the weights fit a plant with `output_dim` outputs.
    pub fn check_output_dim(&self, output_dim: usize) -> Result<()> {
        if self.output_dim() != output_dim {
            return Err(Error::DimensionMismatch {
                context: "tracking weight size",
                expected: output_dim,
                actual: self.output_dim(),
            });
        }
        Ok(())
    }

    /// Weighted squared tracking error `(y - r)' Q (y - r)`.
    #[inline]
    pub fn tracking(&self, y: &DVector<f64>, reference: &DVector<f64>) -> f64 {
        let q = &self.weights.q;
        let n = y.len();
        let mut acc = 0.0;
        for i in 0..n {
            let ei = y[i] - reference[i];
            if ei == 0.0 {
                continue;
            }
            let mut row = 0.0;
            for j in 0..n {
                row += q[(i, j)] * (y[j] - reference[j]);
            }
            acc += ei * row;
        }
        acc
    }

    /// Control-effort term `lambda_u * effort(u - u_prev)`.
    #[inline]
    pub fn effort(&self, u: &SwitchPosition, u_prev: &SwitchPosition) -> f64 {
        if self.weights.lambda_u == 0.0 {
            return 0.0;
        }
        self.weights.lambda_u * self.weights.effort.evaluate(u, u_prev)
    }

    /// Full stage cost for prediction step `step`.
    #[inline]
    pub fn stage(
        &self,
        step: usize,
        y: &DVector<f64>,
        reference: &DVector<f64>,
        u: &SwitchPosition,
        u_prev: &SwitchPosition,
    ) -> Result<f64> {
        let cost = self.tracking(y, reference) + self.effort(u, u_prev);
        if !cost.is_finite() {
            return Err(Error::NonFiniteCost { step });
        }
        Ok(cost)
    }
}
