//! Discrete-time state-space plant models.

use nalgebra::DMatrix;

use crate::error::{Error, Result};

/// Number of converter phases driving the plant input.
pub const PHASES: usize = 3;

/// Discrete-time linear plant model for one control step.
///
/// ```text
/// x[k+1] = A x[k] + B1 u[k] + B2 d[k]
/// y[k]   = C x[k]
/// ```
///
/// `u` is the three-phase switch position and `d` a measured disturbance such as
/// the grid voltage. Plants without a disturbance use a `B2` with zero columns.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscreteStateSpace {
    a: DMatrix<f64>,
    b1: DMatrix<f64>,
    b2: DMatrix<f64>,
    c: DMatrix<f64>,
}

impl DiscreteStateSpace {
    /// Build a model, checking that all matrix shapes agree.
    pub fn new(
        a: DMatrix<f64>,
        b1: DMatrix<f64>,
        b2: DMatrix<f64>,
        c: DMatrix<f64>,
    ) -> Result<Self> {
        let n = a.nrows();
        if a.ncols() != n {
            return Err(Error::DimensionMismatch {
                context: "state-transition matrix columns",
                expected: n,
                actual: a.ncols(),
            });
        }
        if b1.nrows() != n {
            return Err(Error::DimensionMismatch {
                context: "converter-input matrix rows",
                expected: n,
                actual: b1.nrows(),
            });
        }
        if b1.ncols() != PHASES {
            return Err(Error::DimensionMismatch {
                context: "converter-input matrix columns",
                expected: PHASES,
                actual: b1.ncols(),
            });
        }
        if b2.nrows() != n && b2.ncols() != 0 {
            return Err(Error::DimensionMismatch {
                context: "disturbance-input matrix rows",
                expected: n,
                actual: b2.nrows(),
            });
        }
        if c.ncols() != n {
            return Err(Error::DimensionMismatch {
                context: "output matrix columns",
                expected: n,
                actual: c.ncols(),
            });
        }
        if n == 0 || c.nrows() == 0 {
            return Err(Error::InvalidConfig(
                "state and output dimensions must be non-zero".to_string(),
            ));
        }

        let b2 = if b2.ncols() == 0 {
            DMatrix::zeros(n, 0)
        } else {
            b2
        };

        Ok(Self { a, b1, b2, c })
    }

    /// Build a model with no disturbance input.
    pub fn without_disturbance(a: DMatrix<f64>, b1: DMatrix<f64>, c: DMatrix<f64>) -> Result<Self> {
        let n = a.nrows();
        Self::new(a, b1, DMatrix::zeros(n, 0), c)
    }

    /// State-transition matrix `A`.
    pub fn a(&self) -> &DMatrix<f64> {
        &self.a
    }

    /// Converter-input matrix `B1` (n x 3).
    pub fn b1(&self) -> &DMatrix<f64> {
        &self.b1
    }

    /// Disturbance-input matrix `B2` (n x m, m may be zero).
    pub fn b2(&self) -> &DMatrix<f64> {
        &self.b2
    }

    /// Output matrix `C`.
    pub fn c(&self) -> &DMatrix<f64> {
        &self.c
    }

    pub fn state_dim(&self) -> usize {
        self.a.nrows()
    }

    pub fn output_dim(&self) -> usize {
        self.c.nrows()
    }

    pub fn disturbance_dim(&self) -> usize {
        self.b2.ncols()
    }

    pub fn has_disturbance(&self) -> bool {
        self.b2.ncols() > 0
    }
}
