//! Grid with a stiff voltage source behind an RL impedance.
//!
//! Quantities are in per unit of the rated values. Time in the continuous model is
//! scaled by the base angular frequency, so a sampling interval `Ts` becomes
//! `Ts * w_base`.

use std::f64::consts::PI;

use anyhow::{Context, Result};
use nalgebra::{DMatrix, Vector2};

use fcsmpc_core::DiscreteStateSpace;
use fcsmpc_core::frames::{abc_to_alpha_beta, clarke_matrix};

use crate::config::{Discretization, ScenarioConfig};

/// Per-unit base values derived from the converter ratings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseValues {
    /// Peak phase voltage [V].
    pub v: f64,
    /// Peak current [A].
    pub i: f64,
    /// Angular frequency [rad/s].
    pub w: f64,
    /// Impedance [Ohm].
    pub z: f64,
    /// Inductance [H].
    pub l: f64,
}

impl BaseValues {
    pub fn new(v_rated: f64, i_rated: f64, f_rated: f64) -> Self {
        let v = (2.0_f64 / 3.0).sqrt() * v_rated;
        let i = 2.0_f64.sqrt() * i_rated;
        let w = 2.0 * PI * f_rated;
        let z = v / i;
        Self {
            v,
            i,
            w,
            z,
            l: z / w,
        }
    }
}

/// Continuous-time model `dx/dt = F x + G1 u + G2 v_g`.
#[derive(Debug, Clone)]
pub struct ContinuousModel {
    pub f: DMatrix<f64>,
    pub g1: DMatrix<f64>,
    pub g2: DMatrix<f64>,
}

/// RL grid model in the alpha-beta frame; the state is the grid current.
#[derive(Debug, Clone)]
pub struct RlGrid {
    base: BaseValues,
    /// Resistance [p.u.].
    r: f64,
    /// Reactance [p.u.].
    x: f64,
    /// Grid angular frequency [p.u.].
    wg: f64,
    /// Grid line-to-line rms voltage [p.u.].
    vg: f64,
    /// Dc-link voltage [p.u.].
    v_dc: f64,
}

impl RlGrid {
    pub fn from_config(config: &ScenarioConfig) -> Self {
        let grid = &config.grid;
        let base = BaseValues::new(grid.v_rated, grid.i_rated, grid.f_rated);
        Self {
            base,
            r: grid.r / base.z,
            x: grid.l / base.l,
            wg: 2.0 * PI * grid.f_grid / base.w,
            vg: grid.v_grid / base.v,
            v_dc: config.converter.v_dc / base.v,
        }
    }

    pub fn base(&self) -> &BaseValues {
        &self.base
    }

    pub fn resistance(&self) -> f64 {
        self.r
    }

    pub fn reactance(&self) -> f64 {
        self.x
    }

    pub fn continuous_model(&self) -> ContinuousModel {
        let clarke = clarke_matrix();
        let g1 = DMatrix::from_fn(2, 3, |i, j| self.v_dc / 2.0 / self.x * clarke[(i, j)]);
        ContinuousModel {
            f: DMatrix::identity(2, 2) * (-self.r / self.x),
            g1,
            g2: DMatrix::identity(2, 2) * (-1.0 / self.x),
        }
    }

    /// Discrete model for sampling interval `ts` [s].
    pub fn discretize(&self, ts: f64, method: Discretization) -> Result<DiscreteStateSpace> {
        let ContinuousModel { f, g1, g2 } = self.continuous_model();
        let ts_pu = ts * self.base.w;
        let n = f.nrows();

        let (a, b1, b2) = match method {
            Discretization::ForwardEuler => (
                DMatrix::identity(n, n) + f * ts_pu,
                g1 * ts_pu,
                g2 * ts_pu,
            ),
            Discretization::Exact => {
                let (m1, m2) = (g1.ncols(), g2.ncols());
                let size = n + m1 + m2;
                let mut augmented = DMatrix::<f64>::zeros(size, size);
                augmented.view_mut((0, 0), (n, n)).copy_from(&f);
                augmented.view_mut((0, n), (n, m1)).copy_from(&g1);
                augmented.view_mut((0, n + m1), (n, m2)).copy_from(&g2);
                let phi = (augmented * ts_pu).exp();
                (
                    phi.view((0, 0), (n, n)).into_owned(),
                    phi.view((0, n), (n, m1)).into_owned(),
                    phi.view((0, n + m1), (n, m2)).into_owned(),
                )
            }
        };

        DiscreteStateSpace::new(a, b1, b2, DMatrix::identity(n, n))
            .context("building the discrete grid model")
    }

    /// Grid voltage angle advance over `ts` [s].
    pub fn angle_step(&self, ts: f64) -> f64 {
        self.wg * ts * self.base.w
    }

    /// Grid voltage in the alpha-beta frame at time `t` [s].
    pub fn grid_voltage(&self, t: f64) -> Vector2<f64> {
        let theta = self.wg * t * self.base.w;
        let peak = (2.0_f64 / 3.0).sqrt() * self.vg;
        let shift = 2.0 * PI / 3.0;
        abc_to_alpha_beta([
            peak * theta.sin(),
            peak * (theta - shift).sin(),
            peak * (theta + shift).sin(),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> RlGrid {
        RlGrid::from_config(&ScenarioConfig::from_json("{}").unwrap())
    }

    #[test]
    fn base_values() {
        let base = BaseValues::new(3300.0, 1575.0, 50.0);
        assert!((base.v - 2694.438).abs() < 1e-3);
        assert!((base.i - 2227.386).abs() < 1e-3);
        assert!((base.z - base.v / base.i).abs() < 1e-12);
        assert!((base.l - base.z / (100.0 * PI)).abs() < 1e-15);
    }

    #[test]
    fn rated_grid_voltage_has_unit_peak_per_phase() {
        let grid = grid();
        for k in 0..8 {
            let vg = grid.grid_voltage(k as f64 * 1.3e-3);
            assert!((vg.norm() - (2.0_f64 / 3.0).sqrt() * 3300.0 / grid.base().v).abs() < 1e-9);
        }
        // at t = 0 the voltage vector points along -beta
        let vg0 = grid.grid_voltage(0.0);
        assert!(vg0.x.abs() < 1e-12);
        assert!(vg0.y < 0.0);
    }

    #[test]
    fn exact_and_euler_agree_for_short_steps() {
        let grid = grid();
        let euler = grid.discretize(1e-6, Discretization::ForwardEuler).unwrap();
        let exact = grid.discretize(1e-6, Discretization::Exact).unwrap();

        assert!((euler.a() - exact.a()).amax() < 1e-6);
        assert!((euler.b1() - exact.b1()).amax() < 1e-6);
        assert!((euler.b2() - exact.b2()).amax() < 1e-6);
    }

    #[test]
    fn input_matrix_rejects_common_mode() {
        let grid = grid();
        let model = grid.discretize(100e-6, Discretization::Exact).unwrap();
        let common = model.b1() * nalgebra::DVector::from_element(3, 1.0);
        assert!(common.amax() < 1e-12);
        assert!(model.a()[(0, 0)] < 1.0);
        assert!(model.a()[(0, 1)].abs() < 1e-15);
    }
}
