//! Sphere decoding of the switching-sequence problem.
//!
//! With a squared-Euclidean effort term, the horizon cost is a quadratic form in
//! the stacked switching sequence `U` (length `3 Np`):
//!
//! ```text
//! J(U) = U' H U + 2 Theta' U + const
//!      = || V U - V U_unc ||^2 + const'
//! ```
//!
//! where `U_unc = -H^-1 Theta` is the unconstrained optimum and `V` is lower
//! triangular with `V' V = H`. Minimizing `J` over the switch positions is then a
//! closest-point search in the lattice generated by `V`, which the decoder solves
//! depth first, one phase at a time, discarding branches whose partial distance
//! leaves the current sphere.
//!
//! # Prediction matrices
//!
//! Stacking the outputs `Y = [y_0; ...; y_{Np-1}]` with `y_l = C x_{l+1}`:
//!
//! ```text
//! Y = Gamma x + Upsilon U + Psi D
//! Gamma[i]      = C A^(i+1)
//! Upsilon[i][j] = C A^(i-j) B1   (j <= i)
//! Psi[i][j]     = C A^(i-j) B2   (j <= i)
//! ```

use nalgebra::{Cholesky, DMatrix, DVector};

use fcsmpc_core::error::{Error, Result};
use fcsmpc_core::model::PHASES;
use fcsmpc_core::{ConverterLevels, DiscreteStateSpace, SwitchPosition};

use crate::cost::{CostEvaluator, EffortNorm, MpcWeights};
use crate::problem::MpcProblem;
use crate::result::{SearchStats, Solution};

/// Relative growth of the initial radius so the fallback sequence is always inside.
const RADIUS_MARGIN: f64 = 1e-9;

/// Smallest ratio of Cholesky pivots accepted before `H` is treated as singular.
const PIVOT_RATIO_TOL: f64 = 1e-6;

/// Sphere decoder solver.
///
/// Requires [`EffortNorm::SquaredEuclidean`], since only then is the cost a
/// quadratic form in the switching sequence. The initial sphere is centred on the
/// unconstrained solution and passes through the fallback sequence, normally the
/// hold sequence.
#[derive(Debug, Clone)]
pub struct SphereDecoderSolver {
    cost: CostEvaluator,
}

impl SphereDecoderSolver {
    pub fn new(weights: MpcWeights) -> Result<Self> {
        if weights.effort != EffortNorm::SquaredEuclidean {
            return Err(Error::InvalidConfig(format!(
                "sphere decoding requires the squared-euclidean effort norm, got {}",
                weights.effort
            )));
        }
        Ok(Self {
            cost: CostEvaluator::new(weights)?,
        })
    }

    pub fn cost_evaluator(&self) -> &CostEvaluator {
        &self.cost
    }

    pub fn solve(&self, problem: &MpcProblem<'_>) -> Result<Solution> {
        self.cost.check_output_dim(problem.model().output_dim())?;

        let weights = self.cost.weights();
        let horizon = problem.horizon();
        let lattice = Lattice::build(problem.model(), &weights.q, weights.lambda_u, horizon)?;

        let target = lattice.unconstrained_target(problem);
        let seed = problem.previous();
        let fallback: Vec<i8> = problem
            .fallback_sequence()
            .iter()
            .flat_map(|u| u.phases())
            .collect();
        let radius = lattice.distance(&fallback, &target) * (1.0 + RADIUS_MARGIN);

        let mut decoder = Decoder {
            v: &lattice.v,
            target: &target,
            levels: problem.levels(),
            seed: seed.phases(),
            candidate: vec![0; fallback.len()],
            best: None,
            radius,
            stats: SearchStats::default(),
        };
        decoder.decode(0, 0.0);
        let stats = decoder.stats;

        let stacked = match decoder.best {
            Some(best) => best,
            None => {
                log::warn!(
                    "sphere decoder: no lattice point inside the initial radius {:.6e}, applying the fallback sequence",
                    radius
                );
                fallback
            }
        };

        let sequence: Vec<SwitchPosition> = stacked
            .chunks_exact(PHASES)
            .map(|phases| SwitchPosition::new(phases[0], phases[1], phases[2]))
            .collect();
        let cost = problem.evaluate(&self.cost, &sequence)?;
        if !cost.is_finite() {
            debug_assert!(false, "decoded sequences respect the switching constraint");
            return Err(Error::Infeasible);
        }
        let solution = Solution::from_sequence(sequence, cost, stats);

        log::debug!(
            "sphere decoder: {} nodes, {} pruned, {} radius updates, u = {}, J = {:.6e}",
            stats.nodes_visited,
            stats.pruned,
            stats.sequences_evaluated,
            solution.switch_position,
            solution.cost
        );

        Ok(solution)
    }
}

/// Horizon matrices of the lattice formulation.
struct Lattice {
    gamma: DMatrix<f64>,
    upsilon: DMatrix<f64>,
    psi: Option<DMatrix<f64>>,
    q_tilde: DMatrix<f64>,
    h_inv: DMatrix<f64>,
    v: DMatrix<f64>,
    lambda_u: f64,
}

impl Lattice {
    fn build(
        model: &DiscreteStateSpace,
        q: &DMatrix<f64>,
        lambda_u: f64,
        horizon: usize,
    ) -> Result<Self> {
        let n = model.state_dim();
        let p = model.output_dim();
        let m = model.disturbance_dim();
        let nu = PHASES * horizon;

        let mut powers = Vec::with_capacity(horizon + 1);
        powers.push(DMatrix::<f64>::identity(n, n));
        for k in 1..=horizon {
            powers.push(model.a() * &powers[k - 1]);
        }
        // C A^k for k = 0..=horizon
        let c_powers: Vec<DMatrix<f64>> = powers.iter().map(|ak| model.c() * ak).collect();
        let c_b1: Vec<DMatrix<f64>> = c_powers.iter().map(|cak| cak * model.b1()).collect();

        let mut gamma = DMatrix::<f64>::zeros(p * horizon, n);
        let mut upsilon = DMatrix::<f64>::zeros(p * horizon, nu);
        let mut psi = model
            .has_disturbance()
            .then(|| DMatrix::<f64>::zeros(p * horizon, m * horizon));

        for i in 0..horizon {
            gamma
                .view_mut((i * p, 0), (p, n))
                .copy_from(&c_powers[i + 1]);
            for j in 0..=i {
                upsilon
                    .view_mut((i * p, j * PHASES), (p, PHASES))
                    .copy_from(&c_b1[i - j]);
                if let Some(psi) = psi.as_mut() {
                    psi.view_mut((i * p, j * m), (p, m))
                        .copy_from(&(&c_powers[i - j] * model.b2()));
                }
            }
        }

        let q_tilde = DMatrix::<f64>::identity(horizon, horizon).kronecker(q);

        // S U stacks u_l - u_{l-1} with u_{-1} moved to the constant term
        let mut s = DMatrix::<f64>::identity(nu, nu);
        for i in PHASES..nu {
            s[(i, i - PHASES)] = -1.0;
        }

        let h = upsilon.transpose() * &q_tilde * &upsilon + s.transpose() * &s * lambda_u;
        let singular = || {
            Error::SingularProblem(
                "horizon Hessian is not positive definite; increase lambda_u".to_string(),
            )
        };
        let chol = Cholesky::new(h).ok_or_else(singular)?;
        let pivots = chol.l_dirty().diagonal();
        if pivots.min() <= PIVOT_RATIO_TOL * pivots.max() {
            return Err(singular());
        }
        let h_inv = chol.inverse();
        let l = Cholesky::new(h_inv.clone())
            .ok_or_else(|| {
                Error::SingularProblem("inverse Hessian is not positive definite".to_string())
            })?
            .unpack();
        let v = l
            .solve_lower_triangular(&DMatrix::identity(nu, nu))
            .ok_or_else(|| {
                Error::SingularProblem("lattice generator is not invertible".to_string())
            })?;

        log::trace!("sphere decoder: lattice generator {}x{}", v.nrows(), v.ncols());

        Ok(Self {
            gamma,
            upsilon,
            psi,
            q_tilde,
            h_inv,
            v,
            lambda_u,
        })
    }

    /// Sphere centre `V U_unc` for the given problem data.
    fn unconstrained_target(&self, problem: &MpcProblem<'_>) -> DVector<f64> {
        let trajectory = problem.trajectory();
        let y_ref = DVector::from_iterator(
            self.gamma.nrows(),
            trajectory.references().iter().flat_map(|r| r.iter().copied()),
        );
        let mut free = y_ref - &self.gamma * problem.state();
        if let Some(psi) = &self.psi {
            let d = DVector::from_iterator(
                psi.ncols(),
                trajectory.disturbances().iter().flat_map(|d| d.iter().copied()),
            );
            free -= psi * d;
        }

        // S' E u_prev only touches the first block: +u_prev there
        let u_prev = problem.previous().to_vector();
        let mut seed_term = DVector::<f64>::zeros(self.v.nrows());
        for k in 0..PHASES {
            seed_term[k] = u_prev[k];
        }

        let theta =
            -(self.upsilon.transpose() * (&self.q_tilde * free)) - seed_term * self.lambda_u;
        let u_unc = -(&self.h_inv * theta);
        &self.v * u_unc
    }

    /// Squared distance between `V U` and the sphere centre.
    fn distance(&self, stacked: &[i8], target: &DVector<f64>) -> f64 {
        let u = DVector::from_iterator(stacked.len(), stacked.iter().map(|&s| f64::from(s)));
        (&self.v * u - target).norm_squared()
    }
}

/// Depth-first lattice search state.
struct Decoder<'m> {
    v: &'m DMatrix<f64>,
    target: &'m DVector<f64>,
    levels: ConverterLevels,
    seed: [i8; PHASES],
    candidate: Vec<i8>,
    best: Option<Vec<i8>>,
    radius: f64,
    stats: SearchStats,
}

impl Decoder<'_> {
    /// Fix component `i` of the stacked sequence given components `0..i`.
    fn decode(&mut self, i: usize, distance: f64) {
        let previous = if i < PHASES {
            self.seed[i]
        } else {
            self.candidate[i - PHASES]
        };
        let all_levels = self.levels.phase_levels().len();
        let reachable = self.levels.reachable_from(previous);
        self.stats.constraint_rejections += all_levels - reachable.len();

        for &level in reachable {
            self.candidate[i] = level;
            let projection: f64 = (0..=i)
                .map(|j| self.v[(i, j)] * f64::from(self.candidate[j]))
                .sum();
            let d = (self.target[i] - projection).powi(2) + distance;
            self.stats.nodes_visited += 1;

            if d >= self.radius {
                self.stats.pruned += 1;
                continue;
            }
            if i + 1 < self.candidate.len() {
                self.decode(i + 1, d);
            } else {
                self.radius = d;
                self.stats.sequences_evaluated += 1;
                self.best = Some(self.candidate.clone());
            }
        }
    }
}
