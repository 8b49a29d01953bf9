//! Closed-loop simulation of the grid-current controller.

use anyhow::{Context, Result};
use nalgebra::{DVector, Vector2};

use fcsmpc_core::frames::dq_to_alpha_beta;
use fcsmpc_core::{ConverterLevels, DiscreteStateSpace, SwitchPosition};
use fcsmpc_solver::{
    HorizonTrajectory, MpcProblem, MpcSolver, MpcWeights, PredictionModel, SearchStats,
    SolverKind,
};

use crate::config::{Discretization, ScenarioConfig};
use crate::plant::RlGrid;

/// One control step of a simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub step: usize,
    /// Time at the start of the step [s].
    pub time: f64,
    /// Grid current at the start of the step [p.u.].
    pub current: Vector2<f64>,
    /// Current reference for the step [p.u.].
    pub reference: Vector2<f64>,
    /// Applied switch position.
    pub switch_position: SwitchPosition,
    /// Optimal horizon cost.
    pub cost: f64,
    pub stats: SearchStats,
}

/// Outer control loop: owns the plant state and the previously applied position.
pub struct ClosedLoop<'a> {
    config: &'a ScenarioConfig,
    grid: RlGrid,
    levels: ConverterLevels,
    model: DiscreteStateSpace,
    plant: DiscreteStateSpace,
    solver: Box<dyn MpcSolver>,
    state: DVector<f64>,
    previous: SwitchPosition,
    step: usize,
}

impl<'a> ClosedLoop<'a> {
    /// Set up the loop for `config` with the given solver.
    ///
    /// The controller predicts with the configured discretization; the plant always
    /// advances with the exact one.
    pub fn new(config: &'a ScenarioConfig, kind: SolverKind) -> Result<Self> {
        let grid = RlGrid::from_config(config);
        let control = &config.control;
        let levels = config.levels()?;
        let model = grid.discretize(control.ts, control.discretization)?;
        let plant = grid.discretize(control.ts, Discretization::Exact)?;

        let weights = MpcWeights::identity(model.output_dim(), control.lambda_u)
            .with_effort(control.effort_norm()?);
        let solver_config = control.solver_config(kind);
        let solver = solver_config
            .build(weights)
            .with_context(|| format!("configuring {}", solver_config.describe()))?;

        let state = if config.simulation.start_from_reference {
            let vg = grid.grid_voltage(0.0);
            dq_to_alpha_beta(&config.reference_dq(0.0), vg.y.atan2(vg.x))
        } else {
            Vector2::zeros()
        };

        let base = grid.base();
        log::debug!(
            "grid: base {:.1} V / {:.1} A, R = {:.5} p.u., X = {:.5} p.u.",
            base.v,
            base.i,
            grid.resistance(),
            grid.reactance()
        );
        log::info!(
            "closed loop: {} {}, Np = {}, Ts = {:.1} us, lambda_u = {}, {:?} model",
            levels,
            solver_config.describe(),
            control.horizon,
            control.ts * 1e6,
            control.lambda_u,
            control.discretization
        );

        Ok(Self {
            config,
            grid,
            levels,
            model,
            plant,
            solver,
            state: DVector::from_column_slice(state.as_slice()),
            previous: SwitchPosition::ZERO,
            step: 0,
        })
    }

    /// Run one control step: solve, apply the first switch position, advance the plant.
    pub fn step(&mut self) -> Result<StepRecord> {
        let control = &self.config.control;
        let time = self.step as f64 * control.ts;
        let delta_theta = self.grid.angle_step(control.ts);

        let vg = self.grid.grid_voltage(time);
        let theta = vg.y.atan2(vg.x);
        let reference = dq_to_alpha_beta(&self.config.reference_dq(time), theta);
        let trajectory = HorizonTrajectory::rotating(reference, delta_theta, control.horizon)?
            .with_rotating_disturbance(vg, delta_theta)?;

        let problem = MpcProblem::new(
            &self.model,
            self.levels,
            &self.state,
            &trajectory,
            self.previous,
        )?;
        let solution = self
            .solver
            .solve(&problem)
            .with_context(|| format!("solving step {}", self.step))?;

        let u = solution.switch_position;
        let next = PredictionModel::new(&self.plant, &trajectory).predict(&self.state, &u, 0);

        let record = StepRecord {
            step: self.step,
            time,
            current: Vector2::new(self.state[0], self.state[1]),
            reference,
            switch_position: u,
            cost: solution.cost,
            stats: solution.stats,
        };
        log::trace!(
            "step {}: u = {}, J = {:.4e}, nodes = {}",
            self.step,
            u,
            solution.cost,
            solution.stats.nodes_visited
        );

        self.state = next;
        self.previous = u;
        self.step += 1;
        Ok(record)
    }

    /// Run `steps` control steps.
    pub fn run(&mut self, steps: usize) -> Result<Trace> {
        let mut records = Vec::with_capacity(steps);
        for _ in 0..steps {
            records.push(self.step()?);
        }
        Ok(Trace {
            kind: self.solver.kind(),
            ts: self.config.control.ts,
            records,
        })
    }
}

/// Run the same scenario once per solver kind, preserving the order of `kinds`.
#[cfg(feature = "parallel")]
pub fn run_solvers(
    config: &ScenarioConfig,
    kinds: &[SolverKind],
    steps: usize,
) -> Result<Vec<Trace>> {
    use rayon::prelude::*;

    kinds
        .par_iter()
        .map(|&kind| ClosedLoop::new(config, kind)?.run(steps))
        .collect()
}

/// Run the same scenario once per solver kind, preserving the order of `kinds`.
#[cfg(not(feature = "parallel"))]
pub fn run_solvers(
    config: &ScenarioConfig,
    kinds: &[SolverKind],
    steps: usize,
) -> Result<Vec<Trace>> {
    kinds
        .iter()
        .map(|&kind| ClosedLoop::new(config, kind)?.run(steps))
        .collect()
}

/// Recorded closed-loop run.
#[derive(Debug, Clone)]
pub struct Trace {
    pub kind: SolverKind,
    pub ts: f64,
    pub records: Vec<StepRecord>,
}

impl Trace {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rms of the current tracking error [p.u.].
    pub fn rms_error(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let sum: f64 = self
            .records
            .iter()
            .map(|r| (r.current - r.reference).norm_squared())
            .sum();
        (sum / self.records.len() as f64).sqrt()
    }

    /// Average switching frequency per phase [Hz].
    ///
    /// Counts single-level transitions between applied positions; two transitions
    /// make one switching period.
    pub fn switching_frequency(&self) -> f64 {
        if self.records.len() < 2 {
            return 0.0;
        }
        let transitions: u32 = self
            .records
            .windows(2)
            .map(|pair| {
                let (a, b) = (pair[0].switch_position, pair[1].switch_position);
                (0..3)
                    .map(|ph| u32::from(a[ph].abs_diff(b[ph])))
                    .sum::<u32>()
            })
            .sum();
        let duration = (self.records.len() - 1) as f64 * self.ts;
        f64::from(transitions) / (3.0 * 2.0 * duration)
    }

    pub fn mean_nodes(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        let total: usize = self.records.iter().map(|r| r.stats.nodes_visited).sum();
        total as f64 / self.records.len() as f64
    }

    pub fn max_nodes(&self) -> usize {
        self.records
            .iter()
            .map(|r| r.stats.nodes_visited)
            .max()
            .unwrap_or(0)
    }

    /// Steps on which a node budget cut the search short.
    pub fn budget_exhausted_steps(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.stats.budget_exhausted)
            .count()
    }

    /// Steps on which both traces applied the same switch position.
    pub fn agreement(&self, other: &Trace) -> usize {
        self.records
            .iter()
            .zip(&other.records)
            .filter(|(a, b)| a.switch_position == b.switch_position)
            .count()
    }
}
