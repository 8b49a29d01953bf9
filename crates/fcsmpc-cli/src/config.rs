//! Scenario configuration loaded from JSON.

use std::path::Path;

use anyhow::{Context, Result, bail};
use nalgebra::Vector2;
use serde::Deserialize;

use fcsmpc_core::ConverterLevels;
use fcsmpc_solver::{EffortNorm, SolverConfig, SolverKind};

/// A complete closed-loop scenario.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    #[serde(default)]
    pub control: ControlConfig,
    /// Grid-current reference in the dq frame, interpolated linearly in time.
    #[serde(default = "default_reference")]
    pub reference: Vec<ReferencePoint>,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Grid ratings and RL impedance in SI units.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct GridConfig {
    /// Rated line-to-line rms voltage [V].
    pub v_rated: f64,
    /// Rated rms current [A].
    pub i_rated: f64,
    /// Rated frequency [Hz].
    pub f_rated: f64,
    /// Grid line-to-line rms voltage [V].
    pub v_grid: f64,
    /// Grid frequency [Hz].
    pub f_grid: f64,
    /// Series resistance [Ohm].
    pub r: f64,
    /// Series inductance [H].
    pub l: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            v_rated: 3300.0,
            i_rated: 1575.0,
            f_rated: 50.0,
            v_grid: 3300.0,
            f_grid: 50.0,
            r: 0.01815,
            l: 5.7773e-4,
        }
    }
}

/// Converter parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ConverterConfig {
    /// Dc-link voltage [V].
    pub v_dc: f64,
    /// Number of levels per phase (2 or 3).
    pub levels: u8,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            v_dc: 5200.0,
            levels: 3,
        }
    }
}

/// Controller settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ControlConfig {
    /// Sampling interval [s].
    pub ts: f64,
    /// Prediction horizon steps.
    pub horizon: usize,
    /// Control-effort weight.
    pub lambda_u: f64,
    /// Effort norm name (`squared`, `alpha_beta`, `absolute`).
    pub effort: String,
    /// Solver name (`enum`, `bnb`, `sphere`).
    pub solver: String,
    /// Node budget for branch-and-bound.
    pub node_budget: Option<usize>,
    /// Discretization of the controller model.
    pub discretization: Discretization,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            ts: 100e-6,
            horizon: 1,
            lambda_u: 10e-3,
            effort: "squared".to_string(),
            solver: "bnb".to_string(),
            node_budget: None,
            discretization: Discretization::ForwardEuler,
        }
    }
}

impl ControlConfig {
    pub fn effort_norm(&self) -> Result<EffortNorm> {
        EffortNorm::from_name(&self.effort)
            .with_context(|| format!("unknown effort norm '{}'", self.effort))
    }

    pub fn solver_kind(&self) -> Result<SolverKind> {
        SolverKind::from_name(&self.solver)
            .with_context(|| format!("unknown solver '{}'", self.solver))
    }

    /// Solver configuration for `kind`, carrying the node budget where it applies.
    pub fn solver_config(&self, kind: SolverKind) -> SolverConfig {
        let config = SolverConfig::new(kind);
        match (kind, self.node_budget) {
            (SolverKind::BranchAndBound, Some(budget)) => config.with_node_budget(budget),
            _ => config,
        }
    }
}

/// Continuous-to-discrete conversion of the plant model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discretization {
    #[default]
    ForwardEuler,
    /// Zero-order hold via the matrix exponential.
    Exact,
}

/// One point of the dq reference schedule.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReferencePoint {
    /// Time [s].
    pub t: f64,
    /// d-axis current [p.u.].
    pub d: f64,
    /// q-axis current [p.u.].
    pub q: f64,
}

fn default_reference() -> Vec<ReferencePoint> {
    vec![ReferencePoint {
        t: 0.0,
        d: 1.0,
        q: 0.0,
    }]
}

/// Simulation length and initial condition.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SimulationConfig {
    /// Simulated time [s].
    pub t_stop: f64,
    /// Start from the steady state of the initial reference instead of zero current.
    pub start_from_reference: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            t_stop: 0.02,
            start_from_reference: true,
        }
    }
}

impl ScenarioConfig {
    /// Read and validate a scenario file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("parsing scenario {}", path.display()))
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges the solver and plant model rely on.
    pub fn validate(&self) -> Result<()> {
        let grid = &self.grid;
        for (name, value) in [
            ("grid.v_rated", grid.v_rated),
            ("grid.i_rated", grid.i_rated),
            ("grid.f_rated", grid.f_rated),
            ("grid.l", grid.l),
            ("converter.v_dc", self.converter.v_dc),
            ("control.ts", self.control.ts),
            ("simulation.t_stop", self.simulation.t_stop),
        ] {
            if !(value.is_finite() && value > 0.0) {
                bail!("{name} must be positive, got {value}");
            }
        }
        if !(grid.r.is_finite() && grid.r >= 0.0) {
            bail!("grid.r must be non-negative, got {}", grid.r);
        }
        if !(grid.v_grid.is_finite() && grid.f_grid.is_finite()) {
            bail!("grid voltage and frequency must be finite");
        }

        ConverterLevels::new(self.converter.levels)?;
        if self.control.horizon == 0 {
            bail!("control.horizon must be at least 1");
        }
        self.control.effort_norm()?;
        self.control.solver_kind()?;

        if self.reference.is_empty() {
            bail!("reference schedule is empty");
        }
        if self
            .reference
            .windows(2)
            .any(|pair| pair[1].t < pair[0].t)
        {
            bail!("reference schedule times must be non-decreasing");
        }
        Ok(())
    }

    pub fn levels(&self) -> Result<ConverterLevels> {
        Ok(ConverterLevels::new(self.converter.levels)?)
    }

    /// Number of control steps covering `t_stop`.
    pub fn steps(&self) -> usize {
        (self.simulation.t_stop / self.control.ts).round() as usize
    }

    /// dq reference at time `t`, held constant outside the schedule.
    pub fn reference_dq(&self, t: f64) -> Vector2<f64> {
        let points = &self.reference;
        let Some(first) = points.first() else {
            return Vector2::zeros();
        };
        if t <= first.t {
            return Vector2::new(first.d, first.q);
        }
        for pair in points.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.t {
                let span = b.t - a.t;
                if span <= 0.0 {
                    return Vector2::new(b.d, b.q);
                }
                let w = (t - a.t) / span;
                return Vector2::new(a.d + w * (b.d - a.d), a.q + w * (b.q - a.q));
            }
        }
        let last = points[points.len() - 1];
        Vector2::new(last.d, last.q)
    }
}
