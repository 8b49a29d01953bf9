//! fcsmpc CLI tool.
//!
//! Runs closed-loop simulations of a finite-control-set MPC grid-current
//! controller described by a JSON scenario file.

mod config;
mod output;
mod plant;
mod simulate;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use fcsmpc_core::SwitchSpace;
use fcsmpc_solver::{EffortNorm, SolverKind};

use crate::config::ScenarioConfig;
use crate::simulate::ClosedLoop;

/// Largest number of switching sequences `compare` will enumerate per step.
const ENUMERATION_LIMIT: usize = 1_000_000;

#[derive(Parser)]
#[command(name = "fcsmpc")]
#[command(about = "Closed-loop simulator for finite-control-set MPC of power converters")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a scenario with one solver
    Simulate {
        /// Path to the scenario JSON file
        config: PathBuf,

        /// Solver override (enum, bnb, sphere)
        #[arg(long)]
        solver: Option<String>,

        /// Number of control steps (default: simulation.t_stop / control.ts)
        #[arg(long)]
        steps: Option<usize>,

        /// Print the trace as CSV instead of a table
        #[arg(long)]
        csv: bool,
    },

    /// Run every applicable solver on the same scenario and compare
    Compare {
        /// Path to the scenario JSON file
        config: PathBuf,

        /// Number of control steps (default: simulation.t_stop / control.ts)
        #[arg(long)]
        steps: Option<usize>,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Simulate {
            config,
            solver,
            steps,
            csv,
        } => cmd_simulate(&config, solver.as_deref(), steps, csv),
        Commands::Compare { config, steps } => cmd_compare(&config, steps),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_simulate(
    path: &Path,
    solver: Option<&str>,
    steps: Option<usize>,
    csv: bool,
) -> Result<()> {
    let config = ScenarioConfig::load(path)?;
    let kind = match solver {
        Some(name) => {
            SolverKind::from_name(name).with_context(|| format!("unknown solver '{}'", name))?
        }
        None => config.control.solver_kind()?,
    };
    let steps = steps.unwrap_or_else(|| config.steps());

    let trace = ClosedLoop::new(&config, kind)?.run(steps)?;

    if csv {
        print!("{}", output::format_csv(&trace));
    } else {
        println!("Closed-loop simulation ({})", path.display());
        println!("==========================================");
        println!();
        print!("{}", output::format_table(&trace));
        println!();
        print!("{}", output::format_summary(&trace));
    }
    Ok(())
}

fn cmd_compare(path: &Path, steps: Option<usize>) -> Result<()> {
    let config = ScenarioConfig::load(path)?;
    let steps = steps.unwrap_or_else(|| config.steps());
    let sequences = SwitchSpace::new(config.levels()?).sequence_count(config.control.horizon);
    let squared_effort = config.control.effort_norm()? == EffortNorm::SquaredEuclidean;

    println!("Solver comparison ({}, {} steps)", path.display(), steps);
    println!("==========================================");
    println!();

    let mut kinds = Vec::new();
    for kind in SolverKind::ALL {
        match kind {
            SolverKind::Enumeration if sequences.is_none_or(|n| n > ENUMERATION_LIMIT) => {
                println!("Skipping {}: too many sequences per step.", kind);
            }
            SolverKind::SphereDecoder if !squared_effort => {
                println!("Skipping {}: needs the squared effort norm.", kind);
            }
            _ => kinds.push(kind),
        }
    }
    log::info!("running {} solvers", kinds.len());
    let traces = simulate::run_solvers(&config, &kinds, steps)?;

    println!();
    print!("{}", output::format_comparison(&traces));
    Ok(())
}
