//! Tabular and CSV output of closed-loop runs.

use std::fmt::Write;

use crate::simulate::{StepRecord, Trace};

const COLUMNS: [&str; 9] = [
    "Step", "Time", "i_alpha", "i_beta", "ref_alpha", "ref_beta", "u_abc", "Cost", "Nodes",
];

/// Format one record as a fixed-width table row.
fn table_row(record: &StepRecord) -> String {
    let u = record.switch_position;
    format!(
        "{:>8}{:>14.6e}{:>12.4}{:>12.4}{:>12.4}{:>12.4}{:>14}{:>14.4e}{:>8}",
        record.step,
        record.time,
        record.current.x,
        record.current.y,
        record.reference.x,
        record.reference.y,
        format!("{}", u),
        record.cost,
        record.stats.nodes_visited
    )
}

fn csv_row(record: &StepRecord) -> String {
    let u = record.switch_position;
    format!(
        "{},{:e},{},{},{},{},{},{},{},{:e},{}",
        record.step,
        record.time,
        record.current.x,
        record.current.y,
        record.reference.x,
        record.reference.y,
        u[0],
        u[1],
        u[2],
        record.cost,
        record.stats.nodes_visited
    )
}

/// Render the trace as a fixed-width table.
pub fn format_table(trace: &Trace) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>8}{:>14}{:>12}{:>12}{:>12}{:>12}{:>14}{:>14}{:>8}",
        COLUMNS[0],
        COLUMNS[1],
        COLUMNS[2],
        COLUMNS[3],
        COLUMNS[4],
        COLUMNS[5],
        COLUMNS[6],
        COLUMNS[7],
        COLUMNS[8]
    );
    let _ = writeln!(out, "{}", "-".repeat(106));
    for record in &trace.records {
        let _ = writeln!(out, "{}", table_row(record));
    }
    out
}

/// Render the trace as CSV with one column per phase.
pub fn format_csv(trace: &Trace) -> String {
    let mut out =
        String::from("step,time,i_alpha,i_beta,ref_alpha,ref_beta,u_a,u_b,u_c,cost,nodes\n");
    for record in &trace.records {
        out.push_str(&csv_row(record));
        out.push('\n');
    }
    out
}

/// Summary figures of one run.
pub fn format_summary(trace: &Trace) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Solver:              {}", trace.kind);
    let _ = writeln!(out, "Steps:               {}", trace.len());
    let _ = writeln!(out, "Rms current error:   {:.4} p.u.", trace.rms_error());
    let _ = writeln!(
        out,
        "Switching frequency: {:.1} Hz",
        trace.switching_frequency()
    );
    let _ = writeln!(
        out,
        "Nodes per step:      {:.1} mean, {} max",
        trace.mean_nodes(),
        trace.max_nodes()
    );
    let exhausted = trace.budget_exhausted_steps();
    if exhausted > 0 {
        let _ = writeln!(out, "Budget exhausted:    {} steps", exhausted);
    }
    out
}

/// Side-by-side comparison of runs of the same scenario; the first trace is the
/// reference for the agreement column.
pub fn format_comparison(traces: &[Trace]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<18}{:>12}{:>14}{:>14}{:>12}{:>12}",
        "Solver", "Rms error", "f_sw [Hz]", "Mean nodes", "Max nodes", "Agreement"
    );
    let _ = writeln!(out, "{}", "-".repeat(82));

    let Some(reference) = traces.first() else {
        return out;
    };
    for trace in traces {
        let _ = writeln!(
            out,
            "{:<18}{:>12.4}{:>14.1}{:>14.1}{:>12}{:>12}",
            trace.kind.to_string(),
            trace.rms_error(),
            trace.switching_frequency(),
            trace.mean_nodes(),
            trace.max_nodes(),
            format!("{}/{}", trace.agreement(reference), reference.len())
        );
    }
    out
}
