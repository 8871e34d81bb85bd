//! Output formatting utilities for CLI.

use propnet::simulate::SimulationReport;
use propnet::structure::StructureStats;
use serde::Serialize;

/// Format structure statistics as human-readable text.
pub(super) fn format_stats_text(name: &str, stats: &StructureStats, role_names: &[String]) -> String {
    let mut output = String::new();

    output.push_str(&format!("Circuit: {name}\n"));
    output.push_str(&format!("  Roles:        {} ({})\n", stats.roles, role_names.join(", ")));
    output.push_str(&format!("  Components:   {}\n", stats.components));
    output.push_str(&format!("  Edges:        {}\n", stats.edges));
    output.push_str(&format!("  Bases:        {}\n", stats.bases));
    output.push_str(&format!("  Inputs:       {} ({} moves)\n", stats.inputs, stats.moves));
    output.push_str(&format!("  Constants:    {}\n", stats.constants));
    output.push_str(&format!(
        "  Gates:        {} and, {} or, {} not, {} relay\n",
        stats.ands, stats.ors, stats.nots, stats.relays
    ));
    output.push_str(&format!(
        "  Cyclic:       {} components in {} groups\n",
        stats.cyclic, stats.cycle_groups
    ));

    output
}

/// Format structure statistics as CSV.
pub(super) fn format_stats_csv(name: &str, stats: &StructureStats) -> String {
    let mut output = String::new();

    output.push_str("circuit,components,edges,bases,inputs,constants,ands,ors,nots,relays,cyclic,cycle_groups,roles,moves\n");
    output.push_str(&format!(
        "{},{},{},{},{},{},{},{},{},{},{},{},{},{}\n",
        name,
        stats.components,
        stats.edges,
        stats.bases,
        stats.inputs,
        stats.constants,
        stats.ands,
        stats.ors,
        stats.nots,
        stats.relays,
        stats.cyclic,
        stats.cycle_groups,
        stats.roles,
        stats.moves
    ));

    output
}

/// JSON-serializable structure statistics.
#[derive(Debug, Serialize)]
pub(super) struct JsonStats<'a> {
    /// Circuit file or game name.
    pub(super) circuit: &'a str,
    /// Role names in order.
    pub(super) roles: &'a [String],
    /// Counts.
    pub(super) stats: &'a StructureStats,
}

/// JSON-serializable per-role outcome.
#[derive(Debug, Serialize)]
pub(super) struct JsonRoleResult {
    /// Role name.
    pub(super) name: String,
    /// Mean goal over completed playouts.
    pub(super) average_goal: f64,
    /// Completed playouts with goal 100.
    pub(super) wins: u64,
}

/// JSON-serializable simulation result.
#[derive(Debug, Serialize)]
pub(super) struct JsonSimulationResult<'a> {
    /// Circuit file or game name.
    pub(super) circuit: &'a str,
    /// Propagation strategy.
    pub(super) strategy: &'a str,
    /// Starting seed.
    pub(super) seed: u64,
    /// Wall time in seconds.
    pub(super) duration_secs: f64,
    /// Throughput.
    pub(super) playouts_per_sec: f64,
    /// Mean playout depth.
    pub(super) average_depth: f64,
    /// Raw counters.
    pub(super) report: &'a SimulationReport,
    /// Per-role outcomes.
    pub(super) roles: Vec<JsonRoleResult>,
}

/// Per-role outcomes of a report.
pub(super) fn role_results(report: &SimulationReport, role_names: &[String]) -> Vec<JsonRoleResult> {
    role_names
        .iter()
        .enumerate()
        .map(|(role, name)| JsonRoleResult {
            name: name.clone(),
            average_goal: report.average_goal(role),
            wins: report.wins[role],
        })
        .collect()
}

/// Format a simulation report as human-readable text.
#[allow(clippy::cast_precision_loss)]
pub(super) fn format_simulation_text(report: &SimulationReport, role_names: &[String]) -> String {
    let mut output = String::new();

    output.push_str(&format!("Playouts: {}\n", report.playouts));
    output.push_str(&format!(
        "  Completed: {}  Truncated: {}\n",
        report.completed, report.truncated
    ));
    output.push_str(&format!(
        "  Depth: {:.2} average, {} max\n\n",
        report.average_depth(),
        report.max_depth
    ));

    let completed = report.completed.max(1) as f64;
    for result in role_results(report, role_names) {
        output.push_str(&format!(
            "  {:<16} {:>6.2} avg goal  {:>5.1}% wins\n",
            result.name,
            result.average_goal,
            result.wins as f64 * 100.0 / completed
        ));
    }

    output
}

/// Format a simulation report as CSV.
pub(super) fn format_simulation_csv(report: &SimulationReport, role_names: &[String]) -> String {
    let mut output = String::new();

    output.push_str("role,completed,truncated,average_depth,average_goal,wins\n");
    for result in role_results(report, role_names) {
        output.push_str(&format!(
            "{},{},{},{:.4},{:.4},{}\n",
            result.name,
            report.completed,
            report.truncated,
            report.average_depth(),
            result.average_goal,
            result.wins
        ));
    }

    output
}
