//! Verify command implementation.

use super::{CircuitSource, CliError};
use propnet::differential::{DifferentialConfig, compare_strategies};
use std::time::Instant;

/// Execute the verify command.
///
/// # Errors
///
/// Returns an error if the circuit cannot be loaded or the strategies
/// disagree.
pub(crate) fn execute(
    source: &CircuitSource,
    playouts: u64,
    seed: u64,
    max_depth: u32,
    audit: bool,
) -> Result<(), CliError> {
    let structure = source.load()?;
    let config = DifferentialConfig {
        playouts,
        seed,
        max_depth,
        audit,
    };

    println!("Verifying: {}", source.name());
    let start = Instant::now();
    let report = compare_strategies(&structure, &config)?;
    let duration = start.elapsed();

    println!("  Playouts:      {}", report.playouts);
    println!("  States:        {}", report.states);
    println!("  Terminal:      {}", report.terminal);
    if audit {
        println!("  Audited:       {}", report.audited);
    }
    println!();
    println!("All strategies agree ({:.2}s)", duration.as_secs_f64());

    Ok(())
}
