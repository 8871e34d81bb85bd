//! Info command implementation.

use super::output::{JsonStats, format_stats_csv, format_stats_text};
use super::{CircuitSource, CliError, OutputFormat};

/// Execute the info command.
///
/// # Errors
///
/// Returns an error if the circuit cannot be loaded.
pub(crate) fn execute(source: &CircuitSource, format: OutputFormat) -> Result<(), CliError> {
    let structure = source.load()?;
    let name = source.name();
    let stats = structure.stats();
    let role_names: Vec<String> = structure.roles().iter().map(|role| role.name.clone()).collect();

    match format {
        OutputFormat::Text => print!("{}", format_stats_text(&name, &stats, &role_names)),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&JsonStats {
                circuit: &name,
                roles: &role_names,
                stats: &stats,
            })?;
            println!("{json}");
        }
        OutputFormat::Csv => print!("{}", format_stats_csv(&name, &stats)),
    }

    Ok(())
}
