//! Generate command implementation.

use super::CliError;
use propnet::synth::{SynthConfig, generate};
use std::path::Path;

/// Execute the generate command.
///
/// # Errors
///
/// Returns an error if the configuration is unusable or the file cannot be
/// written.
pub(crate) fn execute(seed: u64, config: &SynthConfig, output: &Path) -> Result<(), CliError> {
    if !(0.0..=1.0).contains(&config.negation_rate) {
        return Err(CliError::Usage(format!(
            "negation rate {} is not a probability",
            config.negation_rate
        )));
    }

    let structure = generate(seed, config)?;
    structure.to_blueprint().save(output)?;

    let stats = structure.stats();
    println!(
        "Wrote {}: {} components, {} bases, {} inputs, {} cycle groups",
        output.display(),
        stats.components,
        stats.bases,
        stats.inputs,
        stats.cycle_groups
    );

    Ok(())
}
