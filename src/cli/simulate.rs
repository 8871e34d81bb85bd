//! Simulate command implementation.

use super::output::{JsonSimulationResult, format_simulation_csv, format_simulation_text, role_results};
use super::{CircuitSource, CliError, OutputFormat};
use indicatif::{ProgressBar, ProgressStyle};
use propnet::simulate::{SimulationConfig, run_playouts_with};
use propnet::{StateMachine, Strategy};
use std::time::Instant;

/// Arguments of the simulate command.
#[derive(Debug)]
pub(crate) struct SimulateArgs {
    pub(crate) source: CircuitSource,
    pub(crate) strategy: Strategy,
    pub(crate) playouts: u64,
    pub(crate) seed: Option<u64>,
    pub(crate) max_depth: u32,
    pub(crate) threads: Option<usize>,
    pub(crate) in_place: bool,
    pub(crate) format: OutputFormat,
    pub(crate) progress: bool,
}

/// Execute the simulate command.
///
/// # Errors
///
/// Returns an error if the circuit cannot be loaded or a playout fails.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn execute(args: &SimulateArgs) -> Result<(), CliError> {
    let structure = args.source.load()?;
    let machine = StateMachine::new(structure, args.strategy);
    let role_names: Vec<String> = machine.roles().iter().map(|role| role.name.clone()).collect();

    // Set thread pool size if specified
    if let Some(num_threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .ok(); // Ignore error if already initialized
    }

    // Base seed
    let seed = args.seed.unwrap_or_else(|| {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(42)
    });

    let config = SimulationConfig {
        playouts: args.playouts,
        seed,
        max_depth: args.max_depth,
        in_place: args.in_place,
    };

    // Progress bar
    let pb = if args.progress {
        let pb = ProgressBar::new(args.playouts);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} playouts ({per_sec})")
            .map_err(|e| CliError::Usage(format!("invalid progress template: {e}")))?
            .progress_chars("=>-");
        pb.set_style(style);
        Some(pb)
    } else {
        None
    };

    let start = Instant::now();
    let report = run_playouts_with(&machine, &config, |_| {
        if let Some(pb) = &pb {
            pb.inc(1);
        }
    })?;
    let duration = start.elapsed();

    if let Some(pb) = pb {
        pb.finish_with_message("done");
    }

    let playouts_per_sec = if duration.as_secs_f64() > 0.0 {
        report.playouts as f64 / duration.as_secs_f64()
    } else {
        0.0
    };

    match args.format {
        OutputFormat::Text => {
            println!("Circuit: {} ({} strategy, seed {seed})", args.source.name(), args.strategy);
            print!("{}", format_simulation_text(&report, &role_names));
            println!();
            println!(
                "Duration: {:.2}s ({playouts_per_sec:.0} playouts/sec)",
                duration.as_secs_f64()
            );
        }
        OutputFormat::Json => {
            let name = args.source.name();
            let json = serde_json::to_string_pretty(&JsonSimulationResult {
                circuit: &name,
                strategy: args.strategy.name(),
                seed,
                duration_secs: duration.as_secs_f64(),
                playouts_per_sec,
                average_depth: report.average_depth(),
                report: &report,
                roles: role_results(&report, &role_names),
            })?;
            println!("{json}");
        }
        OutputFormat::Csv => print!("{}", format_simulation_csv(&report, &role_names)),
    }

    Ok(())
}
