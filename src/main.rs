//! Propnet CLI - inspect, simulate and cross-check propositional networks.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, fmt};

/// Propnet - propositional-network state machines for general game playing
#[derive(Parser, Debug)]
#[command(name = "propnet")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print structure statistics
    Info {
        #[command(flatten)]
        source: cli::CircuitSource,

        /// Output format: text, json, or csv
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },

    /// Run random playouts and aggregate their outcomes
    Simulate {
        #[command(flatten)]
        source: cli::CircuitSource,

        /// Propagation strategy
        #[arg(short = 'S', long, default_value = "lazy")]
        strategy: propnet::Strategy,

        /// Number of playouts (default: 1000)
        #[arg(short = 'n', long, default_value = "1000")]
        playouts: u64,

        /// Starting seed (increments for each playout)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Joint moves before a playout is abandoned (default: 500)
        #[arg(short = 'd', long, default_value = "500")]
        max_depth: u32,

        /// Parallel threads (default: CPU count)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Clone states on every transition instead of advancing in place
        #[arg(long)]
        clone_states: bool,

        /// Output format: text, json, or csv
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Show progress bar
        #[arg(short, long)]
        progress: bool,
    },

    /// Check that every strategy agrees on random playouts
    Verify {
        #[command(flatten)]
        source: cli::CircuitSource,

        /// Number of playouts (default: 50)
        #[arg(short = 'n', long, default_value = "50")]
        playouts: u64,

        /// Starting seed (default: 7)
        #[arg(short, long, default_value = "7")]
        seed: u64,

        /// Joint moves before a playout is abandoned (default: 60)
        #[arg(short = 'd', long, default_value = "60")]
        max_depth: u32,

        /// Skip the validity audit of visited states
        #[arg(long)]
        no_audit: bool,
    },

    /// Write a random well-formed circuit description
    Generate {
        /// Generator seed
        #[arg(short, long, default_value = "0")]
        seed: u64,

        /// Roles
        #[arg(long, default_value = "2")]
        roles: usize,

        /// Base propositions
        #[arg(long, default_value = "8")]
        bases: usize,

        /// Moves per role, noop included
        #[arg(long, default_value = "3")]
        moves: usize,

        /// Acyclic gates in the state layer
        #[arg(long, default_value = "24")]
        state_gates: usize,

        /// Acyclic gates in the transition layer
        #[arg(long, default_value = "24")]
        transition_gates: usize,

        /// Cycle groups per layer
        #[arg(long, default_value = "2")]
        cycle_groups: usize,

        /// Gates per cycle group
        #[arg(long, default_value = "3")]
        cycle_size: usize,

        /// Extra edges between ring members per layer
        #[arg(long, default_value = "2")]
        back_edges: usize,

        /// Probability that an acyclic gate is a NOT
        #[arg(long, default_value = "0.25")]
        negation_rate: f64,

        /// Output file (JSON)
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match args.command {
        Commands::Info { source, format } => cli::info::execute(&source, format),

        Commands::Simulate {
            source,
            strategy,
            playouts,
            seed,
            max_depth,
            threads,
            clone_states,
            format,
            progress,
        } => cli::simulate::execute(&cli::simulate::SimulateArgs {
            source,
            strategy,
            playouts,
            seed,
            max_depth,
            threads,
            in_place: !clone_states,
            format,
            progress,
        }),

        Commands::Verify {
            source,
            playouts,
            seed,
            max_depth,
            no_audit,
        } => cli::verify::execute(&source, playouts, seed, max_depth, !no_audit),

        Commands::Generate {
            seed,
            roles,
            bases,
            moves,
            state_gates,
            transition_gates,
            cycle_groups,
            cycle_size,
            back_edges,
            negation_rate,
            output,
        } => cli::generate::execute(
            seed,
            &propnet::synth::SynthConfig {
                roles,
                bases,
                moves_per_role: moves,
                state_gates,
                transition_gates,
                cycle_groups,
                cycle_size,
                back_edges,
                negation_rate,
            },
            &output,
        ),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
