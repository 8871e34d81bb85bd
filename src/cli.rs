//! CLI command implementations for Propnet.

pub(crate) mod generate;
pub(crate) mod info;
pub(crate) mod simulate;
pub(crate) mod verify;

mod output;

use clap::{Args, ValueEnum};
use propnet::differential::DifferentialError;
use propnet::{Blueprint, LoadError, MachineError, Structure, StructureError, games};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Output format for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON output.
    Json,
    /// CSV format.
    Csv,
}

/// Built-in fixture games.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum BuiltinGame {
    /// One robot, three lights, seven steps.
    Buttons,
    /// Two-player tic-tac-toe.
    TicTacToe,
}

/// Where a command gets its circuit from.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
pub(crate) struct CircuitSource {
    /// Circuit description file (JSON)
    circuit: Option<PathBuf>,

    /// Use a built-in game instead of a file
    #[arg(short, long, value_enum)]
    game: Option<BuiltinGame>,
}

impl CircuitSource {
    /// Short name for reports.
    pub(crate) fn name(&self) -> String {
        match (&self.circuit, self.game) {
            (Some(path), _) => path.display().to_string(),
            (None, Some(BuiltinGame::Buttons)) => "buttons".to_string(),
            (None, Some(BuiltinGame::TicTacToe)) => "tic-tac-toe".to_string(),
            (None, None) => "unknown".to_string(),
        }
    }

    /// Load and validate the circuit.
    pub(crate) fn load(&self) -> Result<Arc<Structure>, CliError> {
        let structure = match (&self.circuit, self.game) {
            (Some(path), _) => Blueprint::load(path)?.to_structure()?,
            (None, Some(BuiltinGame::Buttons)) => games::buttons_and_lights()?,
            (None, Some(BuiltinGame::TicTacToe)) => games::tic_tac_toe()?,
            (None, None) => return Err(CliError::Usage("a circuit file or --game is required".to_string())),
        };
        Ok(Arc::new(structure))
    }
}

/// CLI error type.
#[derive(Debug, Error)]
pub(crate) enum CliError {
    /// The circuit file could not be read.
    #[error(transparent)]
    Load(#[from] LoadError),
    /// The circuit is malformed.
    #[error("invalid circuit: {0}")]
    Structure(#[from] StructureError),
    /// A query failed during a command.
    #[error(transparent)]
    Machine(#[from] MachineError),
    /// The strategies disagreed.
    #[error("verification failed: {0}")]
    Differential(#[from] DifferentialError),
    /// Report serialization failed.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    /// Bad arguments.
    #[error("{0}")]
    Usage(String),
}
