// Allow unwrap in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Propnet: propositional-network state machines for general game playing.
//!
//! A game's rules compiled into a boolean circuit answer four questions for
//! any reachable state: is it terminal, which moves are legal, what is the
//! successor for a joint move, and what does each role score. This crate
//! provides:
//! - An immutable, validated circuit with cycle analysis
//! - Compact per-state storage of values and validity
//! - Three interchangeable propagation strategies
//! - A state-machine driver, random playouts and a differential checker
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   simulate / differential / games   │
//! ├─────────────────────────────────────┤
//! │       StateMachine (machine)        │
//! ├─────────────────────────────────────┤
//! │   Propagator: pull | lazy | eager   │
//! ├─────────────────────────────────────┤
//! │  Structure (shared) │ InternalState │
//! └─────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use propnet::{StateMachine, Strategy, games};
//! use std::sync::Arc;
//!
//! let structure = Arc::new(games::buttons_and_lights()?);
//! let machine = StateMachine::new(structure, Strategy::Lazy);
//! let mut state = machine.initial_state();
//! let press = machine.move_by_label(0, "a").expect("button a exists");
//! let mut next = machine.next_state(&mut state, &[press])?;
//! assert!(!machine.is_terminal(&mut next)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod differential;
pub mod error;
pub mod games;
pub mod machine;
pub mod propagation;
pub mod simulate;
pub mod state;
pub mod structure;
pub mod synth;

pub use error::{LoadError, MachineError, MachineResult, ParseStrategyError, StructureError};
pub use machine::{Move, StateMachine};
pub use propagation::Strategy;
pub use state::{Bits, InternalState};
pub use structure::{Blueprint, ComponentId, ComponentKind, RoleId, Structure, StructureBuilder};
