//! Lock-step comparison of every propagation strategy.
//!
//! One machine per strategy walks the same seeded random playouts. At every
//! step each machine is asked the same questions and the answers, errors
//! included, must match those of the pull machine. Transitions alternate
//! between cloning and in-place advancement so both paths are covered, and
//! each state can be audited against a fresh evaluation.

use crate::error::MachineError;
use crate::machine::{Move, StateMachine, ValidityViolation, check_validity, query_scope};
use crate::propagation::Strategy;
use crate::state::{Bits, InternalState};
use crate::structure::{ComponentId, Structure};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

/// Configuration for a differential run.
#[derive(Debug, Clone, Copy)]
pub struct DifferentialConfig {
    /// Number of playouts.
    pub playouts: u64,
    /// Base seed; playout `i` uses `seed + i`.
    pub seed: u64,
    /// Joint moves before a playout is abandoned.
    pub max_depth: u32,
    /// Audit the validity invariant of every visited state.
    pub audit: bool,
}

impl Default for DifferentialConfig {
    fn default() -> Self {
        Self {
            playouts: 50,
            seed: 7,
            max_depth: 60,
            audit: true,
        }
    }
}

/// Counters of a run in which every strategy agreed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DifferentialReport {
    /// Playouts walked.
    pub playouts: u64,
    /// States compared, over all playouts.
    pub states: u64,
    /// Playouts that reached a terminal state.
    pub terminal: u64,
    /// States whose validity was audited, over all strategies.
    pub audited: u64,
}

/// Where and how the strategies disagreed.
#[derive(Debug, Error)]
pub enum DifferentialError {
    /// A strategy answered differently from the pull strategy.
    #[error("{strategy} diverged at playout {playout}, depth {depth}: {detail}")]
    Divergence {
        /// The diverging strategy.
        strategy: Strategy,
        /// Playout index.
        playout: u64,
        /// Joint moves played before the divergence.
        depth: u32,
        /// Both answers.
        detail: String,
    },
    /// A strategy held a stale value marked valid.
    #[error("{strategy} failed the validity audit at playout {playout}, depth {depth}: {violation}")]
    Stale {
        /// The offending strategy.
        strategy: Strategy,
        /// Playout index.
        playout: u64,
        /// Joint moves played before the audit.
        depth: u32,
        /// First violation found.
        violation: ValidityViolation,
    },
    /// The reference machine could not continue the playout.
    #[error("playout {playout} stopped at depth {depth}: {source}")]
    Machine {
        /// Playout index.
        playout: u64,
        /// Joint moves played.
        depth: u32,
        /// Underlying failure.
        #[source]
        source: MachineError,
    },
}

/// Everything a machine says about one state.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Observation {
    terminal: Result<bool, MachineError>,
    legal: Vec<Result<Vec<Move>, MachineError>>,
    goals: Vec<Result<u8, MachineError>>,
}

fn observe(machine: &StateMachine, state: &mut InternalState) -> Observation {
    let roles = machine.roles().len();
    Observation {
        terminal: machine.is_terminal(state),
        legal: (0..roles).map(|role| machine.legal_moves(state, role)).collect(),
        goals: (0..roles).map(|role| machine.goal(state, role)).collect(),
    }
}

struct Walker<'a> {
    machines: &'a [StateMachine],
    scope: &'a Bits,
    audit: bool,
    playout: u64,
    depth: u32,
}

impl Walker<'_> {
    fn diverged(&self, strategy: Strategy, detail: String) -> DifferentialError {
        tracing::warn!(%strategy, playout = self.playout, depth = self.depth, %detail, "strategies diverged");
        DifferentialError::Divergence {
            strategy,
            playout: self.playout,
            depth: self.depth,
            detail,
        }
    }

    fn machine_error(&self, source: MachineError) -> DifferentialError {
        DifferentialError::Machine {
            playout: self.playout,
            depth: self.depth,
            source,
        }
    }

    /// Compare every state's observation with the reference; returns it.
    fn compare_observations(&self, states: &mut [InternalState]) -> Result<Observation, DifferentialError> {
        let reference = observe(&self.machines[0], &mut states[0]);
        for (machine, state) in self.machines.iter().zip(states.iter_mut()).skip(1) {
            let observation = observe(machine, state);
            if observation != reference {
                return Err(self.diverged(
                    machine.strategy(),
                    format!("expected {reference:?}, found {observation:?}"),
                ));
            }
        }
        Ok(reference)
    }

    fn audit_states(&self, structure: &Structure, states: &[InternalState]) -> Result<u64, DifferentialError> {
        if !self.audit {
            return Ok(0);
        }
        for (machine, state) in self.machines.iter().zip(states) {
            let violations =
                check_validity(structure, state, self.scope).map_err(|source| self.machine_error(source))?;
            if let Some(&violation) = violations.first() {
                tracing::warn!(
                    strategy = %machine.strategy(),
                    playout = self.playout,
                    depth = self.depth,
                    %violation,
                    "validity audit failed"
                );
                return Err(DifferentialError::Stale {
                    strategy: machine.strategy(),
                    playout: self.playout,
                    depth: self.depth,
                    violation,
                });
            }
        }
        Ok(states.len() as u64)
    }

    fn advance(&self, states: Vec<InternalState>, joint: &[Move]) -> Result<Vec<InternalState>, DifferentialError> {
        let cloning = self.depth % 2 == 0;
        let mut next = Vec::with_capacity(states.len());
        let mut reference: Option<Result<Vec<ComponentId>, MachineError>> = None;
        for (machine, mut state) in self.machines.iter().zip(states) {
            let successor = if cloning {
                machine.next_state(&mut state, joint)
            } else {
                machine.next_state_in_place(state, joint)
            };
            let contents = successor.as_ref().map(|state| machine.true_bases(state)).map_err(Clone::clone);
            if let Some(expected) = reference.as_ref().filter(|expected| **expected != contents) {
                return Err(self.diverged(
                    machine.strategy(),
                    format!("successor {expected:?} vs {contents:?}"),
                ));
            }
            if reference.is_none() {
                reference = Some(contents);
            }
            next.push(successor.map_err(|source| self.machine_error(source))?);
        }
        Ok(next)
    }
}

/// Pick one move per role from the reference machine's legal lists.
fn pick_joint_move(
    observation: &Observation,
    rng: &mut SmallRng,
) -> Result<Vec<Move>, MachineError> {
    observation
        .legal
        .iter()
        .map(|legal| {
            let legal = legal.as_ref().map_err(Clone::clone)?;
            Ok(legal[rng.random_range(0..legal.len())])
        })
        .collect()
}

/// Walk seeded random playouts with every strategy in lock-step.
///
/// # Errors
///
/// Returns the first divergence, failed audit, or reference failure.
pub fn compare_strategies(
    structure: &Arc<Structure>,
    config: &DifferentialConfig,
) -> Result<DifferentialReport, DifferentialError> {
    let machines: Vec<StateMachine> = Strategy::ALL
        .iter()
        .map(|&strategy| StateMachine::new(Arc::clone(structure), strategy))
        .collect();
    let scope = query_scope(structure);
    let mut report = DifferentialReport::default();

    for playout in 0..config.playouts {
        let mut rng = SmallRng::seed_from_u64(config.seed.wrapping_add(playout));
        let mut states: Vec<InternalState> = machines.iter().map(StateMachine::initial_state).collect();
        let mut walker = Walker {
            machines: &machines,
            scope: &scope,
            audit: config.audit,
            playout,
            depth: 0,
        };
        report.playouts += 1;

        loop {
            let observation = walker.compare_observations(&mut states)?;
            report.states += 1;
            report.audited += walker.audit_states(structure, &states)?;

            let terminal = observation.terminal.clone().map_err(|source| walker.machine_error(source))?;
            if terminal {
                report.terminal += 1;
                break;
            }
            if walker.depth == config.max_depth {
                break;
            }
            let joint = pick_joint_move(&observation, &mut rng).map_err(|source| walker.machine_error(source))?;
            states = walker.advance(states, &joint)?;
            walker.depth += 1;
        }
    }

    tracing::debug!(
        playouts = report.playouts,
        states = report.states,
        terminal = report.terminal,
        "strategies agree"
    );
    Ok(report)
}
