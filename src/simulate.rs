//! Random depth charges over a state machine.
//!
//! A playout picks a uniformly random legal joint move until the state is
//! terminal or a depth limit is hit. Batches run in parallel with rayon: each
//! worker folds its playouts into a local [`SimulationReport`] and the reports
//! are merged at the end, so the hot path shares nothing.

use crate::error::MachineResult;
use crate::machine::StateMachine;
use crate::state::InternalState;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::Serialize;

/// Configuration for a batch of playouts.
#[derive(Debug, Clone, Copy)]
pub struct SimulationConfig {
    /// Number of playouts.
    pub playouts: u64,
    /// Base seed; playout `i` uses `seed + i`.
    pub seed: u64,
    /// Joint moves before a playout is abandoned.
    pub max_depth: u32,
    /// Advance states in place instead of cloning them.
    pub in_place: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            playouts: 1000,
            seed: 42,
            max_depth: 500,
            in_place: true,
        }
    }
}

/// Outcome of one playout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Playout {
    /// Joint moves played.
    pub depth: u32,
    /// Goal of every role, or `None` if the depth limit was hit first.
    pub goals: Option<Vec<u8>>,
}

impl Playout {
    /// Whether the playout reached a terminal state.
    #[must_use]
    pub fn completed(&self) -> bool {
        self.goals.is_some()
    }
}

/// Play random joint moves from `state` until it is terminal.
///
/// # Errors
///
/// Fails if a query fails on some visited state.
pub fn playout<R: Rng + ?Sized>(
    machine: &StateMachine,
    mut state: InternalState,
    rng: &mut R,
    max_depth: u32,
    in_place: bool,
) -> MachineResult<Playout> {
    let mut depth = 0;
    while !machine.is_terminal(&mut state)? {
        if depth == max_depth {
            return Ok(Playout { depth, goals: None });
        }
        let joint = machine.random_joint_move(&mut state, rng)?;
        state = if in_place {
            machine.next_state_in_place(state, &joint)?
        } else {
            machine.next_state(&mut state, &joint)?
        };
        depth += 1;
    }
    Ok(Playout {
        depth,
        goals: Some(machine.goals(&mut state)?),
    })
}

/// Aggregated statistics of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SimulationReport {
    /// Playouts run.
    pub playouts: u64,
    /// Playouts that reached a terminal state.
    pub completed: u64,
    /// Playouts abandoned at the depth limit.
    pub truncated: u64,
    /// Sum of playout depths.
    pub total_depth: u64,
    /// Deepest playout.
    pub max_depth: u32,
    /// Per role, sum of goals over completed playouts.
    pub goal_totals: Vec<u64>,
    /// Per role, completed playouts with goal 100.
    pub wins: Vec<u64>,
}

impl SimulationReport {
    /// Empty report for `roles` roles.
    #[must_use]
    pub fn new(roles: usize) -> Self {
        Self {
            goal_totals: vec![0; roles],
            wins: vec![0; roles],
            ..Self::default()
        }
    }

    /// Record one playout.
    pub fn add(&mut self, playout: &Playout) {
        self.playouts += 1;
        self.total_depth += u64::from(playout.depth);
        self.max_depth = self.max_depth.max(playout.depth);
        match &playout.goals {
            Some(goals) => {
                self.completed += 1;
                for (role, &goal) in goals.iter().enumerate() {
                    self.goal_totals[role] += u64::from(goal);
                    if goal == 100 {
                        self.wins[role] += 1;
                    }
                }
            }
            None => self.truncated += 1,
        }
    }

    /// Merge another batch into this one.
    pub fn merge(&mut self, other: &Self) {
        self.playouts += other.playouts;
        self.completed += other.completed;
        self.truncated += other.truncated;
        self.total_depth += other.total_depth;
        self.max_depth = self.max_depth.max(other.max_depth);
        for (total, extra) in self.goal_totals.iter_mut().zip(&other.goal_totals) {
            *total += extra;
        }
        for (wins, extra) in self.wins.iter_mut().zip(&other.wins) {
            *wins += extra;
        }
    }

    /// Mean depth over all playouts.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_depth(&self) -> f64 {
        if self.playouts == 0 {
            0.0
        } else {
            self.total_depth as f64 / self.playouts as f64
        }
    }

    /// Mean goal of `role` over completed playouts.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_goal(&self, role: usize) -> f64 {
        if self.completed == 0 {
            0.0
        } else {
            self.goal_totals[role] as f64 / self.completed as f64
        }
    }
}

/// Run a batch of playouts from the initial state.
///
/// # Errors
///
/// Fails with the first query error of any playout.
pub fn run_playouts(machine: &StateMachine, config: &SimulationConfig) -> MachineResult<SimulationReport> {
    run_playouts_with(machine, config, |_| {})
}

/// Run a batch of playouts, calling `on_playout` after each one.
///
/// # Errors
///
/// Fails with the first query error of any playout.
pub fn run_playouts_with<F>(
    machine: &StateMachine,
    config: &SimulationConfig,
    on_playout: F,
) -> MachineResult<SimulationReport>
where
    F: Fn(&Playout) + Sync,
{
    let roles = machine.roles().len();
    (0..config.playouts)
        .into_par_iter()
        .try_fold(
            || SimulationReport::new(roles),
            |mut report, i| {
                let mut rng = SmallRng::seed_from_u64(config.seed.wrapping_add(i));
                let result = playout(
                    machine,
                    machine.initial_state(),
                    &mut rng,
                    config.max_depth,
                    config.in_place,
                )?;
                report.add(&result);
                on_playout(&result);
                Ok(report)
            },
        )
        .try_reduce(
            || SimulationReport::new(roles),
            |mut a, b| {
                a.merge(&b);
                Ok(a)
            },
        )
}
