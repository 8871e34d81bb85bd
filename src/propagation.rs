//! Propagation strategies: how a state's stale components are brought up to
//! date.
//!
//! Every strategy implements [`Propagator`]. The driver calls the query hooks
//! before reading terminal, legal, goal or next components; after a hook
//! returns, the components it covers hold consistent values.
//!
//! | Strategy | Work on change | Work on query |
//! |---|---|---|
//! | [`Strategy::Pull`] | reset validity | depth-first evaluation with caching |
//! | [`Strategy::Lazy`] | taint direct outputs | topological rescan of the query cone |
//! | [`Strategy::Eager`] | recursive push to fixpoint | none |

mod backward;
mod forward;
mod recursive;

pub use backward::BackwardPropagator;
pub use forward::ForwardPropagator;
pub use recursive::RecursivePropagator;

use crate::error::{MachineResult, ParseStrategyError};
use crate::state::InternalState;
use crate::structure::{ComponentId, RoleId, Structure};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Selects one of the propagation strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// On-demand backward evaluation.
    Pull,
    /// Topological incremental forward propagation.
    Lazy,
    /// Recursive eager forward propagation.
    Eager,
}

impl Strategy {
    /// Every strategy, in a fixed order.
    pub const ALL: [Strategy; 3] = [Strategy::Pull, Strategy::Lazy, Strategy::Eager];

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Strategy::Pull => "pull",
            Strategy::Lazy => "lazy",
            Strategy::Eager => "eager",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = ParseStrategyError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.name() == name)
            .ok_or_else(|| ParseStrategyError(name.to_string()))
    }
}

/// The strategy-specific half of a state machine.
///
/// Implementations hold only data derived from the structure; all per-state
/// data lives in the [`InternalState`] passed to every call.
pub trait Propagator: fmt::Debug + Send + Sync {
    /// Which strategy this is.
    fn strategy(&self) -> Strategy;

    /// Finish the base-state template so that it satisfies the strategy's
    /// invariants.
    fn prepare_base_state(&self, _structure: &Structure, _state: &mut InternalState) {}

    /// Write a base or input component and propagate as the strategy requires.
    fn change_base_or_input(
        &self,
        structure: &Structure,
        state: &mut InternalState,
        id: ComponentId,
        value: bool,
    );

    /// Called once after the inputs of a state were rewritten for a joint move.
    fn inputs_changed(&self, _structure: &Structure, _state: &mut InternalState) {}

    /// Make `id` valid.
    ///
    /// # Errors
    ///
    /// Fails if the circuit turns out to be malformed.
    fn compute_component(
        &self,
        structure: &Structure,
        state: &mut InternalState,
        id: ComponentId,
    ) -> MachineResult<()>;

    /// Make the terminal component valid.
    ///
    /// # Errors
    ///
    /// Fails if the circuit turns out to be malformed.
    fn compute_terminal(&self, structure: &Structure, state: &mut InternalState) -> MachineResult<()>;

    /// Make every legal component of `role` valid.
    ///
    /// # Errors
    ///
    /// Fails if the circuit turns out to be malformed.
    fn compute_legals(
        &self,
        structure: &Structure,
        state: &mut InternalState,
        role: RoleId,
    ) -> MachineResult<()>;

    /// Make every goal component of `role` valid.
    ///
    /// # Errors
    ///
    /// Fails if the circuit turns out to be malformed.
    fn compute_goals(
        &self,
        structure: &Structure,
        state: &mut InternalState,
        role: RoleId,
    ) -> MachineResult<()>;

    /// Make every next component valid.
    ///
    /// # Errors
    ///
    /// Fails if the circuit turns out to be malformed.
    fn compute_transitions(&self, structure: &Structure, state: &mut InternalState) -> MachineResult<()>;

    /// Called once on a successor after its bases were written.
    fn transition_finished(&self, _structure: &Structure, _state: &mut InternalState) {}
}

/// One propagator of each kind, chosen when a machine is built.
#[derive(Debug, Clone)]
pub enum Engine {
    /// See [`BackwardPropagator`].
    Pull(BackwardPropagator),
    /// See [`ForwardPropagator`].
    Lazy(ForwardPropagator),
    /// See [`RecursivePropagator`].
    Eager(RecursivePropagator),
}

impl Engine {
    /// Build the propagator for `strategy`.
    #[must_use]
    pub fn new(strategy: Strategy, structure: &Structure) -> Self {
        match strategy {
            Strategy::Pull => Engine::Pull(BackwardPropagator::new(structure)),
            Strategy::Lazy => Engine::Lazy(ForwardPropagator::new(structure)),
            Strategy::Eager => Engine::Eager(RecursivePropagator::new()),
        }
    }

    /// The selected propagator.
    #[must_use]
    pub fn propagator(&self) -> &dyn Propagator {
        match self {
            Engine::Pull(propagator) => propagator,
            Engine::Lazy(propagator) => propagator,
            Engine::Eager(propagator) => propagator,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_names() {
        let names: Vec<_> = Strategy::ALL.iter().map(ToString::to_string).collect();
        assert_eq!(names, vec!["pull", "lazy", "eager"]);
        let parsed: Strategy = serde_json::from_str("\"eager\"").unwrap();
        assert_eq!(parsed, Strategy::Eager);
    }

    #[test]
    fn test_strategy_parses_from_its_name() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.name().parse::<Strategy>().unwrap(), strategy);
        }
        assert_eq!(
            "Lazy".parse::<Strategy>().unwrap_err(),
            ParseStrategyError("Lazy".to_string())
        );
        assert_eq!(
            "push".parse::<Strategy>().unwrap_err().to_string(),
            "unknown strategy `push`, expected pull, lazy or eager"
        );
    }
}
