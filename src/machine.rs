//! The game-facing driver: answers terminal, legal, goal and successor
//! queries for owned states.
//!
//! A [`StateMachine`] pairs one shared [`Structure`] with one propagation
//! strategy. States are plain values: clone them to branch, hand them back to
//! the machine to query or advance them.
//!
//! Transitions are two-phase. The inputs of the joint move are written and
//! every base's next value is computed from the pre-transition assignment into
//! a buffer. Only then are the bases whose value differs written into the
//! successor, so no next value can observe a half-updated state.

mod audit;
mod moves;

pub use audit::{ValidityViolation, assert_valid, check_validity, query_scope, reference_values};
pub use moves::{Move, cross_product};

use crate::error::{MachineError, MachineResult};
use crate::propagation::{Engine, Propagator, Strategy};
use crate::state::InternalState;
use crate::structure::{ComponentId, ComponentKind, MoveEntry, Role, RoleId, Structure};
use rand::Rng;
use std::sync::Arc;

/// A propositional-network state machine.
#[derive(Debug, Clone)]
pub struct StateMachine {
    structure: Arc<Structure>,
    engine: Engine,
    /// Every base false, no inputs, settled as the strategy requires.
    base_state: InternalState,
    /// The base state with the initially true bases applied.
    initial_state: InternalState,
}

impl StateMachine {
    /// Build a machine over `structure` using `strategy`.
    #[must_use]
    pub fn new(structure: Arc<Structure>, strategy: Strategy) -> Self {
        let engine = Engine::new(strategy, &structure);
        let propagator = engine.propagator();

        let mut base_state = InternalState::template(&structure);
        propagator.prepare_base_state(&structure, &mut base_state);

        let mut initial_state = base_state.clone();
        for base in structure.bases().iter().filter(|base| base.initial) {
            propagator.change_base_or_input(&structure, &mut initial_state, base.id, true);
        }

        let stats = structure.stats();
        tracing::info!(
            %strategy,
            components = stats.components,
            edges = stats.edges,
            bases = stats.bases,
            inputs = stats.inputs,
            cyclic = stats.cyclic,
            cycle_groups = stats.cycle_groups,
            roles = stats.roles,
            "state machine ready"
        );

        StateMachine {
            structure,
            engine,
            base_state,
            initial_state,
        }
    }

    /// The shared structure.
    #[must_use]
    pub fn structure(&self) -> &Arc<Structure> {
        &self.structure
    }

    /// The propagation strategy in use.
    #[must_use]
    pub fn strategy(&self) -> Strategy {
        self.propagator().strategy()
    }

    /// Roles in declaration order.
    #[must_use]
    pub fn roles(&self) -> &[Role] {
        self.structure.roles()
    }

    fn propagator(&self) -> &dyn Propagator {
        self.engine.propagator()
    }

    /// A fresh copy of the initial state.
    #[must_use]
    pub fn initial_state(&self) -> InternalState {
        self.initial_state.clone()
    }

    /// A fresh copy of the state with every base false.
    #[must_use]
    pub fn base_state(&self) -> InternalState {
        self.base_state.clone()
    }

    /// The state in which exactly the given bases hold.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::NotAssignable`] if an id is not a base.
    pub fn state_from_bases(&self, bases: &[ComponentId]) -> MachineResult<InternalState> {
        let mut state = self.base_state();
        for &id in bases {
            if id >= self.structure.len() || self.structure.component(id).kind != ComponentKind::Base {
                return Err(MachineError::NotAssignable(id));
            }
            if !state.get(id) {
                self.propagator().change_base_or_input(&self.structure, &mut state, id, true);
            }
        }
        self.propagator().transition_finished(&self.structure, &mut state);
        Ok(state)
    }

    /// Ids of the bases that hold in `state`, ascending.
    #[must_use]
    pub fn true_bases(&self, state: &InternalState) -> Vec<ComponentId> {
        let mut bases: Vec<_> = self
            .structure
            .bases()
            .iter()
            .filter(|base| state.get(base.id))
            .map(|base| base.id)
            .collect();
        bases.sort_unstable();
        bases
    }

    /// Whether `state` is terminal.
    ///
    /// # Errors
    ///
    /// Fails if the circuit cannot be evaluated.
    pub fn is_terminal(&self, state: &mut InternalState) -> MachineResult<bool> {
        self.propagator().compute_terminal(&self.structure, state)?;
        Ok(state.get(self.structure.terminal()))
    }

    fn role_entry(&self, role: RoleId) -> MachineResult<&Role> {
        self.structure.role(role).ok_or(MachineError::UnknownRole(role))
    }

    /// Legal moves of `role`, in move-table order.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::NoLegalMoves`] if nothing is legal.
    pub fn legal_moves(&self, state: &mut InternalState, role: RoleId) -> MachineResult<Vec<Move>> {
        let entry = self.role_entry(role)?;
        self.propagator().compute_legals(&self.structure, state, role)?;
        let legal: Vec<_> = entry
            .moves
            .iter()
            .enumerate()
            .filter(|(_, mv)| state.get(mv.legal))
            .map(|(index, _)| Move::new(role, index))
            .collect();
        if legal.is_empty() {
            return Err(no_legal_moves(entry));
        }
        Ok(legal)
    }

    /// A uniformly random legal move of `role`.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::NoLegalMoves`] if nothing is legal.
    pub fn random_move<R: Rng + ?Sized>(
        &self,
        state: &mut InternalState,
        role: RoleId,
        rng: &mut R,
    ) -> MachineResult<Move> {
        let entry = self.role_entry(role)?;
        self.propagator().compute_legals(&self.structure, state, role)?;
        let count = entry.moves.iter().filter(|mv| state.get(mv.legal)).count();
        if count == 0 {
            return Err(no_legal_moves(entry));
        }
        let pick = rng.random_range(0..count);
        entry
            .moves
            .iter()
            .enumerate()
            .filter(|(_, mv)| state.get(mv.legal))
            .nth(pick)
            .map(|(index, _)| Move::new(role, index))
            .ok_or_else(|| no_legal_moves(entry))
    }

    /// One random legal move per role.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::NoLegalMoves`] if some role has no legal move.
    pub fn random_joint_move<R: Rng + ?Sized>(
        &self,
        state: &mut InternalState,
        rng: &mut R,
    ) -> MachineResult<Vec<Move>> {
        (0..self.structure.roles().len())
            .map(|role| self.random_move(state, role, rng))
            .collect()
    }

    /// Every joint move, first role varying slowest.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::NoLegalMoves`] if some role has no legal move.
    pub fn legal_joint_moves(&self, state: &mut InternalState) -> MachineResult<Vec<Vec<Move>>> {
        let per_role = (0..self.structure.roles().len())
            .map(|role| self.legal_moves(state, role))
            .collect::<MachineResult<Vec<_>>>()?;
        Ok(cross_product(&per_role))
    }

    /// Payoff of `role`.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::NoUniqueGoal`] unless exactly one goal
    /// proposition of the role holds.
    pub fn goal(&self, state: &mut InternalState, role: RoleId) -> MachineResult<u8> {
        let entry = self.role_entry(role)?;
        self.propagator().compute_goals(&self.structure, state, role)?;
        let mut satisfied = entry.goals.iter().filter(|goal| state.get(goal.component));
        match (satisfied.next(), satisfied.next()) {
            (Some(goal), None) => Ok(goal.value),
            (first, second) => Err(MachineError::NoUniqueGoal {
                role: entry.name.clone(),
                satisfied: usize::from(first.is_some()) + usize::from(second.is_some()) + satisfied.count(),
            }),
        }
    }

    /// Payoff of every role, in role order.
    ///
    /// # Errors
    ///
    /// Fails if some role has no unique goal.
    pub fn goals(&self, state: &mut InternalState) -> MachineResult<Vec<u8>> {
        (0..self.structure.roles().len())
            .map(|role| self.goal(state, role))
            .collect()
    }

    /// Bring the terminal, legal and goal components of `state` up to date
    /// without interpreting them.
    ///
    /// # Errors
    ///
    /// Fails if the circuit cannot be evaluated.
    pub fn settle_queries(&self, state: &mut InternalState) -> MachineResult<()> {
        let propagator = self.propagator();
        propagator.compute_terminal(&self.structure, state)?;
        for role in 0..self.structure.roles().len() {
            propagator.compute_legals(&self.structure, state, role)?;
            propagator.compute_goals(&self.structure, state, role)?;
        }
        Ok(())
    }

    /// Value of an arbitrary component.
    ///
    /// # Errors
    ///
    /// Fails if the circuit cannot be evaluated.
    pub fn evaluate(&self, state: &mut InternalState, id: ComponentId) -> MachineResult<bool> {
        self.propagator().compute_component(&self.structure, state, id)?;
        Ok(state.get(id))
    }

    /// Overwrite a base or input component.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::NotAssignable`] for any other component.
    pub fn assign(&self, state: &mut InternalState, id: ComponentId, value: bool) -> MachineResult<()> {
        if id >= self.structure.len() {
            return Err(MachineError::NotAssignable(id));
        }
        match self.structure.component(id).kind {
            ComponentKind::Base => {
                self.propagator().change_base_or_input(&self.structure, state, id, value);
                self.propagator().transition_finished(&self.structure, state);
                Ok(())
            }
            ComponentKind::Input => {
                self.propagator().change_base_or_input(&self.structure, state, id, value);
                self.propagator().inputs_changed(&self.structure, state);
                Ok(())
            }
            _ => Err(MachineError::NotAssignable(id)),
        }
    }

    /// The move of `role` with the given label.
    #[must_use]
    pub fn move_by_label(&self, role: RoleId, label: &str) -> Option<Move> {
        self.structure
            .move_index(role, label)
            .map(|index| Move::new(role, index))
    }

    /// Table entry of a move.
    ///
    /// # Panics
    ///
    /// Panics if the move was not issued for this machine's structure.
    #[must_use]
    pub fn move_entry(&self, mv: Move) -> &MoveEntry {
        &self.structure.roles()[mv.role()].moves[mv.index()]
    }

    /// Advance a copy of `state` by `joint`.
    ///
    /// `state` itself keeps its bases; only its input bits and cached values
    /// change.
    ///
    /// # Errors
    ///
    /// Fails on a malformed joint move or if the circuit cannot be evaluated.
    pub fn next_state(&self, state: &mut InternalState, joint: &[Move]) -> MachineResult<InternalState> {
        let next = self.compute_next(state, joint)?;
        let mut successor = state.clone();
        self.write_bases(&mut successor, &next);
        Ok(successor)
    }

    /// Advance `state` by `joint`, reusing its storage.
    ///
    /// # Errors
    ///
    /// Fails on a malformed joint move or if the circuit cannot be evaluated.
    pub fn next_state_in_place(&self, mut state: InternalState, joint: &[Move]) -> MachineResult<InternalState> {
        let next = self.compute_next(&mut state, joint)?;
        self.write_bases(&mut state, &next);
        Ok(state)
    }

    fn check_joint_move(&self, joint: &[Move]) -> MachineResult<()> {
        let expected = self.structure.roles().len();
        if joint.len() != expected {
            return Err(MachineError::JointMoveArity {
                expected,
                found: joint.len(),
            });
        }
        for (slot, mv) in joint.iter().enumerate() {
            if mv.role() != slot {
                return Err(MachineError::MoveRoleMismatch {
                    slot,
                    found: mv.role(),
                });
            }
        }
        Ok(())
    }

    /// Phase one: write the inputs and buffer every base's next value.
    fn compute_next(&self, state: &mut InternalState, joint: &[Move]) -> MachineResult<Vec<bool>> {
        self.check_joint_move(joint)?;
        let propagator = self.propagator();

        let chosen: Vec<ComponentId> = joint.iter().map(|&mv| self.move_entry(mv).input).collect();
        for &input in &chosen {
            if !state.get(input) {
                propagator.change_base_or_input(&self.structure, state, input, true);
            }
        }
        for &input in self.structure.inputs() {
            if state.get(input) && !chosen.contains(&input) {
                propagator.change_base_or_input(&self.structure, state, input, false);
            }
        }
        propagator.inputs_changed(&self.structure, state);

        propagator.compute_transitions(&self.structure, state)?;
        Ok(self
            .structure
            .bases()
            .iter()
            .map(|base| state.get(base.next))
            .collect())
    }

    /// Phase two: write the bases that change.
    fn write_bases(&self, state: &mut InternalState, next: &[bool]) {
        let propagator = self.propagator();
        for (base, &value) in self.structure.bases().iter().zip(next) {
            if state.get(base.id) != value {
                propagator.change_base_or_input(&self.structure, state, base.id, value);
            }
        }
        propagator.transition_finished(&self.structure, state);
    }
}

fn no_legal_moves(role: &Role) -> MachineError {
    MachineError::NoLegalMoves {
        role: role.name.clone(),
    }
}
