//! Validity audit - detects components whose cached value disagrees with a
//! fresh evaluation.
//!
//! A component marked valid must hold the value a from-scratch evaluation of
//! the same bases and inputs would produce. These checks are bug detectors for
//! the propagation strategies and should never fire.

use crate::error::MachineResult;
use crate::propagation::BackwardPropagator;
use crate::state::{Bits, InternalState};
use crate::structure::{ComponentId, Structure};
use std::fmt;

/// A valid component whose cached value is wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityViolation {
    /// The component.
    pub component: ComponentId,
    /// Value held by the audited state.
    pub cached: bool,
    /// Value of a fresh evaluation.
    pub expected: bool,
}

impl fmt::Display for ValidityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "component {} is marked valid with {} but evaluates to {}",
            self.component, self.cached, self.expected
        )
    }
}

impl std::error::Error for ValidityViolation {}

/// Components a query may read: the cones of terminal, legal and goal.
#[must_use]
pub fn query_scope(structure: &Structure) -> Bits {
    structure.cone(
        std::iter::once(structure.terminal())
            .chain(structure.legal_components())
            .chain(structure.goal_components()),
    )
}

/// Fresh pull evaluation of every component from the bases and inputs of
/// `state`.
///
/// # Errors
///
/// Fails if the circuit cannot be evaluated.
pub fn reference_values(structure: &Structure, state: &InternalState) -> MachineResult<Bits> {
    let mut fresh = InternalState::template(structure);
    for base in structure.bases() {
        fresh.set(base.id, state.get(base.id));
    }
    for &input in structure.inputs() {
        fresh.set(input, state.get(input));
    }
    let pull = BackwardPropagator::new(structure);
    let mut values = Bits::new(structure.len());
    for id in 0..structure.len() {
        values.set(id, pull.evaluate(structure, &mut fresh, id)?);
    }
    Ok(values)
}

/// Check every valid component of `scope`.
///
/// Returns the violations found, or empty if the state is consistent.
///
/// # Errors
///
/// Fails if the reference evaluation fails.
pub fn check_validity(
    structure: &Structure,
    state: &InternalState,
    scope: &Bits,
) -> MachineResult<Vec<ValidityViolation>> {
    let reference = reference_values(structure, state)?;
    let mut violations = Vec::new();
    let mut cursor = 0;
    while let Some(id) = scope.next_set_within(state.validity(), cursor) {
        if state.get(id) != reference.get(id) {
            violations.push(ValidityViolation {
                component: id,
                cached: state.get(id),
                expected: reference.get(id),
            });
        }
        cursor = id + 1;
    }
    Ok(violations)
}

/// Assert the validity invariant over `scope`, panicking on any violation.
///
/// Only active in debug builds. No-op in release builds.
///
/// # Panics
///
/// Panics with every violation if the state is inconsistent, or if the
/// reference evaluation fails.
#[cfg(debug_assertions)]
pub fn assert_valid(structure: &Structure, state: &InternalState, scope: &Bits) {
    match check_validity(structure, state, scope) {
        Ok(violations) if violations.is_empty() => {}
        Ok(violations) => {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Validity violations:\n  - {}", messages.join("\n  - "));
        }
        Err(err) => panic!("Reference evaluation failed: {err}"),
    }
}

/// No-op in release builds.
#[cfg(not(debug_assertions))]
pub fn assert_valid(_structure: &Structure, _state: &InternalState, _scope: &Bits) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagation::{ForwardPropagator, Propagator};
    use crate::structure::StructureBuilder;

    fn sample() -> (Structure, ComponentId, ComponentId) {
        let mut builder = StructureBuilder::new();
        let role = builder.role("solo");
        let p = builder.base("p", false);
        let always = builder.constant(true);
        let go = builder.legal_move(role, "go", always).unwrap();
        let flip = builder.or([p, go]).unwrap();
        builder.set_next(p, flip).unwrap();
        let ended = builder.relay(p).unwrap();
        builder.terminal(ended).unwrap();
        let structure = builder.build().unwrap();
        let (p, ended) = (structure.resolve(p), structure.resolve(ended));
        (structure, p, ended)
    }

    #[test]
    fn test_settled_state_passes() {
        let (structure, p, _) = sample();
        let propagator = ForwardPropagator::new(&structure);
        let mut state = InternalState::template(&structure);
        propagator.change_base_or_input(&structure, &mut state, p, true);
        propagator.compute_terminal(&structure, &mut state).unwrap();

        let scope = query_scope(&structure);
        assert!(check_validity(&structure, &state, &scope).unwrap().is_empty());
        assert_valid(&structure, &state, &scope);
    }

    #[test]
    fn test_stale_value_marked_valid_is_detected() {
        let (structure, p, ended) = sample();
        let mut state = InternalState::template(&structure);
        state.set(p, true);
        state.set_valid(ended);

        let violations = check_validity(&structure, &state, &query_scope(&structure)).unwrap();
        assert_eq!(
            violations,
            vec![ValidityViolation {
                component: ended,
                cached: false,
                expected: true,
            }]
        );
        assert!(violations[0].to_string().contains("marked valid"));
    }

    #[test]
    fn test_invalid_components_are_ignored() {
        let (structure, p, _) = sample();
        let mut state = InternalState::template(&structure);
        state.set(p, true);
        assert!(check_validity(&structure, &state, &query_scope(&structure)).unwrap().is_empty());
    }

    #[test]
    fn test_scope_excludes_transition_layer() {
        let (structure, p, ended) = sample();
        let scope = query_scope(&structure);
        assert!(scope.get(ended) && scope.get(p));
        let next = structure.bases()[0].next;
        assert!(!scope.get(next));
    }
}
