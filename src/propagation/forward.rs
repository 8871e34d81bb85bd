//! Lazy forward propagation in topological order.
//!
//! A change to a base or input flips its bit and marks its direct outputs
//! stale. Nothing else happens until a query: the query scans its precomputed
//! cone for the lowest stale id, recomputes it from its inputs, and on a
//! change taints that component's outputs and restarts from the lowest tainted
//! id. Because ids are topological, each scan position sees settled inputs
//! everywhere outside cycles.
//!
//! Falling values inside cycles are torn down eagerly: when a cyclic AND or
//! RELAY loses a true input, and when a cyclic OR loses its last true input
//! from outside any cycle, it is forced false (and stale) before the rescan,
//! so a loop can never keep itself alive.

use super::{Propagator, Strategy};
use crate::error::MachineResult;
use crate::state::{Bits, InternalState, Query};
use crate::structure::{ComponentId, ComponentKind, RoleId, Structure};

/// Topological lazy propagator.
#[derive(Debug, Clone)]
pub struct ForwardPropagator {
    terminal_cone: Bits,
    legal_cone: Bits,
    goal_cone: Bits,
    next_cone: Bits,
}

impl ForwardPropagator {
    /// Precompute the dependency cones of every query.
    #[must_use]
    pub fn new(structure: &Structure) -> Self {
        ForwardPropagator {
            terminal_cone: structure.cone([structure.terminal()]),
            legal_cone: structure.cone(structure.legal_components()),
            goal_cone: structure.cone(structure.goal_components()),
            next_cone: structure.cone(structure.next_components()),
        }
    }

    fn settle_query(structure: &Structure, state: &mut InternalState, query: Query, cone: &Bits) {
        if !state.is_settled(query) {
            propagate_cone(structure, state, cone);
            state.mark_settled(query);
        }
    }
}

impl Propagator for ForwardPropagator {
    fn strategy(&self) -> Strategy {
        Strategy::Lazy
    }

    fn change_base_or_input(
        &self,
        structure: &Structure,
        state: &mut InternalState,
        id: ComponentId,
        value: bool,
    ) {
        if structure.component(id).kind == ComponentKind::Base {
            state.clear_settled();
        }
        set_component_value(structure, state, id, value, structure.len());
    }

    fn compute_component(
        &self,
        structure: &Structure,
        state: &mut InternalState,
        id: ComponentId,
    ) -> MachineResult<()> {
        propagate_cone(structure, state, &structure.cone([id]));
        Ok(())
    }

    fn compute_terminal(&self, structure: &Structure, state: &mut InternalState) -> MachineResult<()> {
        Self::settle_query(structure, state, Query::Terminal, &self.terminal_cone);
        Ok(())
    }

    fn compute_legals(
        &self,
        structure: &Structure,
        state: &mut InternalState,
        _role: RoleId,
    ) -> MachineResult<()> {
        Self::settle_query(structure, state, Query::Legal, &self.legal_cone);
        Ok(())
    }

    fn compute_goals(
        &self,
        structure: &Structure,
        state: &mut InternalState,
        _role: RoleId,
    ) -> MachineResult<()> {
        Self::settle_query(structure, state, Query::Goal, &self.goal_cone);
        Ok(())
    }

    fn compute_transitions(&self, structure: &Structure, state: &mut InternalState) -> MachineResult<()> {
        propagate_cone(structure, state, &self.next_cone);
        Ok(())
    }

    fn transition_finished(&self, _structure: &Structure, state: &mut InternalState) {
        state.clear_settled();
    }
}

/// Bring every component of `cone` up to date.
pub(crate) fn propagate_cone(structure: &Structure, state: &mut InternalState, cone: &Bits) {
    let mut cursor = 0;
    while let Some(id) = cone.next_set_excluding(state.validity(), cursor) {
        cursor = recompute(structure, state, id);
    }
}

/// Bring every component of the state up to date.
pub(crate) fn propagate_all(structure: &Structure, state: &mut InternalState) {
    let mut cursor = 0;
    while let Some(id) = state.validity().next_clear(cursor) {
        cursor = recompute(structure, state, id);
    }
}

/// Recompute `id` from its inputs; returns the next scan position.
fn recompute(structure: &Structure, state: &mut InternalState, id: ComponentId) -> ComponentId {
    let value = evaluate_from_inputs(structure, state, id);
    state.set_valid(id);
    set_component_value(structure, state, id, value, id + 1)
}

pub(crate) fn evaluate_from_inputs(structure: &Structure, state: &InternalState, id: ComponentId) -> bool {
    let component = structure.component(id);
    match component.kind {
        ComponentKind::And => component.inputs.iter().all(|&input| state.get(input)),
        ComponentKind::Or => component.inputs.iter().any(|&input| state.get(input)),
        ComponentKind::Not => !state.get(component.inputs[0]),
        ComponentKind::Relay => state.get(component.inputs[0]),
        ComponentKind::True => true,
        ComponentKind::False => false,
        ComponentKind::Base | ComponentKind::Input => state.get(id),
    }
}

/// Write `value` and taint outputs; returns the lowest id left to rescan.
fn set_component_value(
    structure: &Structure,
    state: &mut InternalState,
    id: ComponentId,
    value: bool,
    next: ComponentId,
) -> ComponentId {
    if state.get(id) == value {
        next
    } else if value {
        set_true(structure, state, id, next)
    } else {
        set_false(structure, state, id, next)
    }
}

fn set_true(structure: &Structure, state: &mut InternalState, id: ComponentId, mut next: ComponentId) -> ComponentId {
    state.set(id, true);
    for &output in &structure.component(id).outputs {
        let stale = match structure.component(output).kind {
            ComponentKind::And | ComponentKind::Or | ComponentKind::Relay => !state.get(output),
            ComponentKind::Not => state.get(output),
            _ => false,
        };
        if stale {
            state.invalidate(output);
            next = next.min(output);
        }
    }
    next
}

fn set_false(structure: &Structure, state: &mut InternalState, id: ComponentId, mut next: ComponentId) -> ComponentId {
    state.set(id, false);
    for &output in &structure.component(id).outputs {
        let component = structure.component(output);
        match component.kind {
            ComponentKind::And | ComponentKind::Relay => {
                if state.get(output) {
                    state.invalidate(output);
                    next = next.min(output);
                    if component.cyclic {
                        next = set_false(structure, state, output, next);
                    }
                }
            }
            ComponentKind::Or => {
                if state.get(output) {
                    state.invalidate(output);
                    next = next.min(output);
                    if component.cyclic && !has_true_acyclic_input(structure, state, output) {
                        next = set_false(structure, state, output, next);
                    }
                }
            }
            ComponentKind::Not => {
                if !state.get(output) {
                    state.invalidate(output);
                    next = next.min(output);
                }
            }
            _ => {}
        }
    }
    next
}

fn has_true_acyclic_input(structure: &Structure, state: &InternalState, id: ComponentId) -> bool {
    structure
        .component(id)
        .inputs
        .iter()
        .any(|&input| !structure.component(input).cyclic && state.get(input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::StructureBuilder;

    #[test]
    fn test_change_taints_only_direct_outputs() {
        let mut builder = StructureBuilder::new();
        let role = builder.role("solo");
        let p = builder.base("p", false);
        builder.set_next(p, p).unwrap();
        let always = builder.constant(true);
        builder.legal_move(role, "wait", always).unwrap();
        let first = builder.relay(p).unwrap();
        let second = builder.relay(first).unwrap();
        builder.terminal(second).unwrap();
        let structure = builder.build().unwrap();
        let (p, first, second) = (
            structure.resolve(p),
            structure.resolve(first),
            structure.resolve(second),
        );

        let propagator = ForwardPropagator::new(&structure);
        let mut state = InternalState::template(&structure);
        propagator.compute_terminal(&structure, &mut state).unwrap();
        assert!(state.is_valid(second) && !state.get(second));

        propagator.change_base_or_input(&structure, &mut state, p, true);
        assert!(!state.is_valid(first));
        assert!(state.is_valid(second));

        propagator.compute_terminal(&structure, &mut state).unwrap();
        assert!(state.get(second));
        assert!(state.is_valid(first) && state.is_valid(second));
    }

    #[test]
    fn test_compute_component_refreshes_valid_descendant() {
        let mut builder = StructureBuilder::new();
        let role = builder.role("solo");
        let p = builder.base("p", false);
        builder.set_next(p, p).unwrap();
        let always = builder.constant(true);
        builder.legal_move(role, "wait", always).unwrap();
        let first = builder.relay(p).unwrap();
        let second = builder.relay(first).unwrap();
        builder.terminal(second).unwrap();
        let structure = builder.build().unwrap();
        let (p, second) = (structure.resolve(p), structure.resolve(second));

        let propagator = ForwardPropagator::new(&structure);
        let mut state = InternalState::template(&structure);
        propagator.compute_terminal(&structure, &mut state).unwrap();
        propagator.change_base_or_input(&structure, &mut state, p, true);
        assert!(state.is_valid(second) && !state.get(second));

        propagator.compute_component(&structure, &mut state, second).unwrap();
        assert!(state.get(second));
    }

    #[test]
    fn test_settled_query_skips_rescan() {
        let mut builder = StructureBuilder::new();
        let role = builder.role("solo");
        let p = builder.base("p", true);
        builder.set_next(p, p).unwrap();
        let always = builder.constant(true);
        builder.legal_move(role, "wait", always).unwrap();
        let ended = builder.relay(p).unwrap();
        builder.terminal(ended).unwrap();
        let structure = builder.build().unwrap();

        let propagator = ForwardPropagator::new(&structure);
        let mut state = InternalState::template(&structure);
        propagator.compute_terminal(&structure, &mut state).unwrap();
        assert!(state.is_settled(Query::Terminal));
        propagator.change_base_or_input(&structure, &mut state, structure.resolve(p), true);
        assert!(!state.is_settled(Query::Terminal));
    }

    #[test]
    fn test_cycle_is_torn_down_when_support_falls() {
        let mut builder = StructureBuilder::new();
        let role = builder.role("solo");
        let ext = builder.base("ext", false);
        builder.set_next(ext, ext).unwrap();
        let always = builder.constant(true);
        builder.legal_move(role, "wait", always).unwrap();
        let held = builder.or([ext]).unwrap();
        let echo = builder.relay(held).unwrap();
        builder.connect(held, echo).unwrap();
        builder.terminal(held).unwrap();
        let structure = builder.build().unwrap();
        let (ext, held, echo) = (
            structure.resolve(ext),
            structure.resolve(held),
            structure.resolve(echo),
        );

        let propagator = ForwardPropagator::new(&structure);
        let mut state = InternalState::template(&structure);
        propagator.change_base_or_input(&structure, &mut state, ext, true);
        propagator.compute_terminal(&structure, &mut state).unwrap();
        assert!(state.get(held) && state.get(echo));

        propagator.change_base_or_input(&structure, &mut state, ext, false);
        propagator.compute_terminal(&structure, &mut state).unwrap();
        assert!(!state.get(held));
        assert!(!state.get(echo));
    }

    #[test]
    fn test_propagate_all_validates_everything() {
        let mut builder = StructureBuilder::new();
        let role = builder.role("solo");
        let p = builder.base("p", false);
        builder.set_next(p, p).unwrap();
        let always = builder.constant(true);
        builder.legal_move(role, "wait", always).unwrap();
        let off = builder.not(p).unwrap();
        builder.terminal(off).unwrap();
        let structure = builder.build().unwrap();

        let mut state = InternalState::template(&structure);
        propagate_all(&structure, &mut state);
        assert_eq!(state.validity().count_ones(), structure.len());
        assert!(state.get(structure.resolve(off)));
    }
}
