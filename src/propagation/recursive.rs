//! Eager forward propagation: every change is pushed recursively through the
//! circuit until nothing else changes, so queries are plain reads.

use super::forward::{evaluate_from_inputs, propagate_all};
use super::{Propagator, Strategy};
use crate::error::MachineResult;
use crate::state::InternalState;
use crate::structure::{ComponentId, ComponentKind, RoleId, Structure};
use std::time::Instant;

/// Recursive eager propagator.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecursivePropagator;

impl RecursivePropagator {
    /// Create the propagator.
    #[must_use]
    pub fn new() -> Self {
        RecursivePropagator
    }
}

impl Propagator for RecursivePropagator {
    fn strategy(&self) -> Strategy {
        Strategy::Eager
    }

    fn prepare_base_state(&self, structure: &Structure, state: &mut InternalState) {
        let started = Instant::now();
        propagate_all(structure, state);
        tracing::debug!(
            elapsed_us = started.elapsed().as_micros(),
            components = structure.len(),
            "settled base state"
        );
    }

    fn change_base_or_input(
        &self,
        structure: &Structure,
        state: &mut InternalState,
        id: ComponentId,
        value: bool,
    ) {
        if state.get(id) != value {
            set_value(structure, state, id, value);
        }
    }

    fn compute_component(
        &self,
        _structure: &Structure,
        _state: &mut InternalState,
        _id: ComponentId,
    ) -> MachineResult<()> {
        Ok(())
    }

    fn compute_terminal(&self, _structure: &Structure, _state: &mut InternalState) -> MachineResult<()> {
        Ok(())
    }

    fn compute_legals(
        &self,
        _structure: &Structure,
        _state: &mut InternalState,
        _role: RoleId,
    ) -> MachineResult<()> {
        Ok(())
    }

    fn compute_goals(
        &self,
        _structure: &Structure,
        _state: &mut InternalState,
        _role: RoleId,
    ) -> MachineResult<()> {
        Ok(())
    }

    fn compute_transitions(&self, _structure: &Structure, _state: &mut InternalState) -> MachineResult<()> {
        Ok(())
    }
}

fn set_value(structure: &Structure, state: &mut InternalState, id: ComponentId, value: bool) {
    state.set(id, value);
    for &output in &structure.component(id).outputs {
        if state.get(id) != value {
            return;
        }
        update_from_input(structure, state, output, value);
    }
}

/// React to one input of `id` having just become `rising`.
fn update_from_input(structure: &Structure, state: &mut InternalState, id: ComponentId, rising: bool) {
    let component = structure.component(id);
    let value = state.get(id);
    if component.cyclic && value && !rising {
        if component.kind != ComponentKind::Or || !has_outside_support(structure, state, id) {
            collapse(structure, state, id);
        }
        return;
    }
    match component.kind {
        ComponentKind::Relay => {
            if value != rising {
                set_value(structure, state, id, rising);
            }
        }
        ComponentKind::And => {
            if !value && rising {
                if component.inputs.iter().all(|&input| state.get(input)) {
                    set_value(structure, state, id, true);
                }
            } else if value && !rising {
                set_value(structure, state, id, false);
            }
        }
        ComponentKind::Or => {
            if !value && rising {
                set_value(structure, state, id, true);
            } else if value && !rising && !component.inputs.iter().any(|&input| state.get(input)) {
                set_value(structure, state, id, false);
            }
        }
        ComponentKind::Not => {
            if value == rising {
                set_value(structure, state, id, !rising);
            }
        }
        ComponentKind::True | ComponentKind::False | ComponentKind::Base | ComponentKind::Input => {}
    }
}

/// A true input of `id` from outside its cycle group.
fn has_outside_support(structure: &Structure, state: &InternalState, id: ComponentId) -> bool {
    let group = structure.component(id).group;
    structure
        .component(id)
        .inputs
        .iter()
        .any(|&input| structure.component(input).group != group && state.get(input))
}

/// Resettle the cycle group of `start` after it lost a true input.
///
/// Every member that may have been held up through `start` is forced false,
/// the group is raised again to its least fixpoint from the survivors, and
/// only the members that end up false are announced outside the group.
fn collapse(structure: &Structure, state: &mut InternalState, start: ComponentId) {
    let group = structure.component(start).group;
    state.set(start, false);
    let mut torn = vec![start];
    let mut cursor = 0;
    while let Some(&id) = torn.get(cursor) {
        cursor += 1;
        for &output in &structure.component(id).outputs {
            let component = structure.component(output);
            if component.group != group || !state.get(output) {
                continue;
            }
            if component.kind == ComponentKind::Or && has_outside_support(structure, state, output) {
                continue;
            }
            state.set(output, false);
            torn.push(output);
        }
    }

    let mut raised = true;
    while raised {
        raised = false;
        for &id in &torn {
            if !state.get(id) && evaluate_from_inputs(structure, state, id) {
                state.set(id, true);
                raised = true;
            }
        }
    }

    for &id in &torn {
        if state.get(id) {
            continue;
        }
        for &output in &structure.component(id).outputs {
            if structure.component(output).group != group {
                update_from_input(structure, state, output, false);
            }
        }
    }
}
