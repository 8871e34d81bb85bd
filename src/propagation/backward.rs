//! On-demand evaluation: nothing is pushed when bases or inputs change; every
//! query walks backwards from the requested components and caches what it
//! computes until the next change resets the cache.
//!
//! The walk uses an explicit frame stack. Results carry two flags: the value,
//! and whether the value is resolved. Re-entering a cyclic component that is
//! already on the stack yields "false, unresolved". An unresolved result is
//! never cached, except at the frame that first entered its cycle group: at
//! that point every assumption made inside the group has been discharged and
//! the value is the least fixpoint.

use super::{Propagator, Strategy};
use crate::error::{MachineError, MachineResult};
use crate::state::{Bits, InternalState};
use crate::structure::{ComponentId, ComponentKind, RoleId, Structure};

const TRUE: u8 = 0b01;
const RESOLVED: u8 = 0b10;

/// Pull-based propagator.
#[derive(Debug, Clone)]
pub struct BackwardPropagator {
    /// Validity of the base-state template: constants, bases and inputs.
    fixed: Bits,
}

#[derive(Debug, Clone, Copy)]
struct Frame {
    id: ComponentId,
    /// Position of the next input to examine.
    next: usize,
    flags: u8,
    /// First member of its cycle group on the stack.
    root: bool,
}

/// Caller-local traversal state for one query.
#[derive(Debug)]
struct Scratch {
    stack: Vec<Frame>,
    visiting: Bits,
    /// Per cycle group, how many members are on the stack.
    open: Vec<u32>,
}

impl Scratch {
    fn new(structure: &Structure) -> Self {
        let tracked = if structure.is_cyclic() { structure.len() } else { 0 };
        Scratch {
            stack: Vec::with_capacity(32),
            visiting: Bits::new(tracked),
            open: vec![0; structure.group_count()],
        }
    }
}

impl BackwardPropagator {
    /// Create the propagator for `structure`.
    #[must_use]
    pub fn new(structure: &Structure) -> Self {
        BackwardPropagator {
            fixed: InternalState::template(structure).validity().clone(),
        }
    }

    /// Evaluate one component, caching everything resolved on the way.
    ///
    /// # Errors
    ///
    /// Returns [`MachineError::Unresolved`] if a non-cyclic component depends
    /// on an unresolved cyclic value.
    pub fn evaluate(
        &self,
        structure: &Structure,
        state: &mut InternalState,
        id: ComponentId,
    ) -> MachineResult<bool> {
        let mut scratch = Scratch::new(structure);
        let flags = evaluate_with(structure, state, &mut scratch, id)?;
        Ok(flags & TRUE != 0)
    }

    fn evaluate_all(
        structure: &Structure,
        state: &mut InternalState,
        ids: impl IntoIterator<Item = ComponentId>,
    ) -> MachineResult<()> {
        let mut scratch = Scratch::new(structure);
        for id in ids {
            evaluate_with(structure, state, &mut scratch, id)?;
        }
        Ok(())
    }
}

impl Propagator for BackwardPropagator {
    fn strategy(&self) -> Strategy {
        Strategy::Pull
    }

    fn change_base_or_input(
        &self,
        _structure: &Structure,
        state: &mut InternalState,
        id: ComponentId,
        value: bool,
    ) {
        state.set(id, value);
    }

    fn inputs_changed(&self, _structure: &Structure, state: &mut InternalState) {
        state.reset_validity(&self.fixed);
    }

    fn compute_component(
        &self,
        structure: &Structure,
        state: &mut InternalState,
        id: ComponentId,
    ) -> MachineResult<()> {
        Self::evaluate_all(structure, state, [id])
    }

    fn compute_terminal(&self, structure: &Structure, state: &mut InternalState) -> MachineResult<()> {
        Self::evaluate_all(structure, state, [structure.terminal()])
    }

    fn compute_legals(
        &self,
        structure: &Structure,
        state: &mut InternalState,
        role: RoleId,
    ) -> MachineResult<()> {
        let entries = &structure.role(role).ok_or(MachineError::UnknownRole(role))?.moves;
        Self::evaluate_all(structure, state, entries.iter().map(|entry| entry.legal))
    }

    fn compute_goals(
        &self,
        structure: &Structure,
        state: &mut InternalState,
        role: RoleId,
    ) -> MachineResult<()> {
        let goals = &structure.role(role).ok_or(MachineError::UnknownRole(role))?.goals;
        Self::evaluate_all(structure, state, goals.iter().map(|goal| goal.component))
    }

    fn compute_transitions(&self, structure: &Structure, state: &mut InternalState) -> MachineResult<()> {
        Self::evaluate_all(structure, state, structure.next_components())
    }

    fn transition_finished(&self, _structure: &Structure, state: &mut InternalState) {
        state.reset_validity(&self.fixed);
    }
}

fn evaluate_with(
    structure: &Structure,
    state: &mut InternalState,
    scratch: &mut Scratch,
    target: ComponentId,
) -> MachineResult<u8> {
    if let Some(flags) = enter(structure, state, scratch, target) {
        return Ok(flags);
    }
    let mut returned = None;
    loop {
        let top = scratch.stack.len() - 1;
        let frame = &mut scratch.stack[top];
        let component = structure.component(frame.id);
        let decided = match returned.take() {
            Some(child) => absorb(component.kind, frame, child),
            None => false,
        };
        if !decided && frame.next < component.inputs.len() {
            let input = component.inputs[frame.next];
            returned = enter(structure, state, scratch, input);
            continue;
        }

        let frame = scratch.stack[top];
        scratch.stack.truncate(top);
        let flags = leave(structure, state, scratch, frame)?;
        if scratch.stack.is_empty() {
            return Ok(flags);
        }
        returned = Some(flags);
    }
}

/// Flags of `id` if known without descending, otherwise push its frame.
fn enter(
    structure: &Structure,
    state: &InternalState,
    scratch: &mut Scratch,
    id: ComponentId,
) -> Option<u8> {
    if state.is_valid(id) || !structure.component(id).kind.is_gate() {
        return Some(RESOLVED | u8::from(state.get(id)));
    }
    let component = structure.component(id);
    let root = match component.group {
        Some(group) => {
            if scratch.visiting.get(id) {
                return Some(0);
            }
            scratch.visiting.insert(id);
            scratch.open[group] += 1;
            scratch.open[group] == 1
        }
        None => false,
    };
    let flags = match component.kind {
        ComponentKind::And => TRUE | RESOLVED,
        ComponentKind::Or => RESOLVED,
        _ => 0,
    };
    scratch.stack.push(Frame {
        id,
        next: 0,
        flags,
        root,
    });
    None
}

/// Fold a child's flags into its parent frame; true once the parent is decided.
fn absorb(kind: ComponentKind, frame: &mut Frame, child: u8) -> bool {
    match kind {
        ComponentKind::And => {
            frame.flags &= child;
            frame.next += 1;
            if frame.flags & TRUE == 0 {
                frame.flags |= child;
                return true;
            }
            false
        }
        ComponentKind::Or => {
            frame.flags = (frame.flags & child) | (child & TRUE);
            frame.next += 1;
            if frame.flags & TRUE != 0 {
                frame.flags |= child;
                return true;
            }
            false
        }
        ComponentKind::Not => {
            frame.flags = child ^ TRUE;
            true
        }
        _ => {
            frame.flags = child;
            true
        }
    }
}

/// Pop bookkeeping for a finished frame and cache its value when allowed.
fn leave(
    structure: &Structure,
    state: &mut InternalState,
    scratch: &mut Scratch,
    frame: Frame,
) -> MachineResult<u8> {
    let component = structure.component(frame.id);
    if let Some(group) = component.group {
        scratch.visiting.remove(frame.id);
        scratch.open[group] -= 1;
    }
    if frame.flags & RESOLVED != 0 || frame.root {
        state.set(frame.id, frame.flags & TRUE != 0);
        state.set_valid(frame.id);
        Ok(frame.flags | RESOLVED)
    } else if component.group.is_some() {
        Ok(frame.flags)
    } else {
        Err(MachineError::Unresolved(frame.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::{Handle, StructureBuilder};

    struct Latch {
        structure: Structure,
        ext: ComponentId,
        held: ComponentId,
        echo: ComponentId,
        off: ComponentId,
    }

    /// `held = OR(echo, ext)`, `echo = RELAY(held)`, `off = NOT(held)`.
    fn latch() -> Latch {
        let mut builder = StructureBuilder::new();
        let role = builder.role("solo");
        let ext = builder.base("ext", false);
        builder.set_next(ext, ext).unwrap();
        let always = builder.constant(true);
        builder.legal_move(role, "wait", always).unwrap();
        let held = builder.or([ext]).unwrap();
        let echo = builder.relay(held).unwrap();
        builder.connect(held, echo).unwrap();
        let off = builder.not(held).unwrap();
        builder.terminal(off).unwrap();
        let structure = builder.build().unwrap();
        let id = |handle: Handle| structure.resolve(handle);
        Latch {
            ext: id(ext),
            held: id(held),
            echo: id(echo),
            off: id(off),
            structure,
        }
    }

    #[test]
    fn test_acyclic_evaluation_caches() {
        let mut builder = StructureBuilder::new();
        let role = builder.role("solo");
        let p = builder.base("p", true);
        let q = builder.base("q", true);
        builder.set_next(p, p).unwrap();
        builder.set_next(q, q).unwrap();
        let always = builder.constant(true);
        builder.legal_move(role, "wait", always).unwrap();
        let both = builder.and([p, q]).unwrap();
        let neither = builder.not(both).unwrap();
        builder.terminal(neither).unwrap();
        let structure = builder.build().unwrap();

        let propagator = BackwardPropagator::new(&structure);
        let mut state = InternalState::template(&structure);
        state.set(structure.resolve(p), true);
        state.set(structure.resolve(q), true);
        assert!(!propagator.evaluate(&structure, &mut state, structure.resolve(neither)).unwrap());
        assert!(state.is_valid(structure.resolve(both)));
        assert!(state.get(structure.resolve(both)));

        propagator.inputs_changed(&structure, &mut state);
        assert!(!state.is_valid(structure.resolve(both)));
        assert!(state.is_valid(structure.resolve(p)));
    }

    #[test]
    fn test_and_short_circuits() {
        let mut builder = StructureBuilder::new();
        let role = builder.role("solo");
        let p = builder.base("p", false);
        let q = builder.base("q", true);
        builder.set_next(p, p).unwrap();
        builder.set_next(q, q).unwrap();
        let always = builder.constant(true);
        builder.legal_move(role, "wait", always).unwrap();
        let lhs = builder.relay(p).unwrap();
        let rhs = builder.relay(q).unwrap();
        let both = builder.and([lhs, rhs]).unwrap();
        builder.terminal(both).unwrap();
        let structure = builder.build().unwrap();

        let propagator = BackwardPropagator::new(&structure);
        let mut state = InternalState::template(&structure);
        state.set(structure.resolve(q), true);
        assert!(!propagator.evaluate(&structure, &mut state, structure.resolve(both)).unwrap());
        assert!(state.is_valid(structure.resolve(lhs)));
        assert!(!state.is_valid(structure.resolve(rhs)));
    }

    #[test]
    fn test_cycle_without_support_is_false() {
        let latch = latch();
        let propagator = BackwardPropagator::new(&latch.structure);
        let mut state = InternalState::template(&latch.structure);
        assert!(!propagator.evaluate(&latch.structure, &mut state, latch.held).unwrap());
        assert!(state.is_valid(latch.held));
        // The relay was only ever seen under the assumption and stays stale.
        assert!(!state.is_valid(latch.echo));
        assert!(!propagator.evaluate(&latch.structure, &mut state, latch.echo).unwrap());
        assert!(propagator.evaluate(&latch.structure, &mut state, latch.off).unwrap());
    }

    #[test]
    fn test_cycle_with_support_is_true() {
        let latch = latch();
        let propagator = BackwardPropagator::new(&latch.structure);
        let mut state = InternalState::template(&latch.structure);
        state.set(latch.ext, true);
        assert!(!propagator.evaluate(&latch.structure, &mut state, latch.off).unwrap());
        assert!(state.get(latch.held));
        assert!(propagator.evaluate(&latch.structure, &mut state, latch.echo).unwrap());
    }

    #[test]
    fn test_chained_cycles_resolve() {
        // An upstream cycle read, through a plain relay, from inside a
        // downstream cycle that is still open on the stack.
        let mut builder = StructureBuilder::new();
        let role = builder.role("solo");
        let ext = builder.base("ext", false);
        builder.set_next(ext, ext).unwrap();
        let always = builder.constant(true);
        builder.legal_move(role, "wait", always).unwrap();
        let upstream = builder.or([ext]).unwrap();
        let upstream_echo = builder.relay(upstream).unwrap();
        builder.connect(upstream, upstream_echo).unwrap();
        let bridge = builder.relay(upstream).unwrap();
        let downstream = builder.or([bridge]).unwrap();
        let downstream_echo = builder.relay(downstream).unwrap();
        builder.connect(downstream, downstream_echo).unwrap();
        builder.terminal(downstream).unwrap();
        let structure = builder.build().unwrap();
        assert_eq!(structure.group_count(), 2);

        let propagator = BackwardPropagator::new(&structure);
        let target = structure.resolve(downstream);
        let mut state = InternalState::template(&structure);
        assert!(!propagator.evaluate(&structure, &mut state, target).unwrap());
        assert!(state.is_valid(structure.resolve(bridge)));

        let mut state = InternalState::template(&structure);
        state.set(structure.resolve(ext), true);
        assert!(propagator.evaluate(&structure, &mut state, target).unwrap());
    }
}
