//! The immutable compiled circuit shared by every state of a game.
//!
//! Component ids are a topological order of the circuit's condensation:
//! outside cycles every component comes after all of its inputs, and the
//! members of one cycle group occupy a contiguous run of ids.

mod blueprint;
mod builder;
mod component;

pub use blueprint::{Blueprint, ComponentSpec, GoalSpec, MoveSpec, RoleSpec};
pub use builder::{Handle, StructureBuilder};
pub use component::{Base, Component, ComponentId, ComponentKind, GoalEntry, MoveEntry, Role, RoleId};

use crate::state::Bits;
use serde::Serialize;
use std::collections::HashMap;

/// A validated propositional network.
#[derive(Debug, Clone)]
pub struct Structure {
    /// Every component, indexed by id.
    components: Vec<Component>,

    /// Roles in declaration order.
    roles: Vec<Role>,

    /// Base propositions in declaration order.
    bases: Vec<Base>,

    /// Input component ids, ascending.
    inputs: Vec<ComponentId>,

    /// The terminal component.
    terminal: ComponentId,

    /// Number of cycle groups.
    groups: usize,

    /// Builder handle index to component id.
    handles: Vec<ComponentId>,

    /// Per role, move label to move index.
    move_lookup: Vec<HashMap<String, usize>>,
}

/// Summary counts of a structure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StructureStats {
    /// All components.
    pub components: usize,
    /// Input-to-output connections.
    pub edges: usize,
    /// Base propositions.
    pub bases: usize,
    /// Input propositions.
    pub inputs: usize,
    /// TRUE and FALSE constants.
    pub constants: usize,
    /// AND gates.
    pub ands: usize,
    /// OR gates.
    pub ors: usize,
    /// NOT gates.
    pub nots: usize,
    /// RELAY gates.
    pub relays: usize,
    /// Components on a dependency cycle.
    pub cyclic: usize,
    /// Strongly connected groups of cyclic components.
    pub cycle_groups: usize,
    /// Roles.
    pub roles: usize,
    /// Moves over all roles.
    pub moves: usize,
}

impl Structure {
    /// Number of components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Whether the structure has no components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Every component in id order.
    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// One component.
    ///
    /// # Panics
    ///
    /// Panics if `id` is out of range.
    #[inline]
    #[must_use]
    pub fn component(&self, id: ComponentId) -> &Component {
        &self.components[id]
    }

    /// Roles in declaration order.
    #[must_use]
    pub fn roles(&self) -> &[Role] {
        &self.roles
    }

    /// One role, if it exists.
    #[must_use]
    pub fn role(&self, role: RoleId) -> Option<&Role> {
        self.roles.get(role)
    }

    /// Base propositions in declaration order.
    #[must_use]
    pub fn bases(&self) -> &[Base] {
        &self.bases
    }

    /// The base with the given label.
    #[must_use]
    pub fn base_by_label(&self, label: &str) -> Option<&Base> {
        self.bases.iter().find(|base| base.label == label)
    }

    /// Input component ids, ascending.
    #[must_use]
    pub fn inputs(&self) -> &[ComponentId] {
        &self.inputs
    }

    /// The terminal component.
    #[must_use]
    pub fn terminal(&self) -> ComponentId {
        self.terminal
    }

    /// Whether any component lies on a cycle.
    #[must_use]
    pub fn is_cyclic(&self) -> bool {
        self.groups > 0
    }

    /// Number of cycle groups.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups
    }

    /// Component id assigned to a builder handle.
    ///
    /// # Panics
    ///
    /// Panics if the handle was issued by a different builder.
    #[must_use]
    pub fn resolve(&self, handle: Handle) -> ComponentId {
        self.handles[handle.index()]
    }

    /// Index of a role's move by label.
    #[must_use]
    pub fn move_index(&self, role: RoleId, label: &str) -> Option<usize> {
        self.move_lookup.get(role)?.get(label).copied()
    }

    /// Legal components of every role.
    pub fn legal_components(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.roles
            .iter()
            .flat_map(|role| role.moves.iter().map(|entry| entry.legal))
    }

    /// Goal components of every role.
    pub fn goal_components(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.roles
            .iter()
            .flat_map(|role| role.goals.iter().map(|goal| goal.component))
    }

    /// Next components of every base.
    pub fn next_components(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.bases.iter().map(|base| base.next)
    }

    /// The seeds and everything they transitively read.
    #[must_use]
    pub fn cone(&self, seeds: impl IntoIterator<Item = ComponentId>) -> Bits {
        let mut cone = Bits::new(self.len());
        let mut pending: Vec<ComponentId> = Vec::new();
        for seed in seeds {
            if !cone.get(seed) {
                cone.insert(seed);
                pending.push(seed);
            }
        }
        while let Some(id) = pending.pop() {
            for &input in &self.components[id].inputs {
                if !cone.get(input) {
                    cone.insert(input);
                    pending.push(input);
                }
            }
        }
        cone
    }

    /// Everything that transitively reads `id`, excluding `id` itself unless
    /// it lies on a cycle through itself.
    #[must_use]
    pub fn downstream(&self, id: ComponentId) -> Bits {
        let mut reached = Bits::new(self.len());
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            for &output in &self.components[current].outputs {
                if !reached.get(output) {
                    reached.insert(output);
                    pending.push(output);
                }
            }
        }
        reached
    }

    /// Summary counts.
    #[must_use]
    pub fn stats(&self) -> StructureStats {
        let mut stats = StructureStats {
            components: self.len(),
            bases: self.bases.len(),
            inputs: self.inputs.len(),
            cycle_groups: self.groups,
            roles: self.roles.len(),
            moves: self.roles.iter().map(|role| role.moves.len()).sum(),
            ..StructureStats::default()
        };
        for component in &self.components {
            stats.edges += component.inputs.len();
            if component.cyclic {
                stats.cyclic += 1;
            }
            match component.kind {
                ComponentKind::True | ComponentKind::False => stats.constants += 1,
                ComponentKind::And => stats.ands += 1,
                ComponentKind::Or => stats.ors += 1,
                ComponentKind::Not => stats.nots += 1,
                ComponentKind::Relay => stats.relays += 1,
                ComponentKind::Base | ComponentKind::Input => {}
            }
        }
        stats
    }
}
