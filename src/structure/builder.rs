//! Incremental construction and validation of a [`Structure`].
//!
//! Components are created in any order and referred to by [`Handle`]s. Gates
//! may be connected after creation, which is how cycles are expressed.
//! [`StructureBuilder::build`] checks the description, finds the cycle groups
//! and renumbers everything into topological order.

use super::{Base, Component, ComponentId, ComponentKind, GoalEntry, MoveEntry, Role, RoleId, Structure};
use crate::error::StructureError;
use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

/// Reference to a component under construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub(super) usize);

impl Handle {
    /// Position in creation order.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Node {
    kind: ComponentKind,
    inputs: Vec<Handle>,
}

#[derive(Debug, Clone)]
struct BaseDraft {
    handle: Handle,
    label: String,
    initial: bool,
    next: Option<Handle>,
}

#[derive(Debug, Clone)]
struct RoleDraft {
    name: String,
    moves: Vec<(String, Handle, Handle)>,
    goals: Vec<(Handle, u8)>,
}

/// Builder for propositional networks.
#[derive(Debug, Clone, Default)]
pub struct StructureBuilder {
    nodes: Vec<Node>,
    bases: Vec<BaseDraft>,
    base_slots: HashMap<Handle, usize>,
    roles: Vec<RoleDraft>,
    terminal: Option<Handle>,
}

type BuildResult<T> = Result<T, StructureError>;

impl StructureBuilder {
    /// Create an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of components created so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no component has been created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    fn push(&mut self, kind: ComponentKind, inputs: Vec<Handle>) -> Handle {
        self.nodes.push(Node { kind, inputs });
        Handle(self.nodes.len() - 1)
    }

    fn check(&self, handle: Handle) -> BuildResult<()> {
        if handle.0 < self.nodes.len() {
            Ok(())
        } else {
            Err(StructureError::UnknownHandle(handle.0))
        }
    }

    fn role_mut(&mut self, role: RoleId) -> BuildResult<&mut RoleDraft> {
        self.roles.get_mut(role).ok_or(StructureError::UnknownRole(role))
    }

    /// Declare a role and return its index.
    pub fn role(&mut self, name: impl Into<String>) -> RoleId {
        self.roles.push(RoleDraft {
            name: name.into(),
            moves: Vec::new(),
            goals: Vec::new(),
        });
        self.roles.len() - 1
    }

    /// A TRUE or FALSE constant.
    pub fn constant(&mut self, value: bool) -> Handle {
        let kind = if value { ComponentKind::True } else { ComponentKind::False };
        self.push(kind, Vec::new())
    }

    /// A base proposition; its next component is set with [`set_next`].
    ///
    /// [`set_next`]: StructureBuilder::set_next
    pub fn base(&mut self, label: impl Into<String>, initial: bool) -> Handle {
        let handle = self.push(ComponentKind::Base, Vec::new());
        self.base_slots.insert(handle, self.bases.len());
        self.bases.push(BaseDraft {
            handle,
            label: label.into(),
            initial,
            next: None,
        });
        handle
    }

    /// An input proposition, to be attached to a move with [`add_move`].
    ///
    /// [`add_move`]: StructureBuilder::add_move
    pub fn input(&mut self) -> Handle {
        self.push(ComponentKind::Input, Vec::new())
    }

    /// A gate of any kind with the given inputs.
    ///
    /// # Errors
    ///
    /// Fails if `kind` is not a gate or an input handle is unknown.
    pub fn gate(
        &mut self,
        kind: ComponentKind,
        inputs: impl IntoIterator<Item = Handle>,
    ) -> BuildResult<Handle> {
        if !kind.is_gate() {
            return Err(StructureError::NotAGate(kind));
        }
        let inputs: Vec<Handle> = inputs.into_iter().collect();
        for &input in &inputs {
            self.check(input)?;
        }
        Ok(self.push(kind, inputs))
    }

    /// Conjunction of `inputs`.
    ///
    /// # Errors
    ///
    /// Fails if an input handle is unknown.
    pub fn and(&mut self, inputs: impl IntoIterator<Item = Handle>) -> BuildResult<Handle> {
        self.gate(ComponentKind::And, inputs)
    }

    /// Disjunction of `inputs`.
    ///
    /// # Errors
    ///
    /// Fails if an input handle is unknown.
    pub fn or(&mut self, inputs: impl IntoIterator<Item = Handle>) -> BuildResult<Handle> {
        self.gate(ComponentKind::Or, inputs)
    }

    /// Negation of `input`.
    ///
    /// # Errors
    ///
    /// Fails if the handle is unknown.
    pub fn not(&mut self, input: Handle) -> BuildResult<Handle> {
        self.gate(ComponentKind::Not, [input])
    }

    /// Copy of `input`.
    ///
    /// # Errors
    ///
    /// Fails if the handle is unknown.
    pub fn relay(&mut self, input: Handle) -> BuildResult<Handle> {
        self.gate(ComponentKind::Relay, [input])
    }

    /// Append `source` to the inputs of the gate `target`.
    ///
    /// # Errors
    ///
    /// Fails if either handle is unknown or `target` is not a gate.
    pub fn connect(&mut self, target: Handle, source: Handle) -> BuildResult<()> {
        self.check(target)?;
        self.check(source)?;
        let node = &mut self.nodes[target.0];
        if !node.kind.is_gate() {
            return Err(StructureError::FixedWithInputs {
                handle: target.0,
                kind: node.kind,
            });
        }
        node.inputs.push(source);
        Ok(())
    }

    /// Set the component whose value a base takes in the successor state.
    ///
    /// # Errors
    ///
    /// Fails if `base` is not a base or `next` is unknown.
    pub fn set_next(&mut self, base: Handle, next: Handle) -> BuildResult<()> {
        self.check(next)?;
        let slot = *self
            .base_slots
            .get(&base)
            .ok_or(StructureError::NotABase(base.0))?;
        self.bases[slot].next = Some(next);
        Ok(())
    }

    /// Attach an existing input component to a new move of `role`.
    ///
    /// # Errors
    ///
    /// Fails if the role or a handle is unknown.
    pub fn add_move(
        &mut self,
        role: RoleId,
        label: impl Into<String>,
        legal: Handle,
        input: Handle,
    ) -> BuildResult<()> {
        self.check(legal)?;
        self.check(input)?;
        self.role_mut(role)?.moves.push((label.into(), legal, input));
        Ok(())
    }

    /// Create the input component for a new move of `role` and return it.
    ///
    /// # Errors
    ///
    /// Fails if the role or the legal handle is unknown.
    pub fn legal_move(
        &mut self,
        role: RoleId,
        label: impl Into<String>,
        legal: Handle,
    ) -> BuildResult<Handle> {
        self.check(legal)?;
        self.role_mut(role)?;
        let input = self.input();
        self.add_move(role, label, legal, input)?;
        Ok(input)
    }

    /// Declare that `component` holding gives `role` the payoff `value`.
    ///
    /// # Errors
    ///
    /// Fails if the role or handle is unknown.
    pub fn goal(&mut self, role: RoleId, component: Handle, value: u8) -> BuildResult<()> {
        self.check(component)?;
        self.role_mut(role)?.goals.push((component, value));
        Ok(())
    }

    /// Declare the terminal component.
    ///
    /// # Errors
    ///
    /// Fails if the handle is unknown.
    pub fn terminal(&mut self, component: Handle) -> BuildResult<()> {
        self.check(component)?;
        self.terminal = Some(component);
        Ok(())
    }

    /// Validate the description and compile it into a [`Structure`].
    ///
    /// # Errors
    ///
    /// Returns the first [`StructureError`] found.
    pub fn build(self) -> BuildResult<Structure> {
        self.validate()?;
        let terminal = self.terminal.ok_or(StructureError::MissingTerminal)?;

        let (order, cyclic, groups) = self.condense();
        let mut ids = vec![0; self.nodes.len()];
        for (id, handle) in order.iter().enumerate() {
            ids[handle.0] = id;
        }
        let id_of = |handle: Handle| ids[handle.0];

        let mut components: Vec<Component> = order
            .iter()
            .enumerate()
            .map(|(id, &handle)| {
                let node = &self.nodes[handle.0];
                Component {
                    id,
                    kind: node.kind,
                    inputs: node.inputs.iter().map(|&input| id_of(input)).collect(),
                    outputs: Vec::new(),
                    cyclic: cyclic[handle.0].is_some(),
                    group: cyclic[handle.0],
                }
            })
            .collect();
        for id in 0..components.len() {
            for position in 0..components[id].inputs.len() {
                let input = components[id].inputs[position];
                if !components[input].outputs.contains(&id) {
                    components[input].outputs.push(id);
                }
            }
        }

        if let Some(negation) = order
            .iter()
            .find(|&&handle| self.nodes[handle.0].kind == ComponentKind::Not && cyclic[handle.0].is_some())
        {
            return Err(StructureError::NegativeCycle(negation.0));
        }

        let bases = self
            .bases
            .iter()
            .map(|draft| {
                let next = draft.next.ok_or_else(|| StructureError::MissingNext {
                    label: draft.label.clone(),
                })?;
                Ok(Base {
                    id: id_of(draft.handle),
                    next: id_of(next),
                    initial: draft.initial,
                    label: draft.label.clone(),
                })
            })
            .collect::<BuildResult<Vec<_>>>()?;

        let mut move_lookup = Vec::with_capacity(self.roles.len());
        let roles = self
            .roles
            .iter()
            .map(|draft| {
                let mut lookup = HashMap::new();
                for (index, (label, _, _)) in draft.moves.iter().enumerate() {
                    lookup.insert(label.clone(), index);
                }
                move_lookup.push(lookup);
                Role {
                    name: draft.name.clone(),
                    moves: draft
                        .moves
                        .iter()
                        .map(|(label, legal, input)| MoveEntry {
                            label: label.clone(),
                            legal: id_of(*legal),
                            input: id_of(*input),
                        })
                        .collect(),
                    goals: draft
                        .goals
                        .iter()
                        .map(|&(component, value)| GoalEntry {
                            component: id_of(component),
                            value,
                        })
                        .collect(),
                }
            })
            .collect();

        let mut inputs: Vec<ComponentId> = components
            .iter()
            .filter(|component| component.kind == ComponentKind::Input)
            .map(|component| component.id)
            .collect();
        inputs.sort_unstable();
        let terminal = id_of(terminal);

        let structure = Structure {
            components,
            roles,
            bases,
            inputs,
            terminal,
            groups,
            handles: ids,
            move_lookup,
        };
        check_queries_ignore_inputs(&structure, &order)?;

        tracing::debug!(
            components = structure.len(),
            cycle_groups = groups,
            "compiled propositional network"
        );
        Ok(structure)
    }

    fn validate(&self) -> BuildResult<()> {
        if self.roles.is_empty() {
            return Err(StructureError::NoRoles);
        }
        if self.terminal.is_none() {
            return Err(StructureError::MissingTerminal);
        }
        for (index, node) in self.nodes.iter().enumerate() {
            if node.kind.is_unary() && node.inputs.len() != 1 {
                return Err(StructureError::Arity {
                    handle: index,
                    kind: node.kind,
                    found: node.inputs.len(),
                });
            }
            if !node.kind.is_gate() && !node.inputs.is_empty() {
                return Err(StructureError::FixedWithInputs {
                    handle: index,
                    kind: node.kind,
                });
            }
        }
        if let Some(draft) = self.bases.iter().find(|draft| draft.next.is_none()) {
            return Err(StructureError::MissingNext {
                label: draft.label.clone(),
            });
        }

        let mut attached = vec![false; self.nodes.len()];
        for role in &self.roles {
            let mut labels = HashSet::new();
            for (label, _, input) in &role.moves {
                if !labels.insert(label.as_str()) {
                    return Err(StructureError::DuplicateMove {
                        role: role.name.clone(),
                        label: label.clone(),
                    });
                }
                if self.nodes[input.0].kind != ComponentKind::Input {
                    return Err(StructureError::MoveWithoutInput {
                        role: role.name.clone(),
                        label: label.clone(),
                    });
                }
                if attached[input.0] {
                    return Err(StructureError::SharedInput(input.0));
                }
                attached[input.0] = true;
            }
            if let Some(&(_, value)) = role.goals.iter().find(|&&(_, value)| value > 100) {
                return Err(StructureError::GoalOutOfRange {
                    role: role.name.clone(),
                    value,
                });
            }
        }
        if let Some(index) = self
            .nodes
            .iter()
            .enumerate()
            .position(|(index, node)| node.kind == ComponentKind::Input && !attached[index])
        {
            return Err(StructureError::DanglingInput(index));
        }
        Ok(())
    }

    /// Topological order of handles, the cycle group of each handle, and the
    /// number of groups.
    fn condense(&self) -> (Vec<Handle>, Vec<Option<usize>>, usize) {
        let mut graph = DiGraph::<(), ()>::with_capacity(self.nodes.len(), self.nodes.len() * 2);
        let nodes: Vec<NodeIndex> = (0..self.nodes.len()).map(|_| graph.add_node(())).collect();
        for (index, node) in self.nodes.iter().enumerate() {
            for input in &node.inputs {
                graph.add_edge(nodes[input.0], nodes[index], ());
            }
        }

        let mut components = kosaraju_scc(&graph);
        components.reverse();

        let mut order = Vec::with_capacity(self.nodes.len());
        let mut cyclic = vec![None; self.nodes.len()];
        let mut groups = 0;
        for mut members in components {
            members.sort_unstable_by_key(|node| node.index());
            let looped = members.len() > 1 || {
                let only = members[0].index();
                self.nodes[only].inputs.contains(&Handle(only))
            };
            for node in &members {
                if looped {
                    cyclic[node.index()] = Some(groups);
                }
                order.push(Handle(node.index()));
            }
            if looped {
                groups += 1;
            }
        }
        (order, cyclic, groups)
    }
}

/// Terminal, legal and goal propositions must be functions of the bases alone.
fn check_queries_ignore_inputs(structure: &Structure, order: &[Handle]) -> BuildResult<()> {
    let queries = [
        ("terminal", structure.cone([structure.terminal()])),
        ("legal", structure.cone(structure.legal_components())),
        ("goal", structure.cone(structure.goal_components())),
    ];
    for (query, cone) in queries {
        if let Some(&input) = structure.inputs().iter().find(|&&input| cone.get(input)) {
            return Err(StructureError::QueryDependsOnInput {
                query: query.to_string(),
                input: order[input].index(),
            });
        }
    }
    Ok(())
}
