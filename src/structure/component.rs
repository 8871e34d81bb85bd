//! Circuit components and the per-role tables that index into them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense index of a component; also its position in every state.
pub type ComponentId = usize;

/// Index of a role in declaration order.
pub type RoleId = usize;

/// What a component computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    /// Constant true.
    True,
    /// Constant false.
    False,
    /// Conjunction of its inputs.
    And,
    /// Disjunction of its inputs.
    Or,
    /// Negation of its single input.
    Not,
    /// Copy of its single input.
    Relay,
    /// A state proposition, written only by transitions.
    Base,
    /// A move proposition, written only when a joint move is applied.
    Input,
}

impl ComponentKind {
    /// Whether the component's value is computed from inputs.
    #[must_use]
    pub const fn is_gate(self) -> bool {
        matches!(
            self,
            ComponentKind::And | ComponentKind::Or | ComponentKind::Not | ComponentKind::Relay
        )
    }

    /// Whether the gate takes exactly one input.
    #[must_use]
    pub const fn is_unary(self) -> bool {
        matches!(self, ComponentKind::Not | ComponentKind::Relay)
    }

    /// Lowercase name used in messages and circuit files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            ComponentKind::True => "true",
            ComponentKind::False => "false",
            ComponentKind::And => "and",
            ComponentKind::Or => "or",
            ComponentKind::Not => "not",
            ComponentKind::Relay => "relay",
            ComponentKind::Base => "base",
            ComponentKind::Input => "input",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A node of the compiled circuit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Position in the topological order.
    pub id: ComponentId,
    /// What the component computes.
    pub kind: ComponentKind,
    /// Components read by this one, in declaration order.
    pub inputs: Vec<ComponentId>,
    /// Components reading this one, ascending.
    pub outputs: Vec<ComponentId>,
    /// Whether the component lies on a dependency cycle.
    pub cyclic: bool,
    /// Cycle group of a cyclic component; all members of one strongly
    /// connected component share it.
    pub group: Option<usize>,
}

/// A state proposition and the component that computes its next value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base {
    /// The base component.
    pub id: ComponentId,
    /// Component read when computing the successor state.
    pub next: ComponentId,
    /// Value in the initial state.
    pub initial: bool,
    /// Human-readable proposition, e.g. `(cell 1 1 x)`.
    pub label: String,
}

/// One move of a role: its legality proposition and its input proposition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveEntry {
    /// Move name, unique within the role.
    pub label: String,
    /// Component that holds when the move is legal.
    pub legal: ComponentId,
    /// Input component set when the move is played.
    pub input: ComponentId,
}

/// A goal proposition and the payoff it stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalEntry {
    /// Component that holds when the payoff applies.
    pub component: ComponentId,
    /// Payoff in `0..=100`.
    pub value: u8,
}

/// A player with its moves and payoffs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    /// Role name.
    pub name: String,
    /// Moves in declaration order.
    pub moves: Vec<MoveEntry>,
    /// Goal propositions in declaration order.
    pub goals: Vec<GoalEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_kinds() {
        assert!(ComponentKind::And.is_gate());
        assert!(ComponentKind::Relay.is_gate());
        assert!(!ComponentKind::Base.is_gate());
        assert!(!ComponentKind::True.is_gate());
        assert!(ComponentKind::Not.is_unary());
        assert!(!ComponentKind::Or.is_unary());
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        let json = serde_json::to_string(&ComponentKind::Relay).unwrap();
        assert_eq!(json, "\"relay\"");
        assert_eq!(ComponentKind::Input.to_string(), "input");
    }
}
