//! Error types for structure construction and state-machine queries.

use crate::structure::{ComponentId, ComponentKind, RoleId};
use thiserror::Error;

/// A circuit description that cannot be turned into a [`Structure`].
///
/// [`Structure`]: crate::structure::Structure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    /// A handle that was not issued by this builder.
    #[error("handle {0} does not name a component of this builder")]
    UnknownHandle(usize),
    /// A role index outside the declared roles.
    #[error("role {0} has not been declared")]
    UnknownRole(RoleId),
    /// The description declares no roles at all.
    #[error("the circuit declares no roles")]
    NoRoles,
    /// No terminal component was declared.
    #[error("no terminal component was declared")]
    MissingTerminal,
    /// A base proposition without a successor component.
    #[error("base `{label}` has no next component")]
    MissingNext {
        /// Label of the offending base.
        label: String,
    },
    /// `set_next` was called on something other than a base.
    #[error("handle {0} is not a base proposition")]
    NotABase(usize),
    /// `gate` was asked for a kind that is not computed from inputs.
    #[error("{0} components are not gates")]
    NotAGate(ComponentKind),
    /// A NOT or RELAY gate without exactly one input.
    #[error("{kind} component {handle} takes exactly one input, found {found}")]
    Arity {
        /// Builder handle of the gate.
        handle: usize,
        /// Kind of the gate.
        kind: ComponentKind,
        /// Number of inputs actually connected.
        found: usize,
    },
    /// A constant, base or input with a connected input.
    #[error("{kind} component {handle} cannot have inputs")]
    FixedWithInputs {
        /// Builder handle of the component.
        handle: usize,
        /// Kind of the component.
        kind: ComponentKind,
    },
    /// A move whose input handle is not an input component.
    #[error("move `{label}` of role `{role}` does not refer to an input component")]
    MoveWithoutInput {
        /// Role name.
        role: String,
        /// Move label.
        label: String,
    },
    /// An input that no move refers to.
    #[error("input component {0} is not attached to any move")]
    DanglingInput(usize),
    /// An input shared by two moves.
    #[error("input component {0} is attached to more than one move")]
    SharedInput(usize),
    /// Two moves of one role with the same label.
    #[error("role `{role}` declares move `{label}` twice")]
    DuplicateMove {
        /// Role name.
        role: String,
        /// Repeated label.
        label: String,
    },
    /// A goal value outside `0..=100`.
    #[error("goal value {value} of role `{role}` exceeds 100")]
    GoalOutOfRange {
        /// Role name.
        role: String,
        /// Declared value.
        value: u8,
    },
    /// A negation on a dependency cycle; the circuit has no minimal model.
    #[error("negation component {0} lies on a dependency cycle")]
    NegativeCycle(usize),
    /// A terminal, legal or goal component that reads a move input.
    #[error("{query} depends on input component {input}")]
    QueryDependsOnInput {
        /// Which query reads the input.
        query: String,
        /// Builder handle of the input.
        input: usize,
    },
}

/// A failed state-machine query or transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MachineError {
    /// A role with no legal move in a non-terminal state.
    #[error("role `{role}` has no legal moves")]
    NoLegalMoves {
        /// Role name.
        role: String,
    },
    /// Zero or several goal propositions hold for a role.
    #[error("role `{role}` satisfies {satisfied} goal propositions, expected exactly one")]
    NoUniqueGoal {
        /// Role name.
        role: String,
        /// Number of goal propositions that hold.
        satisfied: usize,
    },
    /// A non-cyclic component whose value could not be determined.
    #[error("non-cyclic component {0} could not be resolved")]
    Unresolved(ComponentId),
    /// A role index outside the structure's roles.
    #[error("role {0} is out of range")]
    UnknownRole(RoleId),
    /// A joint move with the wrong number of entries.
    #[error("joint move has {found} entries but the game has {expected} roles")]
    JointMoveArity {
        /// Number of roles.
        expected: usize,
        /// Number of moves supplied.
        found: usize,
    },
    /// A joint move entry placed in another role's slot.
    #[error("slot {slot} of the joint move holds a move of role {found}")]
    MoveRoleMismatch {
        /// Position in the joint move.
        slot: usize,
        /// Role the move belongs to.
        found: RoleId,
    },
    /// Only bases and inputs can be assigned directly.
    #[error("component {0} is neither a base nor an input")]
    NotAssignable(ComponentId),
}

/// Failure to load or save a circuit description.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Reading or writing the file failed.
    #[error("circuit file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not a valid circuit description.
    #[error("malformed circuit description: {0}")]
    Json(#[from] serde_json::Error),
    /// The description parsed but does not form a valid circuit.
    #[error("invalid circuit: {0}")]
    Structure(#[from] StructureError),
}

/// A strategy name that is not one of `pull`, `lazy` or `eager`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown strategy `{0}`, expected pull, lazy or eager")]
pub struct ParseStrategyError(pub String);

/// Result type for state-machine operations.
pub type MachineResult<T> = Result<T, MachineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_machine_error_display() {
        let err = MachineError::NoUniqueGoal {
            role: "white".to_string(),
            satisfied: 2,
        };
        assert_eq!(
            err.to_string(),
            "role `white` satisfies 2 goal propositions, expected exactly one"
        );
    }

    #[test]
    fn test_structure_error_display() {
        let err = StructureError::Arity {
            handle: 7,
            kind: ComponentKind::Not,
            found: 2,
        };
        assert_eq!(err.to_string(), "not component 7 takes exactly one input, found 2");
    }

    #[test]
    fn test_load_error_from_structure() {
        let err: LoadError = StructureError::MissingTerminal.into();
        assert!(err.to_string().contains("no terminal"));
    }
}
