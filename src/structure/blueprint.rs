//! Serializable circuit descriptions.
//!
//! A blueprint lists components by position; every reference inside it
//! (gate inputs, base successors, move and goal propositions, the terminal)
//! is an index into `components`.

use super::{ComponentKind, Handle, Structure, StructureBuilder};
use crate::error::{LoadError, StructureError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A complete circuit description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blueprint {
    /// Roles in order.
    pub roles: Vec<RoleSpec>,
    /// Components by position.
    pub components: Vec<ComponentSpec>,
    /// Position of the terminal component.
    pub terminal: usize,
}

/// A role with its moves and goals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSpec {
    /// Role name.
    pub name: String,
    /// Moves of the role.
    #[serde(default)]
    pub moves: Vec<MoveSpec>,
    /// Goal propositions of the role.
    #[serde(default)]
    pub goals: Vec<GoalSpec>,
}

/// A move: label, legality proposition and input proposition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveSpec {
    /// Move name.
    pub label: String,
    /// Position of the legal component.
    pub legal: usize,
    /// Position of the input component.
    pub input: usize,
}

/// A payoff and the proposition granting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalSpec {
    /// Position of the goal component.
    pub component: usize,
    /// Payoff in `0..=100`.
    pub value: u8,
}

/// One component of a blueprint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ComponentSpec {
    /// Constant true.
    True,
    /// Constant false.
    False,
    /// Conjunction.
    And {
        /// Input positions.
        inputs: Vec<usize>,
    },
    /// Disjunction.
    Or {
        /// Input positions.
        inputs: Vec<usize>,
    },
    /// Negation.
    Not {
        /// Input position.
        input: usize,
    },
    /// Copy.
    Relay {
        /// Input position.
        input: usize,
    },
    /// State proposition.
    Base {
        /// Proposition text.
        label: String,
        /// Value in the initial state.
        #[serde(default)]
        initial: bool,
        /// Position of the next component.
        next: usize,
    },
    /// Move proposition.
    Input,
}

impl Blueprint {
    /// Read a blueprint from a JSON file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read or is not a blueprint.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Write the blueprint to a JSON file.
    ///
    /// # Errors
    ///
    /// Fails if serialization or the write fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), LoadError> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }

    /// Validate and compile the described circuit.
    ///
    /// # Errors
    ///
    /// Fails if a position is out of range or the circuit is malformed.
    pub fn to_structure(&self) -> Result<Structure, StructureError> {
        let mut builder = StructureBuilder::new();
        let count = self.components.len();
        let handle = |position: usize| {
            if position < count {
                Ok(Handle(position))
            } else {
                Err(StructureError::UnknownHandle(position))
            }
        };

        for spec in &self.components {
            match spec {
                ComponentSpec::True => {
                    builder.constant(true);
                }
                ComponentSpec::False => {
                    builder.constant(false);
                }
                ComponentSpec::And { .. } => {
                    builder.gate(ComponentKind::And, Vec::new())?;
                }
                ComponentSpec::Or { .. } => {
                    builder.gate(ComponentKind::Or, Vec::new())?;
                }
                ComponentSpec::Not { .. } => {
                    builder.gate(ComponentKind::Not, Vec::new())?;
                }
                ComponentSpec::Relay { .. } => {
                    builder.gate(ComponentKind::Relay, Vec::new())?;
                }
                ComponentSpec::Base { label, initial, .. } => {
                    builder.base(label.clone(), *initial);
                }
                ComponentSpec::Input => {
                    builder.input();
                }
            }
        }

        for (position, spec) in self.components.iter().enumerate() {
            let target = Handle(position);
            match spec {
                ComponentSpec::And { inputs } | ComponentSpec::Or { inputs } => {
                    for &input in inputs {
                        builder.connect(target, handle(input)?)?;
                    }
                }
                ComponentSpec::Not { input } | ComponentSpec::Relay { input } => {
                    builder.connect(target, handle(*input)?)?;
                }
                ComponentSpec::Base { next, .. } => builder.set_next(target, handle(*next)?)?,
                ComponentSpec::True | ComponentSpec::False | ComponentSpec::Input => {}
            }
        }

        for spec in &self.roles {
            let role = builder.role(spec.name.clone());
            for entry in &spec.moves {
                builder.add_move(role, entry.label.clone(), handle(entry.legal)?, handle(entry.input)?)?;
            }
            for goal in &spec.goals {
                builder.goal(role, handle(goal.component)?, goal.value)?;
            }
        }
        builder.terminal(handle(self.terminal)?)?;
        builder.build()
    }
}

impl Structure {
    /// Describe the structure as a blueprint indexed by component id.
    #[must_use]
    pub fn to_blueprint(&self) -> Blueprint {
        let mut bases = vec![None; self.len()];
        for base in self.bases() {
            bases[base.id] = Some(base);
        }
        let components = self
            .components()
            .iter()
            .map(|component| match component.kind {
                ComponentKind::True => ComponentSpec::True,
                ComponentKind::False => ComponentSpec::False,
                ComponentKind::And => ComponentSpec::And {
                    inputs: component.inputs.clone(),
                },
                ComponentKind::Or => ComponentSpec::Or {
                    inputs: component.inputs.clone(),
                },
                ComponentKind::Not => ComponentSpec::Not {
                    input: component.inputs[0],
                },
                ComponentKind::Relay => ComponentSpec::Relay {
                    input: component.inputs[0],
                },
                ComponentKind::Base => match bases[component.id] {
                    Some(base) => ComponentSpec::Base {
                        label: base.label.clone(),
                        initial: base.initial,
                        next: base.next,
                    },
                    None => unreachable!("every base component has a base entry"),
                },
                ComponentKind::Input => ComponentSpec::Input,
            })
            .collect();
        let roles = self
            .roles()
            .iter()
            .map(|role| RoleSpec {
                name: role.name.clone(),
                moves: role
                    .moves
                    .iter()
                    .map(|entry| MoveSpec {
                        label: entry.label.clone(),
                        legal: entry.legal,
                        input: entry.input,
                    })
                    .collect(),
                goals: role
                    .goals
                    .iter()
                    .map(|goal| GoalSpec {
                        component: goal.component,
                        value: goal.value,
                    })
                    .collect(),
            })
            .collect();
        Blueprint {
            roles,
            components,
            terminal: self.terminal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LATCH: &str = r#"{
        "roles": [{
            "name": "solo",
            "moves": [{ "label": "press", "legal": 1, "input": 2 }],
            "goals": [{ "component": 0, "value": 100 }, { "component": 4, "value": 0 }]
        }],
        "components": [
            { "kind": "base", "label": "lit", "next": 3 },
            { "kind": "true" },
            { "kind": "input" },
            { "kind": "or", "inputs": [0, 2] },
            { "kind": "not", "input": 0 }
        ],
        "terminal": 0
    }"#;

    #[test]
    fn test_parse_and_compile() {
        let blueprint: Blueprint = serde_json::from_str(LATCH).unwrap();
        let structure = blueprint.to_structure().unwrap();
        assert_eq!(structure.len(), 5);
        assert_eq!(structure.bases()[0].label, "lit");
        assert!(!structure.bases()[0].initial);
        assert_eq!(structure.roles()[0].goals.len(), 2);
    }

    #[test]
    fn test_out_of_range_reference() {
        let mut blueprint: Blueprint = serde_json::from_str(LATCH).unwrap();
        blueprint.terminal = 9;
        assert_eq!(
            blueprint.to_structure().unwrap_err(),
            StructureError::UnknownHandle(9)
        );
    }

    #[test]
    fn test_structure_describes_itself() {
        let blueprint: Blueprint = serde_json::from_str(LATCH).unwrap();
        let structure = blueprint.to_structure().unwrap();
        let again = structure.to_blueprint().to_structure().unwrap();
        assert_eq!(again.stats(), structure.stats());
        assert_eq!(again.bases()[0].label, "lit");
    }
}
