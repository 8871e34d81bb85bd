#![no_main]

//! Circuit description fuzzer.
//!
//! Feeds arbitrary blueprints to the compiler. Malformed circuits must be
//! rejected with an error; circuits that compile must answer their initial
//! queries identically under every strategy.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use propnet::structure::{ComponentSpec, GoalSpec, MoveSpec, RoleSpec};
use propnet::{Blueprint, StateMachine, Strategy};
use std::sync::Arc;

/// A fuzzer-generated component; references are reduced modulo the count.
#[derive(Arbitrary, Debug)]
enum FuzzComponent {
    True,
    False,
    And(Vec<u8>),
    Or(Vec<u8>),
    Not(u8),
    Relay(u8),
    Base { initial: bool, next: u8 },
    Input,
}

#[derive(Arbitrary, Debug)]
struct FuzzRole {
    moves: Vec<(u8, u8)>,
    goals: Vec<(u8, u8)>,
}

#[derive(Arbitrary, Debug)]
struct BlueprintInput {
    components: Vec<FuzzComponent>,
    roles: Vec<FuzzRole>,
    terminal: u8,
}

fuzz_target!(|input: BlueprintInput| {
    let count = input.components.len().min(64);
    if count == 0 {
        return;
    }
    let at = |index: u8| usize::from(index) % count;

    let components = input
        .components
        .iter()
        .take(count)
        .enumerate()
        .map(|(position, component)| match component {
            FuzzComponent::True => ComponentSpec::True,
            FuzzComponent::False => ComponentSpec::False,
            FuzzComponent::And(inputs) => ComponentSpec::And {
                inputs: inputs.iter().take(4).map(|&i| at(i)).collect(),
            },
            FuzzComponent::Or(inputs) => ComponentSpec::Or {
                inputs: inputs.iter().take(4).map(|&i| at(i)).collect(),
            },
            FuzzComponent::Not(input) => ComponentSpec::Not { input: at(*input) },
            FuzzComponent::Relay(input) => ComponentSpec::Relay { input: at(*input) },
            FuzzComponent::Base { initial, next } => ComponentSpec::Base {
                label: format!("b{position}"),
                initial: *initial,
                next: at(*next),
            },
            FuzzComponent::Input => ComponentSpec::Input,
        })
        .collect();
    let roles = input
        .roles
        .iter()
        .take(3)
        .enumerate()
        .map(|(index, role)| RoleSpec {
            name: format!("r{index}"),
            moves: role
                .moves
                .iter()
                .take(4)
                .enumerate()
                .map(|(label, &(legal, input))| MoveSpec {
                    label: format!("m{label}"),
                    legal: at(legal),
                    input: at(input),
                })
                .collect(),
            goals: role
                .goals
                .iter()
                .take(4)
                .map(|&(component, value)| GoalSpec {
                    component: at(component),
                    value,
                })
                .collect(),
        })
        .collect();
    let blueprint = Blueprint {
        roles,
        components,
        terminal: at(input.terminal),
    };

    // Rejection is fine; panicking is not
    let Ok(structure) = blueprint.to_structure() else {
        return;
    };
    let structure = Arc::new(structure);

    let answers: Vec<_> = Strategy::ALL
        .iter()
        .map(|&strategy| {
            let machine = StateMachine::new(structure.clone(), strategy);
            let mut state = machine.initial_state();
            let terminal = machine.is_terminal(&mut state);
            let legal = machine.legal_joint_moves(&mut state);
            let goals = machine.goals(&mut state);
            (terminal, legal, goals)
        })
        .collect();
    assert_eq!(answers[0], answers[1], "pull and lazy disagree");
    assert_eq!(answers[0], answers[2], "pull and eager disagree");
});
