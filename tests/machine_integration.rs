//! Integration tests for the state-machine driver.
//!
//! Every scenario runs against all three propagation strategies.

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use propnet::machine::{Move, check_validity, query_scope};
use propnet::structure::{Handle, StructureBuilder};
use propnet::{ComponentId, InternalState, MachineError, StateMachine, Strategy, Structure, games};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::collections::BTreeSet;
use std::sync::Arc;

/// `b = OR(RELAY(b), ext)` and `a = NOT b`, with moves `on` and `off`
/// deciding `ext` in the next state.
struct MinimalModel {
    structure: Arc<Structure>,
    ext: ComponentId,
    a: ComponentId,
    b: ComponentId,
}

fn minimal_model() -> MinimalModel {
    let mut builder = StructureBuilder::new();
    let role = builder.role("solo");
    let always = builder.constant(true);
    let never = builder.constant(false);
    let ext = builder.base("ext", false);
    let on = builder.legal_move(role, "on", always).unwrap();
    builder.legal_move(role, "off", always).unwrap();
    builder.set_next(ext, on).unwrap();

    let b = builder.or([ext]).unwrap();
    let echo = builder.relay(b).unwrap();
    builder.connect(b, echo).unwrap();
    let a = builder.not(b).unwrap();
    builder.terminal(never).unwrap();
    builder.goal(role, a, 0).unwrap();
    builder.goal(role, b, 100).unwrap();

    let structure = builder.build().unwrap();
    let id = |handle: Handle| structure.resolve(handle);
    MinimalModel {
        ext: id(ext),
        a: id(a),
        b: id(b),
        structure: Arc::new(structure),
    }
}

fn labels(machine: &StateMachine, state: &InternalState) -> BTreeSet<String> {
    machine
        .true_bases(state)
        .into_iter()
        .filter_map(|id| {
            machine
                .structure()
                .bases()
                .iter()
                .find(|base| base.id == id)
                .map(|base| base.label.clone())
        })
        .collect()
}

fn set_of(labels: &[&str]) -> BTreeSet<String> {
    labels.iter().map(ToString::to_string).collect()
}

#[test]
fn test_minimal_model_without_support() {
    let model = minimal_model();
    for strategy in Strategy::ALL {
        let machine = StateMachine::new(model.structure.clone(), strategy);
        let mut state = machine.initial_state();
        assert!(!machine.evaluate(&mut state, model.b).unwrap(), "{strategy}");
        assert!(machine.evaluate(&mut state, model.a).unwrap(), "{strategy}");
        assert_eq!(machine.goal(&mut state, 0).unwrap(), 0);
    }
}

#[test]
fn test_minimal_model_with_support() {
    let model = minimal_model();
    for strategy in Strategy::ALL {
        let machine = StateMachine::new(model.structure.clone(), strategy);
        let mut state = machine.state_from_bases(&[model.ext]).unwrap();
        assert!(machine.evaluate(&mut state, model.b).unwrap(), "{strategy}");
        assert!(!machine.evaluate(&mut state, model.a).unwrap(), "{strategy}");
        assert_eq!(machine.goal(&mut state, 0).unwrap(), 100);
    }
}

#[test]
fn test_minimal_model_across_flips() {
    let model = minimal_model();
    for strategy in Strategy::ALL {
        let machine = StateMachine::new(model.structure.clone(), strategy);
        let on = machine.move_by_label(0, "on").unwrap();
        let off = machine.move_by_label(0, "off").unwrap();
        let mut state = machine.initial_state();
        for (round, mv) in [on, off, on, on, off, off, on].into_iter().enumerate() {
            state = if round % 2 == 0 {
                machine.next_state(&mut state, &[mv]).unwrap()
            } else {
                machine.next_state_in_place(state, &[mv]).unwrap()
            };
            let supported = mv == on;
            assert_eq!(machine.evaluate(&mut state, model.b).unwrap(), supported, "{strategy} round {round}");
            assert_eq!(machine.evaluate(&mut state, model.a).unwrap(), !supported, "{strategy} round {round}");
        }

        // Direct assignment takes the same path as a transition.
        machine.assign(&mut state, model.ext, false).unwrap();
        assert!(!machine.evaluate(&mut state, model.b).unwrap(), "{strategy}");
        machine.assign(&mut state, model.ext, true).unwrap();
        assert!(machine.evaluate(&mut state, model.b).unwrap(), "{strategy}");
    }
}

#[test]
fn test_terminal_follows_base() {
    let mut builder = StructureBuilder::new();
    let role = builder.role("solo");
    let always = builder.constant(true);
    let p = builder.base("p", false);
    let finish = builder.legal_move(role, "finish", always).unwrap();
    let wait = builder.legal_move(role, "wait", always).unwrap();
    let kept = builder.and([wait, p]).unwrap();
    let next = builder.or([finish, kept]).unwrap();
    builder.set_next(p, next).unwrap();
    builder.terminal(p).unwrap();
    let structure = Arc::new(builder.build().unwrap());

    for strategy in Strategy::ALL {
        let machine = StateMachine::new(structure.clone(), strategy);
        let wait = machine.move_by_label(0, "wait").unwrap();
        let finish = machine.move_by_label(0, "finish").unwrap();
        let mut state = machine.initial_state();
        assert!(!machine.is_terminal(&mut state).unwrap());
        let mut state = machine.next_state(&mut state, &[wait]).unwrap();
        assert!(!machine.is_terminal(&mut state).unwrap());
        let mut state = machine.next_state_in_place(state, &[finish]).unwrap();
        assert!(machine.is_terminal(&mut state).unwrap());
        let mut state = machine.next_state(&mut state, &[wait]).unwrap();
        assert!(machine.is_terminal(&mut state).unwrap());
    }
}

#[test]
fn test_evaluate_sees_assignment_two_gates_down() {
    let mut builder = StructureBuilder::new();
    let role = builder.role("solo");
    let p = builder.base("p", false);
    builder.set_next(p, p).unwrap();
    let always = builder.constant(true);
    builder.legal_move(role, "wait", always).unwrap();
    let first = builder.relay(p).unwrap();
    let second = builder.relay(first).unwrap();
    builder.terminal(second).unwrap();
    builder.goal(role, always, 0).unwrap();
    let structure = Arc::new(builder.build().unwrap());
    let (p, second) = (structure.resolve(p), structure.resolve(second));

    for strategy in Strategy::ALL {
        let machine = StateMachine::new(structure.clone(), strategy);
        let mut state = machine.initial_state();
        assert!(!machine.is_terminal(&mut state).unwrap(), "{strategy}");
        machine.assign(&mut state, p, true).unwrap();
        assert!(machine.evaluate(&mut state, second).unwrap(), "{strategy}");
        assert!(machine.is_terminal(&mut state).unwrap(), "{strategy}");

        machine.assign(&mut state, p, false).unwrap();
        assert!(!machine.evaluate(&mut state, second).unwrap(), "{strategy}");
    }
}

#[test]
fn test_buttons_successors_by_hand() {
    let structure = Arc::new(games::buttons_and_lights().unwrap());
    for strategy in Strategy::ALL {
        let machine = StateMachine::new(structure.clone(), strategy);
        let press = |label: &str| machine.move_by_label(0, label).unwrap();
        let mut state = machine.initial_state();
        assert_eq!(labels(&machine, &state), set_of(&["step0"]));

        let mut state = machine.next_state(&mut state, &[press("a")]).unwrap();
        assert_eq!(labels(&machine, &state), set_of(&["p", "step1"]));

        let mut state = machine.next_state(&mut state, &[press("b")]).unwrap();
        assert_eq!(labels(&machine, &state), set_of(&["q", "step2"]));

        let mut state = machine.next_state(&mut state, &[press("c")]).unwrap();
        assert_eq!(labels(&machine, &state), set_of(&["r", "step3"]));

        let state = machine.next_state_in_place(state, &[press("a")]).unwrap();
        assert_eq!(labels(&machine, &state), set_of(&["p", "r", "step4"]));
    }
}

#[test]
fn test_parent_survives_cloning_transition() {
    let structure = Arc::new(games::buttons_and_lights().unwrap());
    for strategy in Strategy::ALL {
        let machine = StateMachine::new(structure.clone(), strategy);
        let a = machine.move_by_label(0, "a").unwrap();
        let b = machine.move_by_label(0, "b").unwrap();
        let mut parent = machine.next_state(&mut machine.initial_state(), &[a]).unwrap();
        let mut first = machine.next_state(&mut parent, &[a]).unwrap();
        let mut second = machine.next_state(&mut parent, &[b]).unwrap();
        assert_eq!(labels(&machine, &parent), set_of(&["p", "step1"]));
        assert_eq!(labels(&machine, &first), set_of(&["step2"]));
        assert_eq!(labels(&machine, &second), set_of(&["q", "step2"]));
        assert!(!machine.is_terminal(&mut first).unwrap());
        assert!(!machine.is_terminal(&mut second).unwrap());
        assert!(!machine.is_terminal(&mut parent).unwrap());
    }
}

#[test]
fn test_no_legal_moves() {
    let mut builder = StructureBuilder::new();
    let role = builder.role("stuck");
    let p = builder.base("p", false);
    builder.set_next(p, p).unwrap();
    builder.legal_move(role, "move", p).unwrap();
    let never = builder.constant(false);
    builder.terminal(never).unwrap();
    let structure = Arc::new(builder.build().unwrap());

    for strategy in Strategy::ALL {
        let machine = StateMachine::new(structure.clone(), strategy);
        let mut state = machine.initial_state();
        let expected = MachineError::NoLegalMoves {
            role: "stuck".to_string(),
        };
        assert_eq!(machine.legal_moves(&mut state, 0).unwrap_err(), expected);
        let mut rng = SmallRng::seed_from_u64(7);
        assert_eq!(machine.random_move(&mut state, 0, &mut rng).unwrap_err(), expected);
        assert_eq!(machine.legal_joint_moves(&mut state).unwrap_err(), expected);
        assert_eq!(
            machine.goal(&mut state, 0).unwrap_err(),
            MachineError::NoUniqueGoal {
                role: "stuck".to_string(),
                satisfied: 0,
            }
        );
    }
}

#[test]
fn test_several_goals_are_rejected() {
    let mut builder = StructureBuilder::new();
    let role = builder.role("greedy");
    let always = builder.constant(true);
    let p = builder.base("p", false);
    builder.set_next(p, p).unwrap();
    builder.legal_move(role, "wait", always).unwrap();
    builder.terminal(always).unwrap();
    builder.goal(role, always, 100).unwrap();
    builder.goal(role, always, 50).unwrap();
    let structure = Arc::new(builder.build().unwrap());

    let machine = StateMachine::new(structure, Strategy::Lazy);
    let mut state = machine.initial_state();
    assert!(matches!(
        machine.goal(&mut state, 0),
        Err(MachineError::NoUniqueGoal { satisfied: 2, .. })
    ));
}

#[test]
fn test_foreign_move_is_rejected() {
    let structure = Arc::new(games::tic_tac_toe().unwrap());
    let machine = StateMachine::new(structure, Strategy::Pull);
    let x_noop = machine.move_by_label(0, "noop").unwrap();
    let o_noop = machine.move_by_label(1, "noop").unwrap();
    let mut state = machine.initial_state();
    assert_eq!(
        machine.next_state(&mut state, &[o_noop, x_noop]).unwrap_err(),
        MachineError::MoveRoleMismatch { slot: 0, found: 1 }
    );
    assert_eq!(
        machine.next_state(&mut state, &[x_noop]).unwrap_err(),
        MachineError::JointMoveArity { expected: 2, found: 1 }
    );
}

#[test]
fn test_lazy_invalidation_reaches_only_direct_outputs() {
    let structure = Arc::new(games::tic_tac_toe().unwrap());
    let machine = StateMachine::new(structure.clone(), Strategy::Lazy);
    let mut state = machine.initial_state();
    machine.settle_queries(&mut state).unwrap();

    let base = structure.base_by_label("cell 2 2 b").unwrap().id;
    let before: BTreeSet<ComponentId> = (0..structure.len()).filter(|&id| !state.is_valid(id)).collect();
    machine.assign(&mut state, base, false).unwrap();
    let after: BTreeSet<ComponentId> = (0..structure.len()).filter(|&id| !state.is_valid(id)).collect();

    let outputs: BTreeSet<ComponentId> = structure.component(base).outputs.iter().copied().collect();
    let fresh: Vec<ComponentId> = after.difference(&before).copied().collect();
    assert!(!fresh.is_empty());
    assert!(fresh.iter().all(|id| outputs.contains(id)));
}

#[test]
fn test_lazy_input_invalidation_reaches_only_direct_outputs() {
    let structure = Arc::new(games::buttons_and_lights().unwrap());
    let machine = StateMachine::new(structure.clone(), Strategy::Lazy);
    let mut state = machine.initial_state();
    machine.settle_queries(&mut state).unwrap();
    for base in structure.bases() {
        machine.evaluate(&mut state, base.next).unwrap();
    }

    let press = machine.move_entry(machine.move_by_label(0, "a").unwrap()).input;
    let before: BTreeSet<ComponentId> = (0..structure.len()).filter(|&id| !state.is_valid(id)).collect();
    machine.assign(&mut state, press, true).unwrap();
    let after: BTreeSet<ComponentId> = (0..structure.len()).filter(|&id| !state.is_valid(id)).collect();

    let outputs: BTreeSet<ComponentId> = structure.component(press).outputs.iter().copied().collect();
    let fresh: Vec<ComponentId> = after.difference(&before).copied().collect();
    assert!(!fresh.is_empty());
    assert!(fresh.iter().all(|id| outputs.contains(id)));

    // Pressing `a` from all-dark lights `p` next.
    let p = structure.base_by_label("p").unwrap().next;
    assert!(machine.evaluate(&mut state, p).unwrap());
}

#[test]
fn test_queries_are_idempotent() {
    let structure = Arc::new(games::tic_tac_toe().unwrap());
    for strategy in Strategy::ALL {
        let machine = StateMachine::new(structure.clone(), strategy);
        let mark = machine.move_by_label(0, "mark 1 1").unwrap();
        let noop = machine.move_by_label(1, "noop").unwrap();
        let mut state = machine.next_state(&mut machine.initial_state(), &[mark, noop]).unwrap();

        let terminal = machine.is_terminal(&mut state).unwrap();
        let legal: Vec<Vec<Move>> = (0..2).map(|role| machine.legal_moves(&mut state, role).unwrap()).collect();
        let settled = state.clone();

        assert_eq!(machine.is_terminal(&mut state).unwrap(), terminal);
        for (role, moves) in legal.iter().enumerate() {
            assert_eq!(&machine.legal_moves(&mut state, role).unwrap(), moves);
        }
        assert_eq!(state, settled, "{strategy}");
    }
}

#[test]
fn test_settled_states_pass_audit() {
    let structure = Arc::new(games::tic_tac_toe().unwrap());
    let scope = query_scope(&structure);
    for strategy in Strategy::ALL {
        let machine = StateMachine::new(structure.clone(), strategy);
        let mut rng = SmallRng::seed_from_u64(2024);
        let mut state = machine.initial_state();
        while !machine.is_terminal(&mut state).unwrap() {
            machine.settle_queries(&mut state).unwrap();
            assert!(check_validity(&structure, &state, &scope).unwrap().is_empty(), "{strategy}");
            let joint = machine.random_joint_move(&mut state, &mut rng).unwrap();
            state = machine.next_state_in_place(state, &joint).unwrap();
        }
        let goals = machine.goals(&mut state).unwrap();
        assert!(goals == vec![100, 0] || goals == vec![0, 100] || goals == vec![50, 50]);
    }
}
