//! Differential testing of the propagation strategies.
//!
//! Random circuits are generated, and every strategy plays the same random
//! playouts. At each state they must agree on terminality, legal moves,
//! goals and successors, and every settled state must pass the validity
//! audit.
//! Run with: cargo test --release differential

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use proptest::prelude::*;
use std::sync::Arc;

use propnet::differential::{DifferentialConfig, compare_strategies};
use propnet::synth::{SynthConfig, generate};

/// Small circuits with cycles, negations and several roles.
fn synth_config() -> impl Strategy<Value = SynthConfig> {
    (
        1usize..=3,
        1usize..=10,
        1usize..=4,
        0usize..=24,
        0usize..=24,
        0usize..=3,
        1usize..=5,
        0usize..=12,
        0.0f64..=0.6,
    )
        .prop_map(
            |(
                roles,
                bases,
                moves_per_role,
                state_gates,
                transition_gates,
                cycle_groups,
                cycle_size,
                back_edges,
                negation_rate,
            )| {
                SynthConfig {
                    roles,
                    bases,
                    moves_per_role,
                    state_gates,
                    transition_gates,
                    cycle_groups,
                    cycle_size,
                    back_edges,
                    negation_rate,
                }
            },
        )
}

fn quick() -> DifferentialConfig {
    DifferentialConfig {
        playouts: 4,
        seed: 0,
        max_depth: 20,
        audit: true,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// All strategies agree on random circuits.
    #[test]
    fn prop_strategies_agree(seed in any::<u64>(), config in synth_config(), walk in any::<u64>()) {
        let structure = Arc::new(generate(seed, &config).unwrap());
        let report = compare_strategies(&structure, &DifferentialConfig { seed: walk, ..quick() });
        prop_assert!(report.is_ok(), "seed {seed}: {:?}", report.as_ref().err());
        let report = report.unwrap();
        prop_assert_eq!(report.playouts, 4);
        prop_assert!(report.states >= 4);
    }

    /// Generated circuits always compile.
    #[test]
    fn prop_generated_circuits_validate(seed in any::<u64>(), config in synth_config()) {
        let structure = generate(seed, &config).unwrap();
        prop_assert_eq!(structure.roles().len(), config.roles);
        prop_assert_eq!(structure.bases().len(), config.bases);
        prop_assert!(structure.roles().iter().all(|role| !role.moves.is_empty()));
    }
}

#[test]
fn test_acyclic_circuits_agree() {
    let config = SynthConfig {
        cycle_groups: 0,
        ..SynthConfig::default()
    };
    for seed in 0..16 {
        let structure = Arc::new(generate(seed, &config).unwrap());
        assert!(!structure.is_cyclic());
        compare_strategies(&structure, &quick()).unwrap();
    }
}

#[test]
fn test_large_cycles_agree() {
    let config = SynthConfig {
        cycle_groups: 4,
        cycle_size: 8,
        ..SynthConfig::default()
    };
    for seed in 0..16 {
        let structure = Arc::new(generate(seed, &config).unwrap());
        assert!(structure.is_cyclic());
        compare_strategies(&structure, &quick()).unwrap();
    }
}

#[test]
fn test_interlocked_cycles_agree() {
    let config = SynthConfig {
        cycle_groups: 4,
        cycle_size: 6,
        back_edges: 16,
        ..SynthConfig::default()
    };
    for seed in 0..32 {
        let structure = Arc::new(generate(seed, &config).unwrap());
        assert!(structure.is_cyclic());
        compare_strategies(&structure, &quick()).unwrap();
    }
}

#[test]
fn test_negation_heavy_circuits_agree() {
    let config = SynthConfig {
        negation_rate: 0.9,
        state_gates: 40,
        transition_gates: 40,
        ..SynthConfig::default()
    };
    for seed in 0..16 {
        let structure = Arc::new(generate(seed, &config).unwrap());
        compare_strategies(&structure, &quick()).unwrap();
    }
}

#[test]
fn test_long_walks_agree() {
    let structure = Arc::new(generate(3, &SynthConfig::default()).unwrap());
    let report = compare_strategies(
        &structure,
        &DifferentialConfig {
            playouts: 8,
            seed: 99,
            max_depth: 200,
            audit: true,
        },
    )
    .unwrap();
    assert_eq!(report.audited, report.states * 3);
}
