#![no_main]

//! Strategy agreement fuzzer.
//!
//! Generates a random circuit from fuzzer-chosen parameters and walks it
//! with every strategy in lock-step. Any divergence or stale cached value
//! is a bug.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use propnet::differential::{DifferentialConfig, compare_strategies};
use propnet::synth::{SynthConfig, generate};
use std::sync::Arc;

/// Structured input for circuit generation.
#[derive(Arbitrary, Debug)]
struct CircuitInput {
    seed: u64,
    walk_seed: u64,
    roles: u8,
    bases: u8,
    moves_per_role: u8,
    state_gates: u8,
    transition_gates: u8,
    cycle_groups: u8,
    cycle_size: u8,
    back_edges: u8,
    negation_percent: u8,
}

fuzz_target!(|input: CircuitInput| {
    // Cap sizes to keep each run short
    let config = SynthConfig {
        roles: usize::from(input.roles % 4).max(1),
        bases: usize::from(input.bases % 24),
        moves_per_role: usize::from(input.moves_per_role % 6),
        state_gates: usize::from(input.state_gates % 64),
        transition_gates: usize::from(input.transition_gates % 64),
        cycle_groups: usize::from(input.cycle_groups % 5),
        cycle_size: usize::from(input.cycle_size % 9),
        back_edges: usize::from(input.back_edges % 16),
        negation_rate: f64::from(input.negation_percent % 101) / 100.0,
    };
    let structure = match generate(input.seed, &config) {
        Ok(structure) => Arc::new(structure),
        Err(e) => panic!("generator produced an invalid circuit for {config:?}: {e}"),
    };

    let report = compare_strategies(
        &structure,
        &DifferentialConfig {
            playouts: 2,
            seed: input.walk_seed,
            max_depth: 16,
            audit: true,
        },
    );
    if let Err(e) = report {
        panic!("strategies disagree on {config:?} seed {}: {e}", input.seed);
    }
});
