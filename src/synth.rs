//! Deterministic generation of random well-formed structures.
//!
//! The circuit has two layers. The state layer reads only bases and
//! constants; terminal, legal and goal components are drawn from it, so they
//! never depend on a move. The transition layer may also read inputs and
//! feeds the next component of every base. Both layers receive rings of
//! AND/OR gates forming positive cycle groups, optionally crossed by extra
//! back-edges that add chords to a ring or merge rings of the same layer
//! into one group. NOT gates are only ever placed outside the rings.

use crate::error::StructureError;
use crate::structure::{ComponentKind, Handle, Structure, StructureBuilder};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Shape of a generated structure.
#[derive(Debug, Clone, Copy)]
pub struct SynthConfig {
    /// Roles; each gets a `noop` move that is always legal.
    pub roles: usize,
    /// Base propositions.
    pub bases: usize,
    /// Moves per role, `noop` included.
    pub moves_per_role: usize,
    /// Acyclic gates in the state layer.
    pub state_gates: usize,
    /// Acyclic gates in the transition layer.
    pub transition_gates: usize,
    /// Rings per layer.
    pub cycle_groups: usize,
    /// Gates per ring.
    pub cycle_size: usize,
    /// Extra edges per layer from one ring member into another.
    pub back_edges: usize,
    /// Probability that an acyclic gate is a NOT.
    pub negation_rate: f64,
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            roles: 2,
            bases: 8,
            moves_per_role: 3,
            state_gates: 24,
            transition_gates: 24,
            cycle_groups: 2,
            cycle_size: 3,
            back_edges: 2,
            negation_rate: 0.25,
        }
    }
}

struct Generator<'a> {
    rng: SmallRng,
    builder: StructureBuilder,
    config: &'a SynthConfig,
}

impl Generator<'_> {
    fn pick(&mut self, pool: &[Handle]) -> Handle {
        pool[self.rng.random_range(0..pool.len())]
    }

    fn acyclic_gate(&mut self, pool: &[Handle]) -> Result<Handle, StructureError> {
        if self.rng.random_bool(self.config.negation_rate) {
            let input = self.pick(pool);
            return self.builder.not(input);
        }
        let kind = match self.rng.random_range(0..5) {
            0 | 1 => ComponentKind::And,
            2 | 3 => ComponentKind::Or,
            _ => ComponentKind::Relay,
        };
        let arity = if kind == ComponentKind::Relay {
            1
        } else {
            self.rng.random_range(2..=3)
        };
        let inputs: Vec<Handle> = (0..arity).map(|_| self.pick(pool)).collect();
        self.builder.gate(kind, inputs)
    }

    /// Grow `pool` by `count` acyclic gates, each reading earlier entries.
    fn layer(&mut self, pool: &mut Vec<Handle>, count: usize) -> Result<(), StructureError> {
        for _ in 0..count {
            let gate = self.acyclic_gate(pool)?;
            pool.push(gate);
        }
        Ok(())
    }

    /// The rings of one layer, then the back-edges between their members.
    fn rings(&mut self, pool: &mut Vec<Handle>) -> Result<(), StructureError> {
        let first = pool.len();
        for _ in 0..self.config.cycle_groups {
            self.ring(pool)?;
        }
        let members = pool[first..].to_vec();
        if members.len() < 2 {
            return Ok(());
        }
        for _ in 0..self.config.back_edges {
            let target = self.pick(&members);
            let source = self.pick(&members);
            if target != source {
                self.builder.connect(target, source)?;
            }
        }
        Ok(())
    }

    /// A ring of AND/OR gates, each also reading one member of `pool`.
    fn ring(&mut self, pool: &mut Vec<Handle>) -> Result<(), StructureError> {
        if self.config.cycle_size == 0 {
            return Ok(());
        }
        let mut members = Vec::with_capacity(self.config.cycle_size);
        for _ in 0..self.config.cycle_size {
            let external = self.pick(pool);
            let member = if self.rng.random_bool(0.7) {
                self.builder.or([external])?
            } else {
                self.builder.and([external])?
            };
            members.push(member);
        }
        for (index, &member) in members.iter().enumerate() {
            let previous = members[(index + members.len() - 1) % members.len()];
            self.builder.connect(member, previous)?;
        }
        pool.extend(members);
        Ok(())
    }
}

/// Generate a structure from `seed`.
///
/// The result always passes validation for any config with at least one
/// role.
///
/// # Errors
///
/// Returns [`StructureError::NoRoles`] for a config without roles.
pub fn generate(seed: u64, config: &SynthConfig) -> Result<Structure, StructureError> {
    let mut generator = Generator {
        rng: SmallRng::seed_from_u64(seed),
        builder: StructureBuilder::new(),
        config,
    };

    let roles: Vec<_> = (0..config.roles)
        .map(|index| generator.builder.role(format!("role{index}")))
        .collect();
    let always = generator.builder.constant(true);
    let bases: Vec<Handle> = (0..config.bases)
        .map(|index| {
            let initial = generator.rng.random_bool(0.3);
            generator.builder.base(format!("b{index}"), initial)
        })
        .collect();

    let mut state_layer = bases.clone();
    state_layer.push(always);
    generator.rings(&mut state_layer)?;
    generator.layer(&mut state_layer, config.state_gates)?;

    let mut transition_layer = state_layer.clone();
    for &role in &roles {
        let noop = generator.builder.legal_move(role, "noop", always)?;
        transition_layer.push(noop);
        for index in 1..config.moves_per_role {
            let legal = generator.pick(&state_layer);
            let input = generator.builder.legal_move(role, format!("m{index}"), legal)?;
            transition_layer.push(input);
        }

        let won = generator.pick(&state_layer);
        let lost = generator.builder.not(won)?;
        generator.builder.goal(role, won, 100)?;
        generator.builder.goal(role, lost, 0)?;
    }
    let terminal = generator.pick(&state_layer);
    generator.builder.terminal(terminal)?;

    let first_transition = transition_layer.len();
    generator.rings(&mut transition_layer)?;
    generator.layer(&mut transition_layer, config.transition_gates)?;
    let fresh = transition_layer.len() - first_transition;

    for &base in &bases {
        // Mostly transition gates, sometimes anything at all.
        let next = if fresh > 0 && generator.rng.random_bool(0.8) {
            transition_layer[first_transition + generator.rng.random_range(0..fresh)]
        } else {
            generator.pick(&transition_layer)
        };
        generator.builder.set_next(base, next)?;
    }

    generator.builder.build()
}
