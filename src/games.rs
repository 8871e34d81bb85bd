//! Hand-built fixture games.
//!
//! Both circuits are small enough to check by hand and exercise every gate
//! kind the engine knows.

mod tictactoe;

pub use tictactoe::tic_tac_toe;

use crate::error::StructureError;
use crate::structure::{Structure, StructureBuilder};

/// Steps before buttons and lights ends on its own.
pub const BUTTONS_STEPS: usize = 7;

/// One robot, three lights `p`, `q`, `r` and three buttons.
///
/// `a` toggles `p`, `b` swaps `p` and `q`, `c` swaps `q` and `r`. The game
/// ends when every light is on (goal 100) or after seven steps (goal 0).
///
/// # Errors
///
/// Never fails; the result type mirrors [`StructureBuilder::build`].
pub fn buttons_and_lights() -> Result<Structure, StructureError> {
    let mut builder = StructureBuilder::new();
    let robot = builder.role("robot");
    let always = builder.constant(true);
    let never = builder.constant(false);

    let p = builder.base("p", false);
    let q = builder.base("q", false);
    let r = builder.base("r", false);
    let a = builder.legal_move(robot, "a", always)?;
    let b = builder.legal_move(robot, "b", always)?;
    let c = builder.legal_move(robot, "c", always)?;

    let not_p = builder.not(p)?;
    let toggled = builder.and([a, not_p])?;
    let p_from_q = builder.and([b, q])?;
    let p_kept = builder.and([c, p])?;
    let next_p = builder.or([toggled, p_from_q, p_kept])?;
    builder.set_next(p, next_p)?;

    let q_kept = builder.and([a, q])?;
    let q_from_p = builder.and([b, p])?;
    let q_from_r = builder.and([c, r])?;
    let next_q = builder.or([q_kept, q_from_p, q_from_r])?;
    builder.set_next(q, next_q)?;

    let r_kept = builder.or([a, b])?;
    let r_held = builder.and([r_kept, r])?;
    let r_from_q = builder.and([c, q])?;
    let next_r = builder.or([r_held, r_from_q])?;
    builder.set_next(r, next_r)?;

    // step0 holds initially and shifts one base per move.
    let mut previous = builder.base("step0", true);
    builder.set_next(previous, never)?;
    for index in 1..=BUTTONS_STEPS {
        let step = builder.base(format!("step{index}"), false);
        builder.set_next(step, previous)?;
        previous = step;
    }

    let lit = builder.and([p, q, r])?;
    let unlit = builder.not(lit)?;
    let ended = builder.or([lit, previous])?;
    builder.terminal(ended)?;
    builder.goal(robot, lit, 100)?;
    builder.goal(robot, unlit, 0)?;

    builder.build()
}
