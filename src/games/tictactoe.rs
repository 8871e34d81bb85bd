//! Tic-tac-toe for `xplayer` and `oplayer`.
//!
//! The player not in control may only play `noop`. Goals: 100 for a line of
//! one's own marks, 0 for a line of the opponent's, 50 for a full board with
//! no line. Before the game ends no goal proposition holds.

use crate::error::StructureError;
use crate::structure::{Handle, Structure, StructureBuilder};

const LINES: [[(usize, usize); 3]; 8] = [
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    [(0, 0), (1, 1), (2, 2)],
    [(0, 2), (1, 1), (2, 0)],
];

/// Cell contents, indexed `[row][column]`.
struct Board {
    x: [[Handle; 3]; 3],
    o: [[Handle; 3]; 3],
    blank: [[Handle; 3]; 3],
}

fn cells(builder: &mut StructureBuilder, mark: &str, initial: bool) -> [[Handle; 3]; 3] {
    std::array::from_fn(|row| {
        std::array::from_fn(|column| builder.base(format!("cell {} {} {mark}", row + 1, column + 1), initial))
    })
}

fn line_of(builder: &mut StructureBuilder, marks: &[[Handle; 3]; 3]) -> Result<Handle, StructureError> {
    let lines = LINES
        .iter()
        .map(|line| builder.and(line.iter().map(|&(row, column)| marks[row][column])))
        .collect::<Result<Vec<_>, _>>()?;
    builder.or(lines)
}

/// The two-player game on a 3x3 board, `xplayer` moving first.
///
/// Moves are labelled `mark R C` with 1-based row and column, plus `noop`.
///
/// # Errors
///
/// Never fails; the result type mirrors [`StructureBuilder::build`].
pub fn tic_tac_toe() -> Result<Structure, StructureError> {
    let mut builder = StructureBuilder::new();
    let xplayer = builder.role("xplayer");
    let oplayer = builder.role("oplayer");

    let board = Board {
        x: cells(&mut builder, "x", false),
        o: cells(&mut builder, "o", false),
        blank: cells(&mut builder, "b", true),
    };
    let x_control = builder.base("control xplayer", true);
    let o_control = builder.base("control oplayer", false);
    builder.set_next(x_control, o_control)?;
    builder.set_next(o_control, x_control)?;

    // Per role, mark inputs in row-major order.
    let mut marks: [Vec<Handle>; 2] = [Vec::with_capacity(9), Vec::with_capacity(9)];
    for (role, control) in [(xplayer, x_control), (oplayer, o_control)] {
        for row in 0..3 {
            for column in 0..3 {
                let legal = builder.and([board.blank[row][column], control])?;
                let input = builder.legal_move(role, format!("mark {} {}", row + 1, column + 1), legal)?;
                marks[role].push(input);
            }
        }
    }
    builder.legal_move(xplayer, "noop", o_control)?;
    builder.legal_move(oplayer, "noop", x_control)?;

    for row in 0..3 {
        for column in 0..3 {
            let x_mark = marks[xplayer][row * 3 + column];
            let o_mark = marks[oplayer][row * 3 + column];
            let x_next = builder.or([board.x[row][column], x_mark])?;
            builder.set_next(board.x[row][column], x_next)?;
            let o_next = builder.or([board.o[row][column], o_mark])?;
            builder.set_next(board.o[row][column], o_next)?;

            let x_unmarked = builder.not(x_mark)?;
            let o_unmarked = builder.not(o_mark)?;
            let blank_next = builder.and([board.blank[row][column], x_unmarked, o_unmarked])?;
            builder.set_next(board.blank[row][column], blank_next)?;
        }
    }

    let x_line = line_of(&mut builder, &board.x)?;
    let o_line = line_of(&mut builder, &board.o)?;
    let open = builder.or(board.blank.iter().flatten().copied())?;
    let full = builder.not(open)?;
    let no_x_line = builder.not(x_line)?;
    let no_o_line = builder.not(o_line)?;
    let draw = builder.and([full, no_x_line, no_o_line])?;

    let ended = builder.or([x_line, o_line, full])?;
    builder.terminal(ended)?;
    builder.goal(xplayer, x_line, 100)?;
    builder.goal(xplayer, draw, 50)?;
    builder.goal(xplayer, o_line, 0)?;
    builder.goal(oplayer, o_line, 100)?;
    builder.goal(oplayer, draw, 50)?;
    builder.goal(oplayer, x_line, 0)?;

    builder.build()
}
