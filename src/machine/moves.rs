//! Move tokens and joint-move enumeration.

use crate::structure::RoleId;

/// One move of one role.
///
/// Tokens are only handed out by a [`StateMachine`] and index into its
/// structure's move table.
///
/// [`StateMachine`]: crate::machine::StateMachine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Move {
    role: RoleId,
    index: usize,
}

impl Move {
    pub(crate) const fn new(role: RoleId, index: usize) -> Self {
        Move { role, index }
    }

    /// Role that plays the move.
    #[must_use]
    pub const fn role(self) -> RoleId {
        self.role
    }

    /// Position in the role's move table.
    #[must_use]
    pub const fn index(self) -> usize {
        self.index
    }
}

/// Every combination taking one move from each role's list, in role order.
///
/// The first role varies slowest. An empty list for any role yields no
/// combinations.
#[must_use]
pub fn cross_product(per_role: &[Vec<Move>]) -> Vec<Vec<Move>> {
    let mut combinations: Vec<Vec<Move>> = vec![Vec::with_capacity(per_role.len())];
    for moves in per_role {
        combinations = combinations
            .iter()
            .flat_map(|prefix| {
                moves.iter().map(move |&choice| {
                    let mut joint = prefix.clone();
                    joint.push(choice);
                    joint
                })
            })
            .collect();
    }
    combinations
}
