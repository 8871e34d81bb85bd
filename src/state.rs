//! Per-state storage: one assignment bit and one validity bit per component.
//!
//! A set validity bit means the paired assignment bit is consistent with the
//! current bases and inputs. A clear validity bit means the value is stale and
//! must be recomputed before it is read.

mod bits;

pub use bits::Bits;

use crate::structure::{ComponentId, ComponentKind, Structure};
use std::ops::Range;

/// Queries whose whole dependency cone a strategy may mark as settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Query {
    /// The terminal component.
    Terminal,
    /// Every legal component of every role.
    Legal,
    /// Every goal component of every role.
    Goal,
}

impl Query {
    const fn mask(self) -> u8 {
        match self {
            Query::Terminal => 0b001,
            Query::Legal => 0b010,
            Query::Goal => 0b100,
        }
    }
}

/// The mutable half of a game state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InternalState {
    /// Assignment bits.
    values: Bits,

    /// Validity bits.
    valid: Bits,

    /// Queries whose cones are known to be settled.
    settled: u8,
}

impl InternalState {
    /// Create a state for `len` components, everything false and stale.
    #[must_use]
    pub fn new(len: usize) -> Self {
        InternalState {
            values: Bits::new(len),
            valid: Bits::new(len),
            settled: 0,
        }
    }

    /// The base-state template for a structure.
    ///
    /// Constants, bases and inputs are valid, TRUE constants hold, and every
    /// gate is false and stale.
    #[must_use]
    pub fn template(structure: &Structure) -> Self {
        let mut state = InternalState::new(structure.len());
        for component in structure.components() {
            match component.kind {
                ComponentKind::True => {
                    state.set(component.id, true);
                    state.set_valid(component.id);
                }
                ComponentKind::False | ComponentKind::Base | ComponentKind::Input => {
                    state.set_valid(component.id);
                }
                ComponentKind::And | ComponentKind::Or | ComponentKind::Not | ComponentKind::Relay => {}
            }
        }
        state
    }

    /// Number of components covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the state covers no components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Assignment bit of a component.
    #[inline]
    #[must_use]
    pub fn get(&self, id: ComponentId) -> bool {
        self.values.get(id)
    }

    /// Write the assignment bit of a component.
    #[inline]
    pub fn set(&mut self, id: ComponentId, value: bool) {
        self.values.set(id, value);
    }

    /// Validity bit of a component.
    #[inline]
    #[must_use]
    pub fn is_valid(&self, id: ComponentId) -> bool {
        self.valid.get(id)
    }

    /// Mark a component's value as consistent.
    #[inline]
    pub fn set_valid(&mut self, id: ComponentId) {
        self.valid.insert(id);
    }

    /// Mark a component's value as stale.
    #[inline]
    pub fn invalidate(&mut self, id: ComponentId) {
        self.valid.remove(id);
    }

    /// Mark a run of component ids as consistent.
    pub fn validate_range(&mut self, range: Range<ComponentId>) {
        self.valid.set_range(range, true);
    }

    /// Mark a run of component ids as stale.
    pub fn invalidate_range(&mut self, range: Range<ComponentId>) {
        self.valid.set_range(range, false);
    }

    /// Replace every validity bit with those of `template`.
    pub fn reset_validity(&mut self, template: &Bits) {
        self.valid.copy_from(template);
    }

    /// All assignment bits.
    #[must_use]
    pub fn values(&self) -> &Bits {
        &self.values
    }

    /// All validity bits.
    #[must_use]
    pub fn validity(&self) -> &Bits {
        &self.valid
    }

    pub(crate) fn is_settled(&self, query: Query) -> bool {
        self.settled & query.mask() != 0
    }

    pub(crate) fn mark_settled(&mut self, query: Query) {
        self.settled |= query.mask();
    }

    pub(crate) fn clear_settled(&mut self) {
        self.settled = 0;
    }
}
