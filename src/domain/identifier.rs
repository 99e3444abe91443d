//! Identifier generation.
//!
//! Every entity in the model (components, connections, causal factors,
//! entries, safety constraints and links) is addressed by a [`Uuid`]. Nothing
//! is ever addressed by position or by name.

use uuid::Uuid;

/// Source of fresh identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IdGenerator {
    /// Random version 4 UUIDs.
    #[default]
    Random,
    /// Monotonically increasing identifiers starting after the given value.
    ///
    /// Deterministic, so handy in tests and benchmarks where stable output is
    /// wanted.
    Sequential(u128),
}

impl IdGenerator {
    /// A deterministic generator whose first identifier is `1`.
    #[must_use]
    pub const fn sequential() -> Self {
        Self::Sequential(0)
    }

    /// Returns a fresh identifier.
    pub fn next_id(&mut self) -> Uuid {
        match self {
            Self::Random => Uuid::new_v4(),
            Self::Sequential(last) => {
                *last += 1;
                Uuid::from_u128(*last)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn sequential_ids_are_stable() {
        let mut ids = IdGenerator::sequential();
        assert_eq!(ids.next_id(), Uuid::from_u128(1));
        assert_eq!(ids.next_id(), Uuid::from_u128(2));
    }

    #[test]
    fn random_ids_do_not_repeat() {
        let mut ids = IdGenerator::Random;
        let unique: HashSet<_> = (0..64).map(|_| ids.next_id()).collect();
        assert_eq!(unique.len(), 64);
    }
}
