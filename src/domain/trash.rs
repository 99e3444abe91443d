use std::collections::VecDeque;

use uuid::Uuid;

/// A bounded holding area for deleted items, keyed by id.
///
/// Items are kept in deletion order. Once the capacity is reached, the
/// oldest item is evicted; eviction is permanent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trash<T> {
    items: VecDeque<(Uuid, T)>,
    capacity: usize,
}

impl<T> Trash<T> {
    /// Creates an empty trash holding at most `capacity` items (at least one).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Stores an item, replacing an older entry with the same id.
    ///
    /// Returns the entry that had to be evicted to make room, if any.
    pub fn put(&mut self, id: Uuid, item: T) -> Option<(Uuid, T)> {
        self.items.retain(|(existing, _)| *existing != id);
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back((id, item));
        evicted
    }

    /// Removes and returns the item stored under `id`.
    pub fn take(&mut self, id: Uuid) -> Option<T> {
        let position = self.items.iter().position(|(existing, _)| *existing == id)?;
        self.items.remove(position).map(|(_, item)| item)
    }

    /// Returns the item stored under `id` without removing it.
    #[must_use]
    pub fn get(&self, id: Uuid) -> Option<&T> {
        self.items
            .iter()
            .find_map(|(existing, item)| (*existing == id).then_some(item))
    }

    /// Whether an item is stored under `id`.
    #[must_use]
    pub fn contains(&self, id: Uuid) -> bool {
        self.items.iter().any(|(existing, _)| *existing == id)
    }

    /// Number of stored items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Maximum number of stored items.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicts_oldest_when_full() {
        let mut trash = Trash::new(2);
        assert!(trash.put(Uuid::from_u128(1), "a").is_none());
        assert!(trash.put(Uuid::from_u128(2), "b").is_none());

        let evicted = trash.put(Uuid::from_u128(3), "c");
        assert_eq!(evicted, Some((Uuid::from_u128(1), "a")));
        assert_eq!(trash.len(), 2);
        assert!(!trash.contains(Uuid::from_u128(1)));
    }

    #[test]
    fn take_removes_item() {
        let mut trash = Trash::new(4);
        trash.put(Uuid::from_u128(1), 10);

        assert_eq!(trash.take(Uuid::from_u128(1)), Some(10));
        assert_eq!(trash.take(Uuid::from_u128(1)), None);
        assert_eq!(trash.len(), 0);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let trash: Trash<()> = Trash::new(0);
        assert_eq!(trash.capacity(), 1);
    }
}
