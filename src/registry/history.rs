//! Fixed-capacity history of recent records
//!
//! When full, a push discards the logically-oldest element, so the buffer
//! always holds the last `capacity` pushes in push order. Not synchronized;
//! the hub serializes access.

use std::collections::VecDeque;

use super::error::HubError;

/// Overwrite-oldest circular buffer
#[derive(Debug, Clone)]
pub struct RingHistory<T> {
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> RingHistory<T> {
    /// Create a history holding at most `capacity` items (minimum 1)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    /// Add an item, discarding the oldest if full
    ///
    /// Returns the discarded item, if any.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.is_full() {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    /// Remove and return the oldest item
    pub fn pop(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// Oldest held item
    pub fn front(&self) -> Option<&T> {
        self.items.front()
    }

    /// Most recently pushed item
    pub fn back(&self) -> Option<&T> {
        self.items.back()
    }

    /// The i-th-oldest held item
    pub fn at(&self, index: usize) -> Result<&T, HubError> {
        self.items.get(index).ok_or(HubError::OutOfRange {
            index,
            len: self.items.len(),
        })
    }

    /// Iterate oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    /// Number of held items
    pub fn size(&self) -> usize {
        self.items.len()
    }

    /// Alias of [`size`](Self::size)
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    /// Maximum number of held items
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all items
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_is_min_of_pushes_and_capacity() {
        for pushes in 0..25usize {
            let mut history = RingHistory::with_capacity(10);
            for i in 0..pushes {
                history.push(i);
            }
            assert_eq!(history.size(), pushes.min(10));
        }
    }

    #[test]
    fn test_overflow_keeps_latest_in_order() {
        let mut history = RingHistory::with_capacity(4);
        // Push 1..=10: N = 10, C = 4
        for i in 1..=10 {
            history.push(i);
        }

        // K-th oldest (0-based) equals the (N - C + K + 1)-th pushed value
        for k in 0..4 {
            assert_eq!(*history.at(k).unwrap(), 10 - 4 + k + 1);
        }
        assert_eq!(history.front(), Some(&7));
        assert_eq!(history.back(), Some(&10));
    }

    #[test]
    fn test_at_out_of_range() {
        let mut history = RingHistory::with_capacity(3);
        history.push("a");

        assert_eq!(
            history.at(1).unwrap_err(),
            HubError::OutOfRange { index: 1, len: 1 }
        );
    }

    #[test]
    fn test_push_returns_evicted() {
        let mut history = RingHistory::with_capacity(2);

        assert_eq!(history.push(1), None);
        assert_eq!(history.push(2), None);
        assert!(history.is_full());
        assert_eq!(history.push(3), Some(1));
    }

    #[test]
    fn test_pop_oldest() {
        let mut history = RingHistory::with_capacity(3);
        history.push(1);
        history.push(2);

        assert_eq!(history.pop(), Some(1));
        assert!(!history.is_full());
        assert_eq!(history.pop(), Some(2));
        assert_eq!(history.pop(), None);
        assert!(history.is_empty());
    }

    #[test]
    fn test_iter_and_clear() {
        let mut history = RingHistory::with_capacity(3);
        for i in 0..5 {
            history.push(i);
        }

        assert_eq!(history.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);

        history.clear();
        assert!(history.is_empty());
        assert_eq!(history.capacity(), 3);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut history = RingHistory::with_capacity(0);
        history.push('x');
        history.push('y');

        assert_eq!(history.len(), 1);
        assert_eq!(history.back(), Some(&'y'));
    }
}
