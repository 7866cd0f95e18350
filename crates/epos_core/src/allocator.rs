//! Per-collection identifier allocation.

use std::sync::atomic::{AtomicU64, Ordering};

/// Hands out strictly increasing record identifiers.
///
/// Identifiers start at 1. Each call to [`next`](Self::next) returns a value
/// no other call has returned, also under concurrent use; identifiers are
/// never handed back.
#[derive(Debug)]
pub struct IdAllocator {
    next: AtomicU64,
}

impl IdAllocator {
    /// The first identifier of a fresh collection.
    pub const FIRST: u64 = 1;

    /// Creates an allocator for a fresh collection.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(Self::FIRST),
        }
    }

    /// Creates an allocator that continues after the highest identifier
    /// ever used.
    ///
    /// `None` means the collection has never been written to.
    #[must_use]
    pub fn starting_after(high_water: Option<u64>) -> Self {
        let next = high_water.map_or(Self::FIRST, |hw| hw.saturating_add(1).max(Self::FIRST));
        Self {
            next: AtomicU64::new(next),
        }
    }

    /// Takes the next identifier.
    ///
    /// Returns `None` once the identifier space is used up.
    pub fn next(&self) -> Option<u64> {
        self.next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n != u64::MAX).then(|| n + 1)
            })
            .ok()
    }

    /// Returns the identifier the next call to [`next`](Self::next) would
    /// take.
    #[must_use]
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Acquire)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn fresh_allocator_starts_at_one() {
        let ids = IdAllocator::new();
        assert_eq!(ids.peek(), 1);
        assert_eq!(ids.next(), Some(1));
        assert_eq!(ids.next(), Some(2));
        assert_eq!(ids.peek(), 3);
    }

    #[test]
    fn restored_allocator_skips_high_water() {
        assert_eq!(IdAllocator::starting_after(None).next(), Some(1));
        assert_eq!(IdAllocator::starting_after(Some(0)).next(), Some(1));
        assert_eq!(IdAllocator::starting_after(Some(41)).next(), Some(42));
    }

    #[test]
    fn exhausted_allocator_stops() {
        let ids = IdAllocator::starting_after(Some(u64::MAX - 2));
        assert_eq!(ids.next(), Some(u64::MAX - 1));
        assert_eq!(ids.next(), None);
        assert_eq!(ids.next(), None);
    }

    #[test]
    fn concurrent_next_never_duplicates() {
        let ids = Arc::new(IdAllocator::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ids = Arc::clone(&ids);
                thread::spawn(move || (0..1000).map(|_| ids.next().unwrap()).collect::<Vec<_>>())
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 8000);
        assert_eq!(ids.peek(), 8001);
    }
}
