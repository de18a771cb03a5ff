//! Lossy memo table shared by the BDD manager and the caching solver.

use std::cell::Cell;

use crate::utils::MyHash;

#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
struct Stats {
    hits: usize,
    misses: usize,
}

/// Direct-mapped memo table with `2^bits` slots.
///
/// A key lives in exactly one slot and a colliding insert evicts the
/// previous occupant. Slots keep the full key, so a lookup can miss but
/// never answers for a different key.
pub struct Cache<K, V> {
    slots: Box<[Option<(K, V)>]>,
    mask: u64,
    stats: Cell<Stats>,
}

impl<K, V> Cache<K, V> {
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Cache bits should be at most 31");
        let slots: Box<[Option<(K, V)>]> = (0..1usize << bits).map(|_| None).collect();
        Self {
            mask: (slots.len() - 1) as u64,
            slots,
            stats: Cell::default(),
        }
    }

    pub fn hits(&self) -> usize {
        self.stats.get().hits
    }

    pub fn misses(&self) -> usize {
        self.stats.get().misses
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
    }

    fn slot(&self, key: &K) -> usize
    where
        K: MyHash,
    {
        (key.hash() & self.mask) as usize
    }
}

impl<K: MyHash + Eq, V> Cache<K, V> {
    pub fn get(&self, key: &K) -> Option<&V> {
        let mut stats = self.stats.get();
        let found = match &self.slots[self.slot(key)] {
            Some((k, v)) if k == key => Some(v),
            _ => None,
        };
        if found.is_some() {
            stats.hits += 1;
        } else {
            stats.misses += 1;
        }
        self.stats.set(stats);
        found
    }

    pub fn insert(&mut self, key: K, value: V) {
        let slot = self.slot(&key);
        self.slots[slot] = Some((key, value));
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_get_insert() {
        let mut cache = Cache::<(u64, u64), &str>::new(3);
        cache.insert((1, 2), "a");
        cache.insert((2, 3), "b");

        assert_eq!(cache.get(&(1, 2)), Some(&"a"));
        assert_eq!(cache.get(&(2, 3)), Some(&"b"));
        assert_eq!(cache.get(&(2, 1)), None);
        assert_eq!((cache.hits(), cache.misses()), (2, 1));
    }

    #[test]
    fn test_eviction() {
        // One slot, so every pair of keys collides.
        let mut cache = Cache::<(u64, u64), i32>::new(0);
        cache.insert((1, 2), 10);
        cache.insert((5, 7), 20);
        assert_eq!(cache.get(&(1, 2)), None);
        assert_eq!(cache.get(&(5, 7)), Some(&20));

        cache.clear();
        assert_eq!(cache.get(&(5, 7)), None);
        assert_eq!(cache.misses(), 2);
    }
}
