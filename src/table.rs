//! Unique table with hash-chained buckets.
//!
//! Values live in a plain `Vec`, indexed directly. Buckets hold the head of a
//! chain threaded through the `next` field of each entry. [`Table::put`] is
//! the hash-consing primitive: it returns the index of an equal value if one
//! is already stored, and only allocates otherwise.

use std::ops::Index;

use crate::utils::MyHash;

#[derive(Clone)]
struct Entry<T> {
    value: T,
    next: Option<usize>,
}

pub struct Table<T> {
    data: Vec<Entry<T>>,
    buckets: Vec<Option<usize>>,
    bitmask: u64,
}

impl<T> Table<T> {
    /// Create a new table with `2^bits` buckets.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 31, "Table bits should be in the range 0..=31");

        let buckets_size = 1 << bits;
        Self {
            data: Vec::new(),
            buckets: vec![None; buckets_size],
            bitmask: (buckets_size - 1) as u64,
        }
    }

    /// Number of stored values.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Number of buckets.
    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Get the reference to the value at the given index.
    pub fn value(&self, index: usize) -> &T {
        &self.data[index].value
    }

    /// Get the index of the next value in the same bucket.
    pub fn next(&self, index: usize) -> Option<usize> {
        self.data[index].next
    }

    /// Add a value without looking for duplicates and without linking it
    /// into any bucket. Used for sentinel cells.
    pub fn add(&mut self, value: T) -> usize {
        self.data.push(Entry { value, next: None });
        self.data.len() - 1
    }
}

impl<T> Table<T>
where
    T: MyHash + Eq,
{
    fn bucket_index(&self, value: &T) -> usize {
        (value.hash() & self.bitmask) as usize
    }

    /// Look up an equal value without inserting.
    pub fn find(&self, value: &T) -> Option<usize> {
        let mut current = self.buckets[self.bucket_index(value)];
        while let Some(index) = current {
            if self.value(index) == value {
                return Some(index);
            }
            current = self.next(index);
        }
        None
    }

    /// Put a value into the table and return its index.
    ///
    /// If an equal value is already stored, its index is returned and
    /// `value` is dropped.
    pub fn put(&mut self, value: T) -> usize {
        if let Some(index) = self.find(&value) {
            return index;
        }

        if self.data.len() >= 2 * self.buckets.len() {
            self.grow();
        }

        let bucket_index = self.bucket_index(&value);
        let head = self.buckets[bucket_index];
        let index = self.add(value);
        self.data[index].next = head;
        self.buckets[bucket_index] = Some(index);
        index
    }

    /// Double the number of buckets and relink every stored value.
    fn grow(&mut self) {
        let size = self.buckets.len() * 2;
        self.buckets = vec![None; size];
        self.bitmask = (size - 1) as u64;
        for index in 0..self.data.len() {
            self.data[index].next = None;
        }
        for index in 0..self.data.len() {
            let bucket_index = self.bucket_index(&self.data[index].value);
            self.data[index].next = self.buckets[bucket_index];
            self.buckets[bucket_index] = Some(index);
        }
    }
}

impl<T> Index<usize> for Table<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.value(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
    struct Item(i32);

    impl MyHash for Item {
        fn hash(&self) -> u64 {
            self.0.unsigned_abs() as u64
        }
    }

    #[test]
    fn test_add() {
        let mut table = Table::new(2);
        let index = table.add(Item(42));
        assert_eq!(table[index], Item(42));
        assert_eq!(table.next(index), None);
        assert_eq!(table.find(&Item(42)), None);
    }

    #[test]
    fn test_put() {
        let mut table = Table::new(2);
        let index1 = table.put(Item(5));
        let index2 = table.put(Item(-5));
        assert_ne!(index1, index2);
        assert_eq!(table[index1], Item(5));
        assert_eq!(table[index2], Item(-5));
        // Same bucket, newest first:
        assert_eq!(table.next(index2), Some(index1));
    }

    #[test]
    fn test_put_deduplicates() {
        let mut table = Table::new(2);
        let a = table.put(Item(7));
        let b = table.put(Item(7));
        assert_eq!(a, b);
        assert_eq!(table.size(), 1);
    }

    #[test]
    fn test_grow_keeps_values_reachable() {
        let mut table = Table::new(1);
        let indices: Vec<usize> = (0..100).map(|i| table.put(Item(i))).collect();
        assert!(table.num_buckets() > 2);
        for (i, &index) in indices.iter().enumerate() {
            assert_eq!(table.find(&Item(i as i32)), Some(index));
        }
        assert_eq!(table.size(), 100);
    }
}
