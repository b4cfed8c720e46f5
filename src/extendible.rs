//! Extendible-N hash table: a directory of bucket references addressed by
//! the low `depth` bits of a hash, each bucket holding up to `bucket_size`
//! keys and carrying its own local depth. Overflow splits the bucket and,
//! once the bucket's local depth catches up to the directory's global
//! depth, doubles the directory.

use std::cell::Cell;
use std::fmt;
use std::time::{Duration, Instant};

use crate::addressing::{low_bits, redirected_indices, MAX_TABLE_SIZE};
use crate::hash::h1;

struct Bucket {
    /// The lowest directory index that references this bucket; also the
    /// low `local_depth` bits of every index that does.
    first_address: usize,
    local_depth: u32,
    keys: Vec<u64>,
}

impl Bucket {
    fn new(first_address: usize, local_depth: u32, bucket_size: usize) -> Self {
        Bucket { first_address, local_depth, keys: Vec::with_capacity(bucket_size) }
    }
}

/// A dynamic extendible hash table over 64-bit keys, with up to
/// `bucket_size` keys per bucket.
///
/// Buckets live in an arena (`buckets`); the `directory` holds arena
/// indices rather than raw pointers, so a bucket referenced from many
/// directory slots is freed exactly once, for free, when the arena drops.
pub struct ExtendibleTable {
    buckets: Vec<Bucket>,
    directory: Vec<usize>,
    depth: u32,
    bucket_size: usize,
    key_count: usize,
    /// A `Cell` because `lookup` takes `&self` but must still accumulate
    /// the time it spends, per the spec's time-accounting requirement.
    elapsed: Cell<Duration>,
}

impl ExtendibleTable {
    /// Builds a table with a single empty bucket of capacity `bucket_size`.
    /// `bucket_size` must be positive.
    pub fn new(bucket_size: usize) -> Self {
        assert!(bucket_size > 0, "bucket size must be positive");
        ExtendibleTable {
            buckets: vec![Bucket::new(0, 0, bucket_size)],
            directory: vec![0],
            depth: 0,
            bucket_size,
            key_count: 0,
            elapsed: Cell::new(Duration::ZERO),
        }
    }

    /// Inserts `key`, returning `true` if newly inserted.
    pub fn insert(&mut self, key: u64) -> bool {
        let start = Instant::now();
        let inserted = self.insert_inner(key);
        self.elapsed.set(self.elapsed.get() + start.elapsed());
        inserted
    }

    fn insert_inner(&mut self, key: u64) -> bool {
        let hash = h1(key);
        let mut addr = low_bits(hash, self.depth);

        if self.buckets[self.directory[addr]].keys.contains(&key) {
            return false;
        }

        while self.buckets[self.directory[addr]].keys.len() == self.bucket_size {
            self.split_bucket(addr);
            addr = low_bits(hash, self.depth);
        }

        let idx = self.directory[addr];
        self.buckets[idx].keys.push(key);
        self.key_count += 1;
        true
    }

    /// Doubles the directory if the bucket at `addr` has caught up to the
    /// global depth, then splits it in two and redistributes its keys.
    fn split_bucket(&mut self, addr: usize) {
        let idx = self.directory[addr];
        if self.buckets[idx].local_depth == self.depth {
            self.double_directory();
        }

        let old_depth = self.buckets[idx].local_depth;
        let first_address = self.buckets[idx].first_address;
        let new_depth = old_depth + 1;
        self.buckets[idx].local_depth = new_depth;

        let new_first_address = (1usize << old_depth) | first_address;
        self.buckets.push(Bucket::new(new_first_address, new_depth, self.bucket_size));
        let new_idx = self.buckets.len() - 1;

        for a in redirected_indices(old_depth, new_depth, first_address, self.depth) {
            self.directory[a] = new_idx;
        }

        let displaced: Vec<u64> = std::mem::take(&mut self.buckets[idx].keys);
        for key in displaced {
            self.reinsert_after_split(key);
        }
    }

    /// Reinserts a key that was just evicted from a bucket being split. The
    /// key's own count was already tallied on its original insertion, so
    /// this must not touch `key_count`, and the target bucket is guaranteed
    /// to have room (each post-split bucket starts from zero keys and the
    /// old bucket can hold at most `bucket_size` keys total).
    fn reinsert_after_split(&mut self, key: u64) {
        let addr = low_bits(h1(key), self.depth);
        let idx = self.directory[addr];
        self.buckets[idx].keys.push(key);
    }

    fn double_directory(&mut self) {
        let new_len = self.directory.len() * 2;
        assert!(new_len <= MAX_TABLE_SIZE, "extendible directory has grown beyond the maximum allowed size");
        self.directory.extend_from_within(..);
        self.depth += 1;
    }

    /// Returns `true` iff `key` is present.
    pub fn lookup(&self, key: u64) -> bool {
        let start = Instant::now();
        let addr = low_bits(h1(key), self.depth);
        let found = self.buckets[self.directory[addr]].keys.contains(&key);
        self.elapsed.set(self.elapsed.get() + start.elapsed());
        found
    }

    pub fn len(&self) -> usize {
        self.key_count
    }

    pub fn is_empty(&self) -> bool {
        self.key_count == 0
    }

    /// The directory index of a bucket's first address is itself, for every
    /// bucket currently in the arena: `directory[first_address(b)] == b`.
    pub fn first_address_invariant_holds(&self) -> bool {
        self.buckets.iter().enumerate().all(|(idx, bucket)| {
            self.directory[bucket.first_address] == idx
        })
    }

    pub fn stats(&self) -> ExtendibleStats {
        ExtendibleStats {
            directory_len: self.directory.len(),
            bucket_count: self.buckets.len(),
            bucket_size: self.bucket_size,
            key_count: self.key_count,
            elapsed: self.elapsed.get(),
        }
    }
}

pub struct ExtendibleStats {
    pub directory_len: usize,
    pub bucket_count: usize,
    pub bucket_size: usize,
    pub key_count: usize,
    pub elapsed: Duration,
}

impl fmt::Display for ExtendibleStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "----- table stats -----")?;
        writeln!(f, "current table size:\t{}", self.directory_len)?;
        writeln!(f, "number of keys    :\t{}", self.key_count)?;
        writeln!(f, "number of buckets :\t{}", self.bucket_count)?;
        writeln!(
            f,
            "space usage factor:\t{:.3}%",
            self.key_count as f64 * 100.0 / (self.directory_len * self.bucket_size) as f64
        )?;
        writeln!(f, "bucket size       :\t{}", self.bucket_size)?;
        write!(f, "CPU time spent    :\t{:.6} sec", self.elapsed.as_secs_f64())
    }
}

impl fmt::Display for ExtendibleTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- table size: {}", self.directory.len())?;
        writeln!(f, "  table:               buckets:")?;
        writeln!(f, "  address | bucketid   bucketid [key]")?;
        for (i, &idx) in self.directory.iter().enumerate() {
            write!(f, "{i:9} | {:<9} ", self.buckets[idx].first_address)?;
            if self.buckets[idx].first_address == i {
                write!(f, "{idx:9} [")?;
                for j in 0..self.bucket_size {
                    match self.buckets[idx].keys.get(j) {
                        Some(k) => write!(f, " {k}")?,
                        None => write!(f, " -")?,
                    }
                }
                write!(f, " ]")?;
            }
            writeln!(f)?;
        }
        write!(f, "--- end table ---")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_lookup() {
        let mut t = ExtendibleTable::new(2);
        assert!(t.insert(1));
        assert!(t.lookup(1));
    }

    #[test]
    fn idempotent_insert() {
        let mut t = ExtendibleTable::new(2);
        assert!(t.insert(1));
        assert!(!t.insert(1));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn absence_on_empty_table() {
        let t = ExtendibleTable::new(2);
        assert!(!t.lookup(99));
    }

    #[test]
    fn absence_of_distinct_key() {
        let mut t = ExtendibleTable::new(2);
        t.insert(1);
        assert!(!t.lookup(99));
    }

    #[test]
    fn overflow_forces_a_split() {
        // bucket_size 2, starting depth 0: a third key forces at least one
        // split (and possibly a directory doubling).
        let mut t = ExtendibleTable::new(2);
        assert!(t.insert(1));
        assert!(t.insert(2));
        assert!(t.insert(3));
        assert!(t.depth >= 1, "inserting past bucket capacity must grow the directory");
        assert!(t.lookup(1));
        assert!(t.lookup(2));
        assert!(t.lookup(3));
    }

    #[test]
    fn directory_entries_per_bucket_matches_depth_difference() {
        let mut t = ExtendibleTable::new(1);
        for key in 0..20u64 {
            t.insert(key);
        }
        for bucket in &t.buckets {
            let refs = t.directory.iter().filter(|&&idx| t.buckets[idx].first_address == bucket.first_address).count();
            assert_eq!(refs, 1usize << (t.depth - bucket.local_depth));
        }
    }

    #[test]
    fn first_address_invariant() {
        let mut t = ExtendibleTable::new(1);
        for key in 0..50u64 {
            t.insert(key);
        }
        assert!(t.first_address_invariant_holds());
    }

    #[test]
    fn count_monotonic_across_inserts() {
        let mut t = ExtendibleTable::new(3);
        let mut last = 0;
        for key in 0..40u64 {
            t.insert(key);
            assert!(t.len() >= last);
            last = t.len();
        }
    }

    #[test]
    fn insert_lookup_consistency_over_random_keys() {
        let rng = fastrand::Rng::with_seed(11);
        let mut t = ExtendibleTable::new(4);
        let mut inserted = Vec::new();
        for _ in 0..300 {
            let key = rng.u64(..);
            if t.insert(key) {
                inserted.push(key);
            }
        }
        for &key in &inserted {
            assert!(t.lookup(key));
        }
    }
}
