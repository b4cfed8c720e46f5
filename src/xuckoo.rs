//! Xuckoo hash table: two extendible directories, one per hash function,
//! each bucket holding at most one key. Collisions are resolved by cuckoo
//! displacement between the two directories; a displacement chain that
//! looks like it is cycling triggers a bucket split (and directory
//! doubling, if needed) instead of growing a fixed-width table.

use std::cell::Cell;
use std::fmt;
use std::time::{Duration, Instant};

use crate::addressing::{low_bits, redirected_indices, MAX_TABLE_SIZE};
use crate::hash::{h1, h2};

/// Past this many displacement steps, a bucket with room left to grow
/// (local depth below the inner table's global depth) is split for free.
const FIRST_LIMIT: u32 = 20_000;
/// Past this many displacement steps, the bucket is split unconditionally,
/// doubling the inner table's directory first if its local depth has
/// already caught up to the global depth.
const FINAL_LIMIT: u32 = 21_000;

/// A bucket holding at most one key.
struct Bucket {
    first_address: usize,
    local_depth: u32,
    key: Option<u64>,
}

impl Bucket {
    fn new(first_address: usize, local_depth: u32) -> Self {
        Bucket { first_address, local_depth, key: None }
    }
}

/// One of the two extendible directories making up a [`XuckooTable`].
struct Inner {
    id: u8, // 1 or 2, selects h1 or h2
    buckets: Vec<Bucket>,
    directory: Vec<usize>,
    depth: u32,
    key_count: usize,
}

impl Inner {
    fn new(id: u8) -> Self {
        Inner { id, buckets: vec![Bucket::new(0, 0)], directory: vec![0], depth: 0, key_count: 0 }
    }

    #[inline(always)]
    fn hash(&self, key: u64) -> u64 {
        if self.id == 1 { h1(key) } else { h2(key) }
    }

    #[inline(always)]
    fn address(&self, key: u64) -> usize {
        low_bits(self.hash(key), self.depth)
    }

    fn bucket_at(&self, addr: usize) -> &Bucket {
        &self.buckets[self.directory[addr]]
    }

    fn double_directory(&mut self) {
        let new_len = self.directory.len() * 2;
        assert!(new_len <= MAX_TABLE_SIZE, "xuckoo inner table has grown beyond the maximum allowed size");
        self.directory.extend_from_within(..);
        self.depth += 1;
    }

    /// Splits the bucket at `addr`, doubling the directory first if that
    /// bucket's local depth has caught up to the global depth. The bucket's
    /// own key (if any) is reinserted through this table's own addressing;
    /// it is never conflated with a cuckoo chain's in-flight carry key.
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
        self.buckets.push(Bucket::new(new_first_address, new_depth));
        let new_idx = self.buckets.len() - 1;

        for a in redirected_indices(old_depth, new_depth, first_address, self.depth) {
            self.directory[a] = new_idx;
        }

        if let Some(key) = self.buckets[idx].key.take() {
            let addr = self.address(key);
            let target = self.directory[addr];
            self.buckets[target].key = Some(key);
        }
    }
}

/// A dynamic xuckoo hash table over 64-bit keys.
pub struct XuckooTable {
    table1: Inner,
    table2: Inner,
    /// A `Cell` because `lookup` takes `&self` but must still accumulate
    /// the time it spends, per the spec's time-accounting requirement.
    elapsed: Cell<Duration>,
}

impl XuckooTable {
    /// Builds a table with both inner directories holding a single empty
    /// bucket.
    pub fn new() -> Self {
        XuckooTable { table1: Inner::new(1), table2: Inner::new(2), elapsed: Cell::new(Duration::ZERO) }
    }

    /// Inserts `key`, returning `true` if newly inserted.
    pub fn insert(&mut self, key: u64) -> bool {
        let start = Instant::now();
        let inserted = self.insert_inner(key);
        self.elapsed.set(self.elapsed.get() + start.elapsed());
        inserted
    }

    fn insert_inner(&mut self, key: u64) -> bool {
        let a1 = self.table1.address(key);
        let a2 = self.table2.address(key);
        if self.table1.bucket_at(a1).key == Some(key) || self.table2.bucket_at(a2).key == Some(key) {
            return false;
        }

        let start_at_table1 = self.table1.key_count <= self.table2.key_count;
        self.displace(key, start_at_table1, 0);
        true
    }

    /// Carries `carry` into the current table (1 if `on_table1`, else 2),
    /// alternating on eviction, with `counter` tracking total displacement
    /// steps across both tables for the split-on-cycle discipline.
    fn displace(&mut self, mut carry: u64, mut on_table1: bool, mut counter: u32) {
        loop {
            counter += 1;
            let table = if on_table1 { &mut self.table1 } else { &mut self.table2 };
            let addr = table.address(carry);
            let idx = table.directory[addr];

            if table.buckets[idx].key.is_none() {
                table.buckets[idx].key = Some(carry);
                table.key_count += 1;
                return;
            }

            let evicted = table.buckets[idx].key.replace(carry).unwrap();

            if counter >= FIRST_LIMIT && table.buckets[idx].local_depth < table.depth {
                table.split_bucket(addr);
            } else if counter >= FINAL_LIMIT {
                table.split_bucket(addr);
            }

            carry = evicted;
            on_table1 = !on_table1;
        }
    }

    /// Returns `true` iff `key` is present.
    pub fn lookup(&self, key: u64) -> bool {
        let start = Instant::now();
        let a1 = self.table1.address(key);
        let a2 = self.table2.address(key);
        let found = self.table1.bucket_at(a1).key == Some(key) || self.table2.bucket_at(a2).key == Some(key);
        self.elapsed.set(self.elapsed.get() + start.elapsed());
        found
    }

    pub fn len(&self) -> usize {
        self.table1.key_count + self.table2.key_count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> XuckooStats {
        XuckooStats {
            size1: self.table1.directory.len(),
            size2: self.table2.directory.len(),
            keys1: self.table1.key_count,
            keys2: self.table2.key_count,
            buckets1: self.table1.buckets.len(),
            buckets2: self.table2.buckets.len(),
            elapsed: self.elapsed.get(),
        }
    }
}

impl Default for XuckooTable {
    fn default() -> Self {
        Self::new()
    }
}

pub struct XuckooStats {
    pub size1: usize,
    pub size2: usize,
    pub keys1: usize,
    pub keys2: usize,
    pub buckets1: usize,
    pub buckets2: usize,
    pub elapsed: Duration,
}

impl fmt::Display for XuckooStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_size = self.size1 + self.size2;
        let total_keys = self.keys1 + self.keys2;
        let total_buckets = self.buckets1 + self.buckets2;
        writeln!(f, "----- table stats -----")?;
        writeln!(f)?;
        writeln!(f, "    --- overall ---")?;
        writeln!(f, "CPU time spent   :\t{:.6} sec", self.elapsed.as_secs_f64())?;
        writeln!(f, "total size       :\t{total_size} potential slots")?;
        writeln!(f, "total keys       :\t{total_keys}")?;
        writeln!(f, "total buckets    :\t{total_buckets}")?;
        writeln!(f, "total space usage:\t{:.3}%", total_keys as f64 * 100.0 / total_size as f64)?;
        writeln!(f, "    ---------------")?;
        writeln!(f)?;
        writeln!(f, "    ---  inner  ---")?;
        writeln!(f, "table 1:")?;
        writeln!(f, "  size       :\t{} slots", self.size1)?;
        writeln!(f, "  keys       :\t{}", self.keys1)?;
        writeln!(f, "  buckets    :\t{}", self.buckets1)?;
        writeln!(f, "  space usage:\t{:.3}%", self.keys1 as f64 * 100.0 / self.size1 as f64)?;
        writeln!(f, "table 2:")?;
        writeln!(f, "  size   :\t{} slots", self.size2)?;
        writeln!(f, "  keys   :\t{}", self.keys2)?;
        writeln!(f, "  buckets:\t{}", self.buckets2)?;
        write!(f, "  space usage:\t{:.3}%", self.keys2 as f64 * 100.0 / self.size2 as f64)
    }
}

impl fmt::Display for XuckooTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- table ---")?;
        for (t, table) in [(1, &self.table1), (2, &self.table2)] {
            writeln!(f, "table {t}")?;
            writeln!(f, "  table:               buckets:")?;
            writeln!(f, "  address | bucketid   bucketid [key]")?;
            for (i, &idx) in table.directory.iter().enumerate() {
                write!(f, "{i:9} | {:<9} ", table.buckets[idx].first_address)?;
                if table.buckets[idx].first_address == i {
                    write!(f, "{idx:9} ")?;
                    match table.buckets[idx].key {
                        Some(k) => write!(f, "[{k}]")?,
                        None => write!(f, "[ ]")?,
                    }
                }
                writeln!(f)?;
            }
        }
        write!(f, "--- end table ---")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_lookup() {
        let mut t = XuckooTable::new();
        assert!(t.insert(100));
        assert!(t.lookup(100));
    }

    #[test]
    fn duplicate_insert_reports_already_present() {
        let mut t = XuckooTable::new();
        assert!(t.insert(100));
        assert!(!t.insert(100));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn absence_on_empty_table() {
        let t = XuckooTable::new();
        assert!(!t.lookup(5));
    }

    #[test]
    fn absence_of_distinct_key() {
        let mut t = XuckooTable::new();
        t.insert(100);
        assert!(!t.lookup(5));
    }

    #[test]
    fn count_monotonic_and_consistent_over_many_keys() {
        let rng = fastrand::Rng::with_seed(99);
        let mut t = XuckooTable::new();
        let mut inserted = Vec::new();
        let mut last_len = 0;
        for _ in 0..2000 {
            let key = rng.u64(..);
            if !inserted.contains(&key) {
                assert!(t.insert(key));
                inserted.push(key);
            }
            assert!(t.len() >= last_len);
            last_len = t.len();
        }
        for &key in &inserted {
            assert!(t.lookup(key));
        }
        assert_eq!(t.table1.key_count + t.table2.key_count, inserted.len());
    }

    #[test]
    fn growth_stays_proportional_to_key_count() {
        let rng = fastrand::Rng::with_seed(123);
        let mut t = XuckooTable::new();
        let mut n = 0usize;
        for _ in 0..5000 {
            let key = rng.u64(..);
            if t.insert(key) {
                n += 1;
            }
        }
        // directory sizes should stay within a small constant factor of the
        // number of keys stored, not run away unboundedly.
        assert!(t.table1.directory.len() <= 64 * n.max(1));
        assert!(t.table2.directory.len() <= 64 * n.max(1));
    }
}
