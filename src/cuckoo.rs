//! Cuckoo hash table: two fixed-width inner tables, two independent hash
//! functions, displacement on collision, full doubling-and-rehash when a
//! displacement chain cycles back on itself.

use std::cell::Cell;
use std::fmt;
use std::time::{Duration, Instant};

use crate::addressing::MAX_TABLE_SIZE;
use crate::hash::{h1, h2};

/// One of the two parallel slot arrays making up a [`CuckooTable`].
struct InnerTable {
    id: u8, // 1 or 2, selects h1 or h2
    slots: Vec<Option<u64>>,
    load: usize,
}

impl InnerTable {
    fn new(id: u8, size: usize) -> Self {
        InnerTable { id, slots: vec![None; size], load: 0 }
    }

    #[inline(always)]
    fn address(&self, key: u64, size: usize) -> usize {
        let hash = if self.id == 1 { h1(key) } else { h2(key) };
        (hash % size as u64) as usize
    }
}

/// A dynamic cuckoo hash table over 64-bit keys.
///
/// Holds two inner tables of equal length `size`. Every stored key lives in
/// exactly one slot: either `h1(k) mod size` of table 1, or `h2(k) mod size`
/// of table 2. A displacement chain that loops back to the key it started
/// with triggers a full doubling and rehash of both inner tables.
pub struct CuckooTable {
    table1: InnerTable,
    table2: InnerTable,
    size: usize,
    /// A `Cell` because `lookup` takes `&self` but must still accumulate
    /// the time it spends, per the spec's time-accounting requirement.
    elapsed: Cell<Duration>,
}

/// Whether an in-flight displacement chain placed its carried key, or
/// discovered that it had cycled back to the key the chain started with.
enum Displaced {
    Placed,
    Cycled,
}

impl CuckooTable {
    /// Builds a table with both inner tables holding `size` empty slots.
    /// `size` must be positive.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "cuckoo table size must be positive");
        CuckooTable {
            table1: InnerTable::new(1, size),
            table2: InnerTable::new(2, size),
            size,
            elapsed: Cell::new(Duration::ZERO),
        }
    }

    /// Inserts `key`, returning `true` if it was newly inserted and `false`
    /// if it was already present.
    pub fn insert(&mut self, key: u64) -> bool {
        let start = Instant::now();
        let inserted = self.insert_inner(key);
        self.elapsed.set(self.elapsed.get() + start.elapsed());
        inserted
    }

    fn insert_inner(&mut self, key: u64) -> bool {
        loop {
            let v = self.table1.address(key, self.size);
            let w = self.table2.address(key, self.size);

            if self.table1.slots[v].is_none() {
                self.table1.slots[v] = Some(key);
                self.table1.load += 1;
                return true;
            }
            if self.table1.slots[v] == Some(key) {
                return false;
            }
            if self.table2.slots[w] == Some(key) {
                return false;
            }

            let evicted = self.table1.slots[v].replace(key).unwrap();
            match self.displace(evicted, key, 2) {
                Displaced::Placed => return true,
                Displaced::Cycled => {
                    self.double_and_rehash();
                    // the key that completed the cycle is exactly the key
                    // we set out to insert; retry now that the tables have
                    // grown.
                    continue;
                }
            }
        }
    }

    /// Carries `carry` through alternating tables starting at `table_id`
    /// (1 or 2), remembering `initial_key` to detect a displacement cycle.
    fn displace(&mut self, mut carry: u64, initial_key: u64, mut table_id: u8) -> Displaced {
        loop {
            if carry == initial_key {
                return Displaced::Cycled;
            }
            let table = if table_id == 1 { &mut self.table1 } else { &mut self.table2 };
            let addr = table.address(carry, self.size);

            match table.slots[addr] {
                None => {
                    table.slots[addr] = Some(carry);
                    table.load += 1;
                    return Displaced::Placed;
                }
                Some(occupant) => {
                    table.slots[addr] = Some(carry);
                    carry = occupant;
                    table_id = if table_id == 1 { 2 } else { 1 };
                }
            }
        }
    }

    /// Doubles `size`, allocates fresh inner tables, and reinserts every key
    /// that was present in either of the old ones.
    fn double_and_rehash(&mut self) {
        let new_size = self.size * 2;
        assert!(
            new_size <= MAX_TABLE_SIZE,
            "cuckoo table has grown beyond the maximum allowed size"
        );

        let old_keys: Vec<u64> = self
            .table1
            .slots
            .iter()
            .chain(self.table2.slots.iter())
            .filter_map(|slot| *slot)
            .collect();

        self.table1 = InnerTable::new(1, new_size);
        self.table2 = InnerTable::new(2, new_size);
        self.size = new_size;

        for key in old_keys {
            self.insert_inner(key);
        }
    }

    /// Returns `true` iff `key` is present.
    pub fn lookup(&self, key: u64) -> bool {
        let start = Instant::now();
        let v = self.table1.address(key, self.size);
        let w = self.table2.address(key, self.size);
        let found = self.table1.slots[v] == Some(key) || self.table2.slots[w] == Some(key);
        self.elapsed.set(self.elapsed.get() + start.elapsed());
        found
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.table1.load + self.table2.load
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CuckooStats {
        CuckooStats {
            size: self.size,
            load1: self.table1.load,
            load2: self.table2.load,
            elapsed: self.elapsed.get(),
        }
    }
}

pub struct CuckooStats {
    pub size: usize,
    pub load1: usize,
    pub load2: usize,
    pub elapsed: Duration,
}

impl fmt::Display for CuckooStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total_load = self.load1 + self.load2;
        let total_slots = self.size * 2;
        writeln!(f, "----- table stats -----")?;
        writeln!(f)?;
        writeln!(f, "    --- overall ---")?;
        writeln!(f, "CPU time spent:\t\t{:.6} sec", self.elapsed.as_secs_f64())?;
        writeln!(f, "total size:\t\t{total_slots} slots")?;
        writeln!(f, "    ({} slots in 2 tables)", self.size)?;
        writeln!(f, "total load:\t\t{total_load} items")?;
        writeln!(
            f,
            "total load factor:\t{:.3}%",
            total_load as f64 * 100.0 / total_slots as f64
        )?;
        writeln!(f, "    ---------------")?;
        writeln!(f)?;
        writeln!(f, "    ---  inner  ---")?;
        writeln!(f, "table 1:")?;
        writeln!(f, "  load:\t\t{} items", self.load1)?;
        writeln!(f, "  load factor:\t{:.3}%", self.load1 as f64 * 100.0 / self.size as f64)?;
        writeln!(f, "table 2:")?;
        writeln!(f, "  load:\t\t{} items", self.load2)?;
        write!(f, "  load factor:\t{:.3}%", self.load2 as f64 * 100.0 / self.size as f64)
    }
}

impl fmt::Display for CuckooTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- table size: {}", self.size)?;
        writeln!(f, "                    table one         table two")?;
        writeln!(f, "                  key | address     address | key")?;
        for i in 0..self.size {
            match self.table1.slots[i] {
                Some(k) => write!(f, " {k:20} ")?,
                None => write!(f, " {:>20} ", "-")?,
            }
            write!(f, "| {i:<9} {i:>9} |")?;
            match self.table2.slots[i] {
                Some(k) => writeln!(f, " {k}")?,
                None => writeln!(f, " -")?,
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
        let mut t = CuckooTable::new(4);
        assert!(t.insert(42));
        assert!(t.lookup(42));
    }

    #[test]
    fn idempotent_insert() {
        let mut t = CuckooTable::new(4);
        assert!(t.insert(42));
        assert!(!t.insert(42));
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn absence_on_empty_table() {
        let t = CuckooTable::new(4);
        assert!(!t.lookup(7));
    }

    #[test]
    fn absence_of_distinct_key() {
        let mut t = CuckooTable::new(4);
        t.insert(42);
        assert!(!t.lookup(7));
    }

    #[test]
    fn count_increases_by_one_per_successful_insert() {
        let mut t = CuckooTable::new(8);
        let mut expected = 0;
        for key in [1u64, 2, 3, 4, 5] {
            assert!(t.insert(key));
            expected += 1;
            assert_eq!(t.len(), expected);
        }
        // duplicate insert does not increase the count
        t.insert(3);
        assert_eq!(t.len(), expected);
    }

    #[test]
    fn rehash_preserves_all_keys() {
        // a small initial table forces several displacement cycles and
        // doublings as more keys land than the starting size can hold.
        let mut t = CuckooTable::new(2);
        let keys: Vec<u64> = (0..11).collect();
        for &k in &keys {
            assert!(t.insert(k));
        }
        assert!(t.size > 2, "table should have doubled at least once");
        for &k in &keys {
            assert!(t.lookup(k), "key {k} missing after rehash");
        }
    }

    #[test]
    fn insert_lookup_consistency_over_random_keys() {
        let rng = fastrand::Rng::with_seed(7);
        let mut t = CuckooTable::new(16);
        let mut inserted = Vec::new();
        for _ in 0..200 {
            let key = rng.u64(..);
            if t.insert(key) {
                inserted.push(key);
            }
        }
        for &key in &inserted {
            assert!(t.lookup(key));
        }
        // a key vanishingly unlikely to have been drawn above
        assert!(!t.lookup(u64::MAX));
    }
}
