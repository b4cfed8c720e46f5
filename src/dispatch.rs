//! Dispatch shell: a tagged handle hiding the choice of scheme behind one
//! uniform `insert`/`lookup`/`stats` surface.

use std::fmt;

use crate::cuckoo::CuckooTable;
use crate::error::{HashTableError, Result};
use crate::extendible::ExtendibleTable;
use crate::xuckoo::XuckooTable;

/// The three supported hashing schemes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Cuckoo,
    ExtendibleN,
    Xuckoo,
}

impl TableKind {
    /// Parses a scheme name the way the command-line `-t` flag accepts it:
    /// `0`/`cuckoo`, `1`/`xtndbln`, `2`/`xuckoo`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "0" | "cuckoo" => Some(TableKind::Cuckoo),
            "1" | "xtndbln" => Some(TableKind::ExtendibleN),
            "2" | "xuckoo" => Some(TableKind::Xuckoo),
            _ => None,
        }
    }
}

/// A hash table of one of the three supported schemes, addressed through a
/// single uniform interface.
pub enum HashTable {
    Cuckoo(CuckooTable),
    ExtendibleN(ExtendibleTable),
    Xuckoo(XuckooTable),
}

impl HashTable {
    /// Constructs a table of `kind`. `size_param` is the initial inner-table
    /// size for [`TableKind::Cuckoo`], the bucket capacity for
    /// [`TableKind::ExtendibleN`], and ignored for [`TableKind::Xuckoo`] —
    /// though it must still be positive, matching the CLI's single size
    /// validation path regardless of scheme.
    pub fn new(kind: TableKind, size_param: i64) -> Result<Self> {
        if size_param <= 0 {
            return Err(HashTableError::NonPositiveSize(size_param));
        }
        Ok(match kind {
            TableKind::Cuckoo => HashTable::Cuckoo(CuckooTable::new(size_param as usize)),
            TableKind::ExtendibleN => HashTable::ExtendibleN(ExtendibleTable::new(size_param as usize)),
            TableKind::Xuckoo => HashTable::Xuckoo(XuckooTable::new()),
        })
    }

    pub fn insert(&mut self, key: u64) -> bool {
        match self {
            HashTable::Cuckoo(t) => t.insert(key),
            HashTable::ExtendibleN(t) => t.insert(key),
            HashTable::Xuckoo(t) => t.insert(key),
        }
    }

    pub fn lookup(&self, key: u64) -> bool {
        match self {
            HashTable::Cuckoo(t) => t.lookup(key),
            HashTable::ExtendibleN(t) => t.lookup(key),
            HashTable::Xuckoo(t) => t.lookup(key),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            HashTable::Cuckoo(t) => t.len(),
            HashTable::ExtendibleN(t) => t.len(),
            HashTable::Xuckoo(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Renders the table's statistics, matching the original per-scheme
    /// `*_stats` output.
    pub fn stats_report(&self) -> String {
        match self {
            HashTable::Cuckoo(t) => t.stats().to_string(),
            HashTable::ExtendibleN(t) => t.stats().to_string(),
            HashTable::Xuckoo(t) => t.stats().to_string(),
        }
    }
}

impl fmt::Display for HashTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashTable::Cuckoo(t) => write!(f, "{t}"),
            HashTable::ExtendibleN(t) => write!(f, "{t}"),
            HashTable::Xuckoo(t) => write!(f, "{t}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognized_kind_does_not_parse() {
        assert_eq!(TableKind::parse("bogus"), None);
    }

    #[test]
    fn every_documented_alias_parses() {
        assert_eq!(TableKind::parse("0"), Some(TableKind::Cuckoo));
        assert_eq!(TableKind::parse("cuckoo"), Some(TableKind::Cuckoo));
        assert_eq!(TableKind::parse("1"), Some(TableKind::ExtendibleN));
        assert_eq!(TableKind::parse("xtndbln"), Some(TableKind::ExtendibleN));
        assert_eq!(TableKind::parse("2"), Some(TableKind::Xuckoo));
        assert_eq!(TableKind::parse("xuckoo"), Some(TableKind::Xuckoo));
    }

    #[test]
    fn non_positive_size_is_rejected_for_every_kind() {
        for kind in [TableKind::Cuckoo, TableKind::ExtendibleN, TableKind::Xuckoo] {
            assert!(matches!(HashTable::new(kind, 0), Err(HashTableError::NonPositiveSize(0))));
            assert!(matches!(HashTable::new(kind, -3), Err(HashTableError::NonPositiveSize(-3))));
        }
    }

    #[test]
    fn dispatches_to_the_right_backend() {
        let mut table = HashTable::new(TableKind::Cuckoo, 4).unwrap();
        assert!(table.insert(42));
        assert!(table.lookup(42));
        assert!(!table.insert(42));
        assert!(!table.lookup(7));
    }
}
