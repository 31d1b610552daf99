//! String interning for identifiers and labels.
//!
//! A [`Symbol`] is a 4-byte handle into a global, process-lifetime string
//! table. AXIS source files are small, so the savings over `String` are
//! modest, but interning still turns every identifier comparison (keyword
//! dispatch in the lexer, name lookup in the symbol table, label comparison
//! in the assembler) into an integer compare instead of a byte-for-byte one.
//!
//! # Thread Safety
//!
//! The compiler itself runs single-threaded (see the crate-level concurrency
//! notes in `axis-drv`), but the table is built on `DashMap` so that the same
//! process can safely lex multiple source files from independent threads if
//! an embedder chooses to.

use ahash::AHasher;
use dashmap::DashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

/// An interned identifier or literal string.
///
/// Two symbols are equal if and only if the strings they were interned from
/// are equal - comparison never touches the underlying bytes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    index: u32,
}

impl Symbol {
    /// Intern `string`, returning the symbol for it.
    ///
    /// Interning the same bytes twice always returns the same `Symbol`.
    pub fn intern(string: &str) -> Self {
        table().intern(string)
    }

    /// Look up the original string for this symbol.
    ///
    /// Every `Symbol` that was produced by [`Symbol::intern`] resolves
    /// successfully; the only way to get `None` is to fabricate a `Symbol`
    /// with an index that was never interned, which client code cannot do
    /// safely (there is no public constructor besides `intern`).
    pub fn as_str(self) -> &'static str {
        table().get(self).expect("symbol not present in table")
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

struct StringTable {
    map: DashMap<u64, (&'static str, u32)>,
    next_index: AtomicU32,
}

impl StringTable {
    fn new() -> Self {
        StringTable {
            map: DashMap::with_capacity(256),
            next_index: AtomicU32::new(0),
        }
    }

    fn intern(&self, string: &str) -> Symbol {
        let hash = hash_of(string);
        if let Some(entry) = self.map.get(&hash) {
            if entry.value().0 == string {
                return Symbol { index: entry.value().1 };
            }
        }

        match self.map.entry(hash) {
            dashmap::mapref::entry::Entry::Occupied(entry) => {
                if entry.get().0 == string {
                    Symbol { index: entry.get().1 }
                } else {
                    self.intern_with_probe(string, hash)
                }
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                let leaked: &'static str = Box::leak(string.to_string().into_boxed_str());
                let index = self.next_index.fetch_add(1, Ordering::Relaxed);
                entry.insert((leaked, index));
                Symbol { index }
            }
        }
    }

    /// Linear probe on hash collision; AXIS source files are small enough
    /// that true collisions are vanishingly rare in practice.
    fn intern_with_probe(&self, string: &str, original_hash: u64) -> Symbol {
        const GOLDEN: u64 = 0x9e3779b97f4a7c15;
        for step in 1u64..=64 {
            let probe = original_hash.wrapping_add(step.wrapping_mul(GOLDEN));
            match self.map.get(&probe) {
                Some(entry) if entry.value().0 == string => {
                    return Symbol { index: entry.value().1 };
                }
                Some(_) => continue,
                None => {
                    let leaked: &'static str = Box::leak(string.to_string().into_boxed_str());
                    let index = self.next_index.fetch_add(1, Ordering::Relaxed);
                    self.map.insert(probe, (leaked, index));
                    return Symbol { index };
                }
            }
        }
        unreachable!("64 consecutive hash collisions while interning {string:?}");
    }

    fn get(&self, symbol: Symbol) -> Option<&'static str> {
        self.map
            .iter()
            .find(|entry| entry.value().1 == symbol.index)
            .map(|entry| entry.value().0)
    }
}

fn hash_of(string: &str) -> u64 {
    let mut hasher = AHasher::default();
    string.hash(&mut hasher);
    hasher.finish()
}

fn table() -> &'static StringTable {
    static TABLE: OnceLock<StringTable> = OnceLock::new();
    TABLE.get_or_init(StringTable::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_string_interns_to_same_symbol() {
        assert_eq!(Symbol::intern("main"), Symbol::intern("main"));
    }

    #[test]
    fn distinct_strings_get_distinct_symbols() {
        assert_ne!(Symbol::intern("give_7"), Symbol::intern("give_8"));
    }

    #[test]
    fn round_trips_through_as_str() {
        let s = Symbol::intern("_read_failed_test_roundtrip");
        assert_eq!(s.as_str(), "_read_failed_test_roundtrip");
    }
}
