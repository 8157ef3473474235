//! String interning backed by an arena.
//!
//! Grammar keywords and help blobs are interned so that node fingerprints
//! and structural comparisons can work with stable `&str` references that
//! live as long as the arena.

use bumpalo::Bump;
use hashbrown::HashSet;

pub struct StringInterner<'a> {
    arena: &'a Bump,
    set: HashSet<&'a str>,
}

impl<'a> StringInterner<'a> {
    pub fn new(arena: &'a Bump) -> Self {
        Self {
            arena,
            set: HashSet::new(),
        }
    }

    /// Intern `s`, returning a reference with the arena's lifetime.
    pub fn intern(&mut self, s: &str) -> &'a str {
        if let Some(&existing) = self.set.get(s) {
            existing
        } else {
            let interned: &'a str = self.arena.alloc_str(s);
            self.set.insert(interned);
            interned
        }
    }

    /// Number of distinct strings interned so far.
    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}
