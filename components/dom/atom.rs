/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Per-document string interning.
//!
//! Tag names, attribute names, namespaces, class tokens and id values are
//! compared constantly while matching selectors and maintaining the document
//! indexes. Interning them once per document turns those comparisons into
//! pointer comparisons. Unlike a process-global atom table, a [`StringPool`]
//! lives and dies with its document, so an interned pointer is valid exactly
//! as long as the document is.

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHasher};

struct AtomInner {
    hash: u64,
    text: Box<str>,
}

/// An interned string. Cheap to clone, trivial to compare: two atoms from the
/// same pool are equal iff they are the same allocation.
#[derive(Clone)]
pub struct Atom(Rc<AtomInner>);

impl Atom {
    pub fn as_str(&self) -> &str {
        &self.0.text
    }

    pub fn is_empty(&self) -> bool {
        self.0.text.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.text.len()
    }

    /// The hash computed when the atom was interned.
    pub fn precomputed_hash(&self) -> u64 {
        self.0.hash
    }

    /// Content comparison with a pointer-equality fast path. Needed where the
    /// two sides may come from different pools (cross-document events,
    /// adoption), where pointer equality alone would be too strict.
    pub fn text_eq(&self, other: &Atom) -> bool {
        Rc::ptr_eq(&self.0, &other.0) ||
            (self.0.hash == other.0.hash && self.0.text == other.0.text)
    }
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Atom {}

impl Hash for Atom {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}

impl PartialEq<str> for Atom {
    fn eq(&self, other: &str) -> bool {
        &*self.0.text == other
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Atom({:?})", &self.0.text)
    }
}

impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0.text)
    }
}

fn str_hash(text: &str) -> u64 {
    let mut hasher = FxHasher::default();
    text.hash(&mut hasher);
    hasher.finish()
}

/// The per-document atom table.
pub struct StringPool {
    table: RefCell<FxHashMap<Box<str>, Atom>>,
}

impl StringPool {
    pub fn new() -> StringPool {
        StringPool {
            table: RefCell::new(FxHashMap::default()),
        }
    }

    /// Interns `text`, returning the pool's canonical atom for it.
    pub fn intern(&self, text: &str) -> Atom {
        let mut table = self.table.borrow_mut();
        if let Some(atom) = table.get(text) {
            return atom.clone();
        }
        let atom = Atom(Rc::new(AtomInner {
            hash: str_hash(text),
            text: text.into(),
        }));
        table.insert(text.into(), atom.clone());
        atom
    }

    /// Looks up the canonical atom for `text` without interning it. Used on
    /// read-only paths (index lookups) where a miss means "no such entry".
    pub fn get(&self, text: &str) -> Option<Atom> {
        self.table.borrow().get(text).cloned()
    }

    pub fn len(&self) -> usize {
        self.table.borrow().len()
    }
}

impl Default for StringPool {
    fn default() -> Self {
        StringPool::new()
    }
}

#[cfg(test)]
mod tests {
    use super::StringPool;

    #[test]
    fn interning_is_idempotent() {
        let pool = StringPool::new();
        let a = pool.intern("div");
        let b = pool.intern("div");
        assert_eq!(a, b);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn distinct_pools_produce_distinct_atoms() {
        let first = StringPool::new();
        let second = StringPool::new();
        let a = first.intern("span");
        let b = second.intern("span");
        assert_ne!(a, b);
        assert!(a.text_eq(&b));
    }
}
