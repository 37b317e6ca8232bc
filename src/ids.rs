//! Monotonic id maps for statements and values.
//!
//! Grounded in `ast::types::RefEquality` (pointer-identity wrapper used to key
//! maps by AST node address rather than by structural content) and in the
//! `Checker`'s `bindings: Vec<Binding>` / index-map pattern from
//! `checkers/ast.rs`, generalized here into a reusable monotonic interner.

use std::hash::{Hash, Hasher};
use std::ops::Deref;

use rustc_hash::FxHashMap;

/// Wraps a reference so that equality and hashing are by pointer identity,
/// not by structural content. Used to key the node id map: two syntactically
/// identical statements at different source locations must get distinct ids.
#[derive(Debug)]
pub struct RefEquality<'a, T>(pub &'a T);

impl<'a, T> Copy for RefEquality<'a, T> {}

impl<'a, T> Clone for RefEquality<'a, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, T> Hash for RefEquality<'a, T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (self.0 as *const T).hash(state);
    }
}

impl<'a, 'b, T> PartialEq<RefEquality<'b, T>> for RefEquality<'a, T> {
    fn eq(&self, other: &RefEquality<'b, T>) -> bool {
        std::ptr::eq(self.0, other.0)
    }
}

impl<'a, T> Eq for RefEquality<'a, T> {}

impl<'a, T> Deref for RefEquality<'a, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.0
    }
}

/// A stable, monotonically-increasing id, starting at 1 (0 is reserved to
/// mean "no id" in the wire format's optional slots).
pub type Id = u64;

/// A monotonic interner from `K` to `Id`. Ids are assigned on first encounter
/// and never reused or renumbered; lookups for an already-seen key return the
/// existing id.
#[derive(Debug, Default)]
pub struct IdMap<K: Eq + Hash> {
    ids: FxHashMap<K, Id>,
    next: Id,
}

impl<K: Eq + Hash> IdMap<K> {
    pub fn new() -> Self {
        IdMap {
            ids: FxHashMap::default(),
            next: 1,
        }
    }

    /// Returns the id for `key`, assigning a fresh one if unseen.
    pub fn get(&mut self, key: K) -> Id {
        self.get_checked(key).0
    }

    /// Like `get`, but also reports whether this call performed an insertion.
    /// The Instrumenter asserts `inserted == false` for every node it touches:
    /// rewriting must never mint new statement ids.
    pub fn get_checked(&mut self, key: K) -> (Id, bool) {
        if let Some(&id) = self.ids.get(&key) {
            return (id, false);
        }
        let id = self.next;
        self.next += 1;
        self.ids.insert(key, id);
        (id, true)
    }

    /// Looks up `key` without inserting.
    pub fn peek(&self, key: &K) -> Option<Id> {
        self.ids.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assigns_ids_from_one_and_reuses_them() {
        let mut map: IdMap<&str> = IdMap::new();
        assert_eq!(map.get("a"), 1);
        assert_eq!(map.get("b"), 2);
        assert_eq!(map.get("a"), 1);
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn get_checked_reports_insertion() {
        let mut map: IdMap<&str> = IdMap::new();
        assert_eq!(map.get_checked("a"), (1, true));
        assert_eq!(map.get_checked("a"), (1, false));
    }
}
