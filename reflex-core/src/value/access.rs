//! The operation surface shared by raw objects and observed views.
//!
//! Raw [`Object`](super::Object)s implement these traits with plain storage
//! semantics; [`Observed`](crate::reactive::Observed) implements them again
//! with tracking and triggering layered on top. [`Value`] dispatches to
//! whichever it holds, so consumer code is written once.

use super::{CollectionIter, Key, Value};

/// Property-level operations: the part of an object that plain property
/// reads and writes go through.
pub trait PropertyAccess {
    /// Read `key`, resolving accessors against `receiver`.
    fn get_with_receiver(&self, key: &Key, receiver: &Value) -> Value;

    /// Write `key`. Data properties land on `receiver`; inherited setters are
    /// invoked with `receiver` as `this`. Returns `false` if the write was
    /// rejected (for example a getter-only accessor).
    fn set_with_receiver(&self, key: &Key, value: Value, receiver: &Value) -> bool;

    /// Whether `key` exists on this object or its prototype chain.
    fn has_property(&self, key: &Key) -> bool;

    fn delete_property(&self, key: &Key) -> bool;

    /// Enumerable own keys in insertion order. Arrays list their indices
    /// first; `length` is not enumerable.
    fn own_keys(&self) -> Vec<Key>;
}

/// Keyed-collection operations (Map, Set, WeakMap, WeakSet).
///
/// Operations a collection kind does not support are inert: a `get_entry`
/// on a Set returns `undefined`, `size` of a weak collection is `0`.
pub trait Collection {
    fn get_entry(&self, key: &Value) -> Value;

    fn has_entry(&self, key: &Value) -> bool;

    fn size(&self) -> usize;

    /// Insert `value` into a Set or WeakSet. Returns the receiver.
    fn add(&self, value: Value) -> Value;

    /// Insert or replace `key` in a Map or WeakMap. Returns the receiver.
    fn set_entry(&self, key: Value, value: Value) -> Value;

    /// Remove `key`. Returns whether it was present.
    fn delete_entry(&self, key: &Value) -> bool;

    fn clear(&self);

    /// Visit `(value, key, collection)` for every entry.
    fn for_each<F>(&self, f: F)
    where
        F: FnMut(Value, Value, &Value);

    fn keys(&self) -> CollectionIter;

    fn values(&self) -> CollectionIter;

    /// `[key, value]` pairs, each as a fresh two-element array.
    fn entries(&self) -> CollectionIter;

    /// Default iteration: entries for maps, values for sets.
    fn iter(&self) -> CollectionIter;
}
