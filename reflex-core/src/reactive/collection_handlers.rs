//! Method handlers for observed Map, Set, WeakMap and WeakSet views.
//!
//! Keyed collections are mutated through method calls, not property
//! writes, so the tracked surface of a collection view is this method
//! table. Each method unwraps its arguments to raw form, delegates to the
//! raw collection, and tracks or triggers around it:
//!
//! - `get_entry` / `has_entry` track `Get` / `Has` on the entry key.
//! - `size`, `for_each` and the iterators track the enumeration bucket.
//! - `add` triggers `Add` only for new members.
//! - `set_entry` triggers `Add` for new keys and `Set` for changed values.
//! - `delete_entry` triggers `Delete` only if the key was present.
//! - `clear` triggers `Clear` only if the collection had entries.
//!
//! Values handed back out (entry values, iterated keys and values, the
//! arguments of `for_each` callbacks) are wrapped in the view's mode.
//!
//! Read-only views refuse every mutating method while the lock is engaged:
//! `delete_entry` returns `false`, the others return the view unchanged.

use super::observed::warn_suppressed;
use super::runtime::{track, trigger, DepKey, TriggerInfo};
use super::{registry, Observed, OperationType};
use crate::error::ReactivityError;
use crate::value::{Collection, CollectionIter, IterMode, ObjectKind, Value, Wrap};

impl Observed {
    fn wrap_mode(&self) -> Wrap {
        if self.is_readonly() {
            Wrap::Readonly
        } else {
            Wrap::Reactive
        }
    }

    /// Returns `true` (after logging) if a mutation must be suppressed.
    fn refuse_mutation(&self, op: OperationType, key: Option<&Value>) -> bool {
        if !self.is_locked() {
            return false;
        }
        let err = ReactivityError::ReadonlyMutation {
            op,
            key: key.map(ToString::to_string),
        };
        warn_suppressed(&err, self.raw());
        true
    }

    fn tracked_iter(&self, mode: IterMode) -> CollectionIter {
        let target = self.raw();
        if !target.is_collection() {
            return CollectionIter::empty();
        }
        track(target, OperationType::Iterate, DepKey::Iterate);
        CollectionIter::new(target.clone(), mode, self.wrap_mode())
    }
}

impl Collection for Observed {
    fn get_entry(&self, key: &Value) -> Value {
        let target = self.raw();
        if !target.is_collection() {
            return Value::Undefined;
        }
        let key = registry::to_raw(key.clone());
        track(target, OperationType::Get, DepKey::Entry(key.clone()));
        self.wrap(target.get_entry(&key))
    }

    fn has_entry(&self, key: &Value) -> bool {
        let target = self.raw();
        if !target.is_collection() {
            return false;
        }
        let key = registry::to_raw(key.clone());
        track(target, OperationType::Has, DepKey::Entry(key.clone()));
        target.has_entry(&key)
    }

    fn size(&self) -> usize {
        let target = self.raw();
        if !target.is_collection() {
            return 0;
        }
        track(target, OperationType::Iterate, DepKey::Iterate);
        target.size()
    }

    fn add(&self, value: Value) -> Value {
        let target = self.raw();
        if !target.is_collection() || self.refuse_mutation(OperationType::Add, Some(&value)) {
            return self.receiver();
        }

        let value = registry::to_raw(value);
        let had_key = target.has_entry(&value);
        target.add(value.clone());
        if !had_key && target.has_entry(&value) {
            trigger(
                target,
                OperationType::Add,
                Some(DepKey::Entry(value.clone())),
                TriggerInfo::added(value),
            );
        }
        self.receiver()
    }

    fn set_entry(&self, key: Value, value: Value) -> Value {
        let target = self.raw();
        if !target.is_collection() || self.refuse_mutation(OperationType::Set, Some(&key)) {
            return self.receiver();
        }

        let key = registry::to_raw(key);
        let value = registry::to_raw(value);
        let had_key = target.has_entry(&key);
        let old_value = target.get_entry(&key);
        target.set_entry(key.clone(), value.clone());

        if !had_key {
            if target.has_entry(&key) {
                trigger(
                    target,
                    OperationType::Add,
                    Some(DepKey::Entry(key)),
                    TriggerInfo::change(old_value, value),
                );
            }
        } else if value != old_value {
            trigger(
                target,
                OperationType::Set,
                Some(DepKey::Entry(key)),
                TriggerInfo::change(old_value, value),
            );
        }
        self.receiver()
    }

    fn delete_entry(&self, key: &Value) -> bool {
        let target = self.raw();
        if !target.is_collection() || self.refuse_mutation(OperationType::Delete, Some(key)) {
            return false;
        }

        let key = registry::to_raw(key.clone());
        let had_key = target.has_entry(&key);
        let old_value = target.get_entry(&key);
        let result = target.delete_entry(&key);
        if had_key {
            trigger(
                target,
                OperationType::Delete,
                Some(DepKey::Entry(key)),
                TriggerInfo::removed(old_value),
            );
        }
        result
    }

    fn clear(&self) {
        let target = self.raw();
        if !target.is_collection() || self.refuse_mutation(OperationType::Clear, None) {
            return;
        }

        let had_items = target.size() != 0;
        #[cfg(debug_assertions)]
        let old_target = had_items.then(|| Value::Object(target.shallow_copy()));
        #[cfg(not(debug_assertions))]
        let old_target = None;

        target.clear();
        if had_items {
            trigger(
                target,
                OperationType::Clear,
                None,
                TriggerInfo {
                    old_target,
                    ..TriggerInfo::default()
                },
            );
        }
    }

    fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(Value, Value, &Value),
    {
        let target = self.raw();
        if !target.is_collection() {
            return;
        }
        track(target, OperationType::Iterate, DepKey::Iterate);
        let receiver = self.receiver();
        target.for_each(|value, key, _| f(self.wrap(value), self.wrap(key), &receiver));
    }

    fn keys(&self) -> CollectionIter {
        self.tracked_iter(IterMode::Keys)
    }

    fn values(&self) -> CollectionIter {
        self.tracked_iter(IterMode::Values)
    }

    fn entries(&self) -> CollectionIter {
        self.tracked_iter(IterMode::Entries)
    }

    fn iter(&self) -> CollectionIter {
        match self.raw().kind() {
            ObjectKind::Map | ObjectKind::WeakMap => self.entries(),
            _ => self.values(),
        }
    }
}
