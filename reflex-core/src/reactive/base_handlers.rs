//! Property handlers for observed plain objects and arrays.
//!
//! Reads track, writes trigger:
//!
//! | operation      | tracks              | triggers                         |
//! |----------------|---------------------|----------------------------------|
//! | get            | `Get` on the key    |                                  |
//! | has            | `Has` on the key    |                                  |
//! | own keys       | `Iterate` (`length` for arrays) |                      |
//! | set            |                     | `Add` if new, `Set` if changed   |
//! | delete         |                     | `Delete` if the key existed      |
//!
//! Nested objects are wrapped lazily on read, in the same mode as the view
//! they were read through. Reference cells stored as property values are
//! unwrapped on read, and writes of plain values into them go through the
//! cell. Storage only ever receives raw values.
//!
//! Collection views pass plain property access straight through to the raw
//! object without tracking; their tracked surface is the method table in
//! `collection_handlers`.

use super::observed::warn_suppressed;
use super::runtime::{track, trigger, DepKey, TriggerInfo};
use super::{registry, Observed, OperationType};
use crate::error::ReactivityError;
use crate::value::{Key, PropertyAccess, Value};

impl PropertyAccess for Observed {
    fn get_with_receiver(&self, key: &Key, receiver: &Value) -> Value {
        let target = self.raw();
        let res = target.get_with_receiver(key, receiver);
        if target.is_collection() || key.is_well_known_symbol() {
            return res;
        }

        track(target, OperationType::Get, DepKey::from(key));

        match res {
            Value::Ref(cell) => cell.value(),
            nested if nested.is_object_like() => self.wrap(nested),
            plain => plain,
        }
    }

    fn set_with_receiver(&self, key: &Key, value: Value, receiver: &Value) -> bool {
        let target = self.raw();
        if target.is_collection() {
            return target.set_with_receiver(key, value, receiver);
        }
        if self.is_locked() {
            let err = ReactivityError::ReadonlyMutation {
                op: OperationType::Set,
                key: Some(key.to_string()),
            };
            warn_suppressed(&err, target);
            return true;
        }

        let value = registry::to_raw(value);
        let had_key = target.has_own(key);
        let old_value = target.lookup(key, receiver);
        if let Value::Ref(cell) = &old_value {
            if !matches!(value, Value::Ref(_)) {
                cell.set_value(value);
                return true;
            }
        }

        let result = target.set_with_receiver(key, value.clone(), receiver);

        // Writes that land on a descendant through this prototype belong to
        // the descendant's view.
        let own_write = receiver
            .raw_object()
            .is_some_and(|receiver| receiver.ptr_eq(target));
        if own_write && result {
            if !had_key {
                trigger(
                    target,
                    OperationType::Add,
                    Some(DepKey::from(key)),
                    TriggerInfo::change(old_value, value),
                );
            } else if value != old_value {
                trigger(
                    target,
                    OperationType::Set,
                    Some(DepKey::from(key)),
                    TriggerInfo::change(old_value, value),
                );
            }
        }
        result
    }

    fn has_property(&self, key: &Key) -> bool {
        let target = self.raw();
        let result = target.has_property(key);
        if !target.is_collection() {
            track(target, OperationType::Has, DepKey::from(key));
        }
        result
    }

    fn delete_property(&self, key: &Key) -> bool {
        let target = self.raw();
        if target.is_collection() {
            return target.delete_property(key);
        }
        if self.is_locked() {
            let err = ReactivityError::ReadonlyMutation {
                op: OperationType::Delete,
                key: Some(key.to_string()),
            };
            warn_suppressed(&err, target);
            return true;
        }

        let had_key = target.has_own(key);
        let old_value = target.lookup(key, &Value::Object(target.clone()));
        let result = target.delete_property(key);
        if had_key && result {
            trigger(
                target,
                OperationType::Delete,
                Some(DepKey::from(key)),
                TriggerInfo::removed(old_value),
            );
        }
        result
    }

    fn own_keys(&self) -> Vec<Key> {
        let target = self.raw();
        if target.is_array() {
            track(target, OperationType::Get, DepKey::Prop(Key::length()));
        } else if !target.is_collection() {
            track(target, OperationType::Iterate, DepKey::Iterate);
        }
        target.own_keys()
    }
}
