//! Observed Views
//!
//! An [`Observed`] is the intercepted view over a raw [`Object`]. It holds
//! no data of its own: every read goes through to the raw object and is
//! tracked, every write goes through and is triggered. Plain objects and
//! arrays use the property handlers in `base_handlers`; Map, Set, WeakMap
//! and WeakSet use the method handlers in `collection_handlers`.
//!
//! Views are created only through the identity registry, which caches one
//! mutable and one read-only view per raw object.

use std::fmt;
use std::rc::{Rc, Weak};

use super::lock;
use super::registry;
use crate::error::ReactivityError;
use crate::value::{Key, Object, PropertyAccess, Value};

pub(crate) struct ObservedInner {
    raw: Object,
    readonly: bool,
}

/// A tracked view over a raw object. Clones share the same view.
#[derive(Clone)]
pub struct Observed(Rc<ObservedInner>);

impl Observed {
    pub(crate) fn new(raw: Object, readonly: bool) -> Self {
        Self(Rc::new(ObservedInner { raw, readonly }))
    }

    pub(crate) fn downgrade(&self) -> Weak<ObservedInner> {
        Rc::downgrade(&self.0)
    }

    pub(crate) fn upgrade(weak: &Weak<ObservedInner>) -> Option<Self> {
        weak.upgrade().map(Self)
    }

    /// The raw object behind this view.
    pub fn raw(&self) -> &Object {
        &self.0.raw
    }

    pub fn is_readonly(&self) -> bool {
        self.0.readonly
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub(crate) fn receiver(&self) -> Value {
        Value::Observed(self.clone())
    }

    /// Wrap a nested value to match this view's mode.
    pub(crate) fn wrap(&self, value: Value) -> Value {
        if self.is_readonly() {
            registry::to_readonly(value)
        } else {
            registry::to_reactive(value)
        }
    }

    /// Whether a mutation through this view must be suppressed.
    pub(crate) fn is_locked(&self) -> bool {
        self.is_readonly() && lock::is_locked()
    }

    /// Like [`Value::set`], but reports a suppressed read-only write as an
    /// error instead of pretending it succeeded.
    pub fn try_set(&self, key: impl Into<Key>, value: impl Into<Value>) -> Result<bool, ReactivityError> {
        let key = key.into();
        if self.is_locked() {
            return Err(ReactivityError::ReadonlyMutation {
                op: super::OperationType::Set,
                key: Some(key.to_string()),
            });
        }
        Ok(self.set_with_receiver(&key, value.into(), &self.receiver()))
    }

    /// Like [`Value::delete`], but reports a suppressed read-only delete as
    /// an error.
    pub fn try_delete(&self, key: impl Into<Key>) -> Result<bool, ReactivityError> {
        let key = key.into();
        if self.is_locked() {
            return Err(ReactivityError::ReadonlyMutation {
                op: super::OperationType::Delete,
                key: Some(key.to_string()),
            });
        }
        Ok(self.delete_property(&key))
    }
}

impl fmt::Debug for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.is_readonly() { "Readonly" } else { "Reactive" };
        write!(f, "{mode}({:?})", self.raw())
    }
}

/// Log a suppressed mutation in development builds.
#[cfg_attr(not(debug_assertions), allow(unused_variables))]
pub(crate) fn warn_suppressed(err: &ReactivityError, target: &Object) {
    #[cfg(debug_assertions)]
    tracing::warn!(target_object = ?target, "{err}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{lock, readonly, unlock};
    use serde_json::json;

    #[test]
    fn try_set_reports_locked_readonly_writes() {
        let view = readonly(json!({ "a": 1 }));
        let observed = view.as_observed().cloned().unwrap();

        let err = observed.try_set("a", 2).unwrap_err();
        assert_eq!(
            err,
            ReactivityError::ReadonlyMutation {
                op: crate::reactive::OperationType::Set,
                key: Some("a".into()),
            }
        );
        assert_eq!(view.get("a"), Value::from(1));

        unlock();
        assert_eq!(observed.try_set("a", 2), Ok(true));
        assert_eq!(observed.try_delete("a"), Ok(true));
        lock();
        assert!(!view.has("a"));
    }

    #[test]
    fn debug_names_mode_and_target() {
        let view = readonly(json!({}));
        let text = format!("{view:?}");
        assert!(text.starts_with("Readonly([object Object]#"));
    }
}
