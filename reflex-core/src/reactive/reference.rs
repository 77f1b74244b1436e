//! Reference Cells
//!
//! A [`Ref`] is a single-slot observable box. It exists for values that
//! need tracking without living in an object property: primitives, or an
//! object whose identity is replaced wholesale.
//!
//! # How Refs Work
//!
//! 1. Reading [`Ref::value`] inside an effect tracks the cell under its one
//!    implicit key.
//!
//! 2. [`Ref::set_value`] stores the new value and, if it differs from the
//!    old one, triggers that key.
//!
//! 3. Object values are stored as their reactive view, so reading a nested
//!    property through a ref is tracked too.
//!
//! The same handle type also carries computed cells (see `computed`) and
//! the property-delegating cells produced by [`to_refs`].
//!
//! # Memory Layout
//!
//! Each ref consists of:
//! - A unique target id (8 bytes), keying its dependency bucket
//! - The slot, or the state of the computed or property it stands for

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use super::computed::ComputedState;
use super::context;
use super::runtime::{self, track, trigger, DepKey, TriggerInfo};
use super::{registry, OperationType, TargetId};
use crate::value::{Key, Value};

enum Slot {
    Cell(RefCell<Value>),
    Computed(Rc<ComputedState>),
    Property { object: Value, key: Key },
}

struct RefInner {
    id: TargetId,
    slot: Slot,
}

impl Drop for RefInner {
    fn drop(&mut self) {
        runtime::forget_target(self.id);
    }
}

/// A reactive reference cell. Clones share the same cell.
///
/// # Example
///
/// ```rust,ignore
/// let count = Ref::new(0);
///
/// // Read the value (tracked inside effects)
/// let value = count.value();
///
/// // Write it; effects that read it re-run
/// count.set_value(5);
/// ```
#[derive(Clone)]
pub struct Ref(Rc<RefInner>);

/// The implicit key every cell read and write goes through.
fn value_key() -> DepKey {
    DepKey::from("")
}

impl Ref {
    /// Create a cell. Objects are stored as their reactive view.
    pub fn new(value: impl Into<Value>) -> Self {
        let value = registry::to_reactive(value.into());
        Self::with_slot(Slot::Cell(RefCell::new(value)))
    }

    pub(crate) fn computed(state: Rc<ComputedState>) -> Self {
        Self::with_slot(Slot::Computed(state))
    }

    fn property(object: Value, key: Key) -> Self {
        Self::with_slot(Slot::Property { object, key })
    }

    fn with_slot(slot: Slot) -> Self {
        Self(Rc::new(RefInner {
            id: TargetId::new(),
            slot,
        }))
    }

    /// The target id this cell tracks under.
    pub fn id(&self) -> TargetId {
        self.0.id
    }

    /// Get the current value.
    ///
    /// If called within an effect, the effect subscribes to this cell.
    pub fn value(&self) -> Value {
        match &self.0.slot {
            Slot::Cell(slot) => {
                track(self, OperationType::Get, value_key());
                slot.borrow().clone()
            }
            Slot::Computed(state) => state.value(),
            Slot::Property { object, key } => object.get(key),
        }
    }

    /// Get the current value without tracking.
    pub fn value_untracked(&self) -> Value {
        context::untracked(|| self.value())
    }

    /// Set a new value, notifying dependents if it changed.
    pub fn set_value(&self, value: impl Into<Value>) {
        match &self.0.slot {
            Slot::Cell(slot) => {
                let value = registry::to_reactive(value.into());
                if *slot.borrow() == value {
                    return;
                }
                let old_value = slot.replace(value.clone());
                trigger(
                    self,
                    OperationType::Set,
                    Some(value_key()),
                    TriggerInfo::change(old_value, value),
                );
            }
            Slot::Computed(state) => state.set_value(value.into()),
            Slot::Property { object, key } => {
                object.set(key, value);
            }
        }
    }

    /// Update the value using a function of the current value.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(Value) -> Value,
    {
        let next = f(self.value_untracked());
        self.set_value(next);
    }

    pub fn is_computed(&self) -> bool {
        matches!(self.0.slot, Slot::Computed(_))
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0.slot {
            Slot::Cell(slot) => match slot.try_borrow() {
                Ok(value) => write!(f, "Ref({value:?})"),
                Err(_) => f.write_str("Ref(<borrowed>)"),
            },
            Slot::Computed(state) => write!(f, "Computed({:?})", state.effect()),
            Slot::Property { key, .. } => write!(f, "Ref(.{key})"),
        }
    }
}

/// Whether `value` is a reference cell (computed cells included).
pub fn is_ref(value: &Value) -> bool {
    matches!(value, Value::Ref(_))
}

/// One cell per enumerable own key of `object`, each reading and writing
/// that property of `object` directly.
///
/// The cells have no tracking of their own: when `object` is observed,
/// reads and writes through them are tracked by the object's handlers.
pub fn to_refs(object: &Value) -> IndexMap<Key, Ref> {
    object
        .own_keys()
        .into_iter()
        .map(|key| (key.clone(), Ref::property(object.clone(), key)))
        .collect()
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
