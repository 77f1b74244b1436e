//! Identity Registry
//!
//! Maps each raw object to its observed views: at most one mutable and one
//! read-only view per object. Repeated wrapping returns the cached view,
//! so `reactive(o) == reactive(o)` holds for as long as someone holds the
//! view.
//!
//! # Ownership
//!
//! The registry holds views weakly and is keyed by [`TargetId`], so it
//! never keeps an object alive. When a raw object is dropped, its entries
//! (and its marks) are removed by [`forget`].
//!
//! The reverse direction needs no table: an [`Observed`] owns its raw
//! object, and being an `Observed` is what makes a value a view.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Weak;

use super::observed::{Observed, ObservedInner};
use super::{runtime, TargetId};
use crate::value::{Key, Object, ObjectKind, Value};

#[derive(Default)]
struct Registry {
    raw_to_reactive: HashMap<TargetId, Weak<ObservedInner>>,
    raw_to_readonly: HashMap<TargetId, Weak<ObservedInner>>,
    readonly_values: HashSet<TargetId>,
    non_reactive_values: HashSet<TargetId>,
}

impl Registry {
    fn views(&mut self, readonly: bool) -> &mut HashMap<TargetId, Weak<ObservedInner>> {
        if readonly {
            &mut self.raw_to_readonly
        } else {
            &mut self.raw_to_reactive
        }
    }
}

thread_local! {
    static REGISTRY: RefCell<Registry> = RefCell::new(Registry::default());
}

/// Observe `value` with mutable handlers.
///
/// A read-only view is returned unchanged, and an object marked with
/// [`mark_readonly`] gets a read-only view instead. Values that cannot be
/// observed are returned unchanged.
pub fn reactive(value: impl Into<Value>) -> Value {
    let value = value.into();
    if let Value::Observed(view) = &value {
        if view.is_readonly() {
            return value;
        }
    }
    if let Value::Object(target) = &value {
        if is_marked(target, |r| &r.readonly_values) {
            return readonly(value);
        }
    }
    create_observed(value, false)
}

/// Observe `value` with read-only handlers. A mutable view is unwrapped to
/// its raw object first.
pub fn readonly(value: impl Into<Value>) -> Value {
    let value = match value.into() {
        Value::Observed(view) if !view.is_readonly() => Value::Object(view.raw().clone()),
        other => other,
    };
    create_observed(value, true)
}

fn create_observed(value: Value, readonly: bool) -> Value {
    let target = match &value {
        Value::Object(target) => target.clone(),
        // Already a view.
        Value::Observed(_) => return value,
        Value::Ref(_) => return value,
        _ => {
            #[cfg(debug_assertions)]
            {
                let err = crate::error::ReactivityError::NotObservable {
                    value: format!("{value:?}"),
                };
                tracing::warn!("{err}");
            }
            return value;
        }
    };

    let cached = REGISTRY.with(|registry| {
        registry
            .borrow_mut()
            .views(readonly)
            .get(&target.id())
            .and_then(Observed::upgrade)
    });
    if let Some(view) = cached {
        return Value::Observed(view);
    }

    if !can_observe(&target) {
        return value;
    }

    let view = Observed::new(target.clone(), readonly);
    let stale = REGISTRY.with(|registry| {
        registry
            .borrow_mut()
            .views(readonly)
            .insert(target.id(), view.downgrade())
    });
    drop(stale);
    runtime::ensure_target(target.id());
    Value::Observed(view)
}

/// Framework nodes, dates and explicitly excluded objects are never
/// observed.
fn can_observe(target: &Object) -> bool {
    let this = Value::Object(target.clone());
    let is_framework_node = ["_isVue", "_isVNode"]
        .iter()
        .any(|marker| target.lookup(&Key::from(*marker), &this).truthy());

    !is_framework_node
        && target.kind() != ObjectKind::Date
        && !is_marked(target, |r| &r.non_reactive_values)
}

fn is_marked(target: &Object, set: impl Fn(&Registry) -> &HashSet<TargetId>) -> bool {
    REGISTRY.with(|registry| set(&*registry.borrow()).contains(&target.id()))
}

/// Whether `value` is an observed view, in either mode.
pub fn is_reactive(value: &Value) -> bool {
    matches!(value, Value::Observed(_))
}

pub fn is_readonly(value: &Value) -> bool {
    matches!(value, Value::Observed(view) if view.is_readonly())
}

/// The raw object behind a view, or `value` itself if it is not a view.
pub fn to_raw(value: impl Into<Value>) -> Value {
    match value.into() {
        Value::Observed(view) => Value::Object(view.raw().clone()),
        other => other,
    }
}

/// Make every future [`reactive`] call on `value` produce a read-only
/// view. Only affects raw objects that have no mutable view yet.
pub fn mark_readonly(value: impl Into<Value>) -> Value {
    let value = value.into();
    if let Value::Object(target) = &value {
        REGISTRY.with(|registry| registry.borrow_mut().readonly_values.insert(target.id()));
    }
    value
}

/// Exclude `value` from observation for good.
pub fn mark_non_reactive(value: impl Into<Value>) -> Value {
    let value = value.into();
    if let Value::Object(target) = &value {
        REGISTRY.with(|registry| registry.borrow_mut().non_reactive_values.insert(target.id()));
    }
    value
}

/// Wrap object-like values mutably; everything else passes through.
pub(crate) fn to_reactive(value: Value) -> Value {
    if value.is_object_like() {
        reactive(value)
    } else {
        value
    }
}

/// Wrap object-like values read-only; everything else passes through.
pub(crate) fn to_readonly(value: Value) -> Value {
    if value.is_object_like() {
        readonly(value)
    } else {
        value
    }
}

/// Drop every registry entry for a dead target. Runs from `Drop`, so it
/// gives up quietly if the registry is unavailable.
pub(crate) fn forget(id: TargetId) {
    let removed = REGISTRY
        .try_with(|registry| {
            registry.try_borrow_mut().ok().map(|mut registry| {
                registry.readonly_values.remove(&id);
                registry.non_reactive_values.remove(&id);
                (
                    registry.raw_to_reactive.remove(&id),
                    registry.raw_to_readonly.remove(&id),
                )
            })
        })
        .ok()
        .flatten();
    drop(removed);
}
