//! Computed Implementation
//!
//! A computed cell is a cached derived value that re-evaluates only when
//! one of its dependencies changes, and only when it is next read.
//!
//! # How Computed Cells Work
//!
//! 1. The getter is wrapped in a lazy effect flagged as computed. Nothing
//!    runs until the value is first read.
//!
//! 2. Reading the value while dirty runs the effect, caches the result and
//!    clears the dirty flag. Reading it while clean returns the cache.
//!
//! 3. The effect's scheduler only sets the dirty flag. A dependency change
//!    never recomputes eagerly.
//!
//! 4. A read from inside another effect subscribes that effect to every Dep
//!    the computed effect belongs to, so the outer effect re-runs when any
//!    input of the computed changes.
//!
//! # Why This Matters
//!
//! Computed runners are notified before plain effects on every trigger, so
//! by the time an outer effect re-runs and reads the value, the flag is
//! already set and the read recomputes.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::context::{self, ReactiveContext};
use super::effect::{effect_with, EffectOptions, ReactiveEffect};
use super::Ref;
use crate::value::Value;

type Setter = Rc<dyn Fn(Value)>;

pub(crate) struct ComputedState {
    effect: ReactiveEffect,
    dirty: Rc<Cell<bool>>,
    value: RefCell<Value>,
    setter: Option<Setter>,
}

impl ComputedState {
    fn new(effect: ReactiveEffect, dirty: Rc<Cell<bool>>, setter: Option<Setter>) -> Self {
        Self {
            effect,
            dirty,
            value: RefCell::new(Value::Undefined),
            setter,
        }
    }

    pub(crate) fn effect(&self) -> &ReactiveEffect {
        &self.effect
    }

    pub(crate) fn value(&self) -> Value {
        if self.dirty.get() {
            let fresh = self.effect.run();
            let stale = self.value.replace(fresh);
            drop(stale);
            self.dirty.set(false);
        }
        track_child_run(&self.effect);
        self.value.borrow().clone()
    }

    pub(crate) fn set_value(&self, value: Value) {
        match &self.setter {
            Some(setter) => setter(value),
            None => {
                #[cfg(debug_assertions)]
                tracing::warn!(new_value = ?value, "write operation failed: computed value is readonly");
            }
        }
    }
}

/// Subscribe the running effect to everything `child` depends on.
fn track_child_run(child: &ReactiveEffect) {
    if !context::is_tracking() {
        return;
    }
    let Some(parent) = ReactiveContext::current() else {
        return;
    };
    for dep in child.dep_handles() {
        if dep.insert(&parent) {
            parent.record_dep(&dep);
        }
    }
}

/// A computed cell.
///
/// # Example
///
/// ```rust,ignore
/// let state = reactive(json!({ "num": 3 }));
/// let reader = state.clone();
/// let double = computed(move || reader.get("num").as_number().unwrap_or_default() * 2.0);
///
/// assert_eq!(double.value(), Value::from(6));
/// ```
#[derive(Clone)]
pub struct ComputedRef {
    cell: Ref,
    state: Rc<ComputedState>,
}

impl ComputedRef {
    /// Get the value, recomputing first if a dependency changed since the
    /// last read.
    pub fn value(&self) -> Value {
        self.state.value()
    }

    /// Call the setter. Read-only computed cells ignore the write.
    pub fn set_value(&self, value: impl Into<Value>) {
        self.state.set_value(value.into());
    }

    /// The underlying effect, for stopping the cell.
    pub fn effect(&self) -> ReactiveEffect {
        self.state.effect().clone()
    }

    /// Whether the next read will recompute.
    pub fn is_dirty(&self) -> bool {
        self.state.dirty.get()
    }

    /// The cell as a plain [`Ref`], for storing in objects or `Value`s.
    pub fn into_ref(self) -> Ref {
        self.cell
    }
}

impl AsRef<Ref> for ComputedRef {
    fn as_ref(&self) -> &Ref {
        &self.cell
    }
}

impl std::fmt::Debug for ComputedRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComputedRef")
            .field("effect", self.state.effect())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

fn build<G, R>(getter: G, setter: Option<Setter>) -> ComputedRef
where
    G: Fn() -> R + 'static,
    R: Into<Value>,
{
    let dirty = Rc::new(Cell::new(true));
    let flag = dirty.clone();
    let runner = effect_with(
        getter,
        EffectOptions::new()
            .lazy()
            .computed()
            .scheduler(move |_| flag.set(true)),
    );
    let state = Rc::new(ComputedState::new(runner, dirty, setter));
    ComputedRef {
        cell: Ref::computed(state.clone()),
        state,
    }
}

/// A read-only computed cell over `getter`.
pub fn computed<G, R>(getter: G) -> ComputedRef
where
    G: Fn() -> R + 'static,
    R: Into<Value>,
{
    build(getter, None)
}

/// A writable computed cell: reads go through `get`, writes call `set`.
pub fn computed_with<G, R, S>(get: G, set: S) -> ComputedRef
where
    G: Fn() -> R + 'static,
    R: Into<Value>,
    S: Fn(Value) + 'static,
{
    build(get, Some(Rc::new(set)))
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{effect, reactive, stop};
    use serde_json::json;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    #[test]
    fn computed_is_lazy() {
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let value = computed(move || call_count_clone.fetch_add(1, Ordering::SeqCst));

        // Should not have computed yet
        assert_eq!(call_count.load(Ordering::SeqCst), 0);
        assert!(value.is_dirty());

        // First access triggers computation
        assert_eq!(value.value(), Value::from(0));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        // Second access uses cache
        assert_eq!(value.value(), Value::from(0));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dependency_change_marks_dirty_without_recomputing() {
        let state = reactive(json!({ "n": 1 }));
        let call_count = Arc::new(AtomicI32::new(0));
        let (reader, calls) = (state.clone(), call_count.clone());
        let doubled = computed(move || {
            calls.fetch_add(1, Ordering::SeqCst);
            reader.get("n").as_number().unwrap_or_default() * 2.0
        });

        assert_eq!(doubled.value(), Value::from(2));
        state.set("n", 4);
        assert!(doubled.is_dirty());
        assert_eq!(call_count.load(Ordering::SeqCst), 1);

        assert_eq!(doubled.value(), Value::from(8));
        assert_eq!(call_count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn outer_effects_see_fresh_values() {
        let state = reactive(json!({ "n": 1 }));
        let reader = state.clone();
        let plus_one = computed(move || reader.get("n").as_number().unwrap_or_default() + 1.0);

        let seen = Rc::new(RefCell::new(Vec::new()));
        let (cell, out) = (plus_one.clone(), seen.clone());
        let _e = effect(move || out.borrow_mut().push(cell.value()));

        state.set("n", 5);
        assert_eq!(*seen.borrow(), vec![Value::from(2), Value::from(6)]);
    }

    #[test]
    fn writable_computed_calls_setter() {
        let state = reactive(json!({ "n": 1 }));
        let (reader, writer) = (state.clone(), state.clone());
        let plus_one = computed_with(
            move || reader.get("n").as_number().unwrap_or_default() + 1.0,
            move |value| {
                writer.set("n", value.as_number().unwrap_or_default() - 1.0);
            },
        );

        plus_one.set_value(10);
        assert_eq!(state.get("n"), Value::from(9));
        assert_eq!(plus_one.value(), Value::from(10));
    }

    #[test]
    fn readonly_computed_ignores_writes() {
        let constant = computed(|| 1);
        constant.set_value(2);
        assert_eq!(constant.value(), Value::from(1));
    }

    #[test]
    fn stopped_computed_keeps_its_cache() {
        let state = reactive(json!({ "n": 1 }));
        let reader = state.clone();
        let value = computed(move || reader.get("n"));

        assert_eq!(value.value(), Value::from(1));
        stop(&value.effect());
        state.set("n", 2);
        assert_eq!(value.value(), Value::from(1));
    }
}
