//! Computed and Ref Tests
//!
//! Laziness, chaining and effect interplay of computed values, and refs
//! stored inside observed objects.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;

use reflex_core::reactive::{effect, stop};
use reflex_core::{computed, computed_with, reactive, to_refs, Key, Ref, Value};
use serde_json::json;

fn number(value: Value) -> f64 {
    value.as_number().unwrap_or_default()
}

/// A computed value can depend on other computed values.
#[test]
fn computed_chains_recompute_in_order() {
    let state = reactive(json!({ "foo": 0 }));

    let reader = state.clone();
    let first = computed(move || number(reader.get("foo")) + 1.0);
    let inner = first.clone();
    let second = computed(move || number(inner.value()) + 1.0);

    assert_eq!(second.value(), Value::from(2));
    assert_eq!(first.value(), Value::from(1));

    state.set("foo", 1);
    assert_eq!(second.value(), Value::from(3));
    assert_eq!(first.value(), Value::from(2));
}

/// An effect reading a chain of computed values sees the latest value.
#[test]
fn effects_see_fresh_chained_values() {
    let state = reactive(json!({ "foo": 0 }));
    let compute_count = Arc::new(AtomicI32::new(0));

    let (reader, calls) = (state.clone(), compute_count.clone());
    let first = computed(move || {
        calls.fetch_add(1, Ordering::SeqCst);
        number(reader.get("foo")) + 1.0
    });
    let inner = first.clone();
    let second = computed(move || number(inner.value()) * 2.0);

    let seen = Rc::new(RefCell::new(Vec::new()));
    let (cell, out) = (second.clone(), seen.clone());
    let _e = effect(move || out.borrow_mut().push(cell.value()));

    state.set("foo", 1);
    assert_eq!(*seen.borrow(), vec![Value::from(2), Value::from(4)]);
    assert_eq!(compute_count.load(Ordering::SeqCst), 2);
}

/// Reading a computed value through a ref handle behaves the same.
#[test]
fn computed_is_a_ref() {
    let state = reactive(json!({ "n": 2 }));
    let reader = state.clone();
    let squared = computed(move || number(reader.get("n")).powi(2));

    let cell: Ref = squared.clone().into_ref();
    assert!(cell.is_computed());
    assert_eq!(cell.value(), Value::from(4));

    state.set("n", 3);
    assert_eq!(cell.value(), Value::from(9));
}

/// A writable computed routes writes through its setter.
#[test]
fn writable_computed_round_trips() {
    let state = reactive(json!({ "first": "Ada", "last": "Lovelace" }));

    let (reader, writer) = (state.clone(), state.clone());
    let full = computed_with(
        move || format!("{} {}", reader.get("first"), reader.get("last")),
        move |value| {
            let text = value.to_string();
            let mut parts = text.splitn(2, ' ');
            writer.set("first", parts.next().unwrap_or_default());
            writer.set("last", parts.next().unwrap_or_default());
        },
    );

    assert_eq!(full.value(), Value::from("Ada Lovelace"));
    full.set_value("Grace Hopper");
    assert_eq!(state.get("last"), Value::from("Hopper"));
    assert_eq!(full.value(), Value::from("Grace Hopper"));
}

/// Stopping a computed value freezes it at its last result.
#[test]
fn stopped_computed_no_longer_updates() {
    let state = reactive(json!({ "n": 1 }));
    let reader = state.clone();
    let value = computed(move || reader.get("n"));

    assert_eq!(value.value(), Value::from(1));
    stop(&value.effect());
    state.set("n", 2);
    assert_eq!(value.value(), Value::from(1));
    assert!(!value.is_dirty());
}

// ----------------------------------------------------------------------------
// Refs
// ----------------------------------------------------------------------------

#[test]
fn ref_is_reactive() {
    let cell = Ref::new(1);
    let dummy = Rc::new(RefCell::new(Value::Undefined));
    let run_count = Rc::new(Cell::new(0));

    let (reader, out, runs) = (cell.clone(), dummy.clone(), run_count.clone());
    let _e = effect(move || {
        runs.set(runs.get() + 1);
        *out.borrow_mut() = reader.value();
    });

    cell.set_value(2);
    assert_eq!(*dummy.borrow(), Value::from(2));
    cell.set_value(2);
    assert_eq!(run_count.get(), 2);
}

/// Refs stored in observed objects read and write as plain values.
#[test]
fn refs_unwrap_inside_objects() {
    let count = Ref::new(1);
    let state = reactive(json!({}));
    state.set("count", count.clone());

    assert_eq!(state.get("count"), Value::from(1));

    let dummy = Rc::new(RefCell::new(Value::Undefined));
    let (reader, out) = (state.clone(), dummy.clone());
    let _e = effect(move || *out.borrow_mut() = reader.get("count"));

    count.set_value(2);
    assert_eq!(*dummy.borrow(), Value::from(2));

    state.set("count", 3);
    assert_eq!(count.value(), Value::from(3));
    assert_eq!(*dummy.borrow(), Value::from(3));

    // Writing a ref replaces the ref itself
    let other = Ref::new(10);
    state.set("count", other.clone());
    assert_eq!(state.get("count"), Value::from(10));
    assert_eq!(count.value(), Value::from(3));
}

#[test]
fn to_refs_stay_linked() {
    let state = reactive(json!({ "x": 1, "y": 2 }));
    let refs = to_refs(&state);

    let x = &refs[&Key::from("x")];
    let y = &refs[&Key::from("y")];

    let dummy = Rc::new(Cell::new(0.0));
    let (rx, ry, out) = (x.clone(), y.clone(), dummy.clone());
    let _e = effect(move || out.set(number(rx.value()) + number(ry.value())));

    assert_eq!(dummy.get(), 3.0);
    state.set("x", 10);
    assert_eq!(dummy.get(), 12.0);
    y.set_value(5);
    assert_eq!(state.get("y"), Value::from(5));
    assert_eq!(dummy.get(), 15.0);
}
