//! Collection Tests
//!
//! Tracking and triggering through observed Map, Set, WeakMap and WeakSet
//! views.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use reflex_core::reactive::effect;
use reflex_core::{is_reactive, is_readonly, reactive, readonly, to_raw, Object, Value};
use serde_json::json;

fn counter() -> (Rc<Cell<u32>>, Rc<Cell<u32>>) {
    let count = Rc::new(Cell::new(0));
    (count.clone(), count)
}

fn bump(count: &Cell<u32>) {
    count.set(count.get() + 1);
}

// ----------------------------------------------------------------------------
// Map
// ----------------------------------------------------------------------------

#[test]
fn map_observes_entry_mutations() {
    let map = reactive(Object::map());
    let dummy = Rc::new(RefCell::new(Value::Undefined));

    let (reader, out) = (map.clone(), dummy.clone());
    let _e = effect(move || *out.borrow_mut() = reader.get_entry("key"));

    assert_eq!(*dummy.borrow(), Value::Undefined);
    map.set_entry("key", "value");
    assert_eq!(*dummy.borrow(), Value::from("value"));
    map.set_entry("key", "value2");
    assert_eq!(*dummy.borrow(), Value::from("value2"));
    map.delete_entry("key");
    assert_eq!(*dummy.borrow(), Value::Undefined);
}

#[test]
fn map_has_is_tracked_per_key() {
    let map = reactive(Object::map());
    let dummy = Rc::new(Cell::new(false));
    let (count, seen) = counter();

    let (reader, out) = (map.clone(), dummy.clone());
    let _e = effect(move || {
        bump(&seen);
        out.set(reader.has_entry("key"));
    });

    map.set_entry("other", 1);
    assert_eq!(count.get(), 1);
    map.set_entry("key", 1);
    assert!(dummy.get());
    assert_eq!(count.get(), 2);
}

#[test]
fn map_for_each_tracks_structure() {
    let map = reactive(Object::map());
    let dummy = Rc::new(Cell::new(0.0));

    let (reader, out) = (map.clone(), dummy.clone());
    let _e = effect(move || {
        let mut sum = 0.0;
        reader.for_each(|value, _, _| sum += value.as_number().unwrap_or_default());
        out.set(sum);
    });

    map.set_entry("a", 3);
    assert_eq!(dummy.get(), 3.0);
    map.set_entry("b", 5);
    assert_eq!(dummy.get(), 8.0);
    map.clear();
    assert_eq!(dummy.get(), 0.0);
}

#[test]
fn map_iterators_track_structure() {
    let map = reactive(Object::map());
    let keys = Rc::new(RefCell::new(Vec::new()));
    let entries = Rc::new(RefCell::new(Vec::new()));

    let (reader, out) = (map.clone(), keys.clone());
    let _k = effect(move || *out.borrow_mut() = reader.keys().collect::<Vec<_>>());
    let (reader, out) = (map.clone(), entries.clone());
    let _e = effect(move || {
        *out.borrow_mut() = reader
            .entries()
            .map(|pair| (pair.get(0), pair.get(1)))
            .collect::<Vec<_>>();
    });

    map.set_entry("a", 1);
    map.set_entry("b", 2);
    assert_eq!(*keys.borrow(), vec![Value::from("a"), Value::from("b")]);
    assert_eq!(
        *entries.borrow(),
        vec![(Value::from("a"), Value::from(1)), (Value::from("b"), Value::from(2))]
    );

    map.delete_entry("a");
    assert_eq!(*keys.borrow(), vec![Value::from("b")]);
}

#[test]
fn map_clear_on_empty_map_does_not_trigger() {
    let map = reactive(Object::map());
    let (count, seen) = counter();

    let reader = map.clone();
    let _e = effect(move || {
        bump(&seen);
        reader.size()
    });

    map.clear();
    map.delete_entry("missing");
    assert_eq!(count.get(), 1);
}

#[test]
fn map_keys_are_stored_raw() {
    let map = reactive(Object::map());
    let key = reactive(json!({}));
    map.set_entry(key.clone(), 1);

    assert_eq!(map.get_entry(key.clone()), Value::from(1));
    assert_eq!(map.get_entry(to_raw(key.clone())), Value::from(1));
    assert!(to_raw(map.clone()).has_entry(to_raw(key)));
}

#[test]
fn map_entry_values_are_observed_lazily() {
    let map = reactive(Object::map_from([("nested", Value::from(json!({ "n": 1 })))]));
    let dummy = Rc::new(RefCell::new(Value::Undefined));

    let (reader, out) = (map.clone(), dummy.clone());
    let _e = effect(move || *out.borrow_mut() = reader.get_entry("nested").get("n"));

    let nested = map.get_entry("nested");
    assert!(is_reactive(&nested));
    nested.set("n", 2);
    assert_eq!(*dummy.borrow(), Value::from(2));
}

#[test]
fn readonly_map_wraps_values_readonly() {
    let map = readonly(Object::map_from([("nested", Value::from(json!({ "n": 1 })))]));
    let nested = map.get_entry("nested");

    assert!(is_readonly(&nested));
    nested.set("n", 2);
    assert_eq!(nested.get("n"), Value::from(1));
}

// ----------------------------------------------------------------------------
// Set
// ----------------------------------------------------------------------------

#[test]
fn set_observes_membership() {
    let set = reactive(Object::set());
    let dummy = Rc::new(Cell::new(false));

    let (reader, out) = (set.clone(), dummy.clone());
    let _e = effect(move || out.set(reader.has_entry("value")));

    set.add("value");
    assert!(dummy.get());
    set.delete_entry("value");
    assert!(!dummy.get());
}

#[test]
fn set_values_follow_adds_and_clears() {
    let set = reactive(Object::set());
    let dummy = Rc::new(RefCell::new(Vec::new()));

    let (reader, out) = (set.clone(), dummy.clone());
    let _e = effect(move || *out.borrow_mut() = reader.values().collect::<Vec<_>>());

    set.add(1);
    set.add(2);
    assert_eq!(*dummy.borrow(), vec![Value::from(1), Value::from(2)]);
    set.clear();
    assert!(dummy.borrow().is_empty());
}

#[test]
fn set_stores_raw_members() {
    let set = reactive(Object::set());
    let member = reactive(json!({}));
    set.add(member.clone());

    assert!(set.has_entry(member.clone()));
    assert!(to_raw(set.clone()).has_entry(to_raw(member.clone())));
    assert_eq!(set.values().next(), Some(member));
}

// ----------------------------------------------------------------------------
// WeakMap and WeakSet
// ----------------------------------------------------------------------------

#[test]
fn weak_map_observes_object_keys() {
    let map = reactive(Object::weak_map());
    let key = Object::new();
    let dummy = Rc::new(RefCell::new(Value::Undefined));

    let (reader, owner, out) = (map.clone(), key.clone(), dummy.clone());
    let _e = effect(move || *out.borrow_mut() = reader.get_entry(owner.clone()));

    map.set_entry(key.clone(), "value");
    assert_eq!(*dummy.borrow(), Value::from("value"));
    map.delete_entry(key.clone());
    assert_eq!(*dummy.borrow(), Value::Undefined);
}

#[test]
fn weak_map_ignores_primitive_keys() {
    let map = reactive(Object::weak_map());
    let (count, seen) = counter();

    let reader = map.clone();
    let _e = effect(move || {
        bump(&seen);
        reader.get_entry("key")
    });

    map.set_entry("key", 1);
    assert_eq!(count.get(), 1);
    assert!(!map.has_entry("key"));
}

#[test]
fn weak_set_observes_membership() {
    let set = reactive(Object::weak_set());
    let member = reactive(json!({}));
    let dummy = Rc::new(Cell::new(false));

    let (reader, wanted, out) = (set.clone(), member.clone(), dummy.clone());
    let _e = effect(move || out.set(reader.has_entry(wanted.clone())));

    set.add(member.clone());
    assert!(dummy.get());
    set.delete_entry(member);
    assert!(!dummy.get());
}
