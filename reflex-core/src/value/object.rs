//! Raw Objects
//!
//! An [`Object`] is the plain, unobserved storage behind every observed
//! view. It knows nothing about tracking: reading or writing it directly
//! never records a dependency or notifies an effect.
//!
//! # Storage
//!
//! Every object has an ordered property bag (data and accessor properties)
//! and an optional prototype. Arrays additionally own sparse element storage
//! and expose `length`; keyed collections own their entries. Property lookups
//! walk the prototype chain, and a prototype may itself be an observed view,
//! in which case the lookup passes through that view's handlers.
//!
//! # Identity
//!
//! Each object carries a [`TargetId`] that keys the dependency store and the
//! identity registry. Dropping the last handle removes the object's entries
//! from both.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::{Rc, Weak};

use indexmap::{IndexMap, IndexSet};

use super::access::{Collection, PropertyAccess};
use super::iter::{CollectionIter, IterMode, Wrap};
use super::{Function, Key, Value};
use crate::reactive::{runtime, TargetId};

/// The built-in kind of an object, reported as its type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Object,
    Array,
    Map,
    Set,
    WeakMap,
    WeakSet,
    Date,
}

impl ObjectKind {
    /// The `[object Tag]` string for this kind.
    pub fn type_tag(self) -> &'static str {
        match self {
            ObjectKind::Object => "[object Object]",
            ObjectKind::Array => "[object Array]",
            ObjectKind::Map => "[object Map]",
            ObjectKind::Set => "[object Set]",
            ObjectKind::WeakMap => "[object WeakMap]",
            ObjectKind::WeakSet => "[object WeakSet]",
            ObjectKind::Date => "[object Date]",
        }
    }

    pub fn is_collection(self) -> bool {
        matches!(
            self,
            ObjectKind::Map | ObjectKind::Set | ObjectKind::WeakMap | ObjectKind::WeakSet
        )
    }
}

/// A property slot.
#[derive(Clone)]
pub enum Property {
    Data(Value),
    Accessor {
        get: Option<Function>,
        set: Option<Function>,
    },
}

/// Array elements.
///
/// Only present indices are stored, so a hole costs nothing and `length`
/// may run far past the last element. `length` never exceeds `u32::MAX`,
/// and the largest index is one less.
struct Elements {
    items: BTreeMap<u32, Value>,
    len: u32,
}

impl Elements {
    fn get(&self, index: u32) -> Option<&Value> {
        self.items.get(&index)
    }

    fn contains(&self, index: u32) -> bool {
        self.items.contains_key(&index)
    }

    /// Store `value` at `index`, growing `length` past it if needed.
    fn insert(&mut self, index: u32, value: Value) -> Option<Value> {
        self.len = self.len.max(index.saturating_add(1));
        self.items.insert(index, value)
    }

    /// Leave a hole at `index`. `length` is unchanged.
    fn remove(&mut self, index: u32) -> Option<Value> {
        self.items.remove(&index)
    }

    /// Truncate or extend to `len`, returning whatever was cut off.
    fn set_len(&mut self, len: u32) -> BTreeMap<u32, Value> {
        let removed = self.items.split_off(&len);
        self.len = len;
        removed
    }

    fn indices(&self) -> impl Iterator<Item = u32> + '_ {
        self.items.keys().copied()
    }
}

impl FromIterator<Value> for Elements {
    fn from_iter<I: IntoIterator<Item = Value>>(values: I) -> Self {
        let items: BTreeMap<u32, Value> = (0..u32::MAX).zip(values).collect();
        let len = items.keys().next_back().map_or(0, |last| last + 1);
        Self { items, len }
    }
}

/// A valid array length: an integer in `0..=u32::MAX`.
fn array_length(value: &Value) -> Option<u32> {
    value
        .as_number()
        .filter(|n| *n >= 0.0 && n.fract() == 0.0 && *n <= f64::from(u32::MAX))
        .map(|n| n as u32)
}

enum Storage {
    Plain,
    Elements(Elements),
    Map(IndexMap<Value, Value>),
    Set(IndexSet<Value>),
    WeakMap(IndexMap<TargetId, (Weak<ObjectData>, Value)>),
    WeakSet(IndexMap<TargetId, Weak<ObjectData>>),
    Date(f64),
}

pub(crate) struct ObjectData {
    id: TargetId,
    kind: ObjectKind,
    props: RefCell<IndexMap<Key, Property>>,
    storage: RefCell<Storage>,
    proto: RefCell<Option<Value>>,
}

impl Drop for ObjectData {
    fn drop(&mut self) {
        runtime::forget_target(self.id);
    }
}

/// A handle to raw object storage. Clones share the same object.
#[derive(Clone)]
pub struct Object(Rc<ObjectData>);

impl Object {
    fn with_storage(kind: ObjectKind, storage: Storage) -> Self {
        Self(Rc::new(ObjectData {
            id: TargetId::new(),
            kind,
            props: RefCell::new(IndexMap::new()),
            storage: RefCell::new(storage),
            proto: RefCell::new(None),
        }))
    }

    /// A new empty plain object.
    pub fn new() -> Self {
        Self::with_storage(ObjectKind::Object, Storage::Plain)
    }

    /// A plain object from `(key, value)` pairs.
    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<Key>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let object = Self::new();
        {
            let mut props = object.0.props.borrow_mut();
            for (key, value) in pairs {
                props.insert(key.into(), Property::Data(value.into()));
            }
        }
        object
    }

    pub fn array<V, I>(items: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        let elements = items.into_iter().map(Into::into).collect();
        Self::with_storage(ObjectKind::Array, Storage::Elements(elements))
    }

    pub fn map() -> Self {
        Self::with_storage(ObjectKind::Map, Storage::Map(IndexMap::new()))
    }

    pub fn map_from<K, V, I>(entries: I) -> Self
    where
        K: Into<Value>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::with_storage(ObjectKind::Map, Storage::Map(map))
    }

    pub fn set() -> Self {
        Self::with_storage(ObjectKind::Set, Storage::Set(IndexSet::new()))
    }

    pub fn set_from<V, I>(values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        let set = values.into_iter().map(Into::into).collect();
        Self::with_storage(ObjectKind::Set, Storage::Set(set))
    }

    pub fn weak_map() -> Self {
        Self::with_storage(ObjectKind::WeakMap, Storage::WeakMap(IndexMap::new()))
    }

    pub fn weak_set() -> Self {
        Self::with_storage(ObjectKind::WeakSet, Storage::WeakSet(IndexMap::new()))
    }

    /// A date holding milliseconds since the epoch.
    pub fn date(millis: f64) -> Self {
        Self::with_storage(ObjectKind::Date, Storage::Date(millis))
    }

    pub fn id(&self) -> TargetId {
        self.0.id
    }

    pub fn kind(&self) -> ObjectKind {
        self.0.kind
    }

    pub fn type_tag(&self) -> &'static str {
        self.0.kind.type_tag()
    }

    pub fn is_array(&self) -> bool {
        self.0.kind == ObjectKind::Array
    }

    pub fn is_collection(&self) -> bool {
        self.0.kind.is_collection()
    }

    pub fn date_value(&self) -> Option<f64> {
        match &*self.0.storage.borrow() {
            Storage::Date(millis) => Some(*millis),
            _ => None,
        }
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub fn prototype(&self) -> Option<Value> {
        self.0.proto.borrow().clone()
    }

    /// Replace the prototype. Only object-like values (raw or observed) are
    /// accepted; anything else clears the prototype.
    pub fn set_prototype(&self, proto: Option<Value>) {
        let proto = proto.filter(Value::is_object_like);
        let previous = self.0.proto.replace(proto);
        drop(previous);
    }

    /// Define an accessor property.
    pub fn define_accessor(&self, key: impl Into<Key>, get: Option<Function>, set: Option<Function>) {
        let previous = self
            .0
            .props
            .borrow_mut()
            .insert(key.into(), Property::Accessor { get, set });
        drop(previous);
    }

    /// The own property slot for `key`, if any.
    pub fn own_property(&self, key: &Key) -> Option<Property> {
        if let Storage::Elements(elements) = &*self.0.storage.borrow() {
            if let Some(index) = key.as_index() {
                return elements.get(index).cloned().map(Property::Data);
            }
            if key.is_length() {
                return Some(Property::Data(Value::from(elements.len)));
            }
        }
        self.0.props.borrow().get(key).cloned()
    }

    pub fn has_own(&self, key: &Key) -> bool {
        if let Storage::Elements(elements) = &*self.0.storage.borrow() {
            if let Some(index) = key.as_index() {
                return elements.contains(index);
            }
            if key.is_length() {
                return true;
            }
        }
        self.0.props.borrow().contains_key(key)
    }

    /// Read `key` through the raw prototype chain without passing through
    /// any observed view. Accessors run with `receiver` as `this`.
    pub(crate) fn lookup(&self, key: &Key, receiver: &Value) -> Value {
        match self.own_property(key) {
            Some(Property::Data(value)) => value,
            Some(Property::Accessor { get: Some(get), .. }) => get.call(receiver, &[]),
            Some(Property::Accessor { get: None, .. }) => Value::Undefined,
            None => match self.prototype().and_then(|p| p.raw_object()) {
                Some(proto) => proto.lookup(key, receiver),
                None => Value::Undefined,
            },
        }
    }

    /// Create or overwrite an own data property. Fails if the slot is an
    /// accessor.
    pub(crate) fn define_data(&self, key: &Key, value: Value) -> bool {
        if let Some(Property::Accessor { .. }) = self.0.props.borrow().get(key) {
            return false;
        }
        if self.is_array() {
            if let Some(index) = key.as_index() {
                let previous = {
                    let mut storage = self.0.storage.borrow_mut();
                    let Storage::Elements(elements) = &mut *storage else {
                        return false;
                    };
                    elements.insert(index, value)
                };
                drop(previous);
                return true;
            }
            if key.is_length() {
                return self.set_length(&value);
            }
        }
        let previous = self
            .0
            .props
            .borrow_mut()
            .insert(key.clone(), Property::Data(value));
        drop(previous);
        true
    }

    /// Rejects anything that is not a valid array length, leaving the array
    /// untouched.
    fn set_length(&self, value: &Value) -> bool {
        let Some(len) = array_length(value) else {
            return false;
        };
        let removed = {
            let mut storage = self.0.storage.borrow_mut();
            let Storage::Elements(elements) = &mut *storage else {
                return false;
            };
            elements.set_len(len)
        };
        drop(removed);
        true
    }

    /// The entry at `index` in iteration order, as `(key, value)`. Sets
    /// report each member as both key and value.
    pub(crate) fn entry_at(&self, index: usize) -> Option<(Value, Value)> {
        match &*self.0.storage.borrow() {
            Storage::Map(map) => map.get_index(index).map(|(k, v)| (k.clone(), v.clone())),
            Storage::Set(set) => set.get_index(index).map(|v| (v.clone(), v.clone())),
            _ => None,
        }
    }

    fn entries_snapshot(&self) -> Vec<(Value, Value)> {
        match &*self.0.storage.borrow() {
            Storage::Map(map) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            Storage::Set(set) => set.iter().map(|v| (v.clone(), v.clone())).collect(),
            _ => Vec::new(),
        }
    }

    /// A shallow copy of a Map or Set, used for debug payloads.
    pub(crate) fn shallow_copy(&self) -> Object {
        match self.kind() {
            ObjectKind::Map => Object::map_from(self.entries_snapshot()),
            ObjectKind::Set => Object::set_from(self.entries_snapshot().into_iter().map(|(_, v)| v)),
            _ => Object::new(),
        }
    }

    fn receiver(&self) -> Value {
        Value::Object(self.clone())
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

fn weak_key(key: &Value) -> Option<Object> {
    let object = key.raw_object();
    if object.is_none() {
        #[cfg(debug_assertions)]
        tracing::warn!(key = ?key, "invalid value used as weak collection key");
    }
    object
}

impl PropertyAccess for Object {
    fn get_with_receiver(&self, key: &Key, receiver: &Value) -> Value {
        match self.own_property(key) {
            Some(Property::Data(value)) => value,
            Some(Property::Accessor { get: Some(get), .. }) => get.call(receiver, &[]),
            Some(Property::Accessor { get: None, .. }) => Value::Undefined,
            None => match self.prototype() {
                Some(proto) => proto.get_with_receiver(key, receiver),
                None => Value::Undefined,
            },
        }
    }

    fn set_with_receiver(&self, key: &Key, value: Value, receiver: &Value) -> bool {
        match self.own_property(key) {
            Some(Property::Accessor { set: Some(set), .. }) => {
                set.call(receiver, &[value]);
                true
            }
            Some(Property::Accessor { set: None, .. }) => false,
            Some(Property::Data(_)) => define_on_receiver(receiver, key, value),
            None => match self.prototype() {
                Some(proto) => proto.set_with_receiver(key, value, receiver),
                None => define_on_receiver(receiver, key, value),
            },
        }
    }

    fn has_property(&self, key: &Key) -> bool {
        if self.has_own(key) {
            return true;
        }
        match self.prototype() {
            Some(proto) => proto.has(key),
            None => false,
        }
    }

    fn delete_property(&self, key: &Key) -> bool {
        if self.is_array() {
            if key.is_length() {
                return false;
            }
            if let Some(index) = key.as_index() {
                let previous = {
                    let mut storage = self.0.storage.borrow_mut();
                    match &mut *storage {
                        Storage::Elements(elements) => elements.remove(index),
                        _ => None,
                    }
                };
                drop(previous);
                return true;
            }
        }
        let previous = self.0.props.borrow_mut().shift_remove(key);
        drop(previous);
        true
    }

    fn own_keys(&self) -> Vec<Key> {
        let mut keys = Vec::new();
        if let Storage::Elements(elements) = &*self.0.storage.borrow() {
            keys.extend(elements.indices().map(Key::from));
        }
        keys.extend(self.0.props.borrow().keys().cloned());
        keys
    }
}

/// Data writes land on the receiver's raw storage; observed receivers have
/// no define trap, so this never re-enters tracking.
fn define_on_receiver(receiver: &Value, key: &Key, value: Value) -> bool {
    match receiver.raw_object() {
        Some(target) => target.define_data(key, value),
        None => false,
    }
}

impl Collection for Object {
    fn get_entry(&self, key: &Value) -> Value {
        match &*self.0.storage.borrow() {
            Storage::Map(map) => map.get(key).cloned().unwrap_or_default(),
            Storage::WeakMap(map) => key
                .raw_object()
                .and_then(|k| map.get(&k.id()))
                .filter(|(weak, _)| weak.strong_count() > 0)
                .map(|(_, v)| v.clone())
                .unwrap_or_default(),
            _ => Value::Undefined,
        }
    }

    fn has_entry(&self, key: &Value) -> bool {
        match &*self.0.storage.borrow() {
            Storage::Map(map) => map.contains_key(key),
            Storage::Set(set) => set.contains(key),
            Storage::WeakMap(map) => key
                .raw_object()
                .and_then(|k| map.get(&k.id()))
                .is_some_and(|(weak, _)| weak.strong_count() > 0),
            Storage::WeakSet(set) => key
                .raw_object()
                .and_then(|k| set.get(&k.id()))
                .is_some_and(|weak| weak.strong_count() > 0),
            _ => false,
        }
    }

    fn size(&self) -> usize {
        match &*self.0.storage.borrow() {
            Storage::Map(map) => map.len(),
            Storage::Set(set) => set.len(),
            _ => 0,
        }
    }

    fn add(&self, value: Value) -> Value {
        match self.kind() {
            ObjectKind::Set => {
                let mut storage = self.0.storage.borrow_mut();
                if let Storage::Set(set) = &mut *storage {
                    set.insert(value);
                }
            }
            ObjectKind::WeakSet => {
                if let Some(member) = weak_key(&value) {
                    let stale = {
                        let mut storage = self.0.storage.borrow_mut();
                        match &mut *storage {
                            Storage::WeakSet(set) => {
                                set.retain(|_, weak| weak.strong_count() > 0);
                                set.insert(member.id(), Rc::downgrade(&member.0))
                            }
                            _ => None,
                        }
                    };
                    drop(stale);
                }
            }
            _ => {}
        }
        self.receiver()
    }

    fn set_entry(&self, key: Value, value: Value) -> Value {
        match self.kind() {
            ObjectKind::Map => {
                let previous = {
                    let mut storage = self.0.storage.borrow_mut();
                    match &mut *storage {
                        Storage::Map(map) => map.insert(key, value),
                        _ => None,
                    }
                };
                drop(previous);
            }
            ObjectKind::WeakMap => {
                if let Some(owner) = weak_key(&key) {
                    let previous = {
                        let mut storage = self.0.storage.borrow_mut();
                        match &mut *storage {
                            Storage::WeakMap(map) => {
                                let stale: Vec<_> = map
                                    .iter()
                                    .filter(|(_, (weak, _))| weak.strong_count() == 0)
                                    .map(|(id, _)| *id)
                                    .collect();
                                let mut dropped: Vec<_> =
                                    stale.iter().filter_map(|id| map.shift_remove(id)).collect();
                                dropped.extend(
                                    map.insert(owner.id(), (Rc::downgrade(&owner.0), value)),
                                );
                                dropped
                            }
                            _ => Vec::new(),
                        }
                    };
                    drop(previous);
                }
            }
            _ => {}
        }
        self.receiver()
    }

    fn delete_entry(&self, key: &Value) -> bool {
        let removed = {
            let mut storage = self.0.storage.borrow_mut();
            match &mut *storage {
                Storage::Map(map) => map.shift_remove_entry(key).map(|(k, v)| vec![k, v]),
                Storage::Set(set) => set.shift_take(key).map(|v| vec![v]),
                Storage::WeakMap(map) => key
                    .raw_object()
                    .and_then(|k| map.shift_remove(&k.id()))
                    .map(|(_, v)| vec![v]),
                Storage::WeakSet(set) => key
                    .raw_object()
                    .and_then(|k| set.shift_remove(&k.id()))
                    .map(|_| Vec::new()),
                _ => None,
            }
        };
        removed.is_some()
    }

    fn clear(&self) {
        let cleared = {
            let mut storage = self.0.storage.borrow_mut();
            match &mut *storage {
                Storage::Map(map) => Some(Storage::Map(std::mem::take(map))),
                Storage::Set(set) => Some(Storage::Set(std::mem::take(set))),
                _ => None,
            }
        };
        drop(cleared);
    }

    fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(Value, Value, &Value),
    {
        let receiver = self.receiver();
        for (key, value) in self.entries_snapshot() {
            f(value, key, &receiver);
        }
    }

    fn keys(&self) -> CollectionIter {
        CollectionIter::new(self.clone(), IterMode::Keys, Wrap::Raw)
    }

    fn values(&self) -> CollectionIter {
        CollectionIter::new(self.clone(), IterMode::Values, Wrap::Raw)
    }

    fn entries(&self) -> CollectionIter {
        CollectionIter::new(self.clone(), IterMode::Entries, Wrap::Raw)
    }

    fn iter(&self) -> CollectionIter {
        match self.kind() {
            ObjectKind::Map => self.entries(),
            _ => self.values(),
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.type_tag(), self.id().raw())
    }
}
