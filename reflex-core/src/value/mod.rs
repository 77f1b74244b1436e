//! Dynamic Values
//!
//! The engine observes plain data of arbitrary shape: nested objects,
//! arrays, keyed collections, prototype chains. [`Value`] is the dynamically
//! typed slot that holds any of it.
//!
//! # Equality
//!
//! Reference variants (objects, observed views, refs, functions, symbols)
//! compare by identity. Primitives compare by SameValueZero: `NaN` equals
//! `NaN` and `-0` equals `+0`. The same relation drives `Hash`, so values
//! can key Map and Set storage and dependency buckets directly.
//!
//! # Dispatch
//!
//! The accessor methods on [`Value`] (`get`, `set`, `has`, `get_entry`, ...)
//! route to raw storage for [`Value::Object`] and through the tracking
//! handlers for [`Value::Observed`]. On primitives they are inert.

mod access;
mod function;
mod iter;
mod key;
mod object;
mod serialize;

pub use access::{Collection, PropertyAccess};
pub use function::Function;
pub use iter::{CollectionIter, IterMode};
pub(crate) use iter::Wrap;
pub use key::{Key, Symbol, WellKnownSymbol};
pub use object::{Object, ObjectKind, Property};

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use crate::error::ValueError;
use crate::reactive::{ComputedRef, Observed, Ref};

/// A dynamically typed value.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    Str(Rc<str>),
    Symbol(Symbol),
    Function(Function),
    /// Raw, unobserved object storage.
    Object(Object),
    /// An intercepted view over a raw object.
    Observed(Observed),
    /// A reference cell or computed cell.
    Ref(Ref),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::Str(_) => "string",
            Value::Symbol(_) => "symbol",
            Value::Function(_) => "function",
            Value::Object(_) | Value::Observed(_) => "object",
            Value::Ref(_) => "ref",
        }
    }

    /// Whether this value can be observed: a raw object or an observed view.
    pub fn is_object_like(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Observed(_))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_observed(&self) -> Option<&Observed> {
        match self {
            Value::Observed(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_ref_cell(&self) -> Option<&Ref> {
        match self {
            Value::Ref(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match self {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// The raw storage behind this value: the object itself, or the target
    /// of an observed view.
    pub fn raw_object(&self) -> Option<Object> {
        match self {
            Value::Object(o) => Some(o.clone()),
            Value::Observed(o) => Some(o.raw().clone()),
            _ => None,
        }
    }

    /// Identity comparison, `===` without the primitive special cases.
    pub fn same(&self, other: &Value) -> bool {
        self == other
    }

    // ------------------------------------------------------------------
    // Property access
    // ------------------------------------------------------------------

    pub fn get(&self, key: impl Into<Key>) -> Value {
        self.get_with_receiver(&key.into(), self)
    }

    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> bool {
        self.set_with_receiver(&key.into(), value.into(), self)
    }

    pub fn has(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        match self {
            Value::Object(o) => o.has_property(&key),
            Value::Observed(o) => o.has_property(&key),
            _ => false,
        }
    }

    pub fn delete(&self, key: impl Into<Key>) -> bool {
        let key = key.into();
        match self {
            Value::Object(o) => o.delete_property(&key),
            Value::Observed(o) => o.delete_property(&key),
            _ => false,
        }
    }

    pub fn own_keys(&self) -> Vec<Key> {
        match self {
            Value::Object(o) => o.own_keys(),
            Value::Observed(o) => o.own_keys(),
            _ => Vec::new(),
        }
    }

    pub(crate) fn get_with_receiver(&self, key: &Key, receiver: &Value) -> Value {
        match self {
            Value::Object(o) => o.get_with_receiver(key, receiver),
            Value::Observed(o) => o.get_with_receiver(key, receiver),
            _ => Value::Undefined,
        }
    }

    pub(crate) fn set_with_receiver(&self, key: &Key, value: Value, receiver: &Value) -> bool {
        match self {
            Value::Object(o) => o.set_with_receiver(key, value, receiver),
            Value::Observed(o) => o.set_with_receiver(key, value, receiver),
            _ => false,
        }
    }

    pub fn prototype_of(&self) -> Option<Value> {
        self.raw_object().and_then(|o| o.prototype())
    }

    /// Replace the prototype of the underlying raw object. Observed views
    /// have no prototype trap, so this always lands on raw storage.
    pub fn set_prototype_of(&self, proto: Option<Value>) {
        if let Some(object) = self.raw_object() {
            object.set_prototype(proto);
        }
    }

    /// Call this value as a function with `this` bound to `this`.
    pub fn call(&self, this: &Value, args: &[Value]) -> Value {
        match self {
            Value::Function(f) => f.call(this, args),
            _ => Value::Undefined,
        }
    }

    /// Look up `key` and call it with this value as `this`.
    pub fn call_method(&self, key: impl Into<Key>, args: &[Value]) -> Value {
        self.get(key).call(self, args)
    }

    // ------------------------------------------------------------------
    // Keyed collections
    // ------------------------------------------------------------------

    pub fn get_entry(&self, key: impl Into<Value>) -> Value {
        let key = key.into();
        match self {
            Value::Object(o) => o.get_entry(&key),
            Value::Observed(o) => o.get_entry(&key),
            _ => Value::Undefined,
        }
    }

    pub fn has_entry(&self, key: impl Into<Value>) -> bool {
        let key = key.into();
        match self {
            Value::Object(o) => o.has_entry(&key),
            Value::Observed(o) => o.has_entry(&key),
            _ => false,
        }
    }

    pub fn set_entry(&self, key: impl Into<Value>, value: impl Into<Value>) -> Value {
        match self {
            Value::Object(o) => o.set_entry(key.into(), value.into()),
            Value::Observed(o) => o.set_entry(key.into(), value.into()),
            _ => self.clone(),
        }
    }

    pub fn add(&self, value: impl Into<Value>) -> Value {
        match self {
            Value::Object(o) => o.add(value.into()),
            Value::Observed(o) => o.add(value.into()),
            _ => self.clone(),
        }
    }

    pub fn delete_entry(&self, key: impl Into<Value>) -> bool {
        let key = key.into();
        match self {
            Value::Object(o) => o.delete_entry(&key),
            Value::Observed(o) => o.delete_entry(&key),
            _ => false,
        }
    }

    pub fn clear(&self) {
        match self {
            Value::Object(o) => o.clear(),
            Value::Observed(o) => o.clear(),
            _ => {}
        }
    }

    pub fn size(&self) -> usize {
        match self {
            Value::Object(o) => o.size(),
            Value::Observed(o) => o.size(),
            _ => 0,
        }
    }

    pub fn for_each<F>(&self, f: F)
    where
        F: FnMut(Value, Value, &Value),
    {
        match self {
            Value::Object(o) => o.for_each(f),
            Value::Observed(o) => o.for_each(f),
            _ => {}
        }
    }

    pub fn keys(&self) -> CollectionIter {
        match self {
            Value::Object(o) => o.keys(),
            Value::Observed(o) => o.keys(),
            _ => CollectionIter::empty(),
        }
    }

    pub fn values(&self) -> CollectionIter {
        match self {
            Value::Object(o) => o.values(),
            Value::Observed(o) => o.values(),
            _ => CollectionIter::empty(),
        }
    }

    pub fn entries(&self) -> CollectionIter {
        match self {
            Value::Object(o) => o.entries(),
            Value::Observed(o) => o.entries(),
            _ => CollectionIter::empty(),
        }
    }

    pub fn iter(&self) -> CollectionIter {
        match self {
            Value::Object(o) => o.iter(),
            Value::Observed(o) => o.iter(),
            _ => CollectionIter::empty(),
        }
    }

    // ------------------------------------------------------------------
    // Arrays
    //
    // Built from get/set/has/delete so that observed arrays track and
    // trigger exactly as individual index and length accesses would.
    // ------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.get(Key::length())
            .as_number()
            .map(|n| n as usize)
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `value`, returning the new length.
    pub fn push(&self, value: impl Into<Value>) -> usize {
        let len = self.len();
        self.set(len, value);
        self.set(Key::length(), len + 1);
        len + 1
    }

    pub fn pop(&self) -> Value {
        let len = self.len();
        if len == 0 {
            self.set(Key::length(), 0);
            return Value::Undefined;
        }
        let last = self.get(len - 1);
        self.delete(len - 1);
        self.set(Key::length(), len - 1);
        last
    }

    pub fn shift(&self) -> Value {
        let len = self.len();
        if len == 0 {
            self.set(Key::length(), 0);
            return Value::Undefined;
        }
        let first = self.get(0);
        for from in 1..len {
            if self.has(from) {
                self.set(from - 1, self.get(from));
            } else {
                self.delete(from - 1);
            }
        }
        self.delete(len - 1);
        self.set(Key::length(), len - 1);
        first
    }

    /// Prepend `items`, returning the new length.
    pub fn unshift<I>(&self, items: I) -> usize
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let items: Vec<Value> = items.into_iter().map(Into::into).collect();
        let len = self.len();
        let count = items.len();
        if count > 0 {
            for from in (0..len).rev() {
                if self.has(from) {
                    self.set(from + count, self.get(from));
                } else {
                    self.delete(from + count);
                }
            }
            for (index, item) in items.into_iter().enumerate() {
                self.set(index, item);
            }
        }
        self.set(Key::length(), len + count);
        len + count
    }

    pub fn join(&self, separator: &str) -> String {
        (0..self.len())
            .map(|index| {
                let item = self.get(index);
                if item.is_nullish() {
                    String::new()
                } else {
                    item.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(separator)
    }

    pub fn to_vec(&self) -> Vec<Value> {
        (0..self.len()).map(|index| self.get(index)).collect()
    }
}

// ----------------------------------------------------------------------------
// Equality
// ----------------------------------------------------------------------------

fn canonical_bits(n: f64) -> u64 {
    if n == 0.0 {
        0
    } else if n.is_nan() {
        f64::NAN.to_bits()
    } else {
        n.to_bits()
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => canonical_bits(*a) == canonical_bits(*b),
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Observed(a), Value::Observed(b)) => a.ptr_eq(b),
            (Value::Ref(a), Value::Ref(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Undefined | Value::Null => {}
            Value::Bool(b) => b.hash(state),
            Value::Number(n) => canonical_bits(*n).hash(state),
            Value::Str(s) => s.hash(state),
            Value::Symbol(s) => s.hash(state),
            Value::Function(f) => std::ptr::hash(f.addr(), state),
            Value::Object(o) => o.id().hash(state),
            Value::Observed(o) => o.addr().hash(state),
            Value::Ref(r) => r.addr().hash(state),
        }
    }
}

// ----------------------------------------------------------------------------
// Formatting
// ----------------------------------------------------------------------------

fn format_number(n: f64, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if n.is_nan() {
        f.write_str("NaN")
    } else if n.is_infinite() {
        f.write_str(if n > 0.0 { "Infinity" } else { "-Infinity" })
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        write!(f, "{}", n as i64)
    } else {
        write!(f, "{n}")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => format_number(*n, f),
            Value::Str(s) => f.write_str(s),
            Value::Symbol(s) => write!(f, "{s:?}"),
            Value::Function(_) => f.write_str("function"),
            Value::Object(_) | Value::Observed(_) => match self.raw_object() {
                Some(o) if o.is_array() => f.write_str(&self.join(",")),
                Some(o) => f.write_str(o.type_tag()),
                None => Ok(()),
            },
            Value::Ref(r) => write!(f, "{}", r.value()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Object(o) => write!(f, "{o:?}"),
            Value::Observed(o) => write!(f, "{o:?}"),
            Value::Ref(r) => write!(f, "{r:?}"),
            Value::Function(func) => write!(f, "{func:?}"),
            other => write!(f, "{other}"),
        }
    }
}

// ----------------------------------------------------------------------------
// Conversions
// ----------------------------------------------------------------------------

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Undefined
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

macro_rules! from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(n: $t) -> Self {
                    Value::Number(n as f64)
                }
            }
        )*
    };
}

from_number!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, f32, f64);

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(Rc::from(s))
    }
}

impl From<Symbol> for Value {
    fn from(s: Symbol) -> Self {
        Value::Symbol(s)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<Observed> for Value {
    fn from(o: Observed) -> Self {
        Value::Observed(o)
    }
}

impl From<Ref> for Value {
    fn from(r: Ref) -> Self {
        Value::Ref(r)
    }
}

impl From<ComputedRef> for Value {
    fn from(c: ComputedRef) -> Self {
        Value::Ref(c.into_ref())
    }
}

impl From<&Value> for Value {
    fn from(v: &Value) -> Self {
        v.clone()
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Undefined)
    }
}

/// Build raw storage from JSON: objects become plain objects, arrays become
/// arrays, numbers become `f64`.
impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::from(s),
            serde_json::Value::Array(items) => {
                Value::Object(Object::array(items.into_iter().map(Value::from)))
            }
            serde_json::Value::Object(map) => Value::Object(Object::from_pairs(
                map.into_iter().map(|(k, v)| (k, Value::from(v))),
            )),
        }
    }
}

fn mismatch(expected: &'static str, found: &Value) -> ValueError {
    ValueError::TypeMismatch {
        expected,
        found: found.type_name(),
    }
}

impl TryFrom<Value> for f64 {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_number().ok_or_else(|| mismatch("number", &value))
    }
}

impl TryFrom<Value> for i64 {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value.as_number() {
            Some(n) if n.fract() == 0.0 => Ok(n as i64),
            _ => Err(mismatch("integer", &value)),
        }
    }
}

impl TryFrom<Value> for bool {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value.as_bool().ok_or_else(|| mismatch("boolean", &value))
    }
}

impl TryFrom<Value> for String {
    type Error = ValueError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch("string", &value))
    }
}
