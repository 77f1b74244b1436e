//! Callable values.
//!
//! Functions are stored on objects as ordinary values (methods) or as the
//! getter/setter halves of accessor properties. They are never observed:
//! wrapping only applies to object-like values.

use std::fmt;
use std::rc::Rc;

use super::Value;

type NativeFn = dyn Fn(&Value, &[Value]) -> Value;

/// A shared callable receiving `this` and an argument list.
#[derive(Clone)]
pub struct Function(Rc<NativeFn>);

impl Function {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Value + 'static,
    {
        Self(Rc::new(f))
    }

    /// A function that ignores `this` and its arguments.
    pub fn thunk<F, R>(f: F) -> Self
    where
        F: Fn() -> R + 'static,
        R: Into<Value>,
    {
        Self::new(move |_, _| f().into())
    }

    /// A getter: called with the receiver as `this`.
    pub fn getter<F, R>(f: F) -> Self
    where
        F: Fn(&Value) -> R + 'static,
        R: Into<Value>,
    {
        Self::new(move |this, _| f(this).into())
    }

    /// A setter: called with the receiver as `this` and the assigned value.
    pub fn setter<F>(f: F) -> Self
    where
        F: Fn(&Value, Value) + 'static,
    {
        Self::new(move |this, args| {
            f(this, args.first().cloned().unwrap_or(Value::Undefined));
            Value::Undefined
        })
    }

    pub fn call(&self, this: &Value, args: &[Value]) -> Value {
        (self.0)(this, args)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn addr(&self) -> *const () {
        Rc::as_ptr(&self.0) as *const ()
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Function({:p})", self.addr())
    }
}
