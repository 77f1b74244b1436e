//! Iteration over keyed collections.

use super::{Object, Value};
use crate::reactive::registry;

/// Which half of each entry an iterator yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterMode {
    Keys,
    Values,
    Entries,
}

/// How yielded values are presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wrap {
    Raw,
    Reactive,
    Readonly,
}

impl Wrap {
    pub(crate) fn apply(self, value: Value) -> Value {
        match self {
            Wrap::Raw => value,
            Wrap::Reactive => registry::to_reactive(value),
            Wrap::Readonly => registry::to_readonly(value),
        }
    }
}

/// A live iterator over a Map or Set.
///
/// The iterator reads the collection by position on every step instead of
/// borrowing it, so the collection may be mutated between steps. Entries
/// appended during iteration are visited.
pub struct CollectionIter {
    source: Option<Object>,
    mode: IterMode,
    wrap: Wrap,
    cursor: usize,
}

impl CollectionIter {
    pub(crate) fn new(source: Object, mode: IterMode, wrap: Wrap) -> Self {
        Self {
            source: Some(source),
            mode,
            wrap,
            cursor: 0,
        }
    }

    /// An iterator that yields nothing, for values that are not collections.
    pub fn empty() -> Self {
        Self {
            source: None,
            mode: IterMode::Values,
            wrap: Wrap::Raw,
            cursor: 0,
        }
    }

    pub fn mode(&self) -> IterMode {
        self.mode
    }
}

impl Iterator for CollectionIter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let (key, value) = self.source.as_ref()?.entry_at(self.cursor)?;
        self.cursor += 1;
        Some(match self.mode {
            IterMode::Keys => self.wrap.apply(key),
            IterMode::Values => self.wrap.apply(value),
            IterMode::Entries => {
                let pair = [self.wrap.apply(key), self.wrap.apply(value)];
                Value::Object(Object::array(pair))
            }
        })
    }
}
