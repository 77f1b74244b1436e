//! Property keys and symbols.

use std::cell::RefCell;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// A unique, identity-compared symbol.
///
/// Two symbols are equal only if they are clones of the same handle, even
/// when their descriptions match.
#[derive(Clone)]
pub struct Symbol(Rc<SymbolInner>);

struct SymbolInner {
    description: Option<String>,
    well_known: bool,
}

/// The built-in protocol symbols.
///
/// Reads of these keys on an observed object are never tracked and their
/// results are never wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnownSymbol {
    AsyncIterator,
    HasInstance,
    IsConcatSpreadable,
    Iterator,
    Match,
    Replace,
    Search,
    Species,
    Split,
    ToPrimitive,
    ToStringTag,
    Unscopables,
}

impl WellKnownSymbol {
    const ALL: [WellKnownSymbol; 12] = [
        WellKnownSymbol::AsyncIterator,
        WellKnownSymbol::HasInstance,
        WellKnownSymbol::IsConcatSpreadable,
        WellKnownSymbol::Iterator,
        WellKnownSymbol::Match,
        WellKnownSymbol::Replace,
        WellKnownSymbol::Search,
        WellKnownSymbol::Species,
        WellKnownSymbol::Split,
        WellKnownSymbol::ToPrimitive,
        WellKnownSymbol::ToStringTag,
        WellKnownSymbol::Unscopables,
    ];

    fn description(self) -> &'static str {
        match self {
            WellKnownSymbol::AsyncIterator => "Symbol.asyncIterator",
            WellKnownSymbol::HasInstance => "Symbol.hasInstance",
            WellKnownSymbol::IsConcatSpreadable => "Symbol.isConcatSpreadable",
            WellKnownSymbol::Iterator => "Symbol.iterator",
            WellKnownSymbol::Match => "Symbol.match",
            WellKnownSymbol::Replace => "Symbol.replace",
            WellKnownSymbol::Search => "Symbol.search",
            WellKnownSymbol::Species => "Symbol.species",
            WellKnownSymbol::Split => "Symbol.split",
            WellKnownSymbol::ToPrimitive => "Symbol.toPrimitive",
            WellKnownSymbol::ToStringTag => "Symbol.toStringTag",
            WellKnownSymbol::Unscopables => "Symbol.unscopables",
        }
    }
}

thread_local! {
    static WELL_KNOWN: RefCell<Vec<Symbol>> = RefCell::new(
        WellKnownSymbol::ALL
            .iter()
            .map(|w| {
                Symbol(Rc::new(SymbolInner {
                    description: Some(w.description().to_string()),
                    well_known: true,
                }))
            })
            .collect(),
    );
}

impl Symbol {
    /// Create a fresh symbol.
    pub fn new(description: impl Into<String>) -> Self {
        Self(Rc::new(SymbolInner {
            description: Some(description.into()),
            well_known: false,
        }))
    }

    /// Create a fresh symbol without a description.
    pub fn anonymous() -> Self {
        Self(Rc::new(SymbolInner {
            description: None,
            well_known: false,
        }))
    }

    /// The per-thread instance of a built-in protocol symbol.
    pub fn well_known(which: WellKnownSymbol) -> Self {
        let index = WellKnownSymbol::ALL
            .iter()
            .position(|w| *w == which)
            .unwrap_or_default();
        WELL_KNOWN.with(|symbols| symbols.borrow()[index].clone())
    }

    pub fn iterator() -> Self {
        Self::well_known(WellKnownSymbol::Iterator)
    }

    pub fn is_concat_spreadable() -> Self {
        Self::well_known(WellKnownSymbol::IsConcatSpreadable)
    }

    pub fn to_string_tag() -> Self {
        Self::well_known(WellKnownSymbol::ToStringTag)
    }

    pub fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    /// Whether this is one of the built-in protocol symbols.
    pub fn is_well_known(&self) -> bool {
        self.0.well_known
    }

    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Rc::as_ptr(&self.0), state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.description().unwrap_or_default())
    }
}

/// A property key.
///
/// Canonical array indices are normalized to [`Key::Index`] so `"3"` and
/// `3` name the same property.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Index(u32),
    Name(Rc<str>),
    Symbol(Symbol),
}

impl Key {
    /// The `length` key of arrays.
    pub fn length() -> Self {
        Key::Name(Rc::from("length"))
    }

    pub fn is_length(&self) -> bool {
        matches!(self, Key::Name(name) if &**name == "length")
    }

    pub fn as_index(&self) -> Option<u32> {
        match self {
            Key::Index(index) => Some(*index),
            _ => None,
        }
    }

    /// Keys whose reads are never tracked.
    pub fn is_well_known_symbol(&self) -> bool {
        matches!(self, Key::Symbol(symbol) if symbol.is_well_known())
    }
}

fn parse_index(name: &str) -> Option<u32> {
    if name == "0" {
        return Some(0);
    }
    if name.starts_with('0') || name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    // u32::MAX itself is not a valid array index.
    name.parse::<u32>().ok().filter(|i| *i != u32::MAX)
}

impl From<&str> for Key {
    fn from(name: &str) -> Self {
        match parse_index(name) {
            Some(index) => Key::Index(index),
            None => Key::Name(Rc::from(name)),
        }
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Key::from(name.as_str())
    }
}

impl From<&String> for Key {
    fn from(name: &String) -> Self {
        Key::from(name.as_str())
    }
}

impl From<usize> for Key {
    fn from(index: usize) -> Self {
        match u32::try_from(index) {
            Ok(index) if index != u32::MAX => Key::Index(index),
            _ => Key::Name(Rc::from(index.to_string())),
        }
    }
}

impl From<u32> for Key {
    fn from(index: u32) -> Self {
        Key::from(index as usize)
    }
}

impl From<i32> for Key {
    fn from(index: i32) -> Self {
        match usize::try_from(index) {
            Ok(index) => Key::from(index),
            Err(_) => Key::Name(Rc::from(index.to_string())),
        }
    }
}

impl From<Symbol> for Key {
    fn from(symbol: Symbol) -> Self {
        Key::Symbol(symbol)
    }
}

impl From<&Symbol> for Key {
    fn from(symbol: &Symbol) -> Self {
        Key::Symbol(symbol.clone())
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(index) => write!(f, "{index}"),
            Key::Name(name) => f.write_str(name),
            Key::Symbol(symbol) => write!(f, "{symbol:?}"),
        }
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Index(index) => write!(f, "{index}"),
            Key::Name(name) => write!(f, "{name:?}"),
            Key::Symbol(symbol) => write!(f, "{symbol:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_names_normalize_to_indices() {
        assert_eq!(Key::from("3"), Key::Index(3));
        assert_eq!(Key::from(3usize), Key::Index(3));
        assert_eq!(Key::from("0"), Key::Index(0));
        assert!(matches!(Key::from("03"), Key::Name(_)));
        assert!(matches!(Key::from("-1"), Key::Name(_)));
        assert!(matches!(Key::from(""), Key::Name(_)));
        assert!(Key::from("length").is_length());
    }

    #[test]
    fn symbols_compare_by_identity() {
        let a = Symbol::new("same");
        let b = Symbol::new("same");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(Symbol::iterator(), Symbol::iterator());
        assert!(Symbol::iterator().is_well_known());
        assert!(!a.is_well_known());
    }
}
