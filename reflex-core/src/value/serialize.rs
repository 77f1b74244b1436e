//! `serde` support.
//!
//! Serializing reads through the same accessors as consumer code, so
//! serializing an observed value inside an effect subscribes the effect to
//! every key it visits. Reference cycles are not detected.

use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use super::{Key, ObjectKind, Value};

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Undefined | Value::Null | Value::Function(_) => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Symbol(s) => serializer.serialize_str(s.description().unwrap_or_default()),
            Value::Ref(r) => r.value().serialize(serializer),
            Value::Object(_) | Value::Observed(_) => {
                let kind = self
                    .raw_object()
                    .map(|o| o.kind())
                    .unwrap_or(ObjectKind::Object);
                match kind {
                    ObjectKind::Array => {
                        let items = self.to_vec();
                        let mut seq = serializer.serialize_seq(Some(items.len()))?;
                        for item in &items {
                            seq.serialize_element(item)?;
                        }
                        seq.end()
                    }
                    ObjectKind::Set => {
                        let items: Vec<Value> = self.values().collect();
                        let mut seq = serializer.serialize_seq(Some(items.len()))?;
                        for item in &items {
                            seq.serialize_element(item)?;
                        }
                        seq.end()
                    }
                    ObjectKind::Map => {
                        let entries: Vec<Value> = self.entries().collect();
                        let mut seq = serializer.serialize_seq(Some(entries.len()))?;
                        for entry in &entries {
                            seq.serialize_element(entry)?;
                        }
                        seq.end()
                    }
                    ObjectKind::Date => match self.raw_object().and_then(|o| o.date_value()) {
                        Some(millis) => serializer.serialize_f64(millis),
                        None => serializer.serialize_none(),
                    },
                    ObjectKind::Object | ObjectKind::WeakMap | ObjectKind::WeakSet => {
                        let keys: Vec<Key> = self
                            .own_keys()
                            .into_iter()
                            .filter(|k| !matches!(k, Key::Symbol(_)))
                            .collect();
                        let mut map = serializer.serialize_map(Some(keys.len()))?;
                        for key in keys {
                            let value = self.get(&key);
                            map.serialize_entry(&key.to_string(), &value)?;
                        }
                        map.end()
                    }
                }
            }
        }
    }
}
