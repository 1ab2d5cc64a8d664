//! Declaration-ordered identifier maps
//!
//! YAML mappings in the unified configuration are decoded into [`Declared`],
//! which keeps entries in the order they were written and remembers every
//! repeated key instead of letting the last one win.

use std::fmt;
use std::marker::PhantomData;

use indexmap::IndexMap;
use serde::de::{self, DeserializeOwned, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An entry that can be declared under an identifier
pub trait Declaration: Sized {
    /// Kind used in messages, e.g. `logging receiver`
    const KIND: &'static str;

    /// Decode one entry from its raw YAML value
    ///
    /// # Errors
    ///
    /// Returns a message naming the identifier when the value does not
    /// match the schema
    fn admit(id: &str, raw: serde_yaml::Value) -> Result<Self, String>;
}

/// Decode an untyped entry, prefixing errors with its identifier
pub(crate) fn admit_plain<T: DeserializeOwned>(kind: &str, id: &str, raw: serde_yaml::Value) -> Result<T, String> {
    serde_yaml::from_value(raw).map_err(|e| format!("{kind} {id:?}: {e}"))
}

/// Decode an entry discriminated by its `type` field
///
/// The discriminator is checked against `supported` before the variant
/// schema is applied, so an unknown type is reported as such rather than
/// as a generic shape mismatch.
pub(crate) fn admit_typed<T: DeserializeOwned>(
    kind: &str,
    supported: &[&str],
    id: &str,
    raw: serde_yaml::Value,
) -> Result<T, String> {
    let type_name = match raw.get("type") {
        Some(serde_yaml::Value::String(name)) => name.clone(),
        Some(_) => return Err(format!("{kind} {id:?} has a non-string \"type\" field")),
        None => return Err(format!("{kind} {id:?} is missing required field \"type\"")),
    };

    if !supported.contains(&type_name.as_str()) {
        return Err(format!(
            "{kind} {id:?} with type {type_name:?} is not supported. Supported {kind} types: [{}]",
            supported.join(", ")
        ));
    }

    serde_yaml::from_value(raw).map_err(|e| format!("{kind} {id:?} with type {type_name:?}: {e}"))
}

/// Identifier map preserving declaration order and duplicate keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declared<T> {
    entries: IndexMap<String, T>,
    duplicates: Vec<String>,
}

impl<T> Default for Declared<T> {
    fn default() -> Self {
        Self {
            entries: IndexMap::new(),
            duplicates: Vec::new(),
        }
    }
}

impl<T> Declared<T> {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an entry by identifier
    pub fn get(&self, id: &str) -> Option<&T> {
        self.entries.get(id)
    }

    /// Whether an identifier is declared
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Insert or replace an entry
    ///
    /// A replaced entry keeps its original position.
    pub fn insert(&mut self, id: impl Into<String>, value: T) -> Option<T> {
        self.entries.insert(id.into(), value)
    }

    /// Iterate entries in declaration order
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, T> {
        self.entries.iter()
    }

    /// Iterate identifiers in declaration order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Number of distinct identifiers
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is declared
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identifiers that were declared more than once, one item per repeat
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }
}

impl<T> FromIterator<(String, T)> for Declared<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        let mut declared = Self::new();
        for (id, value) in iter {
            declared.insert(id, value);
        }
        declared
    }
}

impl<'a, T> IntoIterator for &'a Declared<T> {
    type Item = (&'a String, &'a T);
    type IntoIter = indexmap::map::Iter<'a, String, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<'de, T: Declaration> Deserialize<'de> for Declared<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DeclaredVisitor<T>(PhantomData<T>);

        impl<'de, T: Declaration> Visitor<'de> for DeclaredVisitor<T> {
            type Value = Declared<T>;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(formatter, "a map of {} declarations", T::KIND)
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(Declared::new())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut declared = Declared::new();

                while let Some(id) = map.next_key::<String>()? {
                    let raw = map.next_value::<serde_yaml::Value>()?;

                    if declared.contains(&id) {
                        declared.duplicates.push(id);
                        continue;
                    }

                    let value = T::admit(&id, raw).map_err(de::Error::custom)?;
                    declared.entries.insert(id, value);
                }

                Ok(declared)
            }
        }

        deserializer.deserialize_map(DeclaredVisitor(PhantomData))
    }
}

impl<T: Serialize> Serialize for Declared<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, value) in &self.entries {
            map.serialize_entry(id, value)?;
        }
        map.end()
    }
}

impl Declaration for String {
    const KIND: &'static str = "entry";

    fn admit(id: &str, raw: serde_yaml::Value) -> Result<Self, String> {
        admit_plain(Self::KIND, id, raw)
    }
}
