//! The canonical XML tree shared by every component in this crate.
//!
//! A [`Value`] is either a bare string (a text-only element or attribute
//! value) or a [`Map`] of child keys to further values. Repeated sibling
//! elements collapse into a [`Value::Sequence`]. Attribute keys are written
//! with a leading `@`, mixed text content under a bare element lives under
//! the literal key `#text`, and every other key is an element name carrying
//! its namespace prefix verbatim (`soap:Body`, `SOAP-ENV:Body`, `s:Body`, ...).

use std::collections::BTreeMap;
use std::fmt;

/// Literal key used for the text content of an element that also carries
/// attributes or child elements.
pub const TEXT_KEY: &str = "#text";

/// An ordered map from element/attribute keys to their values.
///
/// Keys preserve insertion order so that `serialize(parse(bytes))` re-emits
/// elements in the order they were read. [`BTreeMap`] would reorder keys
/// alphabetically, so this wraps a `Vec` of pairs instead.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Map(Vec<(String, Value)>);

impl Map {
    pub fn new() -> Self {
        Map(Vec::new())
    }

    /// Inserts `value` under `key`. If `key` already holds a value, the two
    /// are merged into a [`Value::Sequence`] (or extended if already one),
    /// matching the "repeated sibling elements collapse into an ordered
    /// sequence" invariant.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some((_, existing)) = self.0.iter_mut().find(|(k, _)| *k == key) {
            existing.push_sibling(value);
        } else {
            self.0.push((key, value));
        }
    }

    /// Sets `key` to `value`, overwriting any previous value instead of
    /// merging into a sequence. Used when a caller wants a single child
    /// rather than list-accumulation semantics (e.g. building attributes).
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if let Some(entry) = self.0.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.0.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.0.iter().position(|(k, _)| k == key)?;
        Some(self.0.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Finds the single entry whose key, stripped of any `prefix:`, equals
    /// `local_name`. This is the prefix-polymorphic lookup described in the
    /// design notes: SOAP documents use `soap:`, `SOAP-ENV:`, `s:`, `env:`,
    /// or no prefix at all for the same element, so every structural lookup
    /// in this crate goes through this helper instead of trying literal keys.
    pub fn get_by_local_name(&self, local_name: &str) -> Option<(&str, &Value)> {
        self.0
            .iter()
            .find(|(k, _)| local_name_of(k) == local_name)
            .map(|(k, v)| (k.as_str(), v))
    }

    /// As [`Map::get_by_local_name`] but also returns the matched key's
    /// prefix (the part before the `:`, or `""` if unprefixed).
    pub fn entries_by_local_name<'a>(
        &'a self,
        local_name: &'a str,
    ) -> impl Iterator<Item = (&'a str, &'a Value)> {
        self.0
            .iter()
            .filter(move |(k, _)| local_name_of(k) == local_name)
            .map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Map {
    fn from_iter<T: IntoIterator<Item = (K, Value)>>(iter: T) -> Self {
        let mut map = Map::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// Returns the part of `qualified_name` after the last `:`, or the whole
/// string if there is no `:`. See [`Map::get_by_local_name`].
pub fn local_name_of(qualified_name: &str) -> &str {
    qualified_name.rsplit(':').next().unwrap_or(qualified_name)
}

/// Returns the prefix of `qualified_name` (before the last `:`), or `""` if
/// the name carries no prefix.
pub fn prefix_of(qualified_name: &str) -> &str {
    match qualified_name.rsplit_once(':') {
        Some((prefix, _)) => prefix,
        None => "",
    }
}

/// The canonical XML tree value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A pure text node: an element with no attributes and no children.
    Text(String),
    /// An element with attributes, children, or both.
    Map(Map),
    /// An ordered list of sibling values sharing the same key.
    Sequence(Vec<Value>),
}

impl Value {
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    pub fn map() -> Self {
        Value::Map(Map::new())
    }

    pub fn from_map(map: Map) -> Self {
        Value::Map(map)
    }

    /// Extracts the textual content of this value regardless of whether it
    /// parsed as a bare string or as a mapping carrying `#text` alongside
    /// attributes. This is the "one extractor" the design notes call for:
    /// every consumer of a text value should go through this rather than
    /// assuming a particular shape.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            Value::Map(map) => match map.get(TEXT_KEY) {
                Some(Value::Text(s)) => Some(s.as_str()),
                _ => None,
            },
            Value::Sequence(_) => None,
        }
    }

    /// As [`Value::as_text`] but falls back to an empty string, matching
    /// the fault-extraction rule that absent elements produce empty
    /// strings rather than errors (§4.9).
    pub fn as_text_or_empty(&self) -> &str {
        self.as_text().unwrap_or("")
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    /// Iterates `self` as a sequence: a bare value yields itself once, a
    /// `Sequence` yields its items in order. Mirrors how repeated sibling
    /// elements and single occurrences are meant to be handled uniformly.
    pub fn iter_items(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        match self {
            Value::Sequence(items) => Box::new(items.iter()),
            other => Box::new(std::iter::once(other)),
        }
    }

    /// Looks up `key` on a `Map` value (an empty result on anything else),
    /// using prefix-polymorphic local-name matching.
    pub fn child_by_local_name(&self, local_name: &str) -> Option<&Value> {
        self.as_map()?.get_by_local_name(local_name).map(|(_, v)| v)
    }

    /// Merges `other` into `self` as a sibling, implementing the "repeated
    /// elements become a sequence" rule in place.
    fn push_sibling(&mut self, other: Value) {
        match self {
            Value::Sequence(items) => items.push(other),
            existing => {
                let first = std::mem::replace(existing, Value::Sequence(Vec::new()));
                if let Value::Sequence(items) = existing {
                    items.push(first);
                    items.push(other);
                }
            }
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Sequence(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
        }
    }
}

/// A lightweight record type used to build a [`Map`] fluently, mirroring
/// the builder-style APIs elsewhere in this crate.
#[derive(Debug, Clone, Default)]
pub struct MapBuilder(Map);

impl MapBuilder {
    pub fn new() -> Self {
        MapBuilder(Map::new())
    }

    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.0.insert(format!("@{name}"), Value::text(value.into()));
        self
    }

    pub fn child(mut self, name: impl Into<String>, value: Value) -> Self {
        self.0.insert(name, value);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.0.set(TEXT_KEY, Value::text(text.into()));
        self
    }

    pub fn build(self) -> Map {
        self.0
    }

    pub fn into_value(self) -> Value {
        Value::Map(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_name_strips_prefix() {
        assert_eq!(local_name_of("soap:Body"), "Body");
        assert_eq!(local_name_of("SOAP-ENV:Body"), "Body");
        assert_eq!(local_name_of("Body"), "Body");
    }

    #[test]
    fn prefix_of_extracts_prefix() {
        assert_eq!(prefix_of("soap:Body"), "soap");
        assert_eq!(prefix_of("Body"), "");
    }

    #[test]
    fn repeated_keys_collapse_into_sequence() {
        let mut map = Map::new();
        map.insert("Item", Value::text("a"));
        map.insert("Item", Value::text("b"));
        map.insert("Item", Value::text("c"));
        let items = map.get("Item").unwrap().as_sequence().unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_text(), Some("a"));
        assert_eq!(items[2].as_text(), Some("c"));
    }

    #[test]
    fn as_text_handles_bare_and_mapped_forms() {
        let bare = Value::text("hello");
        assert_eq!(bare.as_text(), Some("hello"));

        let mut map = Map::new();
        map.insert("@xsi:type", Value::text("xsd:string"));
        map.insert(TEXT_KEY, Value::text("hello"));
        let mapped = Value::Map(map);
        assert_eq!(mapped.as_text(), Some("hello"));
    }

    #[test]
    fn get_by_local_name_is_prefix_agnostic() {
        let mut map = Map::new();
        map.insert("SOAP-ENV:Body", Value::text("x"));
        assert_eq!(map.get_by_local_name("Body").unwrap().0, "SOAP-ENV:Body");
    }
}
