//! Structured representation of a parsed SOAP XML document
//!
//! XML-to-structure conversion is inherently ambiguous about cardinality: an
//! element that appears once maps naturally to a single value, while the same
//! element repeated maps to a list. `Value` makes that ambiguity explicit as
//! a tagged variant so callers can pattern match instead of guessing at
//! runtime types.

use xmltree::{Element, XMLNode};

/// A node in the parsed response tree.
///
/// Mappings preserve document order. Repeated sibling elements are folded
/// into a `Sequence` under their shared key; a single occurrence stays a
/// plain entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// An empty element (or an absent optional value).
    Null,
    /// Text content of a leaf element.
    Scalar(String),
    /// Child elements keyed by snake_cased local name, in document order.
    Mapping(Vec<(String, Value)>),
    /// Repeated elements, in document order.
    Sequence(Vec<Value>),
}

impl Value {
    /// Looks up a key in a `Mapping`. Returns `None` for every other variant.
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Mapping(entries) => entries
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    /// Returns the text of a `Scalar`, or `None` for other variants.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Scalar(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the entries of a `Mapping`, or `None` for other variants.
    pub fn as_mapping(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// Returns the items of a `Sequence`, or `None` for other variants.
    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Converts a parsed XML element into a `Value`.
    ///
    /// Element and attribute names are snake_cased with namespace prefixes
    /// dropped, so `<soapenv:Body>` and `<Body>` both convert under the key
    /// `body`. Attributes are exposed as `@name` entries.
    pub fn from_element(element: &Element) -> Value {
        let mut entries: Vec<(String, Value)> = Vec::new();

        let mut attributes: Vec<(&String, &String)> = element.attributes.iter().collect();
        attributes.sort();
        for (name, value) in attributes {
            entries.push((format!("@{}", snake_case(name)), Value::Scalar(value.clone())));
        }
        let attribute_count = entries.len();

        let mut text = String::new();
        let mut has_child_elements = false;
        for node in &element.children {
            match node {
                XMLNode::Element(child) => {
                    has_child_elements = true;
                    insert_entry(&mut entries, snake_case(&child.name), Value::from_element(child));
                }
                XMLNode::Text(content) | XMLNode::CData(content) => text.push_str(content),
                _ => {}
            }
        }

        if has_child_elements {
            return Value::Mapping(entries);
        }
        let text = text.trim();
        if !text.is_empty() {
            return Value::Scalar(text.to_string());
        }
        if attribute_count > 0 {
            return Value::Mapping(entries);
        }
        Value::Null
    }
}

/// Inserts a child entry, folding repeated keys into a `Sequence`.
fn insert_entry(entries: &mut Vec<(String, Value)>, key: String, value: Value) {
    if let Some((_, existing)) = entries.iter_mut().find(|(name, _)| *name == key) {
        match existing {
            Value::Sequence(items) => items.push(value),
            _ => {
                let first = std::mem::replace(existing, Value::Null);
                *existing = Value::Sequence(vec![first, value]);
            }
        }
        return;
    }
    entries.push((key, value));
}

/// Converts an XML local name to snake_case: `ZoneGroupState` becomes
/// `zone_group_state`, `Content-Type` becomes `content_type`.
pub(crate) fn snake_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 4);
    let mut previous_lower = false;
    for character in name.chars() {
        if character == '-' || character == '.' {
            result.push('_');
            previous_lower = false;
        } else if character.is_ascii_uppercase() {
            if previous_lower {
                result.push('_');
            }
            result.push(character.to_ascii_lowercase());
            previous_lower = false;
        } else {
            previous_lower = character.is_ascii_lowercase() || character.is_ascii_digit();
            result.push(character);
        }
    }
    result
}
