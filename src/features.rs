//! Feature and property bag.
//!
//! Features are booleans backed by [`SerializerOptions`]; only the keys
//! below are recognized. Properties are free-form and stored as given.

use core::fmt;

use crate::options::SerializerOptions;
use crate::FastIndexMap;

/// Write elements without content as `<name/>`.
pub const FEATURE_SELF_CLOSING: &str = "http://xmlpull.org/v1/doc/features.html#serializer-self-closing";

/// Escape `\n` and `\t` in text content as character references.
pub const FEATURE_ESCAPE_TEXT_WHITESPACE: &str =
    "http://xmlpull.org/v1/doc/features.html#serializer-escape-text-whitespace";

/// Value stored under a property key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_owned())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

/// Wendet ein Feature auf die Optionen an; `false` bei unbekanntem Key.
pub(crate) fn apply_feature(options: &mut SerializerOptions, name: &str, value: bool) -> bool {
    match name {
        FEATURE_SELF_CLOSING => options.self_closing_empty_elements = value,
        FEATURE_ESCAPE_TEXT_WHITESPACE => options.escape_text_whitespace = value,
        _ => return false,
    }
    true
}

pub(crate) fn read_feature(options: &SerializerOptions, name: &str) -> Option<bool> {
    match name {
        FEATURE_SELF_CLOSING => Some(options.self_closing_empty_elements),
        FEATURE_ESCAPE_TEXT_WHITESPACE => Some(options.escape_text_whitespace),
        _ => None,
    }
}

/// Pass-through property storage in insertion order.
#[derive(Debug, Clone, Default)]
pub struct PropertyBag {
    values: FastIndexMap<String, PropertyValue>,
}

impl PropertyBag {
    /// Stores `value`, returning the previous value for `name`.
    pub fn set(&mut self, name: &str, value: PropertyValue) -> Option<PropertyValue> {
        self.values.insert(name.to_owned(), value)
    }

    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
