//! Serializer output policy.
//!
//! # Beispiel
//!
//! ```
//! use xmlser::options::SerializerOptions;
//!
//! let opts = SerializerOptions::default()
//!     .with_self_closing_empty_elements(true)
//!     .with_escape_text_whitespace(true);
//!
//! assert!(opts.self_closing_empty_elements());
//! assert!(opts.escape_text_whitespace());
//! ```

/// Output policy for one [`XmlSerializer`](crate::XmlSerializer).
///
/// Both switches are also reachable through the feature bag
/// ([`FEATURE_SELF_CLOSING`](crate::features::FEATURE_SELF_CLOSING),
/// [`FEATURE_ESCAPE_TEXT_WHITESPACE`](crate::features::FEATURE_ESCAPE_TEXT_WHITESPACE)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SerializerOptions {
    pub(crate) self_closing_empty_elements: bool,
    pub(crate) escape_text_whitespace: bool,
}

impl SerializerOptions {
    /// Empty elements are written as `<name/>` instead of `<name></name>`.
    pub fn with_self_closing_empty_elements(mut self, on: bool) -> Self {
        self.self_closing_empty_elements = on;
        self
    }

    /// Text content additionally escapes `\n` as `&#10;` and `\t` as `&#9;`.
    pub fn with_escape_text_whitespace(mut self, on: bool) -> Self {
        self.escape_text_whitespace = on;
        self
    }

    pub fn self_closing_empty_elements(&self) -> bool {
        self.self_closing_empty_elements
    }

    pub fn escape_text_whitespace(&self) -> bool {
        self.escape_text_whitespace
    }
}
