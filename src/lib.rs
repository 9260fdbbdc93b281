//! xmlser – streaming, namespace-aware XML 1.0 serializer
//!
//! # Beispiel
//!
//! ```
//! use xmlser::XmlSerializer;
//!
//! let mut buf = Vec::new();
//! {
//!     let mut ser = XmlSerializer::new();
//!     ser.set_output(&mut buf, "UTF-8").unwrap();
//!     ser.start_document(Some("UTF-8"), None).unwrap();
//!     ser.set_prefix("", "urn:doc").unwrap();
//!     ser.start_tag(Some("urn:doc"), "greeting").unwrap()
//!         .attribute(Some("urn:meta"), "lang", "en").unwrap()
//!         .text("Hello & welcome").unwrap();
//!     ser.end_document().unwrap();
//! }
//! assert_eq!(
//!     String::from_utf8(buf).unwrap(),
//!     "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
//!      <greeting xmlns=\"urn:doc\" xmlns:ns1=\"urn:meta\" ns1:lang=\"en\">Hello &amp; welcome</greeting>"
//! );
//! ```

pub mod error;
mod escape;
pub mod event;
pub mod features;
pub mod namespace;
pub mod options;
pub mod serializer;
pub mod sink;
pub mod state;

pub use error::{Error, Result};

/// HashSet mit ahash (schneller, nicht DoS-resistent; nur intern).
pub(crate) type FastHashSet<K> = hashbrown::HashSet<K, ahash::RandomState>;

/// IndexMap mit ahash (deterministische Iteration + schnelles Hashing).
pub(crate) type FastIndexMap<K, V> = indexmap::IndexMap<K, V, ahash::RandomState>;

// Public API: Serializer
pub use serializer::XmlSerializer;
pub use state::SerializerState;

// Public API: Options / Features
pub use features::{PropertyValue, FEATURE_ESCAPE_TEXT_WHITESPACE, FEATURE_SELF_CLOSING};
pub use options::SerializerOptions;

// Public API: Sinks
pub use sink::{ByteSink, Sink, WriterSink};

// Public API: Namespaces
pub use namespace::{XMLNS_NS_URI, XML_NS_URI};

// Public API: Events
pub use event::{events_to_xml, events_to_xml_writer, Event};
