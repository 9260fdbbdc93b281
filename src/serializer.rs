//! Streaming, namespace-aware XML serializer.
//!
//! Jede Operation prueft zuerst die Zustandsmaschine, loest dann ggf.
//! Namespaces auf und schreibt erst danach in den Sink. Das `>` eines
//! Start-Tags wird verzoegert, bis feststeht, dass keine Attribute folgen.
//!
//! # Beispiel
//!
//! ```
//! use xmlser::XmlSerializer;
//!
//! let mut out = String::new();
//! {
//!     let mut ser = XmlSerializer::new();
//!     ser.set_output_writer(&mut out).unwrap();
//!     ser.start_tag(None, "root").unwrap()
//!         .attribute(None, "id", "1").unwrap()
//!         .start_tag(Some("urn:x"), "child").unwrap()
//!         .text("hi").unwrap()
//!         .end_tag(Some("urn:x"), "child").unwrap()
//!         .end_tag(None, "root").unwrap();
//!     ser.end_document().unwrap();
//! }
//! assert_eq!(out, r#"<root id="1"><ns1:child xmlns:ns1="urn:x">hi</ns1:child></root>"#);
//! ```

use core::fmt;
use std::io;

use log::{debug, trace};

use crate::escape;
use crate::features::{self, PropertyBag, PropertyValue};
use crate::namespace::{NamespaceStack, PrefixLookup};
use crate::options::SerializerOptions;
use crate::sink::{ByteSink, Sink, WriterSink};
use crate::state::{ElementFrame, SerializerState, TagStateMachine};
use crate::{Error, Result};

/// Writes one XML document per bound output, incrementally.
///
/// Lifecycle: [`set_output`](Self::set_output) (or one of its variants),
/// optional [`start_document`](Self::start_document), element content,
/// [`end_document`](Self::end_document). Once an error has been returned the
/// instance must not be used for further output.
pub struct XmlSerializer<'w> {
    sink: Option<Box<dyn Sink + 'w>>,
    tags: TagStateMachine,
    namespaces: NamespaceStack,
    options: SerializerOptions,
    properties: PropertyBag,
}

impl Default for XmlSerializer<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for XmlSerializer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XmlSerializer")
            .field("state", &self.tags.state())
            .field("depth", &self.tags.depth())
            .field("encoding", &self.output_encoding())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<'w> XmlSerializer<'w> {
    pub fn new() -> Self {
        Self::with_options(SerializerOptions::default())
    }

    pub fn with_options(options: SerializerOptions) -> Self {
        Self {
            sink: None,
            tags: TagStateMachine::default(),
            namespaces: NamespaceStack::new(),
            options,
            properties: PropertyBag::default(),
        }
    }

    pub fn options(&self) -> &SerializerOptions {
        &self.options
    }

    pub fn state(&self) -> SerializerState {
        self.tags.state()
    }

    // ========================================================================
    // Features und Properties
    // ========================================================================

    /// Sets a recognized feature (see [`features`](crate::features)).
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] for keys this serializer does not implement.
    pub fn set_feature(&mut self, name: &str, value: bool) -> Result<()> {
        if features::apply_feature(&mut self.options, name, value) {
            Ok(())
        } else {
            Err(Error::illegal_state(
                "set_feature",
                self.tags.state(),
                format!("unsupported feature '{name}'"),
            ))
        }
    }

    /// Current value of a recognized feature, `None` for unknown keys.
    pub fn feature(&self, name: &str) -> Option<bool> {
        features::read_feature(&self.options, name)
    }

    /// Stores a property; properties have no effect on the output.
    pub fn set_property(&mut self, name: &str, value: impl Into<PropertyValue>) {
        self.properties.set(name, value.into());
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    // ========================================================================
    // Ausgabe binden
    // ========================================================================

    /// Binds a byte stream written in the encoding `encoding` (e.g. `UTF-8`).
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] if a document is in progress,
    /// [`Error::InvalidArgument`] for an unknown encoding label.
    pub fn set_output<W: io::Write + 'w>(&mut self, out: W, encoding: &str) -> Result<()> {
        self.tags.check_set_output()?;
        let sink = ByteSink::new(out, encoding)?;
        self.bind(Box::new(sink), "byte");
        Ok(())
    }

    /// Binds a character writer; no encoding conversion takes place.
    pub fn set_output_writer<W: fmt::Write + 'w>(&mut self, out: W) -> Result<()> {
        self.tags.check_set_output()?;
        self.bind(Box::new(WriterSink::new(out)), "character");
        Ok(())
    }

    /// Binds a custom [`Sink`].
    pub fn set_sink(&mut self, sink: impl Sink + 'w) -> Result<()> {
        self.tags.check_set_output()?;
        self.bind(Box::new(sink), "custom");
        Ok(())
    }

    fn bind(&mut self, sink: Box<dyn Sink + 'w>, kind: &str) {
        trace!("set_output: {kind} sink, encoding {:?}", sink.encoding());
        self.sink = Some(sink);
        self.tags.reset_for_output();
        self.namespaces = NamespaceStack::new();
    }

    /// Encoding of the bound byte output, `None` for character output.
    pub fn output_encoding(&self) -> Option<&str> {
        self.sink.as_deref().and_then(|s| s.encoding())
    }

    fn out(&mut self) -> Result<&mut (dyn Sink + 'w)> {
        let state = self.tags.state();
        self.sink
            .as_deref_mut()
            .ok_or_else(|| Error::illegal_state("write", state, "no output set"))
    }

    // ========================================================================
    // Dokument
    // ========================================================================

    /// Writes the XML declaration; must be the first output of the document.
    pub fn start_document(&mut self, encoding: Option<&str>, standalone: Option<bool>) -> Result<()> {
        self.tags.check_start_document()?;
        self.check_no_pending("start_document")?;
        escape::write_xml_declaration(self.out()?, encoding, standalone)?;
        self.tags.enter_prolog();
        Ok(())
    }

    /// Closes every open element (innermost first), finishes the sink and
    /// ends the document.
    pub fn end_document(&mut self) -> Result<()> {
        self.tags.check_end_document()?;
        self.check_no_pending("end_document")?;
        self.namespaces.discard_generated_pending();
        let open = self.tags.depth();
        if open > 0 {
            debug!("end_document closes {open} open element(s)");
        }
        while let Some(frame) = self.tags.pop() {
            self.write_end_tag(&frame)?;
            self.namespaces.pop(frame.depth);
        }
        self.out()?.finish()?;
        self.tags.close();
        Ok(())
    }

    /// Writes `<!DOCTYPE body>`; only once and before the root element.
    pub fn docdecl(&mut self, body: &str) -> Result<()> {
        self.tags.check_docdecl()?;
        self.check_no_pending("docdecl")?;
        escape::write_doctype(self.out()?, body)?;
        self.tags.mark_doctype_written();
        Ok(())
    }

    // ========================================================================
    // Namespaces
    // ========================================================================

    /// Binds `prefix` to `namespace` on the next start tag.
    ///
    /// The empty prefix sets the default namespace; `set_prefix("", "")`
    /// undeclares an inherited default.
    pub fn set_prefix(&mut self, prefix: &str, namespace: &str) -> Result<()> {
        self.tags.check_set_prefix()?;
        self.namespaces.bind(prefix, namespace)
    }

    /// Prefix currently bound to `namespace`.
    ///
    /// With `generate_if_absent` a new prefix is bound when none exists: on
    /// the open start tag if there is one, otherwise it is reserved for the
    /// next start tag. A reservation never blocks other calls and is dropped
    /// when the enclosing element ends.
    ///
    /// # Errors
    ///
    /// [`Error::IllegalState`] for `generate_if_absent` after the root element
    /// has been closed.
    pub fn get_prefix(&mut self, namespace: &str, generate_if_absent: bool) -> Result<Option<String>> {
        if generate_if_absent {
            self.tags.check_generate_prefix()?;
        }
        let open_depth = self.tags.top().filter(|f| f.pending_close).map(|f| f.depth);
        match self.namespaces.lookup_prefix(namespace, generate_if_absent, open_depth)? {
            None => Ok(None),
            Some(PrefixLookup::Existing(prefix) | PrefixLookup::Queued(prefix)) => Ok(Some(prefix)),
            Some(PrefixLookup::DeclaredOnOpenTag(binding)) => {
                if let Some(frame) = self.tags.top_mut() {
                    frame.declared_prefixes.insert(binding.prefix.clone());
                }
                escape::write_namespace_declaration(self.out()?, &binding.prefix, &binding.uri)?;
                Ok(Some(binding.prefix))
            }
        }
    }

    /// Number of open elements.
    pub fn depth(&self) -> usize {
        self.tags.depth()
    }

    /// Namespace of the innermost open element.
    pub fn namespace(&self) -> Option<&str> {
        self.tags.top().and_then(|f| f.namespace.as_deref())
    }

    /// Local name of the innermost open element.
    pub fn name(&self) -> Option<&str> {
        self.tags.top().map(|f| f.name.as_str())
    }

    fn check_no_pending(&self, operation: &'static str) -> Result<()> {
        if self.namespaces.has_pending() {
            return Err(Error::illegal_state(
                operation,
                self.tags.state(),
                "set_prefix() must be followed directly by start_tag()",
            ));
        }
        Ok(())
    }

    // ========================================================================
    // Elemente und Attribute
    // ========================================================================

    /// Schreibt das verzoegerte `>` des offenen Start-Tags.
    fn close_start_tag(&mut self) -> Result<()> {
        let Some(frame) = self.tags.open_start_tag() else {
            return Ok(());
        };
        frame.pending_close = false;
        self.out()?.write_str(">")
    }

    /// Opens an element. `None` writes the name unqualified; `Some("")`
    /// places it in no namespace, undeclaring an inherited default.
    pub fn start_tag(&mut self, namespace: Option<&str>, name: &str) -> Result<&mut Self> {
        self.tags.check_start_tag()?;
        escape::check_name("element", name, namespace.is_none())?;
        let depth = self.tags.depth() + 1;
        self.namespaces.push(depth)?;
        self.close_start_tag()?;

        let resolved = self.namespaces.resolve_element(namespace, depth)?;
        let mut frame = ElementFrame::new(namespace, name, resolved.prefix, depth);
        let declarations: Vec<(String, String)> = self
            .namespaces
            .declarations_at(depth)
            .into_iter()
            .map(|b| (b.prefix.clone(), b.uri.clone()))
            .collect();

        let sink = self.out()?;
        sink.write_str("<")?;
        escape::write_qname(sink, frame.prefix.as_deref(), name)?;
        for (prefix, uri) in declarations {
            if frame.declared_prefixes.insert(prefix.clone()) {
                escape::write_namespace_declaration(sink, &prefix, &uri)?;
            }
        }
        self.tags.push(frame);
        Ok(self)
    }

    /// Adds an attribute to the open start tag.
    ///
    /// Unprefixed attributes are in no namespace, so `None` and `Some("")`
    /// are equivalent here.
    pub fn attribute(&mut self, namespace: Option<&str>, name: &str, value: &str) -> Result<&mut Self> {
        self.tags.check_attribute()?;
        self.check_no_pending("attribute")?;
        escape::check_name("attribute", name, namespace.is_none())?;
        if namespace.is_none() && (name == "xmlns" || name.starts_with("xmlns:")) {
            return Err(Error::invalid_argument(
                "namespace declarations must be made with set_prefix()",
            ));
        }

        let key = (namespace.unwrap_or("").to_owned(), name.to_owned());
        let depth = self.tags.depth();
        if self.tags.top().is_some_and(|f| f.attributes.contains(&key)) {
            return Err(Error::invalid_argument(format!("duplicate attribute '{name}'")));
        }
        let resolved = self.namespaces.resolve_attribute(namespace, depth)?;
        let declare = match (&resolved.declared, self.tags.top_mut()) {
            (Some(binding), Some(frame)) => {
                frame.attributes.insert(key);
                frame.declared_prefixes.insert(binding.prefix.clone())
            }
            (None, Some(frame)) => {
                frame.attributes.insert(key);
                false
            }
            (_, None) => false,
        };

        let sink = self.out()?;
        if let (true, Some(binding)) = (declare, &resolved.declared) {
            escape::write_namespace_declaration(sink, &binding.prefix, &binding.uri)?;
        }
        sink.write_str(" ")?;
        escape::write_qname(sink, resolved.prefix.as_deref(), name)?;
        sink.write_str("=\"")?;
        escape::write_escaped_attr(sink, value)?;
        sink.write_str("\"")?;
        Ok(self)
    }

    /// Closes the innermost element; `(namespace, name)` must match it exactly.
    pub fn end_tag(&mut self, namespace: Option<&str>, name: &str) -> Result<&mut Self> {
        self.check_no_pending("end_tag")?;
        let frame = self.tags.pop_matching(namespace, name)?;
        self.namespaces.discard_generated_pending();
        self.write_end_tag(&frame)?;
        self.namespaces.pop(frame.depth);
        Ok(self)
    }

    fn write_end_tag(&mut self, frame: &ElementFrame) -> Result<()> {
        let self_closing = self.options.self_closing_empty_elements;
        let sink = self.out()?;
        if frame.pending_close {
            if self_closing {
                return sink.write_str("/>");
            }
            sink.write_str(">")?;
        }
        sink.write_str("</")?;
        escape::write_qname(sink, frame.prefix.as_deref(), &frame.name)?;
        sink.write_str(">")
    }

    // ========================================================================
    // Inhalt
    // ========================================================================

    /// Writes escaped character data.
    pub fn text(&mut self, text: &str) -> Result<&mut Self> {
        self.tags.check_content("text")?;
        self.check_no_pending("text")?;
        self.close_start_tag()?;
        let escape_whitespace = self.options.escape_text_whitespace;
        escape::write_escaped_text(self.out()?, text, escape_whitespace)?;
        Ok(self)
    }

    /// Writes `buf[start..start + len]` exactly like [`text`](Self::text).
    pub fn text_chars(&mut self, buf: &[char], start: usize, len: usize) -> Result<&mut Self> {
        let Some(slice) = start.checked_add(len).and_then(|end| buf.get(start..end)) else {
            return Err(Error::invalid_argument(format!(
                "character range {start}+{len} out of bounds for buffer of length {}",
                buf.len()
            )));
        };
        let text: String = slice.iter().collect();
        self.text(&text)
    }

    /// Writes `<![CDATA[text]]>`.
    pub fn cdsect(&mut self, text: &str) -> Result<()> {
        self.tags.check_content("cdsect")?;
        self.check_no_pending("cdsect")?;
        escape::check_cdata(text)?;
        self.close_start_tag()?;
        escape::write_cdata(self.out()?, text)
    }

    /// Writes `&name;` unescaped.
    pub fn entity_ref(&mut self, name: &str) -> Result<()> {
        self.tags.check_content("entity_ref")?;
        self.check_no_pending("entity_ref")?;
        escape::check_name("entity", name, false)?;
        self.close_start_tag()?;
        escape::write_entity_ref(self.out()?, name)
    }

    /// Writes `<?pi?>`; `pi` holds target and data separated by whitespace.
    pub fn processing_instruction(&mut self, pi: &str) -> Result<()> {
        self.tags.check_misc("processing_instruction")?;
        self.check_no_pending("processing_instruction")?;
        escape::check_processing_instruction(pi)?;
        self.close_start_tag()?;
        self.tags.enter_prolog();
        escape::write_processing_instruction(self.out()?, pi)
    }

    /// Writes `<!--text-->`.
    pub fn comment(&mut self, text: &str) -> Result<()> {
        self.tags.check_misc("comment")?;
        self.check_no_pending("comment")?;
        escape::check_comment(text)?;
        self.close_start_tag()?;
        self.tags.enter_prolog();
        escape::write_comment(self.out()?, text)
    }

    /// Writes whitespace without semantic content.
    ///
    /// Outside the root element only XML whitespace is accepted; inside an
    /// element the text is written like [`text`](Self::text).
    pub fn ignorable_whitespace(&mut self, text: &str) -> Result<()> {
        self.tags.check_misc("ignorable_whitespace")?;
        self.check_no_pending("ignorable_whitespace")?;
        if self.tags.depth() == 0 {
            if !escape::is_xml_whitespace(text) {
                return Err(Error::invalid_argument(
                    "only whitespace is allowed outside the root element",
                ));
            }
            self.tags.enter_prolog();
            return self.out()?.write_str(text);
        }
        self.close_start_tag()?;
        let escape_whitespace = self.options.escape_text_whitespace;
        escape::write_escaped_text(self.out()?, text, escape_whitespace)
    }

    /// Closes a pending start tag and flushes the sink.
    pub fn flush(&mut self) -> Result<()> {
        if self.sink.is_none() {
            return Ok(());
        }
        self.close_start_tag()?;
        self.out()?.flush()
    }
}
