//! Tag state machine: document lifecycle, element stack and call legality.
//!
//! ```text
//! Unset --set_output--> Ready --start_document--> InProlog
//!   Ready/InProlog --start_tag--> InElement (depth > 0)
//!   InElement --end_tag (depth 0)--> AfterRoot --end_document--> Closed
//! ```
//!
//! Die Maschine schreibt selbst nichts; der Facade (`XmlSerializer`) fragt sie
//! vor jeder Ausgabe, ob der Aufruf erlaubt ist.

use core::fmt;

use crate::{Error, FastHashSet, Result};

/// Lifecycle state of one serializer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SerializerState {
    /// No output bound yet.
    #[default]
    Unset,
    /// Output bound, nothing written.
    Ready,
    /// Document prolog: XML declaration, doctype, comments or PIs written.
    InProlog,
    /// At least one element is open.
    InElement,
    /// The root element has been closed; only `Misc*` may follow.
    AfterRoot,
    /// `end_document` completed.
    Closed,
}

impl fmt::Display for SerializerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Unset => "Unset",
            Self::Ready => "Ready",
            Self::InProlog => "InProlog",
            Self::InElement => "InElement",
            Self::AfterRoot => "AfterRoot",
            Self::Closed => "Closed",
        };
        f.write_str(name)
    }
}

/// One open element.
#[derive(Debug, Clone)]
pub(crate) struct ElementFrame {
    pub namespace: Option<String>,
    pub name: String,
    /// Aufgeloester Prefix; `None` oder `""` → unqualifiziert geschrieben.
    pub prefix: Option<String>,
    pub depth: usize,
    /// `<name` wurde geschrieben, `>` steht noch aus.
    pub pending_close: bool,
    pub declared_prefixes: FastHashSet<String>,
    /// Expanded names (uri, local) der bereits geschriebenen Attribute.
    pub attributes: FastHashSet<(String, String)>,
}

impl ElementFrame {
    pub fn new(namespace: Option<&str>, name: &str, prefix: Option<String>, depth: usize) -> Self {
        Self {
            namespace: namespace.map(str::to_owned),
            name: name.to_owned(),
            prefix,
            depth,
            pending_close: true,
            declared_prefixes: FastHashSet::default(),
            attributes: FastHashSet::default(),
        }
    }
}

/// Tracks the lifecycle state and the stack of open elements.
#[derive(Debug, Default)]
pub(crate) struct TagStateMachine {
    state: SerializerState,
    frames: Vec<ElementFrame>,
    doctype_written: bool,
}

impl TagStateMachine {
    pub fn state(&self) -> SerializerState {
        self.state
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn top(&self) -> Option<&ElementFrame> {
        self.frames.last()
    }

    pub fn top_mut(&mut self) -> Option<&mut ElementFrame> {
        self.frames.last_mut()
    }

    /// Oberstes Element, solange sein Start-Tag noch Attribute annimmt.
    pub fn open_start_tag(&mut self) -> Option<&mut ElementFrame> {
        self.frames.last_mut().filter(|f| f.pending_close)
    }

    fn fail(&self, operation: &'static str, reason: &'static str) -> Error {
        Error::illegal_state(operation, self.state, reason)
    }

    /// Jede Ausgabe braucht einen gebundenen Sink und ein offenes Dokument.
    pub fn check_emit(&self, operation: &'static str) -> Result<()> {
        match self.state {
            SerializerState::Unset => Err(self.fail(operation, "no output set, call set_output() first")),
            SerializerState::Closed => Err(self.fail(operation, "document already ended")),
            _ => Ok(()),
        }
    }

    pub fn check_set_output(&self) -> Result<()> {
        match self.state {
            SerializerState::Unset | SerializerState::Closed => Ok(()),
            _ => Err(self.fail("set_output", "output already set for this document")),
        }
    }

    /// Neues Dokument: Zustand zuruecksetzen.
    pub fn reset_for_output(&mut self) {
        self.state = SerializerState::Ready;
        self.frames.clear();
        self.doctype_written = false;
    }

    pub fn check_start_document(&self) -> Result<()> {
        self.check_emit("start_document")?;
        if self.state != SerializerState::Ready {
            return Err(self.fail("start_document", "XML declaration must be the very first output"));
        }
        Ok(())
    }

    pub fn enter_prolog(&mut self) {
        if self.state == SerializerState::Ready {
            self.state = SerializerState::InProlog;
        }
    }

    pub fn check_docdecl(&self) -> Result<()> {
        self.check_emit("docdecl")?;
        match self.state {
            SerializerState::Ready | SerializerState::InProlog if !self.doctype_written => Ok(()),
            SerializerState::Ready | SerializerState::InProlog => {
                Err(self.fail("docdecl", "document type declaration already written"))
            }
            _ => Err(self.fail("docdecl", "document type declaration must precede the root element")),
        }
    }

    pub fn mark_doctype_written(&mut self) {
        self.doctype_written = true;
        self.enter_prolog();
    }

    pub fn check_start_tag(&self) -> Result<()> {
        self.check_emit("start_tag")?;
        if self.state == SerializerState::AfterRoot {
            return Err(self.fail("start_tag", "root element already closed, only one root is allowed"));
        }
        Ok(())
    }

    /// Prueft dass `attribute` direkt auf `start_tag`/`attribute` folgt.
    pub fn check_attribute(&self) -> Result<()> {
        self.check_emit("attribute")?;
        match self.frames.last() {
            Some(frame) if frame.pending_close => Ok(()),
            Some(_) => Err(self.fail("attribute", "start tag already closed by content")),
            None => Err(self.fail("attribute", "no open start tag")),
        }
    }

    /// `set_prefix` nur vor einem `start_tag` und nicht zwischen Attributen.
    pub fn check_set_prefix(&self) -> Result<()> {
        self.check_emit("set_prefix")?;
        if self.state == SerializerState::AfterRoot {
            return Err(self.fail("set_prefix", "root element already closed"));
        }
        match self.frames.last() {
            Some(frame) if frame.pending_close && !frame.attributes.is_empty() => Err(self.fail(
                "set_prefix",
                "attributes already written for the open start tag",
            )),
            _ => Ok(()),
        }
    }

    /// Prefix-Generierung braucht ein Element, das ihn noch deklarieren kann.
    pub fn check_generate_prefix(&self) -> Result<()> {
        self.check_emit("get_prefix")?;
        if self.state == SerializerState::AfterRoot {
            return Err(self.fail("get_prefix", "root element already closed, no element can declare a new prefix"));
        }
        Ok(())
    }

    /// Text, CDATA und Entity-Referenzen nur innerhalb eines Elements.
    pub fn check_content(&self, operation: &'static str) -> Result<()> {
        self.check_emit(operation)?;
        if self.frames.is_empty() {
            return Err(self.fail(operation, "character content is only allowed inside an element"));
        }
        Ok(())
    }

    /// Kommentare, PIs und Whitespace: ueberall im Dokument (`Misc*`).
    pub fn check_misc(&self, operation: &'static str) -> Result<()> {
        self.check_emit(operation)
    }

    pub fn check_end_document(&self) -> Result<()> {
        self.check_emit("end_document")
    }

    pub fn push(&mut self, frame: ElementFrame) {
        self.frames.push(frame);
        self.state = SerializerState::InElement;
    }

    /// Entfernt das oberste Element, wenn `(namespace, name)` passt.
    pub fn pop_matching(&mut self, namespace: Option<&str>, name: &str) -> Result<ElementFrame> {
        self.check_emit("end_tag")?;
        let Some(top) = self.frames.last() else {
            return Err(self.fail("end_tag", "no open element"));
        };
        if top.namespace.as_deref() != namespace || top.name != name {
            return Err(Error::tag_mismatch(
                (top.namespace.as_deref(), &top.name),
                (namespace, name),
            ));
        }
        self.pop()
            .ok_or_else(|| self.fail("end_tag", "no open element"))
    }

    /// Innerstes Element entfernen; `end_document` schliesst so alle offenen Elemente.
    pub fn pop(&mut self) -> Option<ElementFrame> {
        let frame = self.frames.pop()?;
        if self.frames.is_empty() {
            self.state = SerializerState::AfterRoot;
        }
        Some(frame)
    }

    pub fn close(&mut self) {
        self.state = SerializerState::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready() -> TagStateMachine {
        let mut sm = TagStateMachine::default();
        sm.reset_for_output();
        sm
    }

    #[test]
    fn unset_rejects_everything() {
        let sm = TagStateMachine::default();
        assert!(matches!(sm.check_start_tag(), Err(Error::IllegalState { .. })));
        assert!(matches!(sm.check_misc("comment"), Err(Error::IllegalState { .. })));
        assert!(sm.check_set_output().is_ok());
    }

    #[test]
    fn set_output_twice_rejected() {
        let sm = ready();
        assert!(sm.check_set_output().is_err());
    }

    #[test]
    fn start_document_only_first() {
        let mut sm = ready();
        assert!(sm.check_start_document().is_ok());
        sm.enter_prolog();
        assert!(sm.check_start_document().is_err());
    }

    #[test]
    fn depth_follows_push_pop() {
        let mut sm = ready();
        sm.push(ElementFrame::new(None, "a", None, 1));
        sm.push(ElementFrame::new(None, "b", None, 2));
        assert_eq!(sm.depth(), 2);
        assert_eq!(sm.state(), SerializerState::InElement);
        sm.pop_matching(None, "b").unwrap();
        assert_eq!(sm.depth(), 1);
        sm.pop_matching(None, "a").unwrap();
        assert_eq!(sm.state(), SerializerState::AfterRoot);
    }

    #[test]
    fn mismatch_even_if_ancestor_matches() {
        let mut sm = ready();
        sm.push(ElementFrame::new(None, "a", None, 1));
        sm.push(ElementFrame::new(None, "b", None, 2));
        let err = sm.pop_matching(None, "a").unwrap_err();
        assert!(matches!(err, Error::TagMismatch { .. }), "{err}");
        assert_eq!(sm.depth(), 2);
    }

    #[test]
    fn null_and_empty_namespace_differ() {
        let mut sm = ready();
        sm.push(ElementFrame::new(Some(""), "a", None, 1));
        assert!(sm.pop_matching(None, "a").is_err());
        assert!(sm.pop_matching(Some(""), "a").is_ok());
    }

    #[test]
    fn attribute_requires_open_start_tag() {
        let mut sm = ready();
        assert!(sm.check_attribute().is_err());
        sm.push(ElementFrame::new(None, "a", None, 1));
        assert!(sm.check_attribute().is_ok());
        if let Some(f) = sm.top_mut() {
            f.pending_close = false;
        }
        assert!(sm.check_attribute().is_err());
    }

    #[test]
    fn set_prefix_rejected_after_attribute() {
        let mut sm = ready();
        sm.push(ElementFrame::new(None, "a", None, 1));
        assert!(sm.check_set_prefix().is_ok());
        if let Some(f) = sm.top_mut() {
            f.attributes.insert((String::new(), "x".into()));
        }
        assert!(sm.check_set_prefix().is_err());
    }

    #[test]
    fn docdecl_once_and_before_root() {
        let mut sm = ready();
        assert!(sm.check_docdecl().is_ok());
        sm.mark_doctype_written();
        assert_eq!(sm.state(), SerializerState::InProlog);
        assert!(sm.check_docdecl().is_err());

        let mut sm = ready();
        sm.push(ElementFrame::new(None, "a", None, 1));
        assert!(sm.check_docdecl().is_err());
    }

    #[test]
    fn second_root_rejected() {
        let mut sm = ready();
        sm.push(ElementFrame::new(None, "a", None, 1));
        sm.pop_matching(None, "a").unwrap();
        assert!(sm.check_start_tag().is_err());
        assert!(sm.check_misc("comment").is_ok());
        assert!(sm.check_content("text").is_err());
        assert!(sm.check_generate_prefix().is_err());
    }

    #[test]
    fn closed_allows_new_output() {
        let mut sm = ready();
        sm.close();
        assert!(sm.check_emit("text").is_err());
        assert!(sm.check_set_output().is_ok());
    }
}
