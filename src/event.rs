//! Serializer calls as data.
//!
//! Eine Event-Sequenz laesst sich speichern, vergleichen und spaeter gegen
//! einen Serializer abspielen.
//!
//! - `events_to_xml()`: gibt XML als String zurueck.
//! - `events_to_xml_writer()`: streamt XML in `impl Write` mit Encoding.

use std::io::Write;

use crate::serializer::XmlSerializer;
use crate::state::SerializerState;
use crate::Result;

/// One serializer call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event<'a> {
    StartDocument {
        encoding: Option<&'a str>,
        standalone: Option<bool>,
    },
    EndDocument,
    SetPrefix {
        prefix: &'a str,
        namespace: &'a str,
    },
    StartTag {
        namespace: Option<&'a str>,
        name: &'a str,
    },
    Attribute {
        namespace: Option<&'a str>,
        name: &'a str,
        value: &'a str,
    },
    EndTag {
        namespace: Option<&'a str>,
        name: &'a str,
    },
    Text(&'a str),
    CdSect(&'a str),
    EntityRef(&'a str),
    ProcessingInstruction(&'a str),
    Comment(&'a str),
    DocDecl(&'a str),
    IgnorableWhitespace(&'a str),
    Flush,
}

impl XmlSerializer<'_> {
    /// Performs the call described by `event`.
    pub fn process(&mut self, event: &Event<'_>) -> Result<()> {
        match *event {
            Event::StartDocument { encoding, standalone } => self.start_document(encoding, standalone),
            Event::EndDocument => self.end_document(),
            Event::SetPrefix { prefix, namespace } => self.set_prefix(prefix, namespace),
            Event::StartTag { namespace, name } => self.start_tag(namespace, name).map(|_| ()),
            Event::Attribute { namespace, name, value } => {
                self.attribute(namespace, name, value).map(|_| ())
            }
            Event::EndTag { namespace, name } => self.end_tag(namespace, name).map(|_| ()),
            Event::Text(text) => self.text(text).map(|_| ()),
            Event::CdSect(text) => self.cdsect(text),
            Event::EntityRef(name) => self.entity_ref(name),
            Event::ProcessingInstruction(pi) => self.processing_instruction(pi),
            Event::Comment(text) => self.comment(text),
            Event::DocDecl(body) => self.docdecl(body),
            Event::IgnorableWhitespace(text) => self.ignorable_whitespace(text),
            Event::Flush => self.flush(),
        }
    }

    /// Spielt alle Events ab und beendet das Dokument, falls noch offen.
    fn replay(&mut self, events: &[Event<'_>]) -> Result<()> {
        for event in events {
            self.process(event)?;
        }
        if self.state() != SerializerState::Closed {
            self.end_document()?;
        }
        Ok(())
    }
}

/// Serialisiert Events als XML-String.
pub fn events_to_xml(events: &[Event<'_>]) -> Result<String> {
    let mut out = String::new();
    {
        let mut ser = XmlSerializer::new();
        ser.set_output_writer(&mut out)?;
        ser.replay(events)?;
    }
    Ok(out)
}

/// Serialisiert Events direkt in einen Writer im Encoding `encoding`.
pub fn events_to_xml_writer(events: &[Event<'_>], writer: impl Write, encoding: &str) -> Result<()> {
    let mut ser = XmlSerializer::new();
    ser.set_output(writer, encoding)?;
    ser.replay(events)
}
