//! Output encoder: escaping tables and literal markup constructs.
//!
//! Text:      `&` `<` `>` `\r` (optional `\n` `\t`)
//! Attribute: `&` `<` `>` `"` `\n` `\t` `\r`
//!
//! Die `check_*` Funktionen validieren vor jeder Ausgabe, damit ein
//! abgelehnter Aufruf nichts in den Sink schreibt.

use memchr::{memchr, memchr3, memmem};

use crate::sink::Sink;
use crate::{Error, Result};

// ============================================================================
// Escaping
// ============================================================================

fn text_replacement(b: u8, escape_whitespace: bool) -> Option<&'static str> {
    match b {
        b'&' => Some("&amp;"),
        b'<' => Some("&lt;"),
        b'>' => Some("&gt;"),
        b'\r' => Some("&#13;"),
        b'\n' if escape_whitespace => Some("&#10;"),
        b'\t' if escape_whitespace => Some("&#9;"),
        _ => None,
    }
}

fn attr_replacement(b: u8) -> Option<&'static str> {
    match b {
        b'&' => Some("&amp;"),
        b'<' => Some("&lt;"),
        b'>' => Some("&gt;"),
        b'"' => Some("&quot;"),
        b'\n' => Some("&#10;"),
        b'\t' => Some("&#9;"),
        b'\r' => Some("&#13;"),
        _ => None,
    }
}

/// Schreibt `s` in Stuecken; nur die ASCII-Sonderzeichen werden ersetzt,
/// daher liegen alle Schnittstellen auf char-Grenzen.
fn write_escaped<S: Sink + ?Sized>(
    sink: &mut S,
    s: &str,
    replacement: impl Fn(u8) -> Option<&'static str>,
) -> Result<()> {
    let mut start = 0;
    for (pos, &b) in s.as_bytes().iter().enumerate() {
        if let Some(rep) = replacement(b) {
            if start < pos {
                sink.write_str(&s[start..pos])?;
            }
            sink.write_str(rep)?;
            start = pos + 1;
        }
    }
    if start < s.len() {
        sink.write_str(&s[start..])?;
    }
    Ok(())
}

/// Escapes character data for element content.
pub fn write_escaped_text<S: Sink + ?Sized>(sink: &mut S, s: &str, escape_whitespace: bool) -> Result<()> {
    let bytes = s.as_bytes();
    let special = memchr3(b'&', b'<', b'>', bytes).is_some()
        || if escape_whitespace {
            memchr3(b'\r', b'\n', b'\t', bytes).is_some()
        } else {
            memchr(b'\r', bytes).is_some()
        };
    if !special {
        return sink.write_str(s);
    }
    write_escaped(sink, s, |b| text_replacement(b, escape_whitespace))
}

/// Escapes a double-quoted attribute value so it survives attribute-value
/// normalization unchanged.
pub fn write_escaped_attr<S: Sink + ?Sized>(sink: &mut S, s: &str) -> Result<()> {
    let bytes = s.as_bytes();
    let special = memchr3(b'&', b'<', b'>', bytes).is_some()
        || memchr3(b'"', b'\n', b'\t', bytes).is_some()
        || memchr(b'\r', bytes).is_some();
    if !special {
        return sink.write_str(s);
    }
    write_escaped(sink, s, attr_replacement)
}

// ============================================================================
// Validierung
// ============================================================================

/// Element-, Attribut- und Entity-Namen: nicht leer, keine Markup-Zeichen.
pub fn check_name(what: &str, name: &str, allow_colon: bool) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid_argument(format!("{what} name must not be empty")));
    }
    let bad = name.chars().find(|&c| {
        c.is_whitespace() || matches!(c, '<' | '>' | '&' | '"' | '\'' | '=' | '/' | '?' | '!') || (c == ':' && !allow_colon)
    });
    if let Some(c) = bad {
        return Err(Error::invalid_argument(format!("{what} name '{name}' contains {c:?}")));
    }
    Ok(())
}

/// XML 1.0 Section 2.7: CDATA darf `]]>` nicht enthalten.
pub fn check_cdata(text: &str) -> Result<()> {
    if memmem::find(text.as_bytes(), b"]]>").is_some() {
        return Err(Error::invalid_argument("CDATA section contains ']]>'"));
    }
    Ok(())
}

/// XML 1.0 Section 2.5: kein `--`, kein `-` am Ende.
pub fn check_comment(text: &str) -> Result<()> {
    if memmem::find(text.as_bytes(), b"--").is_some() || text.ends_with('-') {
        return Err(Error::invalid_argument("comment contains '--' or ends with '-'"));
    }
    Ok(())
}

/// XML 1.0 Section 2.6: nicht leer, kein `?>`, Target nicht `xml`.
pub fn check_processing_instruction(pi: &str) -> Result<()> {
    let target = pi.split(|c: char| c.is_ascii_whitespace()).next().unwrap_or("");
    if target.is_empty() {
        return Err(Error::invalid_argument("processing instruction target must not be empty"));
    }
    if target.eq_ignore_ascii_case("xml") {
        return Err(Error::invalid_argument("processing instruction target 'xml' is reserved, use start_document()"));
    }
    if memmem::find(pi.as_bytes(), b"?>").is_some() {
        return Err(Error::invalid_argument("processing instruction contains '?>'"));
    }
    Ok(())
}

/// Whitespace im Sinne von XML 1.0 (S-Produktion).
pub fn is_xml_whitespace(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
}

// ============================================================================
// Literale Konstrukte
// ============================================================================

/// `<?xml version="1.0" encoding="ENC" standalone="yes|no"?>`
pub fn write_xml_declaration<S: Sink + ?Sized>(
    sink: &mut S,
    encoding: Option<&str>,
    standalone: Option<bool>,
) -> Result<()> {
    sink.write_str("<?xml version=\"1.0\"")?;
    if let Some(enc) = encoding {
        sink.write_str(" encoding=\"")?;
        write_escaped_attr(sink, enc)?;
        sink.write_str("\"")?;
    }
    if let Some(standalone) = standalone {
        sink.write_str(if standalone { " standalone=\"yes\"" } else { " standalone=\"no\"" })?;
    }
    sink.write_str("?>")
}

pub fn write_cdata<S: Sink + ?Sized>(sink: &mut S, text: &str) -> Result<()> {
    sink.write_str("<![CDATA[")?;
    sink.write_str(text)?;
    sink.write_str("]]>")
}

pub fn write_comment<S: Sink + ?Sized>(sink: &mut S, text: &str) -> Result<()> {
    sink.write_str("<!--")?;
    sink.write_str(text)?;
    sink.write_str("-->")
}

pub fn write_processing_instruction<S: Sink + ?Sized>(sink: &mut S, pi: &str) -> Result<()> {
    sink.write_str("<?")?;
    sink.write_str(pi)?;
    sink.write_str("?>")
}

/// `&name;` ohne Escaping des Namens.
pub fn write_entity_ref<S: Sink + ?Sized>(sink: &mut S, name: &str) -> Result<()> {
    sink.write_str("&")?;
    sink.write_str(name)?;
    sink.write_str(";")
}

/// `<!DOCTYPE body>` mit dem Rumpf unveraendert.
pub fn write_doctype<S: Sink + ?Sized>(sink: &mut S, body: &str) -> Result<()> {
    sink.write_str("<!DOCTYPE ")?;
    sink.write_str(body)?;
    sink.write_str(">")
}

/// ` xmlns:prefix="uri"` bzw. ` xmlns="uri"`.
pub fn write_namespace_declaration<S: Sink + ?Sized>(sink: &mut S, prefix: &str, uri: &str) -> Result<()> {
    if prefix.is_empty() {
        sink.write_str(" xmlns=\"")?;
    } else {
        sink.write_str(" xmlns:")?;
        sink.write_str(prefix)?;
        sink.write_str("=\"")?;
    }
    write_escaped_attr(sink, uri)?;
    sink.write_str("\"")
}

/// `prefix:name` oder nur `name`.
pub fn write_qname<S: Sink + ?Sized>(sink: &mut S, prefix: Option<&str>, name: &str) -> Result<()> {
    if let Some(p) = prefix.filter(|p| !p.is_empty()) {
        sink.write_str(p)?;
        sink.write_str(":")?;
    }
    sink.write_str(name)
}
