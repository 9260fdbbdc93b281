//! Output sinks: byte streams with a character encoding, or character writers.
//!
//! Der Serializer schreibt ausschliesslich `&str`-Stuecke; die Umwandlung in
//! Bytes passiert hier. Pro Dokument wird genau ein Sink gebunden.

use std::fmt;
use std::io::Write;

use encoding_rs::{CoderResult, Encoder, Encoding, UTF_16BE, UTF_16LE, UTF_8};
use log::warn;

use crate::{Error, Result};

/// Destination of serialized markup.
///
/// Writes may be buffered by the implementation; they only have to be
/// visible after [`flush`](Sink::flush).
pub trait Sink {
    /// Writes a chunk of already escaped markup.
    fn write_str(&mut self, s: &str) -> Result<()>;

    /// Pushes buffered output to the underlying destination.
    fn flush(&mut self) -> Result<()>;

    /// Called once by `end_document`; finalizes encoder state and flushes.
    fn finish(&mut self) -> Result<()> {
        self.flush()
    }

    /// Character encoding of a byte-oriented sink.
    fn encoding(&self) -> Option<&str> {
        None
    }
}

/// Scratch-Puffergroesse fuer Encoder-Ausgabe.
const SCRATCH_BYTES: usize = 4096;

enum ByteEncoding {
    Utf8,
    Utf16 { big_endian: bool, scratch: Vec<u8> },
    Other { encoder: Encoder, scratch: Vec<u8> },
}

/// Byte-oriented sink writing through a character encoding.
///
/// UTF-8 passes straight through. UTF-16 variants are encoded per code unit;
/// the bare label `UTF-16` starts the stream with a little-endian byte order
/// mark. Every other encoding known to `encoding_rs` streams through its
/// encoder, replacing unmappable characters with decimal character references.
pub struct ByteSink<W: Write> {
    out: W,
    label: String,
    encoding: ByteEncoding,
    bom_pending: bool,
    warned_unmappable: bool,
}

impl<W: Write> ByteSink<W> {
    /// Creates a sink for the encoding `label` (case-insensitive, WHATWG labels).
    ///
    /// # Errors
    ///
    /// [`Error::InvalidArgument`] if the label is unknown or maps to the
    /// WHATWG `replacement` encoding (e.g. `iso-2022-kr`), which cannot encode.
    pub fn new(out: W, label: &str) -> Result<Self> {
        let label = label.trim();
        let encoding = Encoding::for_label_no_replacement(label.as_bytes())
            .ok_or_else(|| Error::invalid_argument(format!("unsupported encoding: {label}")))?;
        let kind = if encoding == UTF_8 {
            ByteEncoding::Utf8
        } else if encoding == UTF_16LE || encoding == UTF_16BE {
            ByteEncoding::Utf16 {
                big_endian: encoding == UTF_16BE,
                scratch: Vec::new(),
            }
        } else {
            ByteEncoding::Other {
                encoder: encoding.new_encoder(),
                scratch: vec![0; SCRATCH_BYTES],
            }
        };
        Ok(Self {
            out,
            label: label.to_owned(),
            encoding: kind,
            bom_pending: label.eq_ignore_ascii_case("utf-16"),
            warned_unmappable: false,
        })
    }

    /// Gibt den inneren Writer zurueck.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn encode(&mut self, s: &str, last: bool) -> Result<()> {
        if self.bom_pending {
            self.bom_pending = false;
            self.out.write_all(&[0xFF, 0xFE])?;
        }
        match &mut self.encoding {
            ByteEncoding::Utf8 => self.out.write_all(s.as_bytes())?,
            ByteEncoding::Utf16 { big_endian, scratch } => {
                scratch.clear();
                for unit in s.encode_utf16() {
                    let bytes = if *big_endian { unit.to_be_bytes() } else { unit.to_le_bytes() };
                    scratch.extend_from_slice(&bytes);
                }
                self.out.write_all(&scratch[..])?;
            }
            ByteEncoding::Other { encoder, scratch } => {
                let mut src = s;
                loop {
                    let (result, read, written, replaced) = encoder.encode_from_utf8(src, &mut scratch[..], last);
                    self.out.write_all(&scratch[..written])?;
                    if replaced && !self.warned_unmappable {
                        self.warned_unmappable = true;
                        warn!(
                            "characters not representable in {} were written as character references",
                            self.label
                        );
                    }
                    src = &src[read..];
                    if let CoderResult::InputEmpty = result {
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

impl<W: Write> Sink for ByteSink<W> {
    fn write_str(&mut self, s: &str) -> Result<()> {
        self.encode(s, false)
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if matches!(self.encoding, ByteEncoding::Other { .. }) {
            self.encode("", true)?;
        }
        self.flush()
    }

    fn encoding(&self) -> Option<&str> {
        Some(&self.label)
    }
}

/// Character-oriented sink over any [`fmt::Write`] (e.g. `String`).
///
/// The output is already decoded text, so there is no encoding and
/// `flush` has nothing to do.
pub struct WriterSink<W: fmt::Write> {
    out: W,
}

impl<W: fmt::Write> WriterSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Gibt den inneren Writer zurueck.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: fmt::Write> Sink for WriterSink<W> {
    fn write_str(&mut self, s: &str) -> Result<()> {
        self.out.write_str(s)?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}
