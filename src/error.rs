//! Central error types for the streaming serializer.
//!
//! Every fallible operation reports exactly one of these variants. After an
//! error the serializer state is undefined for further emission; only
//! `flush` or dropping the instance remain meaningful.

use core::fmt;
use std::borrow::Cow;

use crate::state::SerializerState;

/// All errors raised by the serializer.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// A call was made in a state or sequence that violates the call protocol.
    IllegalState {
        /// Name of the offending operation (e.g. `attribute`).
        operation: &'static str,
        /// State of the serializer when the call was made.
        state: SerializerState,
        /// Was genau verletzt wurde (leer wenn nicht verfügbar).
        reason: Cow<'static, str>,
    },
    /// Malformed input, e.g. a CDATA section containing `]]>`.
    InvalidArgument(Cow<'static, str>),
    /// A prefix binding passed to `set_prefix` was rejected.
    InvalidBinding {
        prefix: String,
        uri: String,
        reason: Cow<'static, str>,
    },
    /// A prefix would be bound to two different URIs on the same element, or
    /// a child element rebinds an inherited non-empty default namespace.
    NamespaceConflict {
        prefix: String,
        existing: String,
        requested: String,
    },
    /// `end_tag` does not match the innermost open element.
    ///
    /// Beide Namen in Clark-Notation `{uri}local` bzw. nur `local`.
    TagMismatch { expected: String, found: String },
    /// The underlying sink failed to write or flush.
    Sink(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IllegalState { operation, state, reason } => {
                if reason.is_empty() {
                    write!(f, "illegal state: {operation}() not allowed in state {state}")
                } else {
                    write!(f, "illegal state: {operation}() not allowed in state {state}: {reason}")
                }
            }
            Self::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
            Self::InvalidBinding { prefix, uri, reason } => {
                write!(f, "invalid namespace binding '{prefix}' -> '{uri}': {reason}")
            }
            Self::NamespaceConflict { prefix, existing, requested } => {
                if prefix.is_empty() {
                    write!(f, "namespace conflict: default namespace already bound to '{existing}', cannot bind '{requested}' while it is in scope")
                } else {
                    write!(f, "namespace conflict: prefix '{prefix}' already bound to '{existing}', cannot bind '{requested}' on the same element")
                }
            }
            Self::TagMismatch { expected, found } => {
                write!(f, "end tag mismatch: expected </{expected}>, found </{found}>")
            }
            Self::Sink(msg) => write!(f, "sink error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Sink(e.to_string())
    }
}

impl From<fmt::Error> for Error {
    fn from(_: fmt::Error) -> Self {
        Self::Sink("character writer failed".into())
    }
}

impl Error {
    /// Erstellt einen `IllegalState` Fehler mit Kontext.
    pub fn illegal_state(
        operation: &'static str,
        state: SerializerState,
        reason: impl Into<Cow<'static, str>>,
    ) -> Self {
        Self::IllegalState {
            operation,
            state,
            reason: reason.into(),
        }
    }

    /// Erstellt einen `InvalidArgument` Fehler mit Nachricht.
    pub fn invalid_argument(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    /// Erstellt einen `InvalidBinding` Fehler.
    pub fn invalid_binding(prefix: &str, uri: &str, reason: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidBinding {
            prefix: prefix.to_owned(),
            uri: uri.to_owned(),
            reason: reason.into(),
        }
    }

    /// Erstellt einen `NamespaceConflict` Fehler.
    pub fn namespace_conflict(prefix: &str, existing: &str, requested: &str) -> Self {
        Self::NamespaceConflict {
            prefix: prefix.to_owned(),
            existing: existing.to_owned(),
            requested: requested.to_owned(),
        }
    }

    /// Erstellt einen `TagMismatch` Fehler aus (namespace, name) Paaren.
    pub fn tag_mismatch(
        expected: (Option<&str>, &str),
        found: (Option<&str>, &str),
    ) -> Self {
        Self::TagMismatch {
            expected: clark(expected.0, expected.1),
            found: clark(found.0, found.1),
        }
    }
}

/// `{uri}local` fuer Namespaces, sonst nur `local`.
fn clark(namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(uri) if !uri.is_empty() => format!("{{{uri}}}{name}"),
        _ => name.to_owned(),
    }
}

/// A convenience `Result` type alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;
