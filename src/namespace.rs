//! Namespace scope stack (Namespaces in XML 1.0).
//!
//! Haelt alle aktiven Prefix→URI Bindings mit ihrer Tiefe. Bindings einer
//! Tiefe verschwinden, wenn das Element dieser Tiefe geschlossen wird.
//!
//! - `xml` und `xmlns` sind auf Tiefe 0 fest gebunden.
//! - Der Default-Namespace (`""`) startet leer gebunden (`xmlns=""`).
//! - Explizite Bindings (`set_prefix`) warten in `pending` auf den naechsten
//!   Start-Tag.
//! - Fehlt ein Binding, wird ein Prefix `nsN` synthetisiert, der in keinem
//!   sichtbaren Scope vorkommt.

use log::debug;

use crate::{Error, Result};

/// Namespace URI permanently bound to the `xml` prefix.
pub const XML_NS_URI: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace URI permanently bound to the `xmlns` prefix.
pub const XMLNS_NS_URI: &str = "http://www.w3.org/2000/xmlns/";

/// How a binding came into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum BindingOrigin {
    /// Explicit `set_prefix` call.
    Explicit,
    /// Synthesized while resolving an element or attribute name.
    Generated,
    /// Pre-bound at depth 0 (`xml`, `xmlns`, empty default namespace).
    Builtin,
}

/// A prefix bound to a namespace URI at a nesting depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceBinding {
    /// `""` denotes the default namespace.
    pub prefix: String,
    pub uri: String,
    pub depth: usize,
    pub origin: BindingOrigin,
}

impl NamespaceBinding {
    fn new(prefix: &str, uri: &str, depth: usize, origin: BindingOrigin) -> Self {
        Self {
            prefix: prefix.to_owned(),
            uri: uri.to_owned(),
            depth,
            origin,
        }
    }
}

/// Outcome of resolving a namespace URI for an element or attribute name.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Resolved {
    /// Prefix to write; `None` or `""` means the name is written unqualified.
    pub prefix: Option<String>,
    /// Binding newly created by the resolution, to be declared on the tag.
    pub declared: Option<NamespaceBinding>,
}

/// Outcome of [`NamespaceStack::lookup_prefix`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrefixLookup {
    /// A visible (or queued) binding already maps the URI.
    Existing(String),
    /// Generated and bound on the open start tag at the given depth.
    DeclaredOnOpenTag(NamespaceBinding),
    /// Generated and queued for the next start tag.
    Queued(String),
}

/// Prefix↔URI bindings per nesting depth.
#[derive(Debug, Clone)]
pub struct NamespaceStack {
    bindings: Vec<NamespaceBinding>,
    pending: Vec<NamespaceBinding>,
    next_generated: usize,
}

impl Default for NamespaceStack {
    fn default() -> Self {
        Self::new()
    }
}

impl NamespaceStack {
    /// Creates a stack with the built-in bindings at depth 0.
    pub fn new() -> Self {
        Self {
            bindings: vec![
                NamespaceBinding::new("", "", 0, BindingOrigin::Builtin),
                NamespaceBinding::new("xml", XML_NS_URI, 0, BindingOrigin::Builtin),
                NamespaceBinding::new("xmlns", XMLNS_NS_URI, 0, BindingOrigin::Builtin),
            ],
            pending: Vec::new(),
            next_generated: 1,
        }
    }

    /// Queues an explicit binding for the next start tag.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidBinding`] for reserved prefixes, reserved URIs and
    /// attempts to unbind a non-empty prefix; [`Error::NamespaceConflict`] if
    /// the same prefix is already queued with a different URI.
    /// Conflicts with an inherited default namespace surface in [`push`](Self::push).
    pub fn bind(&mut self, prefix: &str, uri: &str) -> Result<()> {
        if prefix == "xml" || prefix == "xmlns" {
            return Err(Error::invalid_binding(prefix, uri, "prefix is reserved and permanently bound"));
        }
        if uri == XML_NS_URI || uri == XMLNS_NS_URI {
            return Err(Error::invalid_binding(prefix, uri, "namespace URI is reserved"));
        }
        if !prefix.is_empty() && uri.is_empty() {
            return Err(Error::invalid_binding(
                prefix,
                uri,
                "only the default namespace may be bound to the empty URI",
            ));
        }
        if prefix.contains(':') || prefix.contains(|c: char| c.is_ascii_whitespace()) {
            return Err(Error::invalid_binding(prefix, uri, "prefix is not an NCName"));
        }
        if let Some(queued) = self.pending.iter().find(|b| b.prefix == prefix) {
            if queued.uri == uri {
                return Ok(());
            }
            return Err(Error::namespace_conflict(prefix, &queued.uri, uri));
        }
        self.pending.push(NamespaceBinding::new(prefix, uri, 0, BindingOrigin::Explicit));
        Ok(())
    }

    /// Queued `set_prefix` bindings that still wait for their start tag.
    ///
    /// Prefixes generated by [`lookup_prefix`](Self::lookup_prefix) do not
    /// count: they are only a reservation and may be dropped.
    pub fn has_pending(&self) -> bool {
        self.pending.iter().any(|b| b.origin == BindingOrigin::Explicit)
    }

    /// Verwirft reservierte (generierte) Bindings, die kein Start-Tag mehr
    /// erreichen, z.B. weil ihr umgebendes Element geschlossen wird.
    pub fn discard_generated_pending(&mut self) {
        self.pending.retain(|b| b.origin != BindingOrigin::Generated);
    }

    /// Opens the scope for a new element: queued bindings take effect at `depth`.
    ///
    /// # Errors
    ///
    /// [`Error::NamespaceConflict`] if a queued default namespace differs from
    /// a non-empty default inherited from an enclosing element.
    pub fn push(&mut self, depth: usize) -> Result<()> {
        if let Some(requested) = self
            .pending
            .iter()
            .find(|b| b.prefix.is_empty() && !b.uri.is_empty())
        {
            if let Some(active) = self
                .uri_for_prefix("")
                .filter(|active| !active.is_empty() && *active != requested.uri)
            {
                return Err(Error::namespace_conflict("", active, &requested.uri));
            }
        }
        for mut binding in self.pending.drain(..) {
            binding.depth = depth;
            self.bindings.push(binding);
        }
        Ok(())
    }

    /// Drops every binding introduced at `depth` or deeper.
    pub fn pop(&mut self, depth: usize) {
        let keep = self
            .bindings
            .iter()
            .rposition(|b| b.depth < depth)
            .map_or(0, |i| i + 1);
        self.bindings.truncate(keep);
    }

    /// Bindings declared on the element at `depth`, explicit ones first in call
    /// order, then generated ones.
    pub fn declarations_at(&self, depth: usize) -> Vec<&NamespaceBinding> {
        let mut decls: Vec<&NamespaceBinding> = self
            .bindings
            .iter()
            .filter(|b| b.depth == depth && b.origin != BindingOrigin::Builtin)
            .collect();
        decls.sort_by_key(|b| b.origin);
        decls
    }

    /// URI currently bound to `prefix`, if any.
    pub fn uri_for_prefix(&self, prefix: &str) -> Option<&str> {
        self.bindings
            .iter()
            .rev()
            .find(|b| b.prefix == prefix)
            .map(|b| b.uri.as_str())
    }

    /// Nearest in-scope prefix bound to `uri` that is not shadowed by a deeper
    /// rebinding of the same prefix.
    pub fn lookup(&self, uri: &str, include_default: bool) -> Option<&str> {
        find_unshadowed(&self.bindings, uri, include_default)
    }

    fn lookup_pending(&self, uri: &str, include_default: bool) -> Option<&str> {
        find_unshadowed(&self.pending, uri, include_default)
    }

    /// Prueft ob ein Prefix in irgendeinem sichtbaren Scope (oder pending) vorkommt.
    fn is_visible(&self, prefix: &str) -> bool {
        self.bindings.iter().chain(&self.pending).any(|b| b.prefix == prefix)
    }

    /// Naechster freier `nsN` Prefix.
    fn generate_prefix(&mut self) -> String {
        loop {
            let candidate = format!("ns{}", self.next_generated);
            self.next_generated += 1;
            if !self.is_visible(&candidate) {
                return candidate;
            }
        }
    }

    /// Fuegt ein Binding auf `depth` hinzu; gleicher Prefix auf gleicher Tiefe
    /// mit anderer URI ist ein Konflikt.
    fn declare(&mut self, prefix: &str, uri: &str, depth: usize) -> Result<NamespaceBinding> {
        if let Some(existing) = self
            .bindings
            .iter()
            .find(|b| b.depth == depth && b.prefix == prefix && b.origin != BindingOrigin::Builtin)
        {
            return Err(Error::namespace_conflict(prefix, &existing.uri, uri));
        }
        let binding = NamespaceBinding::new(prefix, uri, depth, BindingOrigin::Generated);
        self.bindings.push(binding.clone());
        Ok(binding)
    }

    fn declare_generated(&mut self, uri: &str, depth: usize) -> Result<NamespaceBinding> {
        let prefix = self.generate_prefix();
        debug!("generated namespace prefix '{prefix}' for '{uri}' at depth {depth}");
        self.declare(&prefix, uri, depth)
    }

    /// Resolves the namespace of an element opened at `depth` (after [`push`](Self::push)).
    ///
    /// `None` leaves the name unqualified without touching bindings. `Some("")`
    /// places the element in no namespace, declaring `xmlns=""` if a non-empty
    /// default is inherited.
    pub fn resolve_element(&mut self, uri: Option<&str>, depth: usize) -> Result<Resolved> {
        let Some(uri) = uri else {
            return Ok(Resolved::default());
        };
        if uri == XMLNS_NS_URI {
            return Err(Error::invalid_argument("elements must not be in the xmlns namespace"));
        }
        if uri.is_empty() {
            if let Some(explicit) = self.bindings.iter().find(|b| {
                b.depth == depth && b.prefix.is_empty() && b.origin == BindingOrigin::Explicit
            }) {
                if !explicit.uri.is_empty() {
                    return Err(Error::namespace_conflict("", &explicit.uri, ""));
                }
            }
            if self.uri_for_prefix("").is_some_and(|d| !d.is_empty()) {
                let binding = self.declare("", "", depth)?;
                return Ok(Resolved { prefix: None, declared: Some(binding) });
            }
            return Ok(Resolved::default());
        }
        self.resolve_uri(uri, depth, true)
    }

    /// Resolves the namespace of an attribute on the element at `depth`.
    ///
    /// Unprefixed attributes are in no namespace, so `None` and `Some("")`
    /// both yield an unqualified name and the default namespace is never used.
    pub fn resolve_attribute(&mut self, uri: Option<&str>, depth: usize) -> Result<Resolved> {
        match uri {
            None | Some("") => Ok(Resolved::default()),
            Some(XMLNS_NS_URI) => Err(Error::invalid_argument(
                "namespace declarations must be made with set_prefix()",
            )),
            Some(uri) => self.resolve_uri(uri, depth, false),
        }
    }

    fn resolve_uri(&mut self, uri: &str, depth: usize, include_default: bool) -> Result<Resolved> {
        if let Some(prefix) = self.lookup(uri, include_default) {
            return Ok(Resolved {
                prefix: Some(prefix.to_owned()),
                declared: None,
            });
        }
        let binding = self.declare_generated(uri, depth)?;
        Ok(Resolved {
            prefix: Some(binding.prefix.clone()),
            declared: Some(binding),
        })
    }

    /// Prefix for `uri`, looking at in-scope and queued bindings.
    ///
    /// When nothing matches and `generate_if_absent` is set, a fresh prefix is
    /// bound on the open start tag (`open_depth`) or, without one, queued for
    /// the next start tag. The empty URI never gets a generated prefix.
    pub fn lookup_prefix(
        &mut self,
        uri: &str,
        generate_if_absent: bool,
        open_depth: Option<usize>,
    ) -> Result<Option<PrefixLookup>> {
        if let Some(prefix) = self
            .lookup_pending(uri, true)
            .or_else(|| self.lookup(uri, true))
        {
            return Ok(Some(PrefixLookup::Existing(prefix.to_owned())));
        }
        if !generate_if_absent || uri.is_empty() {
            return Ok(None);
        }
        match open_depth {
            Some(depth) => {
                let binding = self.declare_generated(uri, depth)?;
                Ok(Some(PrefixLookup::DeclaredOnOpenTag(binding)))
            }
            None => {
                let prefix = self.generate_prefix();
                debug!("queued generated namespace prefix '{prefix}' for '{uri}'");
                self.pending
                    .push(NamespaceBinding::new(&prefix, uri, 0, BindingOrigin::Generated));
                Ok(Some(PrefixLookup::Queued(prefix)))
            }
        }
    }
}

/// Rueckwaerts-Suche: erstes Binding fuer `uri`, dessen Prefix nicht von einem
/// spaeteren Binding ueberdeckt wird.
fn find_unshadowed<'a>(
    bindings: &'a [NamespaceBinding],
    uri: &str,
    include_default: bool,
) -> Option<&'a str> {
    bindings.iter().enumerate().rev().find_map(|(i, b)| {
        let usable = b.uri == uri && (include_default || !b.prefix.is_empty());
        let shadowed = bindings[i + 1..].iter().any(|later| later.prefix == b.prefix);
        (usable && !shadowed).then_some(b.prefix.as_str())
    })
}
