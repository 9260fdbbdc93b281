//! Integrationstests fuer Namespace-Aufloesung und Prefix-Verwaltung.

use xmlser::{Error, XmlSerializer, XMLNS_NS_URI, XML_NS_URI};

fn run(f: impl FnOnce(&mut XmlSerializer<'_>) -> xmlser::Result<()>) -> xmlser::Result<String> {
    let mut out = String::new();
    {
        let mut ser = XmlSerializer::new();
        ser.set_output_writer(&mut out)?;
        f(&mut ser)?;
        ser.end_document()?;
    }
    Ok(out)
}

/// Explizite Bindings in Aufrufreihenfolge vor generierten.
#[test]
fn declaration_order() {
    let out = run(|s| {
        s.set_prefix("b", "urn:b")?;
        s.set_prefix("a", "urn:a")?;
        s.start_tag(Some("urn:g"), "r")?
            .attribute(Some("urn:a"), "x", "1")?
            .attribute(Some("urn:b"), "y", "2")?;
        Ok(())
    })
    .unwrap();
    assert_eq!(
        out,
        r#"<ns1:r xmlns:b="urn:b" xmlns:a="urn:a" xmlns:ns1="urn:g" a:x="1" b:y="2"></ns1:r>"#
    );
}

/// Generierte Prefixe kollidieren nie mit sichtbaren Bindings.
#[test]
fn generated_prefix_skips_user_prefix() {
    let out = run(|s| {
        s.set_prefix("ns1", "urn:user")?;
        s.start_tag(Some("urn:user"), "r")?;
        s.start_tag(Some("urn:other"), "c")?;
        Ok(())
    })
    .unwrap();
    assert_eq!(
        out,
        r#"<ns1:r xmlns:ns1="urn:user"><ns2:c xmlns:ns2="urn:other"></ns2:c></ns1:r>"#
    );
}

/// Ein Binding gilt fuer Nachfahren und wird nicht erneut deklariert.
#[test]
fn inherited_binding_reused() {
    let out = run(|s| {
        s.start_tag(Some("urn:x"), "a")?
            .start_tag(Some("urn:x"), "b")?
            .attribute(Some("urn:x"), "c", "1")?;
        Ok(())
    })
    .unwrap();
    assert_eq!(
        out,
        r#"<ns1:a xmlns:ns1="urn:x"><ns1:b ns1:c="1"></ns1:b></ns1:a>"#
    );
}

/// Geschwister deklarieren den Namespace jeweils neu.
#[test]
fn sibling_scopes_are_independent() {
    let out = run(|s| {
        s.start_tag(None, "r")?
            .start_tag(Some("urn:x"), "a")?
            .end_tag(Some("urn:x"), "a")?
            .start_tag(Some("urn:x"), "b")?
            .end_tag(Some("urn:x"), "b")?;
        Ok(())
    })
    .unwrap();
    assert_eq!(
        out,
        r#"<r><ns1:a xmlns:ns1="urn:x"></ns1:a><ns2:b xmlns:ns2="urn:x"></ns2:b></r>"#
    );
}

/// Default-Namespace fuer Elemente, nie fuer Attribute.
#[test]
fn default_namespace_not_used_for_attributes() {
    let out = run(|s| {
        s.set_prefix("", "urn:d")?;
        s.start_tag(Some("urn:d"), "r")?.attribute(Some("urn:d"), "a", "1")?;
        Ok(())
    })
    .unwrap();
    assert_eq!(out, r#"<r xmlns="urn:d" xmlns:ns1="urn:d" ns1:a="1"></r>"#);
}

/// Element ohne Namespace unter geerbtem Default: `xmlns=""`.
#[test]
fn empty_namespace_undeclares_default() {
    let out = run(|s| {
        s.set_prefix("", "urn:d")?;
        s.start_tag(Some("urn:d"), "r")?.start_tag(Some(""), "plain")?;
        Ok(())
    })
    .unwrap();
    assert_eq!(out, r#"<r xmlns="urn:d"><plain xmlns=""></plain></r>"#);
}

/// `None` schreibt den Namen unqualifiziert, ohne `xmlns=""`.
#[test]
fn null_namespace_writes_raw_name() {
    let out = run(|s| {
        s.set_prefix("", "urn:d")?;
        s.start_tag(Some("urn:d"), "r")?.start_tag(None, "raw")?;
        Ok(())
    })
    .unwrap();
    assert_eq!(out, r#"<r xmlns="urn:d"><raw></raw></r>"#);
}

/// Ueberdeckter Prefix wird nicht fuer die alte URI verwendet.
#[test]
fn shadowed_prefix_not_reused() {
    let out = run(|s| {
        s.set_prefix("p", "urn:one")?;
        s.start_tag(Some("urn:one"), "a")?;
        s.set_prefix("p", "urn:two")?;
        s.start_tag(Some("urn:two"), "b")?;
        s.start_tag(Some("urn:one"), "c")?;
        Ok(())
    })
    .unwrap();
    assert_eq!(
        out,
        r#"<p:a xmlns:p="urn:one"><p:b xmlns:p="urn:two"><ns1:c xmlns:ns1="urn:one"></ns1:c></p:b></p:a>"#
    );
}

/// `xml:` Attribute brauchen keine Deklaration.
#[test]
fn xml_namespace_is_prebound() {
    let out = run(|s| {
        s.start_tag(None, "r")?.attribute(Some(XML_NS_URI), "lang", "de")?;
        Ok(())
    })
    .unwrap();
    assert_eq!(out, r#"<r xml:lang="de"></r>"#);
}

/// Reservierte Prefixe und URIs.
#[test]
fn reserved_bindings_rejected() {
    let mut out = String::new();
    let mut ser = XmlSerializer::new();
    ser.set_output_writer(&mut out).unwrap();
    for (prefix, uri) in [
        ("xml", "urn:x"),
        ("xmlns", "urn:x"),
        ("p", XML_NS_URI),
        ("p", XMLNS_NS_URI),
        ("p", ""),
    ] {
        let err = ser.set_prefix(prefix, uri).unwrap_err();
        assert!(matches!(err, Error::InvalidBinding { .. }), "{prefix} -> {uri}: {err}");
    }
}

/// Gleicher Prefix, zwei URIs vor demselben Start-Tag.
#[test]
fn conflicting_bindings_same_element() {
    let err = run(|s| {
        s.set_prefix("p", "urn:one")?;
        s.set_prefix("p", "urn:two")
    })
    .unwrap_err();
    assert!(matches!(err, Error::NamespaceConflict { ref prefix, .. } if prefix == "p"), "{err}");
}

/// Default-Namespace zweimal mit verschiedenen URIs ohne Schliessen.
#[test]
fn default_namespace_rebound_twice() {
    let err = run(|s| {
        s.set_prefix("", "urn:one")?;
        s.set_prefix("", "urn:two")
    })
    .unwrap_err();
    assert!(matches!(err, Error::NamespaceConflict { ref prefix, .. } if prefix.is_empty()), "{err}");
}

/// Kind-Element bindet den geerbten Default-Namespace auf eine andere URI.
#[test]
fn default_namespace_rebound_on_child() {
    let err = run(|s| {
        s.set_prefix("", "urn:one")?;
        s.start_tag(Some("urn:one"), "root")?;
        s.set_prefix("", "urn:two")?;
        s.start_tag(Some("urn:two"), "child").map(|_| ())
    })
    .unwrap_err();
    assert!(
        matches!(err, Error::NamespaceConflict { ref prefix, ref existing, ref requested }
            if prefix.is_empty() && existing == "urn:one" && requested == "urn:two"),
        "{err}"
    );
}

/// Gleiche URI erneut oder nach `xmlns=""` ist kein Konflikt.
#[test]
fn default_namespace_on_child_without_conflict() {
    let out = run(|s| {
        s.set_prefix("", "urn:one")?;
        s.start_tag(Some("urn:one"), "root")?;
        s.set_prefix("", "urn:one")?;
        s.start_tag(Some("urn:one"), "same")?;
        s.set_prefix("", "")?;
        s.start_tag(Some(""), "plain")?;
        s.set_prefix("", "urn:two")?;
        s.start_tag(Some("urn:two"), "other")?;
        Ok(())
    })
    .unwrap();
    assert_eq!(
        out,
        concat!(
            r#"<root xmlns="urn:one"><same xmlns="urn:one"><plain xmlns="">"#,
            r#"<other xmlns="urn:two"></other></plain></same></root>"#
        )
    );
}

/// Leerer Namespace waehrend explizitem Default auf demselben Element.
#[test]
fn empty_namespace_against_explicit_default() {
    let err = run(|s| {
        s.set_prefix("", "urn:d")?;
        s.start_tag(Some(""), "r").map(|_| ())
    })
    .unwrap_err();
    assert!(matches!(err, Error::NamespaceConflict { .. }), "{err}");
}

/// Prefix-Binding muss direkt vor `start_tag` stehen.
#[test]
fn pending_binding_must_precede_start_tag() {
    let err = run(|s| {
        s.start_tag(None, "r")?;
        s.set_prefix("p", "urn:p")?;
        s.comment("x")
    })
    .unwrap_err();
    assert!(matches!(err, Error::IllegalState { operation: "comment", .. }), "{err}");
}

/// `get_prefix` ohne offenen Start-Tag reserviert fuer den naechsten.
#[test]
fn get_prefix_queues_for_next_start_tag() {
    let out = run(|s| {
        s.start_tag(None, "r")?.text("t")?;
        let prefix = s.get_prefix("urn:q", true)?;
        assert_eq!(prefix.as_deref(), Some("ns1"));
        s.start_tag(Some("urn:q"), "c")?;
        Ok(())
    })
    .unwrap();
    assert_eq!(out, r#"<r>t<ns1:c xmlns:ns1="urn:q"></ns1:c></r>"#);
}

/// `get_prefix("")` erzeugt nie einen Prefix.
#[test]
fn get_prefix_for_empty_uri() {
    let out = run(|s| {
        s.start_tag(None, "r")?;
        assert_eq!(s.get_prefix("", true)?.as_deref(), Some(""));
        Ok(())
    })
    .unwrap();
    assert_eq!(out, "<r></r>");
}

/// Reservierter Prefix ohne folgenden Start-Tag blockiert `end_tag` nicht.
#[test]
fn unused_generated_prefix_dropped_with_element() {
    let out = run(|s| {
        s.start_tag(None, "r")?.text("t")?;
        assert_eq!(s.get_prefix("urn:x", true)?.as_deref(), Some("ns1"));
        s.comment("c")?;
        s.end_tag(None, "r")?;
        Ok(())
    })
    .unwrap();
    assert_eq!(out, "<r>t<!--c--></r>");
}

/// Nach dem Wurzelelement kann kein Prefix mehr erzeugt werden.
#[test]
fn get_prefix_generation_after_root() {
    let mut out = String::new();
    let mut ser = XmlSerializer::new();
    ser.set_output_writer(&mut out).unwrap();
    ser.start_tag(None, "r").unwrap().end_tag(None, "r").unwrap();
    let err = ser.get_prefix("urn:x", true).unwrap_err();
    assert!(matches!(err, Error::IllegalState { operation: "get_prefix", .. }), "{err}");
    assert_eq!(ser.get_prefix("urn:x", false).unwrap(), None);
    ser.end_document().unwrap();
    drop(ser);
    assert_eq!(out, "<r></r>");
}
