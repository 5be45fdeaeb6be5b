//! Events → textual XML.
//!
//! Typisierte Werte erscheinen in ihrer lexikalischen Form
//! ([`TypedValue`]'s `Display`). Fehlende Namespace-Deklarationen fuer
//! Element- und Attribut-Prefixe werden ergaenzt, damit die Ausgabe
//! wohlgeformt bleibt.
//!
//! - `events_to_xml()`: gibt XML als String zurueck.
//! - `events_to_xml_writer()`: streamt XML direkt in `impl Write`.
//! - `events_to_xml_iter_fallible()`: streamt aus einem Reader-Iterator.
//! - `events_to_pretty_xml*()`: wie oben, mit Einrueckung.

use std::io::Write;
use std::sync::Arc;

use crate::Result;
use crate::error::Error;
use crate::event::{ElementStart, NamespaceDeclaration, XmlEvent};
use crate::namespace::XML_NAMESPACE;
use crate::qname::QualifiedName;

/// Serialisiert Events als XML-String.
pub fn events_to_xml(events: &[XmlEvent]) -> Result<String> {
    let mut buf = Vec::new();
    events_to_xml_writer(events, &mut buf)?;
    String::from_utf8(buf).map_err(|_| Error::IoError("XML output is not valid UTF-8".into()))
}

/// Serialisiert Events als eingerueckten XML-String (2 Spaces).
pub fn events_to_pretty_xml(events: &[XmlEvent]) -> Result<String> {
    let mut buf = Vec::new();
    let mut ser = XmlStreamSerializer::pretty(&mut buf, 2);
    for event in events {
        ser.process(event)?;
    }
    ser.finish()?;
    String::from_utf8(buf).map_err(|_| Error::IoError("XML output is not valid UTF-8".into()))
}

/// Serialisiert Events direkt in einen Writer.
pub fn events_to_xml_writer(events: &[XmlEvent], writer: impl Write) -> Result<()> {
    let mut ser = XmlStreamSerializer::new(writer);
    for event in events {
        ser.process(event)?;
    }
    ser.finish()
}

/// Wie `events_to_xml_writer`, aber aus einem fallible Iterator (Decode-Fehler via `?`).
pub fn events_to_xml_iter_fallible(events: impl Iterator<Item = Result<XmlEvent>>, writer: impl Write) -> Result<()> {
    let mut ser = XmlStreamSerializer::new(writer);
    for event in events {
        ser.process(&event?)?;
    }
    ser.finish()
}

/// Wie `events_to_xml_iter_fallible`, eingerueckt.
pub fn events_to_pretty_xml_iter_fallible(
    events: impl Iterator<Item = Result<XmlEvent>>,
    writer: impl Write,
) -> Result<()> {
    let mut ser = XmlStreamSerializer::pretty(writer, 2);
    for event in events {
        ser.process(&event?)?;
    }
    ser.finish()
}

// ============================================================================
// Hilfsfunktionen
// ============================================================================

#[inline]
fn w(writer: &mut impl Write, s: &str) -> Result<()> {
    writer.write_all(s.as_bytes()).map_err(Error::from)
}

fn write_qname(writer: &mut impl Write, q: &QualifiedName) -> Result<()> {
    if !q.prefix.is_empty() {
        w(writer, &q.prefix)?;
        w(writer, ":")?;
    }
    w(writer, &q.local_name)
}

/// XML-Escaping mit memchr3: grosse Bloecke ohne Escape-Zeichen werden in
/// einem Stueck geschrieben.
fn write_escaped_memchr3(w: &mut impl Write, s: &str, needle: [u8; 3], replacement: [&[u8]; 3]) -> Result<()> {
    let bytes = s.as_bytes();
    let mut start = 0;
    while let Some(offset) = memchr::memchr3(needle[0], needle[1], needle[2], &bytes[start..]) {
        let pos = start + offset;
        w.write_all(&bytes[start..pos])?;
        let replaced = match bytes[pos] {
            b if b == needle[0] => replacement[0],
            b if b == needle[1] => replacement[1],
            _ => replacement[2],
        };
        w.write_all(replaced)?;
        start = pos + 1;
    }
    w.write_all(&bytes[start..])?;
    Ok(())
}

/// Text-Inhalt: & < > → &amp; &lt; &gt;
fn write_escaped_text(w: &mut impl Write, s: &str) -> Result<()> {
    write_escaped_memchr3(w, s, [b'&', b'<', b'>'], [b"&amp;", b"&lt;", b"&gt;"])
}

/// Attribut-Werte: & < " → &amp; &lt; &quot;
fn write_escaped_attr(w: &mut impl Write, s: &str) -> Result<()> {
    write_escaped_memchr3(w, s, [b'&', b'<', b'"'], [b"&amp;", b"&lt;", b"&quot;"])
}

fn write_comment(writer: &mut impl Write, text: &str) -> Result<()> {
    if text.contains("--") || text.ends_with('-') {
        return Err(Error::InvalidComment);
    }
    w(writer, "<!--")?;
    w(writer, text)?;
    w(writer, "-->")
}

// ============================================================================
// XmlStreamSerializer
// ============================================================================

/// Offenes Element mit seinen (ggf. ergaenzten) Deklarationen.
struct OpenElement {
    name: QualifiedName,
    namespaces: Vec<NamespaceDeclaration>,
    has_child: bool,
}

/// Streaming-Serializer, schreibt direkt in `W: Write`.
pub(crate) struct XmlStreamSerializer<W: Write> {
    writer: W,
    element_stack: Vec<OpenElement>,
    /// Start-Tag wird bis zum naechsten Event zurueckgehalten (`<a/>`).
    pending_start: Option<ElementStart>,
    indent: Option<usize>,
    last_was_text: bool,
}

impl<W: Write> XmlStreamSerializer<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            element_stack: Vec::new(),
            pending_start: None,
            indent: None,
            last_was_text: false,
        }
    }

    pub fn pretty(writer: W, indent: usize) -> Self {
        Self { indent: Some(indent), ..Self::new(writer) }
    }

    pub fn process(&mut self, event: &XmlEvent) -> Result<()> {
        match event {
            XmlEvent::StartElement(start) => {
                self.flush_pending_start(false)?;
                self.before_node()?;
                self.pending_start = Some(start.clone());
                self.last_was_text = false;
            }
            XmlEvent::EndElement => {
                if self.pending_start.is_some() {
                    self.flush_pending_start(true)?;
                } else {
                    let open = self
                        .element_stack
                        .pop()
                        .ok_or(Error::EmptyStack { operation: "EndElement" })?;
                    if open.has_child && !self.last_was_text {
                        self.write_indent(self.element_stack.len())?;
                    }
                    w(&mut self.writer, "</")?;
                    write_qname(&mut self.writer, &open.name)?;
                    w(&mut self.writer, ">")?;
                }
                self.last_was_text = false;
            }
            XmlEvent::Text(value) => {
                self.flush_pending_start(false)?;
                let text = value.to_string();
                write_escaped_text(&mut self.writer, &text)?;
                self.last_was_text = true;
            }
            XmlEvent::Comment(text) => {
                self.flush_pending_start(false)?;
                self.before_node()?;
                write_comment(&mut self.writer, text)?;
                self.last_was_text = false;
            }
        }
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.flush_pending_start(false)?;
        if self.indent.is_some() {
            w(&mut self.writer, "\n")?;
        }
        self.writer.flush()?;
        Ok(())
    }

    /// Einrueckung vor einem Kind-Knoten (nur im Pretty-Modus, nie nach Text).
    fn before_node(&mut self) -> Result<()> {
        let depth = self.element_stack.len();
        if let Some(parent) = self.element_stack.last_mut() {
            parent.has_child = true;
        }
        if depth > 0 && !self.last_was_text {
            self.write_indent(depth)?;
        }
        Ok(())
    }

    fn write_indent(&mut self, depth: usize) -> Result<()> {
        if let Some(indent) = self.indent {
            w(&mut self.writer, "\n")?;
            for _ in 0..depth * indent {
                w(&mut self.writer, " ")?;
            }
        }
        Ok(())
    }

    /// Schreibt den gepufferten Start-Tag und pusht das Element auf den Stack.
    fn flush_pending_start(&mut self, self_closing: bool) -> Result<()> {
        let Some(start) = self.pending_start.take() else {
            return Ok(());
        };
        let mut namespaces = start.namespaces.clone();
        self.synthesize_missing_ns(&start, &mut namespaces);

        w(&mut self.writer, "<")?;
        write_qname(&mut self.writer, &start.name)?;
        for attr in &start.attributes {
            w(&mut self.writer, " ")?;
            write_qname(&mut self.writer, &attr.name)?;
            w(&mut self.writer, "=\"")?;
            write_escaped_attr(&mut self.writer, &attr.value.to_string())?;
            w(&mut self.writer, "\"")?;
        }
        for ns in &namespaces {
            if ns.prefix.is_empty() {
                w(&mut self.writer, " xmlns=\"")?;
            } else {
                w(&mut self.writer, " xmlns:")?;
                w(&mut self.writer, &ns.prefix)?;
                w(&mut self.writer, "=\"")?;
            }
            write_escaped_attr(&mut self.writer, &ns.uri)?;
            w(&mut self.writer, "\"")?;
        }

        if self_closing {
            w(&mut self.writer, "/>")?;
        } else {
            w(&mut self.writer, ">")?;
            self.element_stack.push(OpenElement {
                name: start.name,
                namespaces,
                has_child: false,
            });
        }
        Ok(())
    }

    /// Aktuelle Bindung eines Prefix (juengste Deklaration zuerst).
    fn resolve(&self, prefix: &str, own: &[NamespaceDeclaration]) -> Option<Arc<str>> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE.into());
        }
        own.iter()
            .chain(self.element_stack.iter().rev().flat_map(|open| open.namespaces.iter()))
            .find(|ns| &*ns.prefix == prefix)
            .map(|ns| ns.uri.clone())
            .or_else(|| prefix.is_empty().then(|| Arc::from("")))
    }

    /// Ergaenzt Deklarationen fuer Prefixe, die nicht oder anders gebunden sind.
    fn synthesize_missing_ns(&self, start: &ElementStart, namespaces: &mut Vec<NamespaceDeclaration>) {
        let names = std::iter::once(&start.name).chain(
            start
                .attributes
                .iter()
                .map(|a| &a.name)
                .filter(|n| !n.prefix.is_empty()),
        );
        for name in names {
            if self.resolve(&name.prefix, namespaces).as_deref() != Some(&*name.namespace_uri) {
                namespaces.push(NamespaceDeclaration::new(name.prefix.clone(), name.namespace_uri.clone()));
            }
        }
    }
}
