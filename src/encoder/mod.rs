//! Record writer.
//!
//! [`BinaryWriter`] nimmt Push-Aufrufe (start_element, Attribute, Werte,
//! end_element) entgegen und schreibt den Record-Stream in eine
//! `std::io::Write` Senke. Intern wird in einem [`ByteWriter`] gepuffert;
//! jede Operation laeuft unter einem Checkpoint, so dass ein Fehler keine
//! angefangenen Records hinterlaesst.
//!
//! Zustandsautomat:
//!
//! ```text
//! BeforeDocument → Element ⇄ Attribute
//!                     ↓
//!                  Content → ... → AfterDocument → Closed
//! ```

mod array;
mod pending;
mod qname;
mod value;

use std::io::Write;
use std::sync::Arc;

use crate::bytestream::ByteWriter;
use crate::dictionary::{StringDictionary, XmlString};
use crate::event::XmlEvent;
use crate::namespace::{NamespaceScope, XMLNS_NAMESPACE};
use crate::options::WriterOptions;
use crate::record::{RecordType, WITH_END_ELEMENT};
use crate::session::{self, WriterSession};
use crate::typed_value::{TypedValue, is_xml_whitespace};
use crate::{Error, Result, string};

pub use array::ArrayElement;
use pending::{AttributeTarget, PendingAttribute};

/// Zustand des Writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    /// Noch kein Root-Element.
    BeforeDocument,
    /// Start-Record offen: Attribute und Namespace-Deklarationen erlaubt.
    Element,
    /// Innerhalb eines Attributs; Werte werden gepuffert.
    Attribute,
    /// Element-Inhalt.
    Content,
    /// Root-Element geschlossen.
    AfterDocument,
    Closed,
}

impl WriterState {
    fn name(self) -> &'static str {
        match self {
            Self::BeforeDocument => "BeforeDocument",
            Self::Element => "Element",
            Self::Attribute => "Attribute",
            Self::Content => "Content",
            Self::AfterDocument => "AfterDocument",
            Self::Closed => "Closed",
        }
    }
}

/// Push-style writer for the binary record format.
///
/// Dictionary-Strings des eigenen Dictionaries werden als `2*key`
/// adressiert, alle anderen (bei vorhandener Session) als `2*index + 1`.
/// Ohne Session werden fremde Dictionary-Strings als Text geschrieben.
pub struct BinaryWriter<'a, W: Write> {
    sink: W,
    buf: ByteWriter,
    dictionary: &'a StringDictionary,
    session: Option<&'a mut WriterSession>,
    options: WriterOptions,
    scope: NamespaceScope,
    state: WriterState,
    /// (Tag-Position, Ende) des zuletzt geschriebenen Content-Text-Records.
    last_text: Option<(usize, usize)>,
    attribute: Option<PendingAttribute>,
}

impl<'a, W: Write> BinaryWriter<'a, W> {
    /// Writer ohne Dictionary und ohne Session.
    pub fn new(sink: W) -> Self {
        Self::with_dictionary(sink, StringDictionary::empty())
    }

    /// Writer mit gemeinsamem Dictionary.
    pub fn with_dictionary(sink: W, dictionary: &'a StringDictionary) -> Self {
        Self {
            sink,
            buf: ByteWriter::new(),
            dictionary,
            session: None,
            options: WriterOptions::default(),
            scope: NamespaceScope::new(),
            state: WriterState::BeforeDocument,
            last_text: None,
            attribute: None,
        }
    }

    /// Writer mit Dictionary und Session fuer alle uebrigen Dictionary-Strings.
    pub fn with_session(sink: W, dictionary: &'a StringDictionary, session: &'a mut WriterSession) -> Self {
        let mut writer = Self::with_dictionary(sink, dictionary);
        writer.session = Some(session);
        writer
    }

    pub fn with_options(mut self, options: WriterOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &WriterOptions {
        &self.options
    }

    /// Anzahl offener Elemente.
    pub fn depth(&self) -> usize {
        self.scope.depth()
    }

    /// Aktuelle Namespace-Bindungen.
    pub fn scope(&self) -> &NamespaceScope {
        &self.scope
    }

    /// Ein im Scope gueltiger Prefix fuer `namespace`.
    pub fn lookup_prefix(&self, namespace: &str) -> Option<&str> {
        self.scope.reverse_lookup(namespace)
    }

    /// Fuehrt `op` unter einem Checkpoint aus. Bei einem Fehler werden
    /// Puffer, Namespace-Scope, Session und Zustand auf den Stand vor dem
    /// Aufruf zurueckgesetzt.
    fn guarded<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.state == WriterState::Closed {
            return Err(Error::ClosedWriter);
        }
        let checkpoint = self.buf.save_checkpoint();
        let scope = self.scope.save_checkpoint();
        let session = self.session.as_deref().map(WriterSession::save_checkpoint);
        let state = self.state;
        let last_text = self.last_text;
        match op(self) {
            Ok(value) => {
                self.buf.discard_checkpoint();
                self.drain_if_full()?;
                Ok(value)
            }
            Err(e) => {
                self.buf.restore_checkpoint(checkpoint);
                self.scope.restore_checkpoint(scope);
                if let (Some(session), Some(saved)) = (self.session.as_deref_mut(), session) {
                    session.restore_checkpoint(saved);
                }
                self.state = state;
                self.last_text = last_text;
                if state != WriterState::Attribute {
                    self.attribute = None;
                }
                Err(e)
            }
        }
    }

    /// Leert den Puffer in die Senke, sobald die Schwelle erreicht ist und
    /// kein Text-Record mehr auf ein folgendes EndElement wartet.
    fn drain_if_full(&mut self) -> Result<()> {
        if let Some((_, end)) = self.last_text
            && end != self.buf.len()
        {
            self.last_text = None;
        }
        if self.last_text.is_none() && self.buf.len() >= self.options.flush_threshold {
            self.buf.drain_to(&mut self.sink)?;
        }
        Ok(())
    }

    /// Schliesst einen offenen Start-Record (Namespace-Deklarationen folgen
    /// auf die Attribute).
    fn auto_complete(&mut self) -> Result<()> {
        if self.state == WriterState::Element {
            self.write_pending_namespaces()?;
            self.state = WriterState::Content;
        }
        Ok(())
    }

    // ========================================================================
    // Elemente
    // ========================================================================

    /// Oeffnet ein Element.
    ///
    /// - `namespace` fehlt: Namespace des Prefix (Standard `""`) muss im Scope sein
    /// - `prefix` fehlt: ein im Scope gueltiger Prefix fuer `namespace` wird
    ///   wiederverwendet, sonst der Default-Namespace gebunden
    /// - beides: das Paar wird deklariert, falls es nicht schon gilt
    pub fn start_element<'n>(
        &mut self,
        prefix: Option<&str>,
        local_name: impl Into<XmlString<'n>>,
        namespace: Option<XmlString<'_>>,
    ) -> Result<()> {
        let local_name = local_name.into();
        self.guarded(|w| {
            match w.state {
                WriterState::Attribute => return Err(Error::invalid_state("start_element", w.state.name())),
                WriterState::AfterDocument => {
                    return Err(Error::invalid_state("start_element (only one root element)", w.state.name()));
                }
                _ => {}
            }
            check_local_name(local_name.as_str())?;
            w.auto_complete()?;
            let prefix = w.scope.open_element(prefix, namespace)?;
            if let Err(e) = w.write_element_record(&prefix, local_name) {
                w.scope.close_element();
                return Err(e);
            }
            if w.scope.depth() == 1 {
                log::debug!("document start: <{}>", local_name);
            }
            w.state = WriterState::Element;
            Ok(())
        })
    }

    /// Schliesst das innerste Element.
    ///
    /// Folgt das EndElement direkt auf einen Text-Record, wird es bei
    /// aktivierter Option in dessen Tag kodiert (`tag | 1`).
    pub fn end_element(&mut self) -> Result<()> {
        self.guarded(|w| {
            if w.scope.depth() == 0 {
                return Err(Error::EmptyStack { operation: "end_element" });
            }
            if w.state == WriterState::Attribute {
                w.finish_attribute()?;
            }
            if w.state == WriterState::Element {
                w.write_pending_namespaces()?;
                w.buf.write_u8(RecordType::EndElement.tag());
            } else {
                match w.last_text.take() {
                    Some((tag_pos, end)) if w.options.combine_text_end_element && end == w.buf.len() => {
                        w.buf.or_byte_at(tag_pos, WITH_END_ELEMENT);
                    }
                    _ => w.buf.write_u8(RecordType::EndElement.tag()),
                }
            }
            w.last_text = None;
            w.scope.close_element();
            w.state = if w.scope.depth() == 0 {
                log::debug!("document end");
                WriterState::AfterDocument
            } else {
                WriterState::Content
            };
            Ok(())
        })
    }

    // ========================================================================
    // Attribute
    // ========================================================================

    /// Oeffnet ein Attribut am aktuellen Start-Record.
    ///
    /// Ein noch offenes Attribut wird implizit beendet. `xmlns` und
    /// `xmlns:*` Attribute werden als Namespace-Deklaration behandelt.
    pub fn start_attribute<'n>(
        &mut self,
        prefix: Option<&str>,
        local_name: impl Into<XmlString<'n>>,
        namespace: Option<XmlString<'_>>,
    ) -> Result<()> {
        let local_name = local_name.into();
        self.guarded(|w| {
            if w.state == WriterState::Attribute {
                w.finish_attribute()?;
            }
            if w.state != WriterState::Element {
                return Err(Error::invalid_state("start_attribute", w.state.name()));
            }
            check_local_name(local_name.as_str())?;
            if let Some(declared_prefix) =
                xmlns_target(prefix, local_name.as_str(), namespace.map(|ns| ns.as_str()))?
            {
                w.attribute = Some(PendingAttribute::new(AttributeTarget::Xmlns { prefix: declared_prefix }));
                w.state = WriterState::Attribute;
                return Ok(());
            }
            let prefix = w.scope.open_attribute(prefix, namespace)?;
            w.write_attribute_record(&prefix, local_name)?;
            w.attribute = Some(PendingAttribute::new(AttributeTarget::Regular));
            w.state = WriterState::Attribute;
            Ok(())
        })
    }

    /// Beendet das offene Attribut und schreibt seinen Wert als einen Text-Record.
    pub fn end_attribute(&mut self) -> Result<()> {
        self.guarded(|w| {
            if w.state != WriterState::Attribute {
                return Err(Error::EmptyStack { operation: "end_attribute" });
            }
            w.finish_attribute()
        })
    }

    /// Attribut mit einem Wert in einem Schritt.
    pub fn write_attribute<'n>(
        &mut self,
        prefix: Option<&str>,
        local_name: impl Into<XmlString<'n>>,
        namespace: Option<XmlString<'_>>,
        value: &TypedValue,
    ) -> Result<()> {
        let local_name = local_name.into();
        self.guarded(|w| {
            w.start_attribute(prefix, local_name, namespace)?;
            w.write_value(value)?;
            w.end_attribute()
        })
    }

    /// Attribut mit Text-Wert.
    pub fn write_attribute_string<'n>(
        &mut self,
        prefix: Option<&str>,
        local_name: impl Into<XmlString<'n>>,
        namespace: Option<XmlString<'_>>,
        value: &str,
    ) -> Result<()> {
        self.write_attribute(prefix, local_name, namespace, &TypedValue::Text(value.into()))
    }

    /// Deklariert einen Namespace am aktuellen Start-Record.
    ///
    /// Ohne Prefix wird ein vorhandener Prefix fuer `namespace` akzeptiert
    /// oder ein neuer vergeben. Bereits geltende Bindungen erzeugen keinen Record.
    pub fn write_xmlns_attribute(&mut self, prefix: Option<&str>, namespace: XmlString<'_>) -> Result<()> {
        self.guarded(|w| {
            if w.state == WriterState::Attribute {
                w.finish_attribute()?;
            }
            if w.state != WriterState::Element {
                return Err(Error::invalid_state("write_xmlns_attribute", w.state.name()));
            }
            match prefix {
                Some(prefix) => {
                    w.scope.declare_if_not_declared(prefix, namespace)?;
                }
                None => {
                    if w.scope.reverse_lookup(namespace.as_str()).is_none() {
                        w.scope.generate_prefix(namespace)?;
                    }
                }
            }
            Ok(())
        })
    }

    fn finish_attribute(&mut self) -> Result<()> {
        let Some(pending) = self.attribute.take() else {
            return Err(Error::EmptyStack { operation: "end_attribute" });
        };
        let result = match &pending.target {
            AttributeTarget::Regular => {
                let value = pending.merged_value();
                self.write_text_record(&value).map(|_| ())
            }
            AttributeTarget::Xmlns { prefix } => match pending.values.as_slice() {
                [TypedValue::Dictionary(ds)] => self.scope.declare_if_not_declared(prefix, XmlString::Dictionary(ds)),
                _ => {
                    let uri = pending.merged_value().to_string();
                    self.scope.declare_if_not_declared(prefix, XmlString::Text(&uri))
                }
            }
            .map(|_| ()),
        };
        match result {
            Ok(()) => {
                self.state = WriterState::Element;
                Ok(())
            }
            Err(e) => {
                self.attribute = Some(pending);
                Err(e)
            }
        }
    }

    // ========================================================================
    // Content
    // ========================================================================

    /// Schreibt einen typisierten Wert (im Attribut: haengt ihn an den Attributwert an).
    pub fn write_value(&mut self, value: &TypedValue) -> Result<()> {
        self.guarded(|w| w.write_value_inner(value))
    }

    fn write_value_inner(&mut self, value: &TypedValue) -> Result<()> {
        match self.state {
            WriterState::Attribute => {
                if let Some(pending) = self.attribute.as_mut() {
                    pending.values.push(value.clone());
                }
                return Ok(());
            }
            WriterState::BeforeDocument | WriterState::AfterDocument if !value.is_whitespace() => {
                return Err(Error::invalid_state("write_value (non-whitespace outside root)", self.state.name()));
            }
            _ => {}
        }
        self.auto_complete()?;
        let tag_pos = self.write_text_record(value)?;
        self.last_text = Some((tag_pos, self.buf.len()));
        Ok(())
    }

    /// Text-Content.
    pub fn write_text(&mut self, text: &str) -> Result<()> {
        self.write_value(&TypedValue::Text(text.into()))
    }

    /// Text-Content, der auch ein Dictionary-String sein kann.
    pub fn write_string(&mut self, text: XmlString<'_>) -> Result<()> {
        match text {
            XmlString::Text(s) => self.write_text(s),
            XmlString::Dictionary(ds) => self.write_value(&TypedValue::Dictionary(ds.clone())),
        }
    }

    /// CDATA hat keine eigene Record-Art und wird als Text geschrieben.
    pub fn write_cdata(&mut self, text: &str) -> Result<()> {
        self.write_text(text)
    }

    /// Rohtext wird ohne Escaping als Text geschrieben.
    pub fn write_raw(&mut self, text: &str) -> Result<()> {
        self.write_text(text)
    }

    /// Whitespace; andere Zeichen werden abgelehnt.
    pub fn write_whitespace(&mut self, text: &str) -> Result<()> {
        if !is_xml_whitespace(text) {
            return Err(Error::out_of_range(format!("'{}' is not whitespace", text.escape_debug())));
        }
        self.write_text(text)
    }

    /// Qualifizierter Name als Wert; der Prefix kommt aus dem Scope.
    ///
    /// Innerhalb eines Attributs wird fuer einen unbekannten Namespace ein
    /// Prefix vergeben, sonst ist das ein Fehler.
    pub fn write_qualified_name<'n>(
        &mut self,
        local_name: impl Into<XmlString<'n>>,
        namespace: XmlString<'_>,
    ) -> Result<()> {
        let local_name = local_name.into();
        self.guarded(|w| {
            let prefix: Arc<str> = match w.scope.reverse_lookup(namespace.as_str()) {
                Some(prefix) => prefix.into(),
                None if w.state == WriterState::Attribute => w.scope.generate_prefix(namespace)?,
                None => {
                    return Err(Error::invalid_name(format!(
                        "namespace '{namespace}' has no prefix in scope"
                    )));
                }
            };
            let value = match local_name {
                XmlString::Dictionary(ds) => TypedValue::QName { prefix, local_name: ds.clone() },
                XmlString::Text(local) if prefix.is_empty() => TypedValue::Text(local.into()),
                XmlString::Text(local) => TypedValue::Text(format!("{prefix}:{local}").into()),
            };
            w.write_value_inner(&value)
        })
    }

    /// Kommentar; `--` und ein abschliessendes `-` sind verboten.
    pub fn write_comment(&mut self, text: &str) -> Result<()> {
        self.guarded(|w| {
            if w.state == WriterState::Attribute {
                return Err(Error::invalid_state("write_comment", w.state.name()));
            }
            if text.contains("--") || text.ends_with('-') {
                return Err(Error::InvalidComment);
            }
            w.auto_complete()?;
            w.buf.write_u8(RecordType::Comment.tag());
            string::encode_prefixed(&mut w.buf, text)
        })
    }

    /// Schreibt ein Infoset-Event.
    pub fn write_event(&mut self, event: &XmlEvent) -> Result<()> {
        match event {
            XmlEvent::StartElement(start) => {
                let name = &start.name;
                self.start_element(
                    Some(&*name.prefix),
                    &*name.local_name,
                    Some(XmlString::Text(&*name.namespace_uri)),
                )?;
                for ns in &start.namespaces {
                    self.write_xmlns_attribute(Some(&*ns.prefix), XmlString::Text(&*ns.uri))?;
                }
                for attr in &start.attributes {
                    let prefix = (!attr.name.prefix.is_empty()).then_some(&*attr.name.prefix);
                    let namespace =
                        (!attr.name.namespace_uri.is_empty()).then_some(XmlString::Text(&*attr.name.namespace_uri));
                    self.write_attribute(prefix, &*attr.name.local_name, namespace, &attr.value)?;
                }
                Ok(())
            }
            XmlEvent::EndElement => self.end_element(),
            XmlEvent::Text(value) => self.write_value(value),
            XmlEvent::Comment(text) => self.write_comment(text),
        }
    }

    // ========================================================================
    // Lebenszyklus
    // ========================================================================

    /// Schreibt alle gepufferten Bytes in die Senke.
    ///
    /// Ein danach folgendes `end_element` wird als eigener Record geschrieben.
    pub fn flush(&mut self) -> Result<()> {
        if self.state == WriterState::Closed {
            return Err(Error::ClosedWriter);
        }
        self.last_text = None;
        self.buf.drain_to(&mut self.sink)?;
        self.sink.flush()?;
        Ok(())
    }

    /// Schliesst alle offenen Elemente und leert den Puffer. Mehrfacher
    /// Aufruf ist erlaubt.
    pub fn close(&mut self) -> Result<()> {
        if self.state == WriterState::Closed {
            return Ok(());
        }
        while self.scope.depth() > 0 {
            self.end_element()?;
        }
        self.buf.drain_to(&mut self.sink)?;
        self.sink.flush()?;
        self.state = WriterState::Closed;
        Ok(())
    }

    /// Schliesst den Writer und gibt die Senke zurueck.
    pub fn finish(mut self) -> Result<W> {
        self.close()?;
        Ok(self.sink)
    }
}

/// Lokale Namen duerfen nicht leer sein.
fn check_local_name(local_name: &str) -> Result<()> {
    if local_name.is_empty() {
        return Err(Error::invalid_name("local name must not be empty"));
    }
    Ok(())
}

/// Erkennt `xmlns` / `xmlns:p` Attribute und liefert den deklarierten Prefix.
fn xmlns_target(prefix: Option<&str>, local_name: &str, namespace: Option<&str>) -> Result<Option<Arc<str>>> {
    let declares = match prefix {
        Some("xmlns") => true,
        Some("") | None => local_name == "xmlns" || namespace == Some(XMLNS_NAMESPACE),
        Some(_) => false,
    };
    if !declares {
        if namespace == Some(XMLNS_NAMESPACE) {
            return Err(Error::invalid_name(format!(
                "prefix '{}' cannot be bound to '{XMLNS_NAMESPACE}'",
                prefix.unwrap_or_default()
            )));
        }
        return Ok(None);
    }
    if let Some(namespace) = namespace
        && namespace != XMLNS_NAMESPACE
    {
        return Err(Error::invalid_name(format!("xmlns attribute cannot be in namespace '{namespace}'")));
    }
    let declared = if prefix != Some("xmlns") && local_name == "xmlns" { "" } else { local_name };
    Ok(Some(declared.into()))
}

// ============================================================================
// High-Level API
// ============================================================================

/// Schreibt eine Event-Folge mit Standard-Optionen.
pub fn encode(events: &[XmlEvent], dictionary: &StringDictionary) -> Result<Vec<u8>> {
    encode_with_options(events, dictionary, WriterOptions::default())
}

/// Schreibt eine Event-Folge mit expliziten Optionen.
pub fn encode_with_options(
    events: &[XmlEvent],
    dictionary: &StringDictionary,
    options: WriterOptions,
) -> Result<Vec<u8>> {
    let mut writer = BinaryWriter::with_dictionary(Vec::new(), dictionary).with_options(options);
    for event in events {
        writer.write_event(event)?;
    }
    writer.finish()
}

/// Schreibt eine Event-Folge mit Session und stellt die Preamble der in
/// diesem Dokument neu vergebenen Session-Strings voran.
pub fn encode_with_session(
    events: &[XmlEvent],
    dictionary: &StringDictionary,
    session: &mut WriterSession,
) -> Result<Vec<u8>> {
    let body = {
        let mut writer = BinaryWriter::with_session(Vec::new(), dictionary, session);
        for event in events {
            writer.write_event(event)?;
        }
        writer.finish()?
    };
    let mut out = session::encode_preamble(&session.take_pending())?;
    out.extend_from_slice(&body);
    Ok(out)
}
