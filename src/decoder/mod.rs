//! Record reader.
//!
//! Liest einen Record-Stream zu einer Folge von [`XmlEvent`]s.
//!
//! # Beispiel
//!
//! ```
//! use nbfx::decoder::decode;
//! use nbfx::encoder::encode;
//! use nbfx::{QualifiedName, StringDictionary, XmlEvent};
//!
//! // Encode → Decode Round-Trip
//! let events_in = vec![
//!     XmlEvent::start(QualifiedName::local("root")),
//!     XmlEvent::text("hi"),
//!     XmlEvent::EndElement,
//! ];
//! let bytes = encode(&events_in, StringDictionary::empty()).unwrap();
//! let events_out = decode(&bytes, StringDictionary::empty()).unwrap();
//! assert_eq!(events_out, events_in);
//! ```
//!
//! Ein Record kann mehrere Events ergeben (Text mit implizitem EndElement,
//! Array-Records); diese werden gepuffert und einzeln geliefert. Nach einem
//! Fehler ist der Stream desynchronisiert und der Reader liefert nichts mehr.

mod array;
mod qname;
mod value;

use std::collections::VecDeque;

use crate::bytestream::ByteReader;
use crate::dictionary::{DictionaryString, StringDictionary};
use crate::error::{Error, ErrorKind, Result};
use crate::event::XmlEvent;
use crate::namespace::NamespaceScope;
use crate::options::ReaderQuotas;
use crate::record::RecordType;
use crate::session::ReaderSession;
use crate::string;

// ============================================================================
// Reader
// ============================================================================

/// Pull-style reader for the binary record format.
///
/// Gerade Dictionary-Indizes adressieren das uebergebene Dictionary
/// (`key / 2`), ungerade die Session (`index / 2`).
pub struct BinaryReader<'a> {
    input: ByteReader<'a>,
    dictionary: &'a StringDictionary,
    session: Option<&'a mut ReaderSession>,
    quotas: ReaderQuotas,
    /// Namespace-Bindungen auf Stand des Lesezeigers (nicht des aktuellen Events).
    scope: NamespaceScope,
    /// Gelesene, noch nicht gelieferte Events.
    pending: VecDeque<XmlEvent>,
    current: Option<XmlEvent>,
    /// Tiefe nach dem zuletzt gelieferten Event.
    depth: usize,
    /// Eingabeende erreicht oder Fehler aufgetreten.
    done: bool,
}

impl<'a> BinaryReader<'a> {
    /// Reader ohne Dictionary und ohne Session.
    pub fn new(data: &'a [u8]) -> Self {
        Self::with_dictionary(data, StringDictionary::empty())
    }

    /// Reader mit gemeinsamem Dictionary.
    pub fn with_dictionary(data: &'a [u8], dictionary: &'a StringDictionary) -> Self {
        Self {
            input: ByteReader::new(data),
            dictionary,
            session: None,
            quotas: ReaderQuotas::default(),
            scope: NamespaceScope::new(),
            pending: VecDeque::new(),
            current: None,
            depth: 0,
            done: false,
        }
    }

    /// Reader mit Dictionary und Session fuer ungerade Indizes.
    pub fn with_session(data: &'a [u8], dictionary: &'a StringDictionary, session: &'a mut ReaderSession) -> Self {
        let mut reader = Self::with_dictionary(data, dictionary);
        reader.session = Some(session);
        reader
    }

    pub fn with_quotas(mut self, quotas: ReaderQuotas) -> Self {
        self.quotas = quotas;
        self
    }

    pub fn quotas(&self) -> &ReaderQuotas {
        &self.quotas
    }

    /// Byte-Offset des Lesezeigers.
    pub fn position(&self) -> usize {
        self.input.position()
    }

    /// Anzahl offener Elemente nach dem aktuellen Event.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Das Event, auf dem der Reader steht.
    pub fn current(&self) -> Option<&XmlEvent> {
        self.current.as_ref()
    }

    /// Rueckt zum naechsten Event vor. `false` am Dokumentende.
    pub fn advance(&mut self) -> Result<bool> {
        match self.next_event() {
            Ok(event) => {
                self.current = event;
                Ok(self.current.is_some())
            }
            Err(e) => {
                self.current = None;
                Err(e)
            }
        }
    }

    /// Liefert das naechste Event (ohne `current` zu setzen).
    pub fn next_event(&mut self) -> Result<Option<XmlEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                match &event {
                    XmlEvent::StartElement(_) => self.depth += 1,
                    XmlEvent::EndElement => self.depth = self.depth.saturating_sub(1),
                    _ => {}
                }
                return Ok(Some(event));
            }
            if self.done {
                return Ok(None);
            }
            if let Err(e) = self.read_record() {
                self.done = true;
                self.pending.clear();
                if e.kind() == ErrorKind::QuotaExceeded {
                    log::warn!("reader quota rejected input: {e}");
                }
                return Err(e);
            }
        }
    }

    /// Liest genau einen Record und legt die resultierenden Events ab.
    fn read_record(&mut self) -> Result<()> {
        let offset = self.input.position();
        let Some(tag) = self.input.peek_u8() else {
            self.done = true;
            if self.scope.depth() > 0 {
                return Err(Error::UnclosedElements { depth: self.scope.depth(), offset });
            }
            return Ok(());
        };
        let record = RecordType::from_tag(tag).ok_or(Error::UnknownRecord { tag, offset })?;
        log::trace!("{offset:#06x}: {record}");
        match record {
            RecordType::EndElement => {
                self.input.read_u8()?;
                self.end_element(tag, offset)?;
            }
            RecordType::Comment => {
                self.input.read_u8()?;
                let text = string::decode_prefixed(&mut self.input, self.quotas.max_string_content_length)?;
                self.pending.push_back(XmlEvent::Comment(text));
            }
            RecordType::Array => self.read_array()?,
            RecordType::Text { .. } => {
                let (value, with_end_element) = self.read_value()?;
                self.pending.push_back(XmlEvent::Text(value));
                if with_end_element {
                    self.end_element(tag, offset)?;
                }
            }
            r if r.is_element() => {
                let start = self.read_element()?;
                self.pending.push_back(XmlEvent::StartElement(start));
            }
            _ => {
                return Err(Error::UnexpectedRecord { tag, offset, expected: "element content" });
            }
        }
        Ok(())
    }

    fn end_element(&mut self, tag: u8, offset: usize) -> Result<()> {
        if self.scope.depth() == 0 {
            return Err(Error::UnexpectedRecord { tag, offset, expected: "an open element" });
        }
        self.scope.close_element();
        if self.scope.depth() == 0 {
            log::debug!("document end at offset {}", self.input.position());
        }
        self.pending.push_back(XmlEvent::EndElement);
        Ok(())
    }

    /// Dictionary-String fuer einen Wire-Index.
    fn dictionary_string(&self, key: u32, offset: usize) -> Result<DictionaryString> {
        let found = if key % 2 == 0 {
            self.dictionary.lookup_key(key / 2)
        } else {
            self.session.as_deref().and_then(|s| s.lookup(key / 2))
        };
        found.cloned().ok_or(Error::UnknownDictionaryKey { key, offset })
    }
}

// ============================================================================
// Iterator API
// ============================================================================

/// Iterator ueber die Events eines Readers.
///
/// Nach dem ersten `Err` endet die Iteration.
pub struct DecodeIter<'a> {
    reader: BinaryReader<'a>,
}

impl<'a> IntoIterator for BinaryReader<'a> {
    type Item = Result<XmlEvent>;
    type IntoIter = DecodeIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        DecodeIter { reader: self }
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = Result<XmlEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.next_event().transpose()
    }
}

impl<'a> DecodeIter<'a> {
    /// Der zugrunde liegende Reader.
    pub fn reader(&self) -> &BinaryReader<'a> {
        &self.reader
    }
}

// ============================================================================
// High-Level API
// ============================================================================

/// Liest einen Record-Stream mit Standard-Quotas und ohne Session.
pub fn decode(data: &[u8], dictionary: &StringDictionary) -> Result<Vec<XmlEvent>> {
    BinaryReader::with_dictionary(data, dictionary).into_iter().collect()
}

/// Liest einen Record-Stream mit optionaler Session und expliziten Quotas.
pub fn decode_with(
    data: &[u8],
    dictionary: &StringDictionary,
    session: Option<&mut ReaderSession>,
    quotas: ReaderQuotas,
) -> Result<Vec<XmlEvent>> {
    let reader = match session {
        Some(session) => BinaryReader::with_session(data, dictionary, session),
        None => BinaryReader::with_dictionary(data, dictionary),
    };
    reader.with_quotas(quotas).into_iter().collect()
}

/// Liest `preamble ++ body`: die Preamble fuellt die Session, danach wird
/// der Rumpf gelesen.
pub fn decode_with_session(
    data: &[u8],
    dictionary: &StringDictionary,
    session: &mut ReaderSession,
) -> Result<Vec<XmlEvent>> {
    let consumed = session.read_preamble(data)?;
    let body = &data[consumed..];
    BinaryReader::with_session(body, dictionary, session)
        .into_iter()
        .collect::<Result<Vec<_>>>()
        .map_err(|e| e.shifted(consumed))
}

// ============================================================================
// Tests
// ============================================================================
