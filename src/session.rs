//! Per-exchange string session.
//!
//! Strings ausserhalb des gemeinsamen Dictionaries werden waehrend eines
//! Austauschs ueber eine Session indiziert. Der Writer vergibt Indizes
//! monoton ab 0; auf dem Draht erscheinen sie als `2*index + 1`. Neu
//! vergebene Strings werden dem Leser ueber eine Preamble vor dem Dokument
//! mitgeteilt:
//!
//! ```text
//! preamble := mb31(size) entry*
//! entry    := mb31(len) utf8-bytes
//! ```
//!
//! `size` ist die Byte-Laenge aller folgenden Eintraege.

use std::sync::Arc;

use crate::bytestream::{ByteReader, ByteWriter};
use crate::dictionary::{DictionaryId, DictionaryString};
use crate::unsigned_integer;
use crate::{Error, FastHashMap, Result};

/// Groesster Session-Index, dessen Wire-Wert `2*index + 1` noch in MB31 passt.
const MAX_INDEX: u32 = (unsigned_integer::MAX - 1) / 2;

/// Stand einer [`WriterSession`] vor einem Writer-Aufruf.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SessionCheckpoint {
    next_index: u32,
    pending: usize,
}

/// Writer-seitige Session.
#[derive(Debug, Default)]
pub struct WriterSession {
    /// Registrierte Instanzen (Identitaet) → Index.
    registered: FastHashMap<DictionaryString, u32>,
    /// Text → Index (Dedup ueber unabhaengige Tabellen hinweg).
    by_value: FastHashMap<Arc<str>, u32>,
    next_index: u32,
    /// Seit dem letzten `take_pending` neu vergebene Strings in Index-Reihenfolge.
    pending: Vec<Arc<str>>,
}

impl WriterSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registriert `ds` und liefert seinen Session-Index.
    ///
    /// Eine bereits registrierte Instanz wird abgelehnt. Eine andere Instanz
    /// mit bereits bekanntem Text erhaelt den vorhandenen Index.
    pub fn try_add(&mut self, ds: &DictionaryString) -> Result<u32> {
        if self.registered.contains_key(ds) {
            return Err(Error::DuplicateSessionEntry(ds.value().to_string()));
        }
        if let Some(&index) = self.by_value.get(ds.value()) {
            self.registered.insert(ds.clone(), index);
            return Ok(index);
        }
        let index = self.next_index;
        if index > MAX_INDEX {
            return Err(Error::out_of_range(format!("session index {index} exceeds wire range")));
        }
        self.next_index += 1;
        let value = ds.value_arc();
        self.registered.insert(ds.clone(), index);
        self.by_value.insert(Arc::clone(&value), index);
        log::debug!("session: '{value}' → {index}");
        self.pending.push(value);
        Ok(index)
    }

    /// Index einer bereits registrierten Instanz.
    pub fn lookup(&self, ds: &DictionaryString) -> Option<u32> {
        self.registered.get(ds).copied()
    }

    /// Index fuer einen Text, unabhaengig von der Instanz.
    pub fn lookup_value(&self, value: &str) -> Option<u32> {
        self.by_value.get(value).copied()
    }

    /// Liefert `ds`'s Index, registriert die Instanz bei Bedarf.
    pub(crate) fn get_or_add(&mut self, ds: &DictionaryString) -> Result<u32> {
        match self.lookup(ds) {
            Some(index) => Ok(index),
            None => self.try_add(ds),
        }
    }

    /// Entnimmt die seit dem letzten Aufruf neu vergebenen Strings.
    pub fn take_pending(&mut self) -> Vec<Arc<str>> {
        std::mem::take(&mut self.pending)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Anzahl vergebener Indizes.
    pub fn len(&self) -> usize {
        self.next_index as usize
    }

    pub fn is_empty(&self) -> bool {
        self.next_index == 0
    }

    pub(crate) fn save_checkpoint(&self) -> SessionCheckpoint {
        SessionCheckpoint { next_index: self.next_index, pending: self.pending.len() }
    }

    /// Nimmt alle seit `checkpoint` vergebenen Indizes zurueck.
    pub(crate) fn restore_checkpoint(&mut self, checkpoint: SessionCheckpoint) {
        if self.next_index == checkpoint.next_index {
            return;
        }
        self.registered.retain(|_, index| *index < checkpoint.next_index);
        self.by_value.retain(|_, index| *index < checkpoint.next_index);
        self.pending.truncate(checkpoint.pending);
        self.next_index = checkpoint.next_index;
    }

    /// Vergisst alle Zuordnungen (Grenze zwischen zwei Austauschen).
    pub fn reset(&mut self) {
        self.registered.clear();
        self.by_value.clear();
        self.pending.clear();
        self.next_index = 0;
    }
}

/// Kodiert eine Session-Preamble fuer `strings`.
pub fn encode_preamble(strings: &[Arc<str>]) -> Result<Vec<u8>> {
    let mut body = ByteWriter::new();
    for s in strings {
        unsigned_integer::encode_len(&mut body, s.len())?;
        body.write_bytes(s.as_bytes());
    }
    let mut out = ByteWriter::new();
    unsigned_integer::encode_len(&mut out, body.len())?;
    out.write_bytes(body.bytes());
    Ok(out.into_vec())
}

/// Reader-seitige Session: Index → String, in Writer-Reihenfolge befuellt.
#[derive(Debug)]
pub struct ReaderSession {
    id: DictionaryId,
    entries: FastHashMap<u32, DictionaryString>,
    next_index: u32,
}

impl ReaderSession {
    pub fn new() -> Self {
        Self {
            id: DictionaryId::new(),
            entries: FastHashMap::default(),
            next_index: 0,
        }
    }

    /// Traegt `value` unter `index` ein. Ein bereits belegter Index wird abgelehnt.
    pub fn add(&mut self, index: u32, value: &str) -> Result<()> {
        if index > MAX_INDEX {
            return Err(Error::out_of_range(format!("session index {index} exceeds wire range")));
        }
        if self.entries.contains_key(&index) {
            return Err(Error::DuplicateSessionEntry(value.to_string()));
        }
        self.entries
            .insert(index, DictionaryString::with_owner(value.into(), index, self.id.clone()));
        self.next_index = self.next_index.max(index + 1);
        Ok(())
    }

    /// Eintrag fuer `index`.
    pub fn lookup(&self, index: u32) -> Option<&DictionaryString> {
        self.entries.get(&index)
    }

    /// Liest eine Preamble und haengt ihre Strings an die naechsten freien
    /// Indizes an. Gibt die Anzahl verbrauchter Bytes zurueck; bei einem
    /// Fehler wird nichts eingetragen.
    pub fn read_preamble(&mut self, data: &[u8]) -> Result<usize> {
        let mut reader = ByteReader::new(data);
        let size = unsigned_integer::decode_len(&mut reader)?;
        let start = reader.position();
        let body = reader.read_bytes(size)?;
        let mut body_reader = ByteReader::new(body);
        let mut values = Vec::new();
        while !body_reader.is_at_end() {
            let len = unsigned_integer::decode_len(&mut body_reader)
                .map_err(|e| e.shifted(start))?;
            let at = start + body_reader.position();
            let bytes = body_reader
                .read_bytes(len)
                .map_err(|e| e.shifted(start))?;
            let value = std::str::from_utf8(bytes).map_err(|_| Error::InvalidText { offset: at })?;
            values.push(value);
        }
        // Erst pruefen, dann eintragen
        let first = self.next_index;
        for (i, value) in values.iter().enumerate() {
            let index = u32::try_from(i)
                .ok()
                .and_then(|i| first.checked_add(i))
                .filter(|&index| index <= MAX_INDEX)
                .ok_or_else(|| Error::out_of_range(format!("session index for '{value}' exceeds wire range")))?;
            if self.entries.contains_key(&index) {
                return Err(Error::DuplicateSessionEntry(value.to_string()));
            }
        }
        for value in &values {
            self.add(self.next_index, value)?;
        }
        log::debug!("session preamble: {} string(s), {} bytes", values.len(), reader.position());
        Ok(reader.position())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Vergisst alle Eintraege.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.next_index = 0;
    }
}

impl Default for ReaderSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StringDictionary;

    #[test]
    fn try_add_assigns_monotonic_indices() {
        let mut d = StringDictionary::new();
        let a = d.add("alpha");
        let b = d.add("beta");
        let mut s = WriterSession::new();
        assert_eq!(s.try_add(&a).unwrap(), 0);
        assert_eq!(s.try_add(&b).unwrap(), 1);
        assert_eq!(s.lookup(&a), Some(0));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn same_instance_twice_is_rejected() {
        let mut d = StringDictionary::new();
        let a = d.add("alpha");
        let mut s = WriterSession::new();
        s.try_add(&a).unwrap();
        let err = s.try_add(&a.clone()).unwrap_err();
        assert_eq!(err, Error::DuplicateSessionEntry("alpha".into()));
    }

    /// Gleicher Text aus unabhaengigen Tabellen teilt sich den Index.
    #[test]
    fn dedup_by_value_across_tables() {
        let mut d1 = StringDictionary::new();
        let mut d2 = StringDictionary::new();
        d2.add("padding");
        let x1 = d1.add("x");
        let x2 = d2.add("x");
        let mut s = WriterSession::new();
        assert_eq!(s.try_add(&x1).unwrap(), 0);
        assert_eq!(s.try_add(&x2).unwrap(), 0);
        assert_eq!(s.len(), 1);
        assert_eq!(s.take_pending().len(), 1);
    }

    #[test]
    fn get_or_add_reuses() {
        let mut d = StringDictionary::new();
        let a = d.add("a");
        let mut s = WriterSession::new();
        assert_eq!(s.get_or_add(&a).unwrap(), 0);
        assert_eq!(s.get_or_add(&a).unwrap(), 0);
    }

    #[test]
    fn take_pending_drains() {
        let mut d = StringDictionary::new();
        let mut s = WriterSession::new();
        s.try_add(&d.add("one")).unwrap();
        s.try_add(&d.add("two")).unwrap();
        assert!(s.has_pending());
        let p = s.take_pending();
        assert_eq!(p.iter().map(|v| &**v).collect::<Vec<_>>(), ["one", "two"]);
        assert!(!s.has_pending());
        assert_eq!(s.lookup_value("two"), Some(1));
    }

    #[test]
    fn reset_forgets_everything() {
        let mut d = StringDictionary::new();
        let a = d.add("a");
        let mut s = WriterSession::new();
        s.try_add(&a).unwrap();
        s.reset();
        assert!(s.is_empty());
        assert_eq!(s.try_add(&a).unwrap(), 0);
    }

    #[test]
    fn restore_checkpoint_forgets_new_indices() {
        let mut dict = StringDictionary::new();
        let a = dict.add("a");
        let b = dict.add("b");
        let mut s = WriterSession::new();
        s.try_add(&a).unwrap();
        let checkpoint = s.save_checkpoint();
        s.try_add(&b).unwrap();
        s.restore_checkpoint(checkpoint);

        assert_eq!(s.len(), 1);
        assert_eq!(s.lookup(&b), None);
        assert_eq!(s.lookup_value("b"), None);
        assert_eq!(s.take_pending(), [Arc::<str>::from("a")]);
        assert_eq!(s.try_add(&b).unwrap(), 1);
    }

    #[test]
    fn preamble_layout() {
        let bytes = encode_preamble(&["ab".into(), "c".into()]).unwrap();
        assert_eq!(bytes, [0x05, 0x02, b'a', b'b', 0x01, b'c']);
        assert_eq!(encode_preamble(&[]).unwrap(), [0x00]);
    }

    #[test]
    fn read_preamble_populates_in_order() {
        let data = [0x05, 0x02, b'a', b'b', 0x01, b'c', 0xFF];
        let mut r = ReaderSession::new();
        assert_eq!(r.read_preamble(&data).unwrap(), 6);
        assert_eq!(r.lookup(0).map(DictionaryString::value), Some("ab"));
        assert_eq!(r.lookup(1).map(DictionaryString::value), Some("c"));
        // Zweite Preamble haengt an
        r.read_preamble(&[0x02, 0x01, b'd']).unwrap();
        assert_eq!(r.lookup(2).map(DictionaryString::value), Some("d"));
    }

    #[test]
    fn read_preamble_truncated() {
        let mut r = ReaderSession::new();
        assert!(matches!(
            r.read_preamble(&[0x05, 0x02, b'a']),
            Err(Error::PrematureEndOfStream { .. })
        ));
        // Laenge eines Eintrags reicht ueber den Block hinaus
        assert!(matches!(
            r.read_preamble(&[0x02, 0x05, b'a']),
            Err(Error::PrematureEndOfStream { offset: 2 })
        ));
    }

    #[test]
    fn read_preamble_invalid_utf8() {
        let mut r = ReaderSession::new();
        assert_eq!(
            r.read_preamble(&[0x02, 0x01, 0xFF]),
            Err(Error::InvalidText { offset: 2 })
        );
    }

    /// Ein fehlerhafter Eintrag verwirft auch die gueltigen davor.
    #[test]
    fn read_preamble_failure_adds_nothing() {
        let mut r = ReaderSession::new();
        assert_eq!(
            r.read_preamble(&[0x05, 0x02, b'a', b'b', 0x01, 0xFF]),
            Err(Error::InvalidText { offset: 5 })
        );
        assert!(r.is_empty());

        r.add(MAX_INDEX, "last").unwrap();
        let err = r.read_preamble(&[0x04, 0x01, b'a', 0x01, b'b']).unwrap_err();
        assert!(matches!(err, Error::ValueOutOfRange(_)));
        assert_eq!(r.len(), 1);
    }

    #[test]
    fn reader_add_rejects_duplicate_index() {
        let mut r = ReaderSession::new();
        r.add(3, "x").unwrap();
        assert!(matches!(r.add(3, "y"), Err(Error::DuplicateSessionEntry(_))));
        assert_eq!(r.lookup(3).map(DictionaryString::value), Some("x"));
        assert!(r.lookup(0).is_none());
    }

    #[test]
    fn reader_clear() {
        let mut r = ReaderSession::new();
        r.add(0, "x").unwrap();
        r.clear();
        assert!(r.is_empty());
        r.add(0, "y").unwrap();
    }

    /// Preamble vom Writer wird vom Reader in gleicher Reihenfolge gelesen.
    #[test]
    fn writer_preamble_to_reader() {
        let mut d = StringDictionary::new();
        let mut w = WriterSession::new();
        for name in ["Envelope", "Header", "Body"] {
            w.try_add(&d.add(name)).unwrap();
        }
        let bytes = encode_preamble(&w.take_pending()).unwrap();
        let mut r = ReaderSession::new();
        r.read_preamble(&bytes).unwrap();
        for name in ["Envelope", "Header", "Body"] {
            let idx = w.lookup_value(name).unwrap();
            assert_eq!(r.lookup(idx).map(DictionaryString::value), Some(name));
        }
    }
}
