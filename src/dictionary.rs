//! Shared string table ("dictionary").
//!
//! Ein Dictionary vergibt Keys in strikter Einfuege-Reihenfolge ab 0.
//! Erneutes Hinzufuegen eines vorhandenen Werts liefert den bestehenden Key
//! (Interning). Jede Tabelle hat eine eigene Identitaet; ob ein
//! [`DictionaryString`] zu einer Tabelle gehoert, wird ausschliesslich ueber
//! diese Identitaet entschieden, nie ueber den Text.

use core::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock};

use crate::FastIndexMap;

/// Identitaet einer [`StringDictionary`].
///
/// Zwei Ids sind gleich, wenn sie von derselben Tabelle stammen.
#[derive(Clone)]
pub struct DictionaryId(Arc<()>);

impl DictionaryId {
    pub(crate) fn new() -> Self {
        Self(Arc::new(()))
    }
}

impl PartialEq for DictionaryId {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for DictionaryId {}

impl Hash for DictionaryId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Debug for DictionaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DictionaryId({:p})", Arc::as_ptr(&self.0))
    }
}

/// Ein Eintrag einer [`StringDictionary`]: Text, Key und Eigentuemer-Tabelle.
///
/// Klone sind dieselbe logische Instanz. Gleichheit ist Identitaet
/// (Tabelle + Key); zwei Tabellen mit gleichem Text liefern ungleiche Eintraege.
#[derive(Clone)]
pub struct DictionaryString {
    value: Arc<str>,
    key: u32,
    owner: DictionaryId,
}

impl DictionaryString {
    /// Eintrag einer Tabelle, die nicht als [`StringDictionary`] gefuehrt wird
    /// (Reader-Session).
    pub(crate) fn with_owner(value: Arc<str>, key: u32, owner: DictionaryId) -> Self {
        Self { value, key, owner }
    }

    /// Der Text des Eintrags.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Geteilter Text (Refcount-Increment statt Kopie).
    pub fn value_arc(&self) -> Arc<str> {
        Arc::clone(&self.value)
    }

    /// Key in der Eigentuemer-Tabelle.
    pub fn key(&self) -> u32 {
        self.key
    }

    /// Identitaet der Eigentuemer-Tabelle.
    pub fn owner(&self) -> &DictionaryId {
        &self.owner
    }

    /// Gehoert dieser Eintrag zu `dictionary`?
    pub fn is_owned_by(&self, dictionary: &StringDictionary) -> bool {
        self.owner == dictionary.id
    }
}

impl PartialEq for DictionaryString {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.owner == other.owner
    }
}

impl Eq for DictionaryString {}

impl Hash for DictionaryString {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.owner.hash(state);
        self.key.hash(state);
    }
}

impl fmt::Debug for DictionaryString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DictionaryString")
            .field("value", &&*self.value)
            .field("key", &self.key)
            .finish()
    }
}

impl fmt::Display for DictionaryString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

static EMPTY: LazyLock<StringDictionary> = LazyLock::new(StringDictionary::new);

/// Insertion-ordered, append-only string table.
///
/// Wird typischerweise einmal aufgebaut und danach per Referenz an beliebig
/// viele Writer/Reader (auch ueber Threads) verteilt.
pub struct StringDictionary {
    id: DictionaryId,
    entries: FastIndexMap<Arc<str>, DictionaryString>,
}

impl StringDictionary {
    /// Erstellt eine leere Tabelle mit eigener Identitaet.
    pub fn new() -> Self {
        Self {
            id: DictionaryId::new(),
            entries: FastIndexMap::default(),
        }
    }

    /// Erstellt eine Tabelle mit initialen Werten in der gegebenen Reihenfolge.
    pub fn with_entries<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut dictionary = Self::new();
        for value in values {
            dictionary.add(value.as_ref());
        }
        dictionary
    }

    /// Die geteilte leere Tabelle (keine Eintraege).
    pub fn empty() -> &'static StringDictionary {
        &EMPTY
    }

    /// Identitaet dieser Tabelle.
    pub fn id(&self) -> &DictionaryId {
        &self.id
    }

    /// Add value → entry (idempotent).
    pub fn add(&mut self, value: &str) -> DictionaryString {
        if let Some(existing) = self.entries.get(value) {
            return existing.clone();
        }
        let key = self.entries.len() as u32;
        let value: Arc<str> = value.into();
        let entry = DictionaryString {
            value: Arc::clone(&value),
            key,
            owner: self.id.clone(),
        };
        self.entries.insert(value, entry.clone());
        entry
    }

    /// Lookup Text → Eintrag.
    pub fn lookup(&self, value: &str) -> Option<&DictionaryString> {
        self.entries.get(value)
    }

    /// Lookup Key → Eintrag.
    pub fn lookup_key(&self, key: u32) -> Option<&DictionaryString> {
        self.entries.get_index(key as usize).map(|(_, entry)| entry)
    }

    /// Anzahl Eintraege.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Eintraege in Key-Reihenfolge.
    pub fn iter(&self) -> impl Iterator<Item = &DictionaryString> {
        self.entries.values()
    }
}

impl Default for StringDictionary {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StringDictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StringDictionary")
            .field("id", &self.id)
            .field("len", &self.entries.len())
            .finish()
    }
}

/// Ein Name oder Namespace: entweder freier Text oder ein Dictionary-Eintrag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlString<'a> {
    Text(&'a str),
    Dictionary(&'a DictionaryString),
}

impl<'a> XmlString<'a> {
    /// Der Text, unabhaengig von der Darstellung.
    pub fn as_str(&self) -> &'a str {
        match *self {
            Self::Text(s) => s,
            Self::Dictionary(ds) => ds.value(),
        }
    }

    /// Der Dictionary-Eintrag, falls vorhanden.
    pub fn dictionary(&self) -> Option<&'a DictionaryString> {
        match *self {
            Self::Text(_) => None,
            Self::Dictionary(ds) => Some(ds),
        }
    }
}

impl<'a> From<&'a str> for XmlString<'a> {
    fn from(s: &'a str) -> Self {
        Self::Text(s)
    }
}

impl<'a> From<&'a String> for XmlString<'a> {
    fn from(s: &'a String) -> Self {
        Self::Text(s.as_str())
    }
}

impl<'a> From<&'a DictionaryString> for XmlString<'a> {
    fn from(ds: &'a DictionaryString) -> Self {
        Self::Dictionary(ds)
    }
}

impl fmt::Display for XmlString<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `add` ist idempotent und vergibt Keys in Einfuege-Reihenfolge.
    #[test]
    fn add_is_idempotent() {
        let mut d = StringDictionary::new();
        let a = d.add("Envelope");
        let b = d.add("Body");
        let a2 = d.add("Envelope");
        assert_eq!(a.key(), 0);
        assert_eq!(b.key(), 1);
        assert_eq!(a, a2);
        assert_eq!(d.len(), 2);
    }

    #[test]
    fn lookup_by_value_and_key() {
        let d = StringDictionary::with_entries(["a", "b", "c"]);
        assert_eq!(d.lookup("b").map(DictionaryString::key), Some(1));
        assert_eq!(d.lookup_key(2).map(DictionaryString::value), Some("c"));
        assert!(d.lookup("zz").is_none());
        assert!(d.lookup_key(3).is_none());
        let keys: Vec<u32> = d.iter().map(DictionaryString::key).collect();
        assert_eq!(keys, [0, 1, 2]);
    }

    /// Gleicher Text in zwei Tabellen ergibt verschiedene Instanzen.
    #[test]
    fn identity_not_value_equality() {
        let mut d1 = StringDictionary::new();
        let mut d2 = StringDictionary::new();
        let x1 = d1.add("x");
        let x2 = d2.add("x");
        assert_eq!(x1.value(), x2.value());
        assert_eq!(x1.key(), x2.key());
        assert_ne!(x1, x2);
        assert!(x1.is_owned_by(&d1));
        assert!(!x1.is_owned_by(&d2));
    }

    #[test]
    fn clones_share_identity() {
        let mut d = StringDictionary::new();
        let x = d.add("x");
        let y = x.clone();
        assert_eq!(x, y);
        assert_eq!(x.owner(), y.owner());
    }

    #[test]
    fn empty_sentinel() {
        let e = StringDictionary::empty();
        assert!(e.is_empty());
        assert!(e.lookup("anything").is_none());
        assert_eq!(e.id(), StringDictionary::empty().id());
        assert_ne!(e.id(), StringDictionary::new().id());
    }

    #[test]
    fn dictionary_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<StringDictionary>();
        assert_send_sync::<DictionaryString>();
    }

    /// Scenario: 260 Eintraege, Keys 0..259 in Reihenfolge.
    #[test]
    fn many_entries_keep_order() {
        let mut d = StringDictionary::new();
        for i in 0..260 {
            assert_eq!(d.add(&format!("s{i}")).key(), i);
        }
        assert_eq!(d.lookup_key(128).map(DictionaryString::value), Some("s128"));
    }

    #[test]
    fn xml_string_conversions() {
        let mut d = StringDictionary::new();
        let ds = d.add("Body");
        let owned = String::from("Header");
        assert_eq!(XmlString::from("x").as_str(), "x");
        assert_eq!(XmlString::from(&owned).as_str(), "Header");
        let xs = XmlString::from(&ds);
        assert_eq!(xs.as_str(), "Body");
        assert_eq!(xs.dictionary(), Some(&ds));
        assert_eq!(xs.to_string(), "Body");
    }
}
