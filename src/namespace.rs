//! Namespace scope bookkeeping.
//!
//! Stack-basierter Resolver: jede Bindung merkt sich die Tiefe, auf der sie
//! deklariert wurde, und wird beim Schliessen dieses Elements entfernt.
//! Die Suche laeuft immer von der juengsten zur aeltesten Bindung, so dass
//! ueberschattete Bindungen nicht gefunden werden.

use std::sync::Arc;

use crate::dictionary::{DictionaryString, XmlString};
use crate::{Error, Result};

/// Namespace-URI des `xml` Prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// Namespace-URI des `xmlns` Prefix.
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// Prefixe, die fuer Attribute automatisch vergeben werden.
const GENERATED_PREFIXES: &[u8; 26] = b"abcdefghijklmnopqrstuvwxyz";

/// Eine Prefix → URI Bindung.
#[derive(Debug, Clone)]
pub struct Binding {
    pub prefix: Arc<str>,
    pub uri: Arc<str>,
    /// Dictionary-Form der URI, falls der Aufrufer sie so uebergeben hat.
    pub uri_dictionary: Option<DictionaryString>,
    pub depth: usize,
}

/// Stand eines [`NamespaceScope`], auf den ein fehlgeschlagener Writer-Aufruf
/// zurueckgesetzt wird.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ScopeCheckpoint {
    bindings: usize,
    depth: usize,
    generated: u32,
}

/// Stack of in-scope prefix → URI bindings, one frame per open element.
#[derive(Debug)]
pub struct NamespaceScope {
    bindings: Vec<Binding>,
    /// Zaehler fuer `d{depth}p{n}` Prefixe, ein Eintrag pro offener Ebene.
    generated: Vec<u32>,
}

impl NamespaceScope {
    /// Neuer Scope auf Tiefe 0; der leere Prefix ist an die leere URI gebunden.
    pub fn new() -> Self {
        Self {
            bindings: vec![Binding {
                prefix: "".into(),
                uri: "".into(),
                uri_dictionary: None,
                depth: 0,
            }],
            generated: vec![0],
        }
    }

    /// Aktuelle Verschachtelungstiefe (0 = ausserhalb des Root-Elements).
    pub fn depth(&self) -> usize {
        self.generated.len() - 1
    }

    /// Betritt eine neue Element-Ebene.
    pub fn enter(&mut self) {
        self.generated.push(0);
    }

    /// Verlaesst die aktuelle Ebene und entfernt alle dort deklarierten Bindungen.
    pub fn close_element(&mut self) {
        let depth = self.depth();
        if depth == 0 {
            return;
        }
        while self.bindings.last().is_some_and(|b| b.depth == depth) {
            self.bindings.pop();
        }
        self.generated.pop();
    }

    /// URI fuer `prefix`, falls im Scope.
    pub fn resolve(&self, prefix: &str) -> Option<&str> {
        if let Some(b) = self.bindings.iter().rev().find(|b| &*b.prefix == prefix) {
            return Some(&b.uri);
        }
        match prefix {
            "xml" => Some(XML_NAMESPACE),
            "xmlns" => Some(XMLNS_NAMESPACE),
            _ => None,
        }
    }

    pub(crate) fn save_checkpoint(&self) -> ScopeCheckpoint {
        ScopeCheckpoint {
            bindings: self.bindings.len(),
            depth: self.depth(),
            generated: self.generated.last().copied().unwrap_or_default(),
        }
    }

    /// Verwirft Bindungen und Ebenen, die nach `checkpoint` entstanden sind.
    /// Bereits geschlossene Ebenen werden nicht wiederhergestellt.
    pub(crate) fn restore_checkpoint(&mut self, checkpoint: ScopeCheckpoint) {
        self.bindings.truncate(checkpoint.bindings);
        self.generated.truncate(checkpoint.depth + 1);
        if let Some(counter) = self.generated.last_mut() {
            *counter = checkpoint.generated;
        }
    }

    /// Ein im Scope gueltiger Prefix fuer `uri`.
    pub fn reverse_lookup(&self, uri: &str) -> Option<&str> {
        if let Some(prefix) = self.find_prefix(uri, |_| true) {
            return Some(prefix);
        }
        match uri {
            XML_NAMESPACE => Some("xml"),
            XMLNS_NAMESPACE => Some("xmlns"),
            _ => None,
        }
    }

    /// Wie [`reverse_lookup`](Self::reverse_lookup), aber nur nicht-leere
    /// Prefixe: Attribute ohne Prefix haben nie einen Namespace.
    pub fn lookup_attribute_prefix(&self, uri: &str) -> Option<&str> {
        if uri.is_empty() {
            return Some("");
        }
        self.find_prefix(uri, |p| !p.is_empty())
    }

    fn find_prefix(&self, uri: &str, accept: impl Fn(&str) -> bool) -> Option<&str> {
        for (i, b) in self.bindings.iter().enumerate().rev() {
            if &*b.uri != uri || !accept(&b.prefix) {
                continue;
            }
            let shadowed = self.bindings[i + 1..].iter().any(|later| later.prefix == b.prefix);
            if !shadowed {
                return Some(&b.prefix);
            }
        }
        None
    }

    /// Deklariert `prefix` → `uri` auf der aktuellen Ebene.
    ///
    /// Gibt `false` zurueck, wenn genau diese Bindung auf dieser Ebene schon
    /// existiert (oder eine feste `xml`/`xmlns` Bindung ist).
    pub fn declare(&mut self, prefix: &str, uri: XmlString<'_>) -> Result<bool> {
        let uri_str = uri.as_str();
        if prefix.len() >= 3 && prefix.as_bytes()[..3].eq_ignore_ascii_case(b"xml") {
            if (prefix == "xml" && uri_str == XML_NAMESPACE) || (prefix == "xmlns" && uri_str == XMLNS_NAMESPACE) {
                return Ok(false);
            }
            return Err(Error::invalid_name(format!("prefix '{prefix}' is reserved")));
        }
        let depth = self.depth();
        for b in self.bindings.iter().rev().take_while(|b| b.depth == depth) {
            if &*b.prefix == prefix {
                if &*b.uri == uri_str {
                    return Ok(false);
                }
                return Err(Error::invalid_name(format!(
                    "prefix '{prefix}' is already bound to '{}' on this element",
                    b.uri
                )));
            }
        }
        if !prefix.is_empty() && uri_str.is_empty() {
            return Err(Error::invalid_name(format!("prefix '{prefix}' cannot be bound to the empty namespace")));
        }
        if uri_str == XMLNS_NAMESPACE || uri_str == XML_NAMESPACE {
            return Err(Error::invalid_name(format!("namespace '{uri_str}' is reserved")));
        }
        self.push(prefix, uri, depth);
        Ok(true)
    }

    /// Deklariert nur, wenn `prefix` nicht schon an `uri` gebunden ist.
    pub fn declare_if_not_declared(&mut self, prefix: &str, uri: XmlString<'_>) -> Result<bool> {
        if self.resolve(prefix) == Some(uri.as_str()) {
            return Ok(false);
        }
        self.declare(prefix, uri)
    }

    /// Bindet ohne Pruefung (Reader-Seite: der Stream ist die Wahrheit).
    pub(crate) fn bind(&mut self, prefix: Arc<str>, uri: Arc<str>) {
        let depth = self.depth();
        self.bindings.push(Binding { prefix, uri, uri_dictionary: None, depth });
    }

    fn push(&mut self, prefix: &str, uri: XmlString<'_>, depth: usize) {
        let (uri, uri_dictionary) = match uri {
            XmlString::Text(s) => (Arc::from(s), None),
            XmlString::Dictionary(ds) => (ds.value_arc(), Some(ds.clone())),
        };
        self.bindings.push(Binding {
            prefix: prefix.into(),
            uri,
            uri_dictionary,
            depth,
        });
    }

    /// Vergibt einen Prefix fuer `uri` und bindet ihn auf der aktuellen Ebene.
    ///
    /// Erster ungebundener Buchstabe `a`..`z`, danach `d{depth}p{n}`.
    pub fn generate_prefix(&mut self, uri: XmlString<'_>) -> Result<Arc<str>> {
        if uri.as_str().is_empty() {
            self.declare_if_not_declared("", uri)?;
            return Ok("".into());
        }
        for &letter in GENERATED_PREFIXES {
            let candidate = char::from(letter).to_string();
            if !self.bindings.iter().any(|b| *b.prefix == *candidate) {
                self.declare(&candidate, uri)?;
                return Ok(candidate.into());
            }
        }
        let depth = self.depth();
        loop {
            let n = match self.generated.last_mut() {
                Some(counter) => {
                    let n = *counter;
                    *counter += 1;
                    n
                }
                None => 0,
            };
            let candidate = format!("d{depth}p{n}");
            if self.resolve(&candidate).is_none() {
                self.declare(&candidate, uri)?;
                return Ok(candidate.into());
            }
        }
    }

    /// Betritt ein Element und bestimmt dessen Prefix.
    ///
    /// - keine URI: Namespace des Prefix (Standard `""`) muss im Scope sein
    /// - kein Prefix: vorhandenen Prefix fuer die URI wiederverwenden, sonst
    ///   den leeren Prefix binden
    /// - beides: nur deklarieren, wenn das Paar nicht schon gilt
    ///
    /// Bei einem Fehler bleibt der Scope unveraendert.
    pub fn open_element(&mut self, prefix: Option<&str>, uri: Option<XmlString<'_>>) -> Result<Arc<str>> {
        self.enter();
        let result = self.resolve_element_prefix(prefix, uri);
        if result.is_err() {
            self.close_element();
        }
        result
    }

    fn resolve_element_prefix(&mut self, prefix: Option<&str>, uri: Option<XmlString<'_>>) -> Result<Arc<str>> {
        match (prefix, uri) {
            (prefix, None) => {
                let prefix = prefix.unwrap_or("");
                if self.resolve(prefix).is_none() {
                    return Err(Error::UndeclaredPrefix(prefix.to_string()));
                }
                Ok(prefix.into())
            }
            (None, Some(uri)) => {
                if let Some(prefix) = self.reverse_lookup(uri.as_str()) {
                    return Ok(prefix.into());
                }
                self.declare("", uri)?;
                Ok("".into())
            }
            (Some(prefix), Some(uri)) => {
                self.declare_if_not_declared(prefix, uri)?;
                Ok(prefix.into())
            }
        }
    }

    /// Bestimmt den Prefix eines (nicht-xmlns) Attributs und deklariert bei
    /// Bedarf eine neue Bindung. Attribute verwenden nie den Default-Namespace.
    pub fn open_attribute(&mut self, prefix: Option<&str>, uri: Option<XmlString<'_>>) -> Result<Arc<str>> {
        let prefix = match prefix {
            Some(p) => p,
            None => match uri.map(|u| u.as_str()) {
                Some(XML_NAMESPACE) => "xml",
                _ => "",
            },
        };
        if prefix == "xml" {
            if let Some(uri) = uri
                && uri.as_str() != XML_NAMESPACE
            {
                return Err(Error::invalid_name(format!("prefix 'xml' cannot be bound to '{uri}'")));
            }
            return Ok(prefix.into());
        }
        let Some(uri) = uri else {
            if prefix.is_empty() || self.resolve(prefix).is_some() {
                return Ok(prefix.into());
            }
            return Err(Error::UndeclaredPrefix(prefix.to_string()));
        };
        if uri.as_str().is_empty() {
            if !prefix.is_empty() {
                return Err(Error::invalid_name(format!("prefix '{prefix}' requires a namespace")));
            }
            return Ok("".into());
        }
        if prefix.is_empty() {
            if let Some(existing) = self.lookup_attribute_prefix(uri.as_str()) {
                return Ok(existing.into());
            }
            if uri.as_str() == XMLNS_NAMESPACE || uri.as_str() == XML_NAMESPACE {
                return Err(Error::invalid_name(format!("namespace '{uri}' is reserved")));
            }
            return self.generate_prefix(uri);
        }
        self.declare_if_not_declared(prefix, uri)?;
        Ok(prefix.into())
    }

    /// Bindungen, die auf der aktuellen Ebene deklariert wurden, in
    /// Deklarationsreihenfolge.
    pub fn declared_here(&self) -> &[Binding] {
        let depth = self.depth();
        if depth == 0 {
            return &[];
        }
        let start = self
            .bindings
            .iter()
            .rposition(|b| b.depth != depth)
            .map_or(0, |i| i + 1);
        &self.bindings[start..]
    }
}

impl Default for NamespaceScope {
    fn default() -> Self {
        Self::new()
    }
}
