//! Qualified names of elements and attributes.

use std::fmt;
use std::sync::Arc;

/// Prefix, lokaler Name und aufgeloester Namespace eines Elements oder Attributs.
///
/// Gleichheit vergleicht alle drei Teile; zwei Namen mit gleichem Namespace
/// aber verschiedenem Prefix sind fuer den Round-Trip verschieden.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    /// Prefix (leer fuer den Default-Namespace bzw. Attribute ohne Namespace).
    pub prefix: Arc<str>,
    pub local_name: Arc<str>,
    pub namespace_uri: Arc<str>,
}

impl QualifiedName {
    pub fn new(prefix: impl Into<Arc<str>>, local_name: impl Into<Arc<str>>, namespace_uri: impl Into<Arc<str>>) -> Self {
        Self {
            prefix: prefix.into(),
            local_name: local_name.into(),
            namespace_uri: namespace_uri.into(),
        }
    }

    /// Name ohne Prefix und Namespace.
    pub fn local(local_name: impl Into<Arc<str>>) -> Self {
        Self::new("", local_name, "")
    }

    /// `true` fuer `xmlns` und `xmlns:*` Attributnamen.
    pub fn is_xmlns(&self) -> bool {
        &*self.prefix == "xmlns" || (self.prefix.is_empty() && &*self.local_name == "xmlns")
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.prefix.is_empty() {
            f.write_str(&self.local_name)
        } else {
            write!(f, "{}:{}", self.prefix, self.local_name)
        }
    }
}

/// Zerlegt `prefix:local` in seine Teile. Ohne `:` ist der Prefix `None`.
pub fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match memchr::memchr(b':', name.as_bytes()) {
        Some(i) => (Some(&name[..i]), &name[i + 1..]),
        None => (None, name),
    }
}
