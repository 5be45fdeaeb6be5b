//! Infoset event model.
//!
//! Reader-Ausgabe und Writer-Eingabe: ein Dokument ist eine Folge von
//! StartElement / EndElement / Text / Comment. Attribute und
//! Namespace-Deklarationen haengen am StartElement.

use std::sync::Arc;

use crate::qname::QualifiedName;
use crate::typed_value::TypedValue;

/// Namespace-Deklaration (`xmlns` / `xmlns:p`) an einem Element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDeclaration {
    /// Leer fuer den Default-Namespace.
    pub prefix: Arc<str>,
    pub uri: Arc<str>,
}

impl NamespaceDeclaration {
    pub fn new(prefix: impl Into<Arc<str>>, uri: impl Into<Arc<str>>) -> Self {
        Self { prefix: prefix.into(), uri: uri.into() }
    }
}

/// Attribut mit typisiertem Wert.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: QualifiedName,
    pub value: TypedValue,
}

/// Inhalt eines StartElement-Events.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementStart {
    pub name: QualifiedName,
    pub attributes: Vec<Attribute>,
    /// Deklarationen in Stream-Reihenfolge.
    pub namespaces: Vec<NamespaceDeclaration>,
}

impl ElementStart {
    pub fn new(name: QualifiedName) -> Self {
        Self {
            name,
            attributes: Vec::new(),
            namespaces: Vec::new(),
        }
    }

    /// Attribut per lokalem Namen und Namespace.
    pub fn attribute(&self, local_name: &str, namespace_uri: &str) -> Option<&TypedValue> {
        self.attributes
            .iter()
            .find(|a| &*a.name.local_name == local_name && &*a.name.namespace_uri == namespace_uri)
            .map(|a| &a.value)
    }
}

/// Ein Infoset-Event.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlEvent {
    StartElement(ElementStart),
    EndElement,
    Text(TypedValue),
    Comment(Arc<str>),
}

impl XmlEvent {
    /// Kurzform fuer ein StartElement ohne Attribute.
    pub fn start(name: QualifiedName) -> Self {
        Self::StartElement(ElementStart::new(name))
    }

    /// Kurzform fuer Text-Content.
    pub fn text(s: &str) -> Self {
        Self::Text(TypedValue::Text(s.into()))
    }

    pub fn is_start_element(&self) -> bool {
        matches!(self, Self::StartElement(_))
    }

    pub fn is_end_element(&self) -> bool {
        matches!(self, Self::EndElement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_lookup() {
        let mut start = ElementStart::new(QualifiedName::local("root"));
        start.attributes.push(Attribute {
            name: QualifiedName::new("a", "id", "urn:x"),
            value: TypedValue::Int(7),
        });
        assert_eq!(start.attribute("id", "urn:x"), Some(&TypedValue::Int(7)));
        assert_eq!(start.attribute("id", ""), None);
    }

    #[test]
    fn shorthands() {
        assert!(XmlEvent::start(QualifiedName::local("x")).is_start_element());
        assert!(XmlEvent::EndElement.is_end_element());
        assert_eq!(XmlEvent::text("hi"), XmlEvent::Text(TypedValue::Text("hi".into())));
    }
}
