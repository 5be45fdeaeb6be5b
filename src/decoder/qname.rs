use std::sync::Arc;

use crate::decoder::BinaryReader;
use crate::error::{Error, Quota, Result};
use crate::event::{Attribute, ElementStart, NamespaceDeclaration};
use crate::qname::QualifiedName;
use crate::record::{RecordType, prefix_letter};
use crate::typed_value::TypedValue;
use crate::{string, unsigned_integer};

/// Attribut vor der Prefix-Aufloesung (xmlns-Records koennen noch folgen).
struct RawAttribute {
    prefix: Arc<str>,
    local_name: Arc<str>,
    value: TypedValue,
    offset: usize,
}

impl BinaryReader<'_> {
    /// Liest einen Element-Record samt Attributen und Namespace-Deklarationen
    /// und betritt die neue Ebene.
    pub(super) fn read_element(&mut self) -> Result<ElementStart> {
        let offset = self.input.position();
        let (prefix, local_name) = self.read_element_name()?;
        if self.scope.depth() >= self.quotas.max_depth {
            return Err(Error::QuotaExceeded {
                quota: Quota::Depth,
                limit: self.quotas.max_depth,
                actual: self.scope.depth() + 1,
            });
        }
        self.scope.enter();
        if self.scope.depth() == 1 {
            log::debug!("document start: <{local_name}> at offset {offset}");
        }

        let mut namespaces = Vec::new();
        let mut raw_attributes = Vec::new();
        while let Some(tag) = self.input.peek_u8() {
            let Some(record) = RecordType::from_tag(tag).filter(|r| r.is_attribute()) else {
                break;
            };
            let at = self.input.position();
            self.input.read_u8()?;
            log::trace!("{at:#06x}: {record}");
            match record {
                RecordType::ShortXmlns
                | RecordType::Xmlns
                | RecordType::ShortDictionaryXmlns
                | RecordType::DictionaryXmlns => {
                    let declaration = self.read_xmlns(record)?;
                    self.scope.bind(declaration.prefix.clone(), declaration.uri.clone());
                    namespaces.push(declaration);
                }
                _ => {
                    let (prefix, local_name) = self.read_attribute_name(record)?;
                    let value = self.read_attribute_value()?;
                    raw_attributes.push(RawAttribute { prefix, local_name, value, offset: at });
                }
            }
        }

        let namespace_uri = self.resolve_prefix(&prefix, offset)?;
        let mut start = ElementStart::new(QualifiedName::new(prefix, local_name, namespace_uri));
        start.namespaces = namespaces;
        for raw in raw_attributes {
            // Attribute ohne Prefix haben keinen Namespace
            let namespace_uri: Arc<str> = if raw.prefix.is_empty() {
                "".into()
            } else {
                self.resolve_prefix(&raw.prefix, raw.offset)?
            };
            start.attributes.push(Attribute {
                name: QualifiedName::new(raw.prefix, raw.local_name, namespace_uri),
                value: raw.value,
            });
        }
        Ok(start)
    }

    /// Prefix und lokaler Name eines Element-Records (liest das Tag).
    pub(super) fn read_element_name(&mut self) -> Result<(Arc<str>, Arc<str>)> {
        let offset = self.input.position();
        let tag = self.input.read_u8()?;
        let record = RecordType::from_tag(tag).ok_or(Error::UnknownRecord { tag, offset })?;
        Ok(match record {
            RecordType::ShortElement => ("".into(), self.read_name()?),
            RecordType::Element => {
                let prefix = self.read_name()?;
                (prefix, self.read_name()?)
            }
            RecordType::ShortDictionaryElement => ("".into(), self.read_dictionary_name()?),
            RecordType::DictionaryElement => {
                let prefix = self.read_name()?;
                (prefix, self.read_dictionary_name()?)
            }
            RecordType::PrefixDictionaryElement(letter) => (letter_prefix(letter), self.read_dictionary_name()?),
            RecordType::PrefixElement(letter) => (letter_prefix(letter), self.read_name()?),
            _ => return Err(Error::UnexpectedRecord { tag, offset, expected: "element record" }),
        })
    }

    fn read_attribute_name(&mut self, record: RecordType) -> Result<(Arc<str>, Arc<str>)> {
        Ok(match record {
            RecordType::ShortAttribute => ("".into(), self.read_name()?),
            RecordType::Attribute => {
                let prefix = self.read_name()?;
                (prefix, self.read_name()?)
            }
            RecordType::ShortDictionaryAttribute => ("".into(), self.read_dictionary_name()?),
            RecordType::DictionaryAttribute => {
                let prefix = self.read_name()?;
                (prefix, self.read_dictionary_name()?)
            }
            RecordType::PrefixDictionaryAttribute(letter) => (letter_prefix(letter), self.read_dictionary_name()?),
            RecordType::PrefixAttribute(letter) => (letter_prefix(letter), self.read_name()?),
            other => {
                return Err(Error::UnexpectedRecord {
                    tag: other.tag(),
                    offset: self.input.position().saturating_sub(1),
                    expected: "attribute record",
                });
            }
        })
    }

    fn read_xmlns(&mut self, record: RecordType) -> Result<NamespaceDeclaration> {
        let prefix: Arc<str> = match record {
            RecordType::Xmlns | RecordType::DictionaryXmlns => self.read_name()?,
            _ => "".into(),
        };
        let uri = match record {
            RecordType::ShortDictionaryXmlns | RecordType::DictionaryXmlns => self.read_dictionary_name()?,
            _ => self.read_name()?,
        };
        Ok(NamespaceDeclaration { prefix, uri })
    }

    /// Name mit MB31-Laengenpraefix.
    fn read_name(&mut self) -> Result<Arc<str>> {
        string::decode_prefixed(&mut self.input, self.quotas.max_string_content_length)
    }

    /// Name ueber einen Dictionary-Index.
    fn read_dictionary_name(&mut self) -> Result<Arc<str>> {
        let offset = self.input.position();
        let key = unsigned_integer::decode(&mut self.input)?;
        Ok(self.dictionary_string(key, offset)?.value_arc())
    }

    fn resolve_prefix(&self, prefix: &str, offset: usize) -> Result<Arc<str>> {
        self.scope.resolve(prefix).map(Arc::from).ok_or_else(|| Error::UnboundPrefix {
            prefix: prefix.to_string(),
            offset,
        })
    }
}

/// Prefix eines Letter-Records (`0` → `"a"`).
pub(super) fn letter_prefix(letter: u8) -> Arc<str> {
    prefix_letter(letter).to_string().into()
}
