use std::io::Write;

use crate::dictionary::{DictionaryString, XmlString};
use crate::encoder::BinaryWriter;
use crate::namespace::Binding;
use crate::record::{RecordType, prefix_letter_index};
use crate::{Error, Result, string, unsigned_integer};

impl<W: Write> BinaryWriter<'_, W> {
    /// Wire-Index eines Dictionary-Strings: `2*key` fuer das eigene
    /// Dictionary, `2*index + 1` ueber die Session, sonst `None` (Text).
    pub(super) fn dictionary_key(&mut self, ds: &DictionaryString) -> Result<Option<u32>> {
        if ds.is_owned_by(self.dictionary) {
            return match ds.key().checked_mul(2) {
                Some(key) if key <= unsigned_integer::MAX => Ok(Some(key)),
                _ => Err(Error::out_of_range(format!("dictionary key {} exceeds wire range", ds.key()))),
            };
        }
        if let Some(session) = self.session.as_deref_mut() {
            let index = session.get_or_add(ds)?;
            return Ok(Some(index * 2 + 1));
        }
        Ok(None)
    }

    fn name_key(&mut self, name: XmlString<'_>) -> Result<Option<u32>> {
        match name {
            XmlString::Dictionary(ds) => self.dictionary_key(ds),
            XmlString::Text(_) => Ok(None),
        }
    }

    /// Element-Record; der Prefix ist bereits aufgeloest.
    pub(super) fn write_element_record(&mut self, prefix: &str, local_name: XmlString<'_>) -> Result<()> {
        let key = self.name_key(local_name)?;
        let record = match (prefix.is_empty(), prefix_letter_index(prefix), key) {
            (true, _, Some(_)) => RecordType::ShortDictionaryElement,
            (true, _, None) => RecordType::ShortElement,
            (false, Some(letter), Some(_)) => RecordType::PrefixDictionaryElement(letter),
            (false, Some(letter), None) => RecordType::PrefixElement(letter),
            (false, None, Some(_)) => RecordType::DictionaryElement,
            (false, None, None) => RecordType::Element,
        };
        self.write_name_record(record, prefix, local_name.as_str(), key)
    }

    /// Attribut-Record (ohne Wert).
    pub(super) fn write_attribute_record(&mut self, prefix: &str, local_name: XmlString<'_>) -> Result<()> {
        let key = self.name_key(local_name)?;
        let record = match (prefix.is_empty(), prefix_letter_index(prefix), key) {
            (true, _, Some(_)) => RecordType::ShortDictionaryAttribute,
            (true, _, None) => RecordType::ShortAttribute,
            (false, Some(letter), Some(_)) => RecordType::PrefixDictionaryAttribute(letter),
            (false, Some(letter), None) => RecordType::PrefixAttribute(letter),
            (false, None, Some(_)) => RecordType::DictionaryAttribute,
            (false, None, None) => RecordType::Attribute,
        };
        self.write_name_record(record, prefix, local_name.as_str(), key)
    }

    /// Tag, ggf. ausgeschriebener Prefix, dann Index oder Name.
    fn write_name_record(&mut self, record: RecordType, prefix: &str, local_name: &str, key: Option<u32>) -> Result<()> {
        self.buf.write_u8(record.tag());
        if matches!(
            record,
            RecordType::Element | RecordType::DictionaryElement | RecordType::Attribute | RecordType::DictionaryAttribute
        ) {
            string::encode_prefixed(&mut self.buf, prefix)?;
        }
        match key {
            Some(key) => unsigned_integer::encode(&mut self.buf, key),
            None => string::encode_prefixed(&mut self.buf, local_name),
        }
    }

    /// Schreibt alle auf der aktuellen Ebene deklarierten Namespaces.
    pub(super) fn write_pending_namespaces(&mut self) -> Result<()> {
        let declared: Vec<Binding> = self.scope.declared_here().to_vec();
        for binding in &declared {
            self.write_xmlns_record(binding)?;
        }
        Ok(())
    }

    fn write_xmlns_record(&mut self, binding: &Binding) -> Result<()> {
        let key = match &binding.uri_dictionary {
            Some(ds) => self.dictionary_key(ds)?,
            None => None,
        };
        let short = binding.prefix.is_empty();
        let record = match (short, key) {
            (true, Some(_)) => RecordType::ShortDictionaryXmlns,
            (true, None) => RecordType::ShortXmlns,
            (false, Some(_)) => RecordType::DictionaryXmlns,
            (false, None) => RecordType::Xmlns,
        };
        self.buf.write_u8(record.tag());
        if !short {
            string::encode_prefixed(&mut self.buf, &binding.prefix)?;
        }
        match key {
            Some(key) => unsigned_integer::encode(&mut self.buf, key),
            None => string::encode_prefixed(&mut self.buf, &binding.uri),
        }
    }
}
