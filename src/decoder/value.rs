use crate::decoder::BinaryReader;
use crate::decoder::qname::letter_prefix;
use crate::error::{Error, Result};
use crate::guid::UniqueId;
use crate::record::{RecordType, TextRecord};
use crate::typed_value::TypedValue;
use crate::{binary, datetime, decimal, float, guid, integer, string, unsigned_integer};

impl BinaryReader<'_> {
    /// Liest einen Text-Record (inkl. Tag). Liefert den Wert und ob das Tag
    /// ein implizites EndElement traegt.
    pub(super) fn read_value(&mut self) -> Result<(TypedValue, bool)> {
        let offset = self.input.position();
        let (record, with_end) = self.read_text_tag("text record")?;
        match record {
            TextRecord::StartList => {
                if with_end {
                    return Err(Error::UnexpectedRecord {
                        tag: record.tag_with_end(true),
                        offset,
                        expected: "text record",
                    });
                }
                self.read_list()
            }
            TextRecord::EndList | TextRecord::Bool => Err(Error::UnexpectedRecord {
                tag: record.tag_with_end(with_end),
                offset,
                expected: "text record",
            }),
            _ => Ok((self.read_scalar(record, offset)?, with_end)),
        }
    }

    /// Attributwert: genau ein Text-Record ohne EndElement.
    pub(super) fn read_attribute_value(&mut self) -> Result<TypedValue> {
        let offset = self.input.position();
        let tag = self.input.peek_u8().unwrap_or_default();
        let (value, with_end) = self.read_value()?;
        if with_end {
            return Err(Error::UnexpectedRecord { tag, offset, expected: "attribute value" });
        }
        Ok(value)
    }

    /// `StartList item* EndList`; das EndList-Tag traegt das EndElement-Bit.
    fn read_list(&mut self) -> Result<(TypedValue, bool)> {
        let mut items = Vec::new();
        loop {
            let offset = self.input.position();
            let (record, with_end) = self.read_text_tag("list item")?;
            match record {
                TextRecord::EndList => return Ok((TypedValue::List(items), with_end)),
                TextRecord::StartList | TextRecord::Bool => {
                    return Err(Error::UnexpectedRecord {
                        tag: record.tag_with_end(with_end),
                        offset,
                        expected: "list item",
                    });
                }
                _ if with_end => {
                    return Err(Error::UnexpectedRecord {
                        tag: record.tag_with_end(true),
                        offset,
                        expected: "list item",
                    });
                }
                _ => items.push(self.read_scalar(record, offset)?),
            }
        }
    }

    fn read_text_tag(&mut self, expected: &'static str) -> Result<(TextRecord, bool)> {
        let offset = self.input.position();
        let tag = self.input.read_u8()?;
        match RecordType::from_tag(tag) {
            Some(RecordType::Text { record, with_end_element }) => Ok((record, with_end_element)),
            Some(_) => Err(Error::UnexpectedRecord { tag, offset, expected }),
            None => Err(Error::UnknownRecord { tag, offset }),
        }
    }

    /// Payload eines einzelnen Text-Records; `offset` ist die Tag-Position.
    fn read_scalar(&mut self, record: TextRecord, offset: usize) -> Result<TypedValue> {
        let max_len = self.quotas.max_string_content_length;
        let r = &mut self.input;
        Ok(match record {
            TextRecord::Zero
            | TextRecord::One
            | TextRecord::Int8
            | TextRecord::Int16
            | TextRecord::Int32
            | TextRecord::Int64 => TypedValue::Int(integer::decode(r, record)?),
            TextRecord::UInt64 => TypedValue::from(integer::decode_u64(r)?),
            TextRecord::False => TypedValue::Bool(false),
            TextRecord::True => TypedValue::Bool(true),
            TextRecord::Float => TypedValue::Float(float::decode_f32(r)?),
            TextRecord::Double => TypedValue::Double(float::decode_f64(r)?),
            TextRecord::Decimal => TypedValue::Decimal(decimal::decode(r)?),
            TextRecord::DateTime => TypedValue::DateTime(datetime::decode(r)?),
            TextRecord::TimeSpan => TypedValue::TimeSpan(datetime::decode_timespan(r)?),
            TextRecord::Uuid => TypedValue::Guid(guid::decode(r)?),
            TextRecord::UniqueId => TypedValue::UniqueId(UniqueId(guid::decode(r)?)),
            TextRecord::Empty
            | TextRecord::Chars8
            | TextRecord::Chars16
            | TextRecord::Chars32
            | TextRecord::UnicodeChars8
            | TextRecord::UnicodeChars16
            | TextRecord::UnicodeChars32 => TypedValue::Text(string::decode(r, record, max_len)?),
            TextRecord::Bytes8 | TextRecord::Bytes16 | TextRecord::Bytes32 => {
                TypedValue::Bytes(binary::decode(r, record, max_len)?)
            }
            TextRecord::Dictionary => {
                let key_offset = r.position();
                let key = unsigned_integer::decode(r)?;
                TypedValue::Dictionary(self.dictionary_string(key, key_offset)?)
            }
            TextRecord::QNameDictionary => {
                let letter_offset = r.position();
                let letter = r.read_u8()?;
                if letter >= 26 {
                    return Err(Error::invalid_payload(letter_offset, format!("prefix letter index {letter}")));
                }
                let key_offset = r.position();
                let key = unsigned_integer::decode(r)?;
                TypedValue::QName {
                    prefix: letter_prefix(letter),
                    local_name: self.dictionary_string(key, key_offset)?,
                }
            }
            TextRecord::StartList | TextRecord::EndList | TextRecord::Bool => {
                return Err(Error::UnexpectedRecord {
                    tag: record.tag(),
                    offset,
                    expected: "scalar text record",
                });
            }
        })
    }
}
