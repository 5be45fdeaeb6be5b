use std::io::Write;

use crate::encoder::BinaryWriter;
use crate::record::{TextRecord, prefix_letter_index};
use crate::typed_value::TypedValue;
use crate::{
    Error, Result, binary, boolean, datetime, decimal, float, guid, integer, string, unsigned_integer,
};

impl<W: Write> BinaryWriter<'_, W> {
    /// Schreibt `value` als Text-Record(s) und liefert die Position des
    /// letzten geschriebenen Tags (Kandidat fuer das kombinierte EndElement).
    pub(super) fn write_text_record(&mut self, value: &TypedValue) -> Result<usize> {
        let tag_pos = self.buf.len();
        match value {
            TypedValue::Bool(v) => self.buf.write_u8(boolean::select(*v).tag()),
            TypedValue::Int(v) => self.write_integer(*v)?,
            TypedValue::UInt64(v) => match i64::try_from(*v) {
                Ok(small) => self.write_integer(small)?,
                Err(_) => {
                    self.buf.write_u8(TextRecord::UInt64.tag());
                    integer::encode_u64(&mut self.buf, *v);
                }
            },
            TypedValue::Float(v) => {
                self.buf.write_u8(TextRecord::Float.tag());
                float::encode_f32(&mut self.buf, *v);
            }
            TypedValue::Double(v) => {
                self.buf.write_u8(TextRecord::Double.tag());
                float::encode_f64(&mut self.buf, *v);
            }
            TypedValue::Decimal(v) => {
                self.buf.write_u8(TextRecord::Decimal.tag());
                decimal::encode(&mut self.buf, *v);
            }
            TypedValue::DateTime(v) => {
                self.buf.write_u8(TextRecord::DateTime.tag());
                datetime::encode(&mut self.buf, *v);
            }
            TypedValue::TimeSpan(v) => {
                self.buf.write_u8(TextRecord::TimeSpan.tag());
                datetime::encode_timespan(&mut self.buf, *v);
            }
            TypedValue::Guid(v) => {
                self.buf.write_u8(TextRecord::Uuid.tag());
                guid::encode(&mut self.buf, v);
            }
            TypedValue::UniqueId(v) => {
                self.buf.write_u8(TextRecord::UniqueId.tag());
                guid::encode(&mut self.buf, &v.0);
            }
            TypedValue::Text(s) => self.write_chars(s)?,
            TypedValue::Bytes(b) => {
                let record = binary::select(b.len());
                self.buf.write_u8(record.tag());
                binary::encode(&mut self.buf, record, b)?;
            }
            TypedValue::Dictionary(ds) => match self.dictionary_key(ds)? {
                Some(key) => {
                    self.buf.write_u8(TextRecord::Dictionary.tag());
                    unsigned_integer::encode(&mut self.buf, key)?;
                }
                None => self.write_chars(ds.value())?,
            },
            TypedValue::QName { prefix, local_name } => {
                // Nur Einzelbuchstaben-Prefixe haben eine kompakte Form
                let key = match prefix_letter_index(prefix) {
                    Some(letter) => self.dictionary_key(local_name)?.map(|key| (letter, key)),
                    None => None,
                };
                match key {
                    Some((letter, key)) => {
                        self.buf.write_u8(TextRecord::QNameDictionary.tag());
                        self.buf.write_u8(letter);
                        unsigned_integer::encode(&mut self.buf, key)?;
                    }
                    None => self.write_chars(&value.to_string())?,
                }
            }
            TypedValue::List(items) => {
                self.buf.write_u8(TextRecord::StartList.tag());
                for item in items {
                    if matches!(item, TypedValue::List(_)) {
                        return Err(Error::out_of_range("lists cannot be nested"));
                    }
                    self.write_text_record(item)?;
                }
                let end_pos = self.buf.len();
                self.buf.write_u8(TextRecord::EndList.tag());
                return Ok(end_pos);
            }
        }
        Ok(tag_pos)
    }

    fn write_integer(&mut self, value: i64) -> Result<()> {
        let record = integer::select(value);
        self.buf.write_u8(record.tag());
        integer::encode(&mut self.buf, record, value)
    }

    fn write_chars(&mut self, text: &str) -> Result<()> {
        let record = string::select(text, self.options.prefer_utf16_text);
        self.buf.write_u8(record.tag());
        string::encode(&mut self.buf, record, text)
    }
}
