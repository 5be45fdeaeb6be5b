//! Array records: werden zu `count` Element-Events mit je einem Wert expandiert.

use crate::decoder::BinaryReader;
use crate::error::{Error, Quota, Result};
use crate::event::XmlEvent;
use crate::guid;
use crate::record::{RecordType, TextRecord};
use crate::typed_value::TypedValue;
use crate::{boolean, datetime, decimal, float, unsigned_integer};

impl BinaryReader<'_> {
    /// `0x03 element-record attribute* 0x01 value-tag|1 mb31(count) payload*`
    pub(super) fn read_array(&mut self) -> Result<()> {
        self.input.read_u8()?;
        let start = self.read_element()?;

        let offset = self.input.position();
        let tag = self.input.read_u8()?;
        if tag != RecordType::EndElement.tag() {
            return Err(Error::UnexpectedRecord { tag, offset, expected: "EndElement after array element" });
        }
        self.scope.close_element();

        let offset = self.input.position();
        let tag = self.input.read_u8()?;
        let record = match RecordType::from_tag(tag) {
            Some(RecordType::Text { record, with_end_element: true }) if record.array_element_size().is_some() => record,
            Some(_) => return Err(Error::UnexpectedRecord { tag, offset, expected: "array value type" }),
            None => return Err(Error::UnknownRecord { tag, offset }),
        };
        let count = unsigned_integer::decode_len(&mut self.input)?;
        if count > self.quotas.max_array_length {
            return Err(Error::QuotaExceeded {
                quota: Quota::ArrayLength,
                limit: self.quotas.max_array_length,
                actual: count,
            });
        }
        log::trace!("array <{}> of {count} x {}", start.name, record.name());

        // Payload vollstaendig lesen, bevor Events entstehen
        let mut values = Vec::with_capacity(count.min(self.input.remaining()));
        for _ in 0..count {
            values.push(self.read_array_item(record)?);
        }
        for value in values {
            self.pending.push_back(XmlEvent::StartElement(start.clone()));
            self.pending.push_back(XmlEvent::Text(value));
            self.pending.push_back(XmlEvent::EndElement);
        }
        Ok(())
    }

    fn read_array_item(&mut self, record: TextRecord) -> Result<TypedValue> {
        let r = &mut self.input;
        Ok(match record {
            TextRecord::Bool => TypedValue::Bool(boolean::decode(r)?),
            TextRecord::Int16 => TypedValue::Int(i64::from(r.read_u16_le()? as i16)),
            TextRecord::Int32 => TypedValue::Int(i64::from(r.read_u32_le()? as i32)),
            TextRecord::Int64 => TypedValue::Int(r.read_u64_le()? as i64),
            TextRecord::Float => TypedValue::Float(float::decode_f32(r)?),
            TextRecord::Double => TypedValue::Double(float::decode_f64(r)?),
            TextRecord::Decimal => TypedValue::Decimal(decimal::decode(r)?),
            TextRecord::DateTime => TypedValue::DateTime(datetime::decode(r)?),
            TextRecord::TimeSpan => TypedValue::TimeSpan(datetime::decode_timespan(r)?),
            TextRecord::Uuid => TypedValue::Guid(guid::decode(r)?),
            other => {
                return Err(Error::invalid_payload(r.position(), format!("{} cannot appear in arrays", other.name())));
            }
        })
    }
}
