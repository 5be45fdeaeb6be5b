//! Array records.
//!
//! ```text
//! 0x03 element-record attribute* 0x01 value-tag|1 mb31(count) payload*
//! ```
//!
//! Ein Array-Record ist gleichwertig zu `count` einzelnen Elementen mit
//! gleichem Namen, die je einen Wert enthalten.

use std::io::Write;

use uuid::Uuid;

use crate::bytestream::ByteWriter;
use crate::datetime::{self, DateTime, TimeSpan};
use crate::decimal::{self, Decimal};
use crate::dictionary::XmlString;
use crate::encoder::{BinaryWriter, WriterState, check_local_name};
use crate::record::{RecordType, TextRecord};
use crate::{Error, Result, boolean, float, guid, unsigned_integer};

/// Typen mit fester Breite, die in Array-Records vorkommen duerfen.
pub trait ArrayElement: Copy {
    /// Text-Record der Elemente.
    const RECORD: TextRecord;

    /// Schreibt die Payload eines Elements.
    fn write_payload(self, writer: &mut ByteWriter);
}

impl ArrayElement for bool {
    const RECORD: TextRecord = TextRecord::Bool;

    fn write_payload(self, writer: &mut ByteWriter) {
        boolean::encode(writer, self);
    }
}

impl ArrayElement for i16 {
    const RECORD: TextRecord = TextRecord::Int16;

    fn write_payload(self, writer: &mut ByteWriter) {
        writer.write_u16_le(self as u16);
    }
}

impl ArrayElement for i32 {
    const RECORD: TextRecord = TextRecord::Int32;

    fn write_payload(self, writer: &mut ByteWriter) {
        writer.write_u32_le(self as u32);
    }
}

impl ArrayElement for i64 {
    const RECORD: TextRecord = TextRecord::Int64;

    fn write_payload(self, writer: &mut ByteWriter) {
        writer.write_u64_le(self as u64);
    }
}

impl ArrayElement for f32 {
    const RECORD: TextRecord = TextRecord::Float;

    fn write_payload(self, writer: &mut ByteWriter) {
        float::encode_f32(writer, self);
    }
}

impl ArrayElement for f64 {
    const RECORD: TextRecord = TextRecord::Double;

    fn write_payload(self, writer: &mut ByteWriter) {
        float::encode_f64(writer, self);
    }
}

impl ArrayElement for Decimal {
    const RECORD: TextRecord = TextRecord::Decimal;

    fn write_payload(self, writer: &mut ByteWriter) {
        decimal::encode(writer, self);
    }
}

impl ArrayElement for DateTime {
    const RECORD: TextRecord = TextRecord::DateTime;

    fn write_payload(self, writer: &mut ByteWriter) {
        datetime::encode(writer, self);
    }
}

impl ArrayElement for TimeSpan {
    const RECORD: TextRecord = TextRecord::TimeSpan;

    fn write_payload(self, writer: &mut ByteWriter) {
        datetime::encode_timespan(writer, self);
    }
}

impl ArrayElement for Uuid {
    const RECORD: TextRecord = TextRecord::Uuid;

    fn write_payload(self, writer: &mut ByteWriter) {
        guid::encode(writer, &self);
    }
}

impl<W: Write> BinaryWriter<'_, W> {
    /// Schreibt `values[offset..offset + count]` als einen Array-Record.
    ///
    /// Bei `count == 0` wird nichts geschrieben. Arrays duerfen auch auf
    /// Dokumentebene stehen (jedes Element ist dann ein eigenes Top-Level-Element).
    pub fn write_array<'n, T: ArrayElement>(
        &mut self,
        prefix: Option<&str>,
        local_name: impl Into<XmlString<'n>>,
        namespace: Option<XmlString<'_>>,
        values: &[T],
        offset: usize,
        count: usize,
    ) -> Result<()> {
        let local_name = local_name.into();
        self.guarded(|w| {
            if offset.checked_add(count).is_none_or(|end| end > values.len()) {
                return Err(Error::InvalidArrayRange { offset, count, len: values.len() });
            }
            if matches!(w.state, WriterState::Attribute | WriterState::AfterDocument) {
                return Err(Error::invalid_state("write_array", w.state.name()));
            }
            check_local_name(local_name.as_str())?;
            if count == 0 {
                return Ok(());
            }
            w.auto_complete()?;
            w.buf.write_u8(RecordType::Array.tag());
            let prefix = w.scope.open_element(prefix, namespace)?;
            let result = w.write_array_body(&prefix, local_name, &values[offset..offset + count]);
            w.scope.close_element();
            result
        })
    }

    fn write_array_body<T: ArrayElement>(&mut self, prefix: &str, local_name: XmlString<'_>, values: &[T]) -> Result<()> {
        self.write_element_record(prefix, local_name)?;
        self.write_pending_namespaces()?;
        self.buf.write_u8(RecordType::EndElement.tag());
        self.buf.write_u8(T::RECORD.tag_with_end(true));
        unsigned_integer::encode_len(&mut self.buf, values.len())?;
        for &value in values {
            value.write_payload(&mut self.buf);
        }
        Ok(())
    }
}
