//! Typed content values.
//!
//! Ein [`TypedValue`] ist der Inhalt eines Text-Records: der Writer waehlt
//! anhand der Variante das Tag, der Reader liefert die Variante zurueck, die
//! zum gelesenen Tag gehoert. Die Textform ([`fmt::Display`]) ist die
//! lexikalische XML-Schema-Darstellung und wird von der XML-Bridge verwendet.

use std::fmt;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use uuid::Uuid;

use crate::datetime::{DateTime, TimeSpan};
use crate::decimal::Decimal;
use crate::dictionary::DictionaryString;
use crate::float::{fmt_f32, fmt_f64};
use crate::guid::UniqueId;

/// Inhalt eines Text-Records.
#[derive(Debug, Clone)]
pub enum TypedValue {
    Bool(bool),
    Int(i64),
    /// Nur fuer Werte oberhalb von `i64::MAX`; kleinere Werte sind `Int`.
    UInt64(u64),
    Float(f32),
    Double(f64),
    Decimal(Decimal),
    DateTime(DateTime),
    TimeSpan(TimeSpan),
    Guid(Uuid),
    UniqueId(UniqueId),
    Text(Arc<str>),
    Bytes(Vec<u8>),
    /// String aus dem Dictionary oder der Session.
    Dictionary(DictionaryString),
    /// Qualifizierter Name mit Dictionary-Localname.
    QName {
        prefix: Arc<str>,
        local_name: DictionaryString,
    },
    /// Liste von Werten (nicht verschachtelt).
    List(Vec<TypedValue>),
}

impl TypedValue {
    /// `true` wenn der Wert nur aus XML-Whitespace besteht (leerer Text eingeschlossen).
    pub fn is_whitespace(&self) -> bool {
        match self {
            Self::Text(s) => is_xml_whitespace(s),
            Self::Dictionary(ds) => is_xml_whitespace(ds.value()),
            _ => false,
        }
    }

    /// Textform als String, ohne Allokation fuer Text- und Dictionary-Werte.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Dictionary(ds) => Some(ds.value()),
            _ => None,
        }
    }
}

/// `true` fuer Strings aus Space, Tab, CR und LF.
pub fn is_xml_whitespace(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
}

/// Floats werden bitweise verglichen, damit NaN-Werte den Round-Trip bestehen.
impl PartialEq for TypedValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::UInt64(a), Self::UInt64(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Double(a), Self::Double(b)) => a.to_bits() == b.to_bits(),
            (Self::Decimal(a), Self::Decimal(b)) => a == b,
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            (Self::TimeSpan(a), Self::TimeSpan(b)) => a == b,
            (Self::Guid(a), Self::Guid(b)) => a == b,
            (Self::UniqueId(a), Self::UniqueId(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Dictionary(a), Self::Dictionary(b)) => a == b,
            (
                Self::QName { prefix: pa, local_name: la },
                Self::QName { prefix: pb, local_name: lb },
            ) => pa == pb && la == lb,
            (Self::List(a), Self::List(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for TypedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => f.write_str(if *v { "true" } else { "false" }),
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt64(v) => write!(f, "{v}"),
            Self::Float(v) => fmt_f32(*v, f),
            Self::Double(v) => fmt_f64(*v, f),
            Self::Decimal(v) => write!(f, "{v}"),
            Self::DateTime(v) => write!(f, "{v}"),
            Self::TimeSpan(v) => write!(f, "{v}"),
            Self::Guid(v) => write!(f, "{}", v.hyphenated()),
            Self::UniqueId(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
            Self::Bytes(b) => f.write_str(&STANDARD.encode(b)),
            Self::Dictionary(ds) => f.write_str(ds.value()),
            Self::QName { prefix, local_name } => {
                if prefix.is_empty() {
                    f.write_str(local_name.value())
                } else {
                    write!(f, "{prefix}:{}", local_name.value())
                }
            }
            Self::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    write!(f, "{item}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<bool> for TypedValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for TypedValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<i64> for TypedValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

/// Werte bis `i64::MAX` werden zu `Int` normalisiert.
impl From<u64> for TypedValue {
    fn from(v: u64) -> Self {
        match i64::try_from(v) {
            Ok(v) => Self::Int(v),
            Err(_) => Self::UInt64(v),
        }
    }
}

impl From<f32> for TypedValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for TypedValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<Decimal> for TypedValue {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<DateTime> for TypedValue {
    fn from(v: DateTime) -> Self {
        Self::DateTime(v)
    }
}

impl From<TimeSpan> for TypedValue {
    fn from(v: TimeSpan) -> Self {
        Self::TimeSpan(v)
    }
}

impl From<Uuid> for TypedValue {
    fn from(v: Uuid) -> Self {
        Self::Guid(v)
    }
}

impl From<UniqueId> for TypedValue {
    fn from(v: UniqueId) -> Self {
        Self::UniqueId(v)
    }
}

impl From<&str> for TypedValue {
    fn from(v: &str) -> Self {
        Self::Text(v.into())
    }
}

impl From<String> for TypedValue {
    fn from(v: String) -> Self {
        Self::Text(v.into())
    }
}

impl From<Vec<u8>> for TypedValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<DictionaryString> for TypedValue {
    fn from(v: DictionaryString) -> Self {
        Self::Dictionary(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datetime::DateTimeKind;
    use crate::dictionary::StringDictionary;

    #[test]
    fn u64_normalizes_to_int() {
        assert_eq!(TypedValue::from(5u64), TypedValue::Int(5));
        assert_eq!(TypedValue::from(u64::MAX), TypedValue::UInt64(u64::MAX));
    }

    #[test]
    fn nan_equals_itself() {
        assert_eq!(TypedValue::Double(f64::NAN), TypedValue::Double(f64::NAN));
        assert_ne!(TypedValue::Double(0.0), TypedValue::Double(-0.0));
        assert_ne!(TypedValue::Float(1.0), TypedValue::Double(1.0));
    }

    #[test]
    fn display_lexical_forms() {
        assert_eq!(TypedValue::Bool(true).to_string(), "true");
        assert_eq!(TypedValue::Int(-7).to_string(), "-7");
        assert_eq!(TypedValue::Double(f64::NEG_INFINITY).to_string(), "-INF");
        assert_eq!(TypedValue::Bytes(vec![1, 2, 3]).to_string(), "AQID");
        let dt = DateTime::from_civil(2024, 5, 6, 7, 8, 9, DateTimeKind::Utc).unwrap();
        assert_eq!(TypedValue::DateTime(dt).to_string(), "2024-05-06T07:08:09Z");
        assert_eq!(
            TypedValue::Guid(Uuid::nil()).to_string(),
            "00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn display_qname_and_list() {
        let mut dict = StringDictionary::new();
        let local = dict.add("Action");
        let qname = TypedValue::QName { prefix: "a".into(), local_name: local.clone() };
        assert_eq!(qname.to_string(), "a:Action");
        let unprefixed = TypedValue::QName { prefix: "".into(), local_name: local };
        assert_eq!(unprefixed.to_string(), "Action");
        let list = TypedValue::List(vec![TypedValue::Int(1), TypedValue::from("x"), TypedValue::Bool(false)]);
        assert_eq!(list.to_string(), "1 x false");
    }

    #[test]
    fn whitespace_detection() {
        assert!(TypedValue::from(" \t\r\n").is_whitespace());
        assert!(TypedValue::from("").is_whitespace());
        assert!(!TypedValue::from(" x ").is_whitespace());
        assert!(!TypedValue::Int(0).is_whitespace());
    }
}
