//! Record tag enumeration shared by writer and reader.
//!
//! Jedes Tag-Byte gehoert zu genau einer Record-Art. Text-Records belegen
//! gerade Tags; das ungerade Nachbar-Tag (`tag | 1`) steht fuer denselben
//! Text mit implizitem EndElement.

use core::fmt;

/// Bit, das einen Text-Record als "mit EndElement" markiert.
pub const WITH_END_ELEMENT: u8 = 0x01;

/// Typ eines Text-Records (gerades Tag).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextRecord {
    Zero,
    One,
    False,
    True,
    Int8,
    Int16,
    Int32,
    Int64,
    Float,
    Double,
    Decimal,
    DateTime,
    Chars8,
    Chars16,
    Chars32,
    Bytes8,
    Bytes16,
    Bytes32,
    StartList,
    EndList,
    Empty,
    Dictionary,
    UniqueId,
    TimeSpan,
    Uuid,
    UInt64,
    Bool,
    UnicodeChars8,
    UnicodeChars16,
    UnicodeChars32,
    QNameDictionary,
}

impl TextRecord {
    const ALL: [TextRecord; 31] = [
        Self::Zero,
        Self::One,
        Self::False,
        Self::True,
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::Float,
        Self::Double,
        Self::Decimal,
        Self::DateTime,
        Self::Chars8,
        Self::Chars16,
        Self::Chars32,
        Self::Bytes8,
        Self::Bytes16,
        Self::Bytes32,
        Self::StartList,
        Self::EndList,
        Self::Empty,
        Self::Dictionary,
        Self::UniqueId,
        Self::TimeSpan,
        Self::Uuid,
        Self::UInt64,
        Self::Bool,
        Self::UnicodeChars8,
        Self::UnicodeChars16,
        Self::UnicodeChars32,
        Self::QNameDictionary,
    ];

    /// Gerades Tag-Byte dieses Text-Records.
    pub const fn tag(self) -> u8 {
        0x80 + 2 * (self as u8)
    }

    /// Tag-Byte mit oder ohne implizites EndElement.
    pub const fn tag_with_end(self, with_end: bool) -> u8 {
        if with_end { self.tag() | WITH_END_ELEMENT } else { self.tag() }
    }

    /// Text-Record fuer ein (gerades oder ungerades) Tag.
    pub fn from_tag(tag: u8) -> Option<Self> {
        let idx = tag.checked_sub(0x80)? / 2;
        Self::ALL.get(idx as usize).copied()
    }

    /// Name wie im Dump ausgegeben.
    pub fn name(self) -> &'static str {
        match self {
            Self::Zero => "ZeroText",
            Self::One => "OneText",
            Self::False => "FalseText",
            Self::True => "TrueText",
            Self::Int8 => "Int8Text",
            Self::Int16 => "Int16Text",
            Self::Int32 => "Int32Text",
            Self::Int64 => "Int64Text",
            Self::Float => "FloatText",
            Self::Double => "DoubleText",
            Self::Decimal => "DecimalText",
            Self::DateTime => "DateTimeText",
            Self::Chars8 => "Chars8Text",
            Self::Chars16 => "Chars16Text",
            Self::Chars32 => "Chars32Text",
            Self::Bytes8 => "Bytes8Text",
            Self::Bytes16 => "Bytes16Text",
            Self::Bytes32 => "Bytes32Text",
            Self::StartList => "StartListText",
            Self::EndList => "EndListText",
            Self::Empty => "EmptyText",
            Self::Dictionary => "DictionaryText",
            Self::UniqueId => "UniqueIdText",
            Self::TimeSpan => "TimeSpanText",
            Self::Uuid => "UuidText",
            Self::UInt64 => "UInt64Text",
            Self::Bool => "BoolText",
            Self::UnicodeChars8 => "UnicodeChars8Text",
            Self::UnicodeChars16 => "UnicodeChars16Text",
            Self::UnicodeChars32 => "UnicodeChars32Text",
            Self::QNameDictionary => "QNameDictionaryText",
        }
    }

    /// Feste Payload-Breite in Bytes fuer Array-Records, `None` wenn der
    /// Typ nicht in Arrays vorkommen darf.
    pub fn array_element_size(self) -> Option<usize> {
        match self {
            Self::Bool => Some(1),
            Self::Int16 => Some(2),
            Self::Int32 | Self::Float => Some(4),
            Self::Int64 | Self::Double | Self::DateTime | Self::TimeSpan => Some(8),
            Self::Decimal | Self::Uuid => Some(16),
            _ => None,
        }
    }
}

/// Eine Record-Art, wie sie am Tag-Byte erkannt wird.
///
/// Die Letter-Varianten tragen den Prefix-Index `0..26` (`a`..`z`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    EndElement,
    Comment,
    Array,
    ShortAttribute,
    Attribute,
    ShortDictionaryAttribute,
    DictionaryAttribute,
    ShortXmlns,
    Xmlns,
    ShortDictionaryXmlns,
    DictionaryXmlns,
    PrefixDictionaryAttribute(u8),
    PrefixAttribute(u8),
    ShortElement,
    Element,
    ShortDictionaryElement,
    DictionaryElement,
    PrefixDictionaryElement(u8),
    PrefixElement(u8),
    Text { record: TextRecord, with_end_element: bool },
}

impl RecordType {
    /// Ordnet ein Tag-Byte seiner Record-Art zu.
    pub fn from_tag(tag: u8) -> Option<Self> {
        let record = match tag {
            0x01 => Self::EndElement,
            0x02 => Self::Comment,
            0x03 => Self::Array,
            0x04 => Self::ShortAttribute,
            0x05 => Self::Attribute,
            0x06 => Self::ShortDictionaryAttribute,
            0x07 => Self::DictionaryAttribute,
            0x08 => Self::ShortXmlns,
            0x09 => Self::Xmlns,
            0x0A => Self::ShortDictionaryXmlns,
            0x0B => Self::DictionaryXmlns,
            0x0C..=0x25 => Self::PrefixDictionaryAttribute(tag - 0x0C),
            0x26..=0x3F => Self::PrefixAttribute(tag - 0x26),
            0x40 => Self::ShortElement,
            0x41 => Self::Element,
            0x42 => Self::ShortDictionaryElement,
            0x43 => Self::DictionaryElement,
            0x44..=0x5D => Self::PrefixDictionaryElement(tag - 0x44),
            0x5E..=0x77 => Self::PrefixElement(tag - 0x5E),
            0x80..=0xBD => Self::Text {
                record: TextRecord::from_tag(tag)?,
                with_end_element: tag & WITH_END_ELEMENT != 0,
            },
            _ => return None,
        };
        Some(record)
    }

    /// Tag-Byte dieser Record-Art.
    pub fn tag(self) -> u8 {
        match self {
            Self::EndElement => 0x01,
            Self::Comment => 0x02,
            Self::Array => 0x03,
            Self::ShortAttribute => 0x04,
            Self::Attribute => 0x05,
            Self::ShortDictionaryAttribute => 0x06,
            Self::DictionaryAttribute => 0x07,
            Self::ShortXmlns => 0x08,
            Self::Xmlns => 0x09,
            Self::ShortDictionaryXmlns => 0x0A,
            Self::DictionaryXmlns => 0x0B,
            Self::PrefixDictionaryAttribute(i) => 0x0C + i,
            Self::PrefixAttribute(i) => 0x26 + i,
            Self::ShortElement => 0x40,
            Self::Element => 0x41,
            Self::ShortDictionaryElement => 0x42,
            Self::DictionaryElement => 0x43,
            Self::PrefixDictionaryElement(i) => 0x44 + i,
            Self::PrefixElement(i) => 0x5E + i,
            Self::Text { record, with_end_element } => record.tag_with_end(with_end_element),
        }
    }

    /// Element-Records (0x40..=0x77).
    pub fn is_element(self) -> bool {
        matches!(
            self,
            Self::ShortElement
                | Self::Element
                | Self::ShortDictionaryElement
                | Self::DictionaryElement
                | Self::PrefixDictionaryElement(_)
                | Self::PrefixElement(_)
        )
    }

    /// Attribut- und Xmlns-Records (0x04..=0x3F).
    pub fn is_attribute(self) -> bool {
        matches!(self.tag(), 0x04..=0x3F)
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EndElement => write!(f, "EndElement"),
            Self::Comment => write!(f, "Comment"),
            Self::Array => write!(f, "Array"),
            Self::ShortAttribute => write!(f, "ShortAttribute"),
            Self::Attribute => write!(f, "Attribute"),
            Self::ShortDictionaryAttribute => write!(f, "ShortDictionaryAttribute"),
            Self::DictionaryAttribute => write!(f, "DictionaryAttribute"),
            Self::ShortXmlns => write!(f, "ShortXmlnsAttribute"),
            Self::Xmlns => write!(f, "XmlnsAttribute"),
            Self::ShortDictionaryXmlns => write!(f, "ShortDictionaryXmlnsAttribute"),
            Self::DictionaryXmlns => write!(f, "DictionaryXmlnsAttribute"),
            Self::PrefixDictionaryAttribute(i) => {
                write!(f, "PrefixDictionaryAttribute{}", prefix_letter(*i).to_ascii_uppercase())
            }
            Self::PrefixAttribute(i) => write!(f, "PrefixAttribute{}", prefix_letter(*i).to_ascii_uppercase()),
            Self::ShortElement => write!(f, "ShortElement"),
            Self::Element => write!(f, "Element"),
            Self::ShortDictionaryElement => write!(f, "ShortDictionaryElement"),
            Self::DictionaryElement => write!(f, "DictionaryElement"),
            Self::PrefixDictionaryElement(i) => {
                write!(f, "PrefixDictionaryElement{}", prefix_letter(*i).to_ascii_uppercase())
            }
            Self::PrefixElement(i) => write!(f, "PrefixElement{}", prefix_letter(*i).to_ascii_uppercase()),
            Self::Text { record, with_end_element } => {
                f.write_str(record.name())?;
                if *with_end_element {
                    f.write_str("WithEndElement")?;
                }
                Ok(())
            }
        }
    }
}

/// Index `0..26` eines Einzelbuchstaben-Prefix `a`..`z`.
pub fn prefix_letter_index(prefix: &str) -> Option<u8> {
    match prefix.as_bytes() {
        [b @ b'a'..=b'z'] => Some(b - b'a'),
        _ => None,
    }
}

/// Buchstabe fuer einen Prefix-Index (`0` → `a`).
pub fn prefix_letter(index: u8) -> char {
    char::from(b'a' + index.min(25))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_tags_are_even() {
        for record in TextRecord::ALL {
            assert_eq!(record.tag() % 2, 0, "{record:?}");
            assert_eq!(TextRecord::from_tag(record.tag()), Some(record));
            assert_eq!(TextRecord::from_tag(record.tag() | 1), Some(record));
        }
        assert_eq!(TextRecord::Zero.tag(), 0x80);
        assert_eq!(TextRecord::Chars8.tag(), 0x98);
        assert_eq!(TextRecord::Empty.tag(), 0xA8);
        assert_eq!(TextRecord::Dictionary.tag(), 0xAA);
        assert_eq!(TextRecord::Uuid.tag(), 0xB0);
        assert_eq!(TextRecord::QNameDictionary.tag(), 0xBC);
    }

    #[test]
    fn every_tag_round_trips() {
        for tag in 0u8..=0xFF {
            if let Some(record) = RecordType::from_tag(tag) {
                assert_eq!(record.tag(), tag, "{record}");
            }
        }
    }

    #[test]
    fn unknown_tags() {
        for tag in [0x00, 0x78, 0x7F, 0xBE, 0xBF, 0xFF] {
            assert_eq!(RecordType::from_tag(tag), None, "0x{tag:02X}");
        }
    }

    #[test]
    fn letter_families() {
        assert_eq!(RecordType::from_tag(0x0C), Some(RecordType::PrefixDictionaryAttribute(0)));
        assert_eq!(RecordType::from_tag(0x3F), Some(RecordType::PrefixAttribute(25)));
        assert_eq!(RecordType::from_tag(0x44), Some(RecordType::PrefixDictionaryElement(0)));
        assert_eq!(RecordType::from_tag(0x77), Some(RecordType::PrefixElement(25)));
        assert!(RecordType::PrefixElement(3).is_element());
        assert!(RecordType::PrefixAttribute(3).is_attribute());
        assert!(RecordType::ShortXmlns.is_attribute());
        assert!(!RecordType::Comment.is_attribute());
    }

    #[test]
    fn with_end_element_tag() {
        let r = RecordType::from_tag(0x8B).unwrap();
        assert_eq!(
            r,
            RecordType::Text { record: TextRecord::Int16, with_end_element: true }
        );
        assert_eq!(r.to_string(), "Int16TextWithEndElement");
    }

    #[test]
    fn array_element_sizes() {
        assert_eq!(TextRecord::Int16.array_element_size(), Some(2));
        assert_eq!(TextRecord::Decimal.array_element_size(), Some(16));
        assert_eq!(TextRecord::Chars8.array_element_size(), None);
    }

    #[test]
    fn prefix_letters() {
        assert_eq!(prefix_letter_index("a"), Some(0));
        assert_eq!(prefix_letter_index("z"), Some(25));
        assert_eq!(prefix_letter_index("ab"), None);
        assert_eq!(prefix_letter_index("A"), None);
        assert_eq!(prefix_letter_index(""), None);
        assert_eq!(prefix_letter(2), 'c');
    }
}
