//! Central error types for the binary record codec.
//!
//! Jede Variante gehoert zu genau einer Fehlerklasse ([`ErrorKind`]). Keine
//! Klasse wird intern wiederholt: nach einem Fehler ist der Stream
//! desynchronisiert und der Austausch muss abgebrochen werden.

use core::fmt;
use std::borrow::Cow;

/// Fehlerklasse eines [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Operation ist im aktuellen Writer/Reader-Zustand ungueltig.
    ProtocolViolation,
    /// Eingabe-Bytes sind kein gueltiger Record-Stream.
    MalformedInput,
    /// Wert oder Name verletzt eine Einschraenkung; es wurden keine Bytes geschrieben.
    ConstraintViolation,
    /// Ein konfiguriertes Reader-Limit wurde ueberschritten.
    QuotaExceeded,
    /// Fehler der Byte-Senke.
    Io,
}

/// Reader-Limit, das ein [`Error::QuotaExceeded`] ausgeloest hat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quota {
    /// Maximale Element-Verschachtelung.
    Depth,
    /// Maximale Anzahl Elemente in einem Array-Record.
    ArrayLength,
    /// Maximale Laenge eines Strings in Bytes (Namen, Text, Kommentare).
    StringLength,
}

impl fmt::Display for Quota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Depth => write!(f, "max depth"),
            Self::ArrayLength => write!(f, "max array length"),
            Self::StringLength => write!(f, "max string length"),
        }
    }
}

/// All errors raised while writing or reading a record stream.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// `end_element`/`end_attribute` ohne passendes offenes Gegenstueck.
    EmptyStack {
        /// Die aufgerufene Operation.
        operation: &'static str,
    },
    /// Schreibversuch nach `close()`.
    ClosedWriter,
    /// Operation ist im aktuellen Zustand nicht erlaubt.
    InvalidState {
        /// Die aufgerufene Operation.
        operation: &'static str,
        /// Der Zustand in dem der Fehler auftrat.
        state: &'static str,
    },
    /// Ein Prefix ist im aktuellen Scope nicht gebunden (Writer-Seite).
    UndeclaredPrefix(String),
    /// Unbekanntes Tag-Byte.
    UnknownRecord { tag: u8, offset: usize },
    /// Bekanntes Tag-Byte an einer Stelle, an der es nicht stehen darf.
    UnexpectedRecord {
        tag: u8,
        offset: usize,
        /// Was an dieser Stelle erwartet wurde.
        expected: &'static str,
    },
    /// Der Stream endet mitten in einem Record.
    PrematureEndOfStream { offset: usize },
    /// Der Stream endet, waehrend noch Elemente offen sind.
    UnclosedElements { depth: usize, offset: usize },
    /// Ein Dictionary- oder Session-Index ist in der Tabelle nicht vorhanden.
    UnknownDictionaryKey { key: u32, offset: usize },
    /// Ein Prefix im Stream ist nicht gebunden (Reader-Seite).
    UnboundPrefix { prefix: String, offset: usize },
    /// Ungueltige UTF-8 bzw. UTF-16 Sequenz.
    InvalidText { offset: usize },
    /// Varint ueberschreitet 31 Bit.
    IntegerOverflow { offset: usize },
    /// Fixed-width Payload ist kein gueltiger Wert (Decimal-Scale, DateTime-Kind, ...).
    InvalidPayload {
        offset: usize,
        reason: Cow<'static, str>,
    },
    /// Wert liegt ausserhalb des fuer sein Tag zulaessigen Bereichs.
    ValueOutOfRange(Cow<'static, str>),
    /// Kommentar enthaelt `--` oder endet auf `-`.
    InvalidComment,
    /// Name, Prefix oder Namespace-Bindung ist ungueltig.
    InvalidName(Cow<'static, str>),
    /// Dieselbe DictionaryString-Instanz wurde zweimal in einer Session registriert.
    DuplicateSessionEntry(String),
    /// `offset + count` liegt ausserhalb des Arrays.
    InvalidArrayRange { offset: usize, count: usize, len: usize },
    /// Ein Reader-Limit wurde ueberschritten.
    QuotaExceeded { quota: Quota, limit: usize, actual: usize },
    /// IO-Fehler der Byte-Senke.
    IoError(String),
    /// Textuelles XML ist nicht wohlgeformt (XML-Bridge).
    XmlParseError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyStack { operation } => write!(f, "{operation}: no open element or attribute"),
            Self::ClosedWriter => write!(f, "writer is closed"),
            Self::InvalidState { operation, state } => write!(f, "{operation} is not valid in state {state}"),
            Self::UndeclaredPrefix(prefix) => write!(f, "prefix '{prefix}' is not bound to a namespace"),
            Self::UnknownRecord { tag, offset } => write!(f, "unknown record tag 0x{tag:02X} at offset {offset}"),
            Self::UnexpectedRecord { tag, offset, expected } => {
                write!(f, "unexpected record tag 0x{tag:02X} at offset {offset}, expected {expected}")
            }
            Self::PrematureEndOfStream { offset } => write!(f, "premature end of stream at offset {offset}"),
            Self::UnclosedElements { depth, offset } => {
                write!(f, "stream ended at offset {offset} with {depth} open element(s)")
            }
            Self::UnknownDictionaryKey { key, offset } => {
                write!(f, "dictionary key {key} at offset {offset} is not in the table")
            }
            Self::UnboundPrefix { prefix, offset } => {
                write!(f, "prefix '{prefix}' at offset {offset} is not bound to a namespace")
            }
            Self::InvalidText { offset } => write!(f, "invalid character data at offset {offset}"),
            Self::IntegerOverflow { offset } => write!(f, "variable-length integer overflow at offset {offset}"),
            Self::InvalidPayload { offset, reason } => write!(f, "invalid value at offset {offset}: {reason}"),
            Self::ValueOutOfRange(msg) => write!(f, "value out of range: {msg}"),
            Self::InvalidComment => write!(f, "comment text must not contain '--' or end with '-'"),
            Self::InvalidName(msg) => write!(f, "invalid name: {msg}"),
            Self::DuplicateSessionEntry(value) => {
                write!(f, "dictionary string '{value}' is already registered in this session")
            }
            Self::InvalidArrayRange { offset, count, len } => {
                write!(f, "array range {offset}+{count} exceeds length {len}")
            }
            Self::QuotaExceeded { quota, limit, actual } => {
                write!(f, "{quota} quota exceeded: {actual} > {limit}")
            }
            Self::IoError(msg) => write!(f, "IO error: {msg}"),
            Self::XmlParseError(msg) => write!(f, "XML parse error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}

impl Error {
    /// Ordnet den Fehler seiner Klasse zu.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyStack { .. }
            | Self::ClosedWriter
            | Self::InvalidState { .. }
            | Self::UndeclaredPrefix(_) => ErrorKind::ProtocolViolation,
            Self::UnknownRecord { .. }
            | Self::UnexpectedRecord { .. }
            | Self::PrematureEndOfStream { .. }
            | Self::UnclosedElements { .. }
            | Self::UnknownDictionaryKey { .. }
            | Self::UnboundPrefix { .. }
            | Self::InvalidText { .. }
            | Self::IntegerOverflow { .. }
            | Self::InvalidPayload { .. }
            | Self::XmlParseError(_) => ErrorKind::MalformedInput,
            Self::ValueOutOfRange(_)
            | Self::InvalidComment
            | Self::InvalidName(_)
            | Self::DuplicateSessionEntry(_)
            | Self::InvalidArrayRange { .. } => ErrorKind::ConstraintViolation,
            Self::QuotaExceeded { .. } => ErrorKind::QuotaExceeded,
            Self::IoError(_) => ErrorKind::Io,
        }
    }

    /// Byte-Offset im Eingabestream, falls der Fehler beim Lesen entstand.
    pub fn offset(&self) -> Option<usize> {
        match self {
            Self::UnknownRecord { offset, .. }
            | Self::UnexpectedRecord { offset, .. }
            | Self::PrematureEndOfStream { offset }
            | Self::UnclosedElements { offset, .. }
            | Self::UnknownDictionaryKey { offset, .. }
            | Self::UnboundPrefix { offset, .. }
            | Self::InvalidText { offset }
            | Self::IntegerOverflow { offset }
            | Self::InvalidPayload { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// Verschiebt den Offset um `base` (Fehler aus einem Teilstream).
    pub(crate) fn shifted(self, base: usize) -> Self {
        match self {
            Self::UnknownRecord { tag, offset } => Self::UnknownRecord { tag, offset: base + offset },
            Self::UnexpectedRecord { tag, offset, expected } => Self::UnexpectedRecord {
                tag,
                offset: base + offset,
                expected,
            },
            Self::PrematureEndOfStream { offset } => Self::PrematureEndOfStream { offset: base + offset },
            Self::UnclosedElements { depth, offset } => Self::UnclosedElements { depth, offset: base + offset },
            Self::UnknownDictionaryKey { key, offset } => Self::UnknownDictionaryKey { key, offset: base + offset },
            Self::UnboundPrefix { prefix, offset } => Self::UnboundPrefix { prefix, offset: base + offset },
            Self::InvalidText { offset } => Self::InvalidText { offset: base + offset },
            Self::IntegerOverflow { offset } => Self::IntegerOverflow { offset: base + offset },
            Self::InvalidPayload { offset, reason } => Self::InvalidPayload { offset: base + offset, reason },
            other => other,
        }
    }

    /// Erstellt einen `InvalidState` Fehler.
    pub fn invalid_state(operation: &'static str, state: &'static str) -> Self {
        Self::InvalidState { operation, state }
    }

    /// Erstellt einen `ValueOutOfRange` Fehler mit Nachricht.
    pub fn out_of_range(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::ValueOutOfRange(msg.into())
    }

    /// Erstellt einen `InvalidName` Fehler mit Nachricht.
    pub fn invalid_name(msg: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidName(msg.into())
    }

    /// Erstellt einen `InvalidPayload` Fehler.
    pub fn invalid_payload(offset: usize, reason: impl Into<Cow<'static, str>>) -> Self {
        Self::InvalidPayload {
            offset,
            reason: reason.into(),
        }
    }
}

/// A convenience `Result` type alias using [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stack_display() {
        let e = Error::EmptyStack { operation: "end_element" };
        let msg = e.to_string();
        assert!(msg.contains("end_element"), "{msg}");
        assert_eq!(e.kind(), ErrorKind::ProtocolViolation);
    }

    #[test]
    fn closed_writer_is_protocol_violation() {
        let e = Error::ClosedWriter;
        assert!(e.to_string().contains("closed"));
        assert_eq!(e.kind(), ErrorKind::ProtocolViolation);
        assert_eq!(e.offset(), None);
    }

    #[test]
    fn invalid_state_display() {
        let e = Error::invalid_state("start_attribute", "Content");
        let msg = e.to_string();
        assert!(msg.contains("start_attribute"), "{msg}");
        assert!(msg.contains("Content"), "{msg}");
    }

    /// Lesefehler tragen den Byte-Offset.
    #[test]
    fn unknown_record_display_has_offset() {
        let e = Error::UnknownRecord { tag: 0xFE, offset: 17 };
        let msg = e.to_string();
        assert!(msg.contains("0xFE"), "{msg}");
        assert!(msg.contains("17"), "{msg}");
        assert_eq!(e.kind(), ErrorKind::MalformedInput);
        assert_eq!(e.offset(), Some(17));
    }

    #[test]
    fn unexpected_record_display() {
        let e = Error::UnexpectedRecord { tag: 0x01, offset: 3, expected: "attribute value" };
        let msg = e.to_string();
        assert!(msg.contains("0x01"), "{msg}");
        assert!(msg.contains("attribute value"), "{msg}");
    }

    #[test]
    fn premature_end_display() {
        let e = Error::PrematureEndOfStream { offset: 9 };
        assert!(e.to_string().contains("premature"));
        assert_eq!(e.offset(), Some(9));
    }

    #[test]
    fn unknown_dictionary_key_display() {
        let e = Error::UnknownDictionaryKey { key: 259, offset: 1 };
        let msg = e.to_string();
        assert!(msg.contains("259"), "{msg}");
        assert_eq!(e.kind(), ErrorKind::MalformedInput);
    }

    #[test]
    fn constraint_violations() {
        assert_eq!(Error::InvalidComment.kind(), ErrorKind::ConstraintViolation);
        assert_eq!(Error::out_of_range("ticks").kind(), ErrorKind::ConstraintViolation);
        assert_eq!(Error::invalid_name("xmlns").kind(), ErrorKind::ConstraintViolation);
        assert_eq!(
            Error::DuplicateSessionEntry("foo".into()).kind(),
            ErrorKind::ConstraintViolation
        );
        let e = Error::InvalidArrayRange { offset: 3, count: 4, len: 5 };
        assert!(e.to_string().contains("3+4"), "{e}");
    }

    #[test]
    fn quota_exceeded_display() {
        let e = Error::QuotaExceeded { quota: Quota::Depth, limit: 32, actual: 33 };
        let msg = e.to_string();
        assert!(msg.contains("max depth"), "{msg}");
        assert!(msg.contains("33"), "{msg}");
        assert_eq!(e.kind(), ErrorKind::QuotaExceeded);
    }

    #[test]
    fn io_error_from_std() {
        let io = std::io::Error::other("disk full");
        let e: Error = io.into();
        assert!(e.to_string().contains("disk full"));
        assert_eq!(e.kind(), ErrorKind::Io);
    }

    #[test]
    fn xml_parse_error_is_malformed_input() {
        let e = Error::XmlParseError("unexpected end".into());
        assert!(e.to_string().contains("unexpected end"));
        assert_eq!(e.kind(), ErrorKind::MalformedInput);
        assert_eq!(e.offset(), None);
    }

    #[test]
    fn error_implements_std_error() {
        let e: Box<dyn std::error::Error> = Box::new(Error::ClosedWriter);
        assert!(!e.to_string().is_empty());
    }

    #[test]
    fn error_is_clone_and_eq() {
        let e1 = Error::IntegerOverflow { offset: 4 };
        let e2 = e1.clone();
        assert_eq!(e1, e2);
    }
}
