//! nbfx – binary XML record codec with shared dictionaries and string sessions
//!
//! Ein XML-Infoset wird als Folge getaggter Records serialisiert. Namen und
//! Werte koennen ueber ein gemeinsames Dictionary (gerade Indizes) oder ueber
//! eine Session pro Austausch (ungerade Indizes) adressiert werden.
//!
//! # Beispiel
//!
//! ```
//! use nbfx::{BinaryReader, BinaryWriter, StringDictionary, TypedValue, XmlEvent};
//!
//! let mut dictionary = StringDictionary::new();
//! let envelope = dictionary.add("Envelope");
//!
//! let mut writer = BinaryWriter::with_dictionary(Vec::new(), &dictionary);
//! writer.start_element(None, &envelope, None).unwrap();
//! writer.write_value(&TypedValue::Int(42)).unwrap();
//! writer.end_element().unwrap();
//! let bytes = writer.finish().unwrap();
//! assert_eq!(bytes, [0x42, 0x00, 0x89, 42]);
//!
//! let mut reader = BinaryReader::with_dictionary(&bytes, &dictionary);
//! assert!(reader.advance().unwrap());
//! assert!(matches!(reader.current(), Some(XmlEvent::StartElement(_))));
//! ```

pub mod binary;
pub mod boolean;
pub mod bytestream;
pub mod datetime;
pub mod decimal;
pub mod decoder;
pub mod dictionary;
pub mod encoder;
pub mod error;
pub mod event;
pub mod float;
pub mod guid;
pub mod integer;
pub mod namespace;
pub mod options;
pub mod qname;
pub mod record;
pub mod session;
pub mod string;
pub mod typed_value;
pub mod unsigned_integer;
pub mod xml;
pub mod xml_serializer;

pub use error::{Error, ErrorKind, Result};

/// HashMap mit ahash (schnell, nicht DoS-resistent; nur intern).
pub(crate) type FastHashMap<K, V> = hashbrown::HashMap<K, V, ahash::RandomState>;

/// IndexMap mit ahash (deterministische Iteration + schnelles Hashing).
pub(crate) type FastIndexMap<K, V> = indexmap::IndexMap<K, V, ahash::RandomState>;

// Public API: Tabellen
pub use dictionary::{DictionaryString, StringDictionary, XmlString};
pub use namespace::NamespaceScope;
pub use session::{ReaderSession, WriterSession};

// Public API: Events + Werte
pub use event::{Attribute, ElementStart, NamespaceDeclaration, XmlEvent};
pub use qname::QualifiedName;
pub use typed_value::TypedValue;
pub use datetime::{DateTime, DateTimeKind, TimeSpan};
pub use decimal::Decimal;
pub use guid::UniqueId;

// Public API: Options
pub use options::{ReaderQuotas, WriterOptions};

// Public API: Encoder/Decoder
pub use decoder::{BinaryReader, DecodeIter, decode, decode_with, decode_with_session};
pub use encoder::{ArrayElement, BinaryWriter, encode, encode_with_session};

// Public API: XML
pub use xml::{xml_to_binary, xml_to_binary_with, xml_to_events};
pub use xml_serializer::{events_to_pretty_xml, events_to_xml, events_to_xml_iter_fallible, events_to_xml_writer};
