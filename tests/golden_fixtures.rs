//! Feste Byte-Folgen ueber die oeffentliche API: Writer, `encode` und
//! `decode` muessen dieselben Fixtures erzeugen bzw. akzeptieren.

use nbfx::{
    Attribute, BinaryWriter, ElementStart, NamespaceDeclaration, QualifiedName, StringDictionary, TypedValue,
    XmlEvent, XmlString, decode, encode,
};

fn scenario_a_bytes() -> Vec<u8> {
    let mut bytes = vec![0x40, 0x04];
    bytes.extend_from_slice(b"root");
    bytes.extend_from_slice(&[0x04, 0x01, b'a', 0xA8]);
    bytes.extend_from_slice(&[0x02, 0x00]);
    bytes.extend_from_slice(&[0x98, 0x05]);
    bytes.extend_from_slice(b"     ");
    bytes.extend_from_slice(&[0x40, 0x03]);
    bytes.extend_from_slice(b"AAA");
    bytes.extend_from_slice(&[0x08, 0x07]);
    bytes.extend_from_slice(b"urn:AAA");
    bytes.extend_from_slice(&[0x01, 0x01]);
    bytes
}

fn scenario_a_events() -> Vec<XmlEvent> {
    let mut root = ElementStart::new(QualifiedName::local("root"));
    root.attributes.push(Attribute {
        name: QualifiedName::local("a"),
        value: TypedValue::Text("".into()),
    });
    let mut aaa = ElementStart::new(QualifiedName::new("", "AAA", "urn:AAA"));
    aaa.namespaces.push(NamespaceDeclaration::new("", "urn:AAA"));
    vec![
        XmlEvent::StartElement(root),
        XmlEvent::Comment("".into()),
        XmlEvent::text("     "),
        XmlEvent::StartElement(aaa),
        XmlEvent::EndElement,
        XmlEvent::EndElement,
    ]
}

#[test]
fn scenario_a_writer() {
    let mut w = BinaryWriter::new(Vec::new());
    w.start_element(None, "root", None).unwrap();
    w.write_attribute_string(None, "a", None, "").unwrap();
    w.write_comment("").unwrap();
    w.write_whitespace("     ").unwrap();
    w.start_element(None, "AAA", Some(XmlString::Text("urn:AAA"))).unwrap();
    w.end_element().unwrap();
    w.end_element().unwrap();
    assert_eq!(w.finish().unwrap(), scenario_a_bytes());
}

#[test]
fn scenario_a_events_encode_to_fixture() {
    let bytes = encode(&scenario_a_events(), StringDictionary::empty()).unwrap();
    assert_eq!(bytes, scenario_a_bytes());
}

#[test]
fn scenario_a_fixture_decodes_to_events() {
    let events = decode(&scenario_a_bytes(), StringDictionary::empty()).unwrap();
    assert_eq!(events, scenario_a_events());
}

/// Dictionary-Name plus leerer Namespace als Dictionary-String.
#[test]
fn scenario_b_dictionary_element() {
    let mut dict = StringDictionary::new();
    let foo = dict.add("FOO");
    let empty = dict.add("");
    assert_eq!(foo.key(), 0);

    let mut w = BinaryWriter::with_dictionary(Vec::new(), &dict);
    w.start_element(None, &foo, Some(XmlString::Dictionary(&empty))).unwrap();
    w.end_element().unwrap();
    let bytes = w.finish().unwrap();
    assert_eq!(bytes, [0x42, 0x00, 0x01]);

    let events = decode(&bytes, &dict).unwrap();
    assert_eq!(events, [XmlEvent::start(QualifiedName::local("FOO")), XmlEvent::EndElement]);
}

#[test]
fn scenario_c_sequential_keys_and_two_byte_varint() {
    let mut dict = StringDictionary::new();
    let strings: Vec<_> = (0..260).map(|i| dict.add(&format!("s{i}"))).collect();
    for (i, ds) in strings.iter().enumerate() {
        assert_eq!(ds.key() as usize, i);
    }

    for key in [128usize, 150, 191, 200, 259] {
        let mut w = BinaryWriter::with_dictionary(Vec::new(), &dict);
        w.start_element(None, &strings[key], None).unwrap();
        w.end_element().unwrap();
        let bytes = w.finish().unwrap();

        let wire = key * 2;
        assert_eq!(bytes.len(), 4, "key {key}");
        assert_eq!(bytes[1], (wire & 0x7F) as u8 | 0x80, "key {key}");
        assert_eq!(bytes[2], (wire >> 7) as u8, "key {key}");

        let events = decode(&bytes, &dict).unwrap();
        assert_eq!(events[0], XmlEvent::start(QualifiedName::local(format!("s{key}"))));
    }

    let mut w = BinaryWriter::with_dictionary(Vec::new(), &dict);
    w.start_element(None, &strings[128], None).unwrap();
    w.end_element().unwrap();
    assert_eq!(w.finish().unwrap(), [0x42, 0x80, 0x02, 0x01]);
}

#[test]
fn scenario_d_int16_array() {
    let values = [4i16, 6, 8, 10, 12];
    let mut w = BinaryWriter::new(Vec::new());
    w.write_array(None, "el", None, &values, 0, values.len()).unwrap();
    let array = w.finish().unwrap();
    assert_eq!(
        array,
        [
            0x03, 0x40, 0x02, b'e', b'l', 0x01, 0x8B, 0x05, 0x04, 0x00, 0x06, 0x00, 0x08, 0x00, 0x0A, 0x00,
            0x0C, 0x00
        ]
    );

    let mut individual = Vec::new();
    for v in values {
        individual.push(XmlEvent::start(QualifiedName::local("el")));
        individual.push(XmlEvent::Text(TypedValue::Int(i64::from(v))));
        individual.push(XmlEvent::EndElement);
    }
    assert_eq!(decode(&array, StringDictionary::empty()).unwrap(), individual);

    // Fuenf einzelne Elemente innerhalb eines Roots gegen denselben Root mit Array
    let mut w = BinaryWriter::new(Vec::new());
    w.start_element(None, "r", None).unwrap();
    for v in values {
        w.start_element(None, "el", None).unwrap();
        w.write_value(&TypedValue::Int(i64::from(v))).unwrap();
        w.end_element().unwrap();
    }
    let separate = w.finish().unwrap();

    let mut w = BinaryWriter::new(Vec::new());
    w.start_element(None, "r", None).unwrap();
    w.write_array(None, "el", None, &values, 0, values.len()).unwrap();
    let packed = w.finish().unwrap();
    assert!(packed.len() < separate.len(), "{} >= {}", packed.len(), separate.len());
}

#[test]
fn minimal_document_is_stable() {
    let run = || {
        let events = [XmlEvent::start(QualifiedName::local("root")), XmlEvent::EndElement];
        encode(&events, StringDictionary::empty()).unwrap()
    };
    let first = run();
    assert_eq!(first, [0x40, 0x04, b'r', b'o', b'o', b't', 0x01]);
    for _ in 0..3 {
        assert_eq!(run(), first);
    }
}
