//! Textual XML → infoset events → binary records.
//!
//! quick-xml liefert die Tokens, der `NsReader` loest die Namespaces auf.
//! Kommentare bleiben erhalten; Processing Instructions und DOCTYPE haben
//! keine Record-Form und werden verworfen. Benachbarte Text-, CDATA- und
//! Referenz-Tokens werden zu einem Text-Event zusammengefasst.

use std::borrow::Cow;
use std::io::Write;

use memchr::memchr;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{QName as XmlQName, ResolveResult};
use quick_xml::reader::NsReader;

use crate::Result;
use crate::dictionary::{StringDictionary, XmlString};
use crate::encoder::BinaryWriter;
use crate::error::Error;
use crate::event::{Attribute, ElementStart, NamespaceDeclaration, XmlEvent};
use crate::namespace::XML_NAMESPACE;
use crate::options::WriterOptions;
use crate::qname::QualifiedName;
use crate::typed_value::{TypedValue, is_xml_whitespace};

/// Parst XML in eine Event-Folge.
pub fn xml_to_events(xml: &str) -> Result<Vec<XmlEvent>> {
    let mut events = Vec::new();
    emit_xml_events(xml, |event| {
        events.push(event);
        Ok(())
    })?;
    Ok(events)
}

/// Kodiert XML mit Standard-Optionen.
pub fn xml_to_binary(xml: &str, dictionary: &StringDictionary) -> Result<Vec<u8>> {
    xml_to_binary_with(xml, dictionary, WriterOptions::default())
}

/// Kodiert XML; die Events werden direkt in den Writer gestreamt.
///
/// Namen, Namespaces und Textwerte, die im Dictionary stehen, werden ueber
/// ihren Index geschrieben.
pub fn xml_to_binary_with(xml: &str, dictionary: &StringDictionary, options: WriterOptions) -> Result<Vec<u8>> {
    let mut writer = BinaryWriter::with_dictionary(Vec::new(), dictionary).with_options(options);
    emit_xml_events(xml, |event| write_dictionary_event(&mut writer, dictionary, &event))?;
    writer.finish()
}

fn write_dictionary_event<W: Write>(
    writer: &mut BinaryWriter<'_, W>,
    dictionary: &StringDictionary,
    event: &XmlEvent,
) -> Result<()> {
    match event {
        XmlEvent::StartElement(start) => {
            let name = &start.name;
            writer.start_element(
                Some(&*name.prefix),
                lookup(dictionary, &name.local_name),
                Some(lookup(dictionary, &name.namespace_uri)),
            )?;
            for ns in &start.namespaces {
                writer.write_xmlns_attribute(Some(&*ns.prefix), lookup(dictionary, &ns.uri))?;
            }
            for attr in &start.attributes {
                let prefix = (!attr.name.prefix.is_empty()).then_some(&*attr.name.prefix);
                let namespace =
                    (!attr.name.namespace_uri.is_empty()).then(|| lookup(dictionary, &attr.name.namespace_uri));
                let value = lookup_value(dictionary, &attr.value);
                writer.write_attribute(prefix, lookup(dictionary, &attr.name.local_name), namespace, &value)?;
            }
            Ok(())
        }
        XmlEvent::Text(value) => writer.write_value(&lookup_value(dictionary, value)),
        other => writer.write_event(other),
    }
}

fn lookup<'a>(dictionary: &'a StringDictionary, value: &'a str) -> XmlString<'a> {
    match dictionary.lookup(value) {
        Some(ds) => XmlString::Dictionary(ds),
        None => XmlString::Text(value),
    }
}

fn lookup_value(dictionary: &StringDictionary, value: &TypedValue) -> TypedValue {
    match value {
        TypedValue::Text(text) => match dictionary.lookup(text) {
            Some(ds) => TypedValue::Dictionary(ds.clone()),
            None => value.clone(),
        },
        other => other.clone(),
    }
}

/// Ruft `emit` fuer jedes Event des Dokuments auf.
pub(crate) fn emit_xml_events(xml: &str, mut emit: impl FnMut(XmlEvent) -> Result<()>) -> Result<()> {
    let mut reader = NsReader::from_reader(xml.as_bytes());
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut depth: usize = 0;
    // Text wird gesammelt und vor jedem anderen Event geflusht
    let mut pending_text: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                flush_text(&mut pending_text, depth, &mut emit)?;
                emit(XmlEvent::StartElement(read_start(&reader, &e)?))?;
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                flush_text(&mut pending_text, depth, &mut emit)?;
                emit(XmlEvent::StartElement(read_start(&reader, &e)?))?;
                emit(XmlEvent::EndElement)?;
            }
            Ok(Event::End(_)) => {
                flush_text(&mut pending_text, depth, &mut emit)?;
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| Error::XmlParseError("end tag without open element".into()))?;
                emit(XmlEvent::EndElement)?;
            }
            Ok(Event::Text(e)) => {
                let raw = utf8(&e)?;
                let text = quick_xml::escape::unescape(raw).map_err(|er| Error::XmlParseError(er.to_string()))?;
                push_text(&mut pending_text, &normalize_line_endings(&text));
            }
            Ok(Event::CData(e)) => {
                push_text(&mut pending_text, &normalize_line_endings(utf8(e.as_ref())?));
            }
            Ok(Event::GeneralRef(e)) => {
                let resolved = resolve_reference(utf8(e.as_ref())?)?;
                push_text(&mut pending_text, &resolved);
            }
            Ok(Event::Comment(e)) => {
                flush_text(&mut pending_text, depth, &mut emit)?;
                let text = normalize_line_endings(utf8(e.as_ref())?);
                emit(XmlEvent::Comment(text.as_ref().into()))?;
            }
            Ok(Event::PI(_)) => log::debug!("processing instruction dropped"),
            Ok(Event::DocType(_)) => log::debug!("DOCTYPE dropped"),
            Ok(Event::Decl(_)) => {}
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlParseError(format!(
                    "parse XML error at {}: {e}",
                    reader.buffer_position()
                )));
            }
        }
        buf.clear();
    }

    flush_text(&mut pending_text, depth, &mut emit)?;
    if depth > 0 {
        return Err(Error::XmlParseError(format!("{depth} element(s) not closed at end of input")));
    }
    Ok(())
}

/// Gesammelten Text als Event liefern. Ausserhalb des Root-Elements ist nur
/// Whitespace erlaubt; er wird verworfen.
fn flush_text(pending: &mut Option<String>, depth: usize, emit: &mut impl FnMut(XmlEvent) -> Result<()>) -> Result<()> {
    let Some(text) = pending.take() else {
        return Ok(());
    };
    if depth == 0 {
        if !is_xml_whitespace(&text) {
            return Err(Error::XmlParseError("character data outside root element".into()));
        }
        return Ok(());
    }
    emit(XmlEvent::Text(TypedValue::Text(text.into())))
}

fn push_text(pending: &mut Option<String>, value: &str) {
    if value.is_empty() {
        return;
    }
    match pending {
        Some(existing) => existing.push_str(value),
        None => *pending = Some(value.to_string()),
    }
}

fn read_start(reader: &NsReader<&[u8]>, e: &BytesStart<'_>) -> Result<ElementStart> {
    let name = e.name();
    let (ns, local) = reader.resolver().resolve_element(name);
    let prefix = prefix_of(name)?;
    let namespace_uri = resolve_to_uri(ns, prefix)?;
    let mut start = ElementStart::new(QualifiedName::new(prefix, utf8(local.into_inner())?, namespace_uri));

    for attr in e.attributes() {
        let attr = attr.map_err(|er| Error::XmlParseError(er.to_string()))?;
        let key = attr.key.as_ref();
        let value = attribute_value(&attr.value)?;
        if key == b"xmlns" {
            start.namespaces.push(NamespaceDeclaration::new("", value));
            continue;
        }
        if let Some(declared) = key.strip_prefix(b"xmlns:") {
            start.namespaces.push(NamespaceDeclaration::new(utf8(declared)?, value));
            continue;
        }
        let (ns, local) = reader.resolver().resolve_attribute(attr.key);
        let prefix = prefix_of(attr.key)?;
        let namespace_uri = resolve_to_uri(ns, prefix)?;
        start.attributes.push(Attribute {
            name: QualifiedName::new(prefix, utf8(local.into_inner())?, namespace_uri),
            value: TypedValue::Text(value.into()),
        });
    }
    Ok(start)
}

fn resolve_to_uri(ns: ResolveResult<'_>, prefix: &str) -> Result<String> {
    match ns {
        ResolveResult::Bound(ns) => Ok(utf8(ns.into_inner())?.to_string()),
        ResolveResult::Unbound => Ok(String::new()),
        ResolveResult::Unknown(_) if prefix == "xml" => Ok(XML_NAMESPACE.to_string()),
        ResolveResult::Unknown(_) => Err(Error::XmlParseError(format!("unbound namespace prefix '{prefix}'"))),
    }
}

fn prefix_of(name: XmlQName<'_>) -> Result<&str> {
    let raw = name.into_inner();
    match memchr(b':', raw) {
        Some(pos) => utf8(&raw[..pos]),
        None => Ok(""),
    }
}

fn attribute_value(raw: &[u8]) -> Result<String> {
    let raw = utf8(raw)?;
    let value = quick_xml::escape::unescape(raw).map_err(|er| Error::XmlParseError(er.to_string()))?;
    Ok(normalize_line_endings(&value).into_owned())
}

/// `&name;` im Text: Zeichenreferenz oder vordefinierte Entity.
fn resolve_reference(name: &str) -> Result<String> {
    if let Some(digits) = name.strip_prefix('#') {
        let code_point = match digits.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => digits.parse::<u32>().ok(),
        };
        return code_point
            .and_then(char::from_u32)
            .map(String::from)
            .ok_or_else(|| Error::XmlParseError(format!("invalid character reference '&{name};'")));
    }
    resolve_predefined_entity(name)
        .map(str::to_string)
        .ok_or_else(|| Error::XmlParseError(format!("unknown entity '&{name};'")))
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|er| Error::XmlParseError(er.to_string()))
}

/// XML 1.0 Sec. 2.11: \r\n -> \n, alleinstehende \r -> \n
fn normalize_line_endings(s: &str) -> Cow<'_, str> {
    if memchr(b'\r', s.as_bytes()).is_none() {
        return Cow::Borrowed(s);
    }
    Cow::Owned(s.replace("\r\n", "\n").replace('\r', "\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode;

    #[test]
    fn simple_document() {
        let events = xml_to_events("<root a=\"1\">hi</root>").unwrap();
        let mut root = ElementStart::new(QualifiedName::local("root"));
        root.attributes.push(Attribute {
            name: QualifiedName::local("a"),
            value: TypedValue::Text("1".into()),
        });
        assert_eq!(
            events,
            [XmlEvent::StartElement(root), XmlEvent::text("hi"), XmlEvent::EndElement]
        );
    }

    #[test]
    fn empty_element_tag() {
        assert_eq!(
            xml_to_events("<root/>").unwrap(),
            [XmlEvent::start(QualifiedName::local("root")), XmlEvent::EndElement]
        );
    }

    #[test]
    fn namespaces_resolved() {
        let events = xml_to_events("<s:Env xmlns:s=\"urn:s\" xmlns=\"urn:d\"><Body s:id=\"x\"/></s:Env>").unwrap();
        let XmlEvent::StartElement(env) = &events[0] else { panic!() };
        assert_eq!(env.name, QualifiedName::new("s", "Env", "urn:s"));
        assert_eq!(
            env.namespaces,
            [NamespaceDeclaration::new("s", "urn:s"), NamespaceDeclaration::new("", "urn:d")]
        );
        let XmlEvent::StartElement(body) = &events[1] else { panic!() };
        assert_eq!(body.name, QualifiedName::new("", "Body", "urn:d"));
        assert_eq!(body.attribute("id", "urn:s"), Some(&TypedValue::Text("x".into())));
    }

    #[test]
    fn xml_prefix_attribute() {
        let events = xml_to_events("<r xml:lang=\"de\"/>").unwrap();
        let XmlEvent::StartElement(r) = &events[0] else { panic!() };
        assert_eq!(r.attribute("lang", XML_NAMESPACE), Some(&TypedValue::Text("de".into())));
    }

    /// Text, Referenzen und CDATA ergeben ein einziges Text-Event.
    #[test]
    fn text_coalesced() {
        let events = xml_to_events("<r>a &amp; b<![CDATA[<c>]]>&#x41;</r>").unwrap();
        assert_eq!(events[1], XmlEvent::text("a & b<c>A"));
        assert_eq!(events.len(), 3);
    }

    #[test]
    fn attribute_entities_unescaped() {
        let events = xml_to_events("<r v=\"&lt;&quot;&#65;\"/>").unwrap();
        let XmlEvent::StartElement(r) = &events[0] else { panic!() };
        assert_eq!(r.attribute("v", ""), Some(&TypedValue::Text("<\"A".into())));
    }

    #[test]
    fn comments_kept_pi_dropped() {
        let events = xml_to_events("<?xml version=\"1.0\"?><!-- c --><r><?pi data?></r>").unwrap();
        assert_eq!(
            events,
            [
                XmlEvent::Comment(" c ".into()),
                XmlEvent::start(QualifiedName::local("r")),
                XmlEvent::EndElement,
            ]
        );
    }

    #[test]
    fn whitespace_outside_root_dropped() {
        let events = xml_to_events("\n  <r/>\n").unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn line_endings_normalized() {
        let events = xml_to_events("<r>a\r\nb\rc</r>").unwrap();
        assert_eq!(events[1], XmlEvent::text("a\nb\nc"));
    }

    #[test]
    fn malformed_inputs() {
        for xml in ["<r>", "<r></s>", "text<r/>", "<p:r/>", "<r>&bogus;</r>"] {
            let err = xml_to_events(xml).unwrap_err();
            assert_eq!(err.kind(), crate::ErrorKind::MalformedInput, "{xml}: {err}");
        }
    }

    #[test]
    fn to_binary_minimal() {
        let bytes = xml_to_binary("<root/>", StringDictionary::empty()).unwrap();
        assert_eq!(bytes, [0x40, 0x04, b'r', b'o', b'o', b't', 0x01]);
    }

    #[test]
    fn to_binary_uses_dictionary() {
        let dict = StringDictionary::with_entries(["Envelope", "urn:env"]);
        let bytes = xml_to_binary("<Envelope xmlns=\"urn:env\"/>", &dict).unwrap();
        assert_eq!(bytes, [0x42, 0x00, 0x0A, 0x02, 0x01]);
        let events = decode(&bytes, &dict).unwrap();
        let XmlEvent::StartElement(env) = &events[0] else { panic!() };
        assert_eq!(&*env.name.namespace_uri, "urn:env");
    }

    #[test]
    fn to_binary_dictionary_text_and_attribute() {
        let dict = StringDictionary::with_entries(["r", "id", "true-ish"]);
        let bytes = xml_to_binary("<r id=\"true-ish\">true-ish</r>", &dict).unwrap();
        assert_eq!(bytes, [0x42, 0x00, 0x06, 0x02, 0xAA, 0x04, 0xAB, 0x04]);
    }

    #[test]
    fn to_binary_plain_options() {
        let default = xml_to_binary("<r>x</r>", StringDictionary::empty()).unwrap();
        let plain = xml_to_binary_with("<r>x</r>", StringDictionary::empty(), WriterOptions::plain()).unwrap();
        assert_eq!(default, [0x40, 0x01, b'r', 0x99, 0x01, b'x']);
        assert_eq!(plain, [0x40, 0x01, b'r', 0x98, 0x01, b'x', 0x01]);
    }
}
