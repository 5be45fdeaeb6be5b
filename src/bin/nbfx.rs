//! nbfx CLI: XML <-> binary record conversion.

use clap::{Args, Parser, Subcommand};
use nbfx::xml_serializer::events_to_pretty_xml_iter_fallible;
use nbfx::{
    BinaryReader, ReaderQuotas, StringDictionary, WriterOptions, XmlEvent, events_to_xml_iter_fallible,
    xml_to_binary_with,
};
use std::io::{IsTerminal, Read, Write};
use std::process;

#[derive(Parser)]
#[command(name = "nbfx", about = "XML <-> binary XML record conversion")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Encode XML to binary records
    Encode(EncodeArgs),
    /// Decode binary records to XML
    Decode(DecodeArgs),
    /// List the events of a binary document with depth and byte offset
    Dump(DumpArgs),
}

#[derive(Args)]
struct CommonArgs {
    /// Input file (- for stdin)
    #[arg(short, long)]
    input: String,

    /// Output file (optional; without -o auto-derived, -o - = stdout)
    #[arg(short, long)]
    output: Option<String>,

    /// Dictionary file: one string per line, line n has key n
    #[arg(short, long)]
    dictionary: Option<String>,
}

#[derive(Args)]
struct EncodeArgs {
    #[command(flatten)]
    common: CommonArgs,

    /// Write text and end element as separate records
    #[arg(long)]
    no_combine: bool,

    /// Always use UTF-8 text records
    #[arg(long)]
    utf8_only: bool,
}

#[derive(Args)]
struct QuotaArgs {
    /// Maximum element depth
    #[arg(long)]
    max_depth: Option<usize>,

    /// Maximum string length in bytes
    #[arg(long)]
    max_string_length: Option<usize>,

    /// Maximum number of array items
    #[arg(long)]
    max_array_length: Option<usize>,

    /// Disable all reader quotas
    #[arg(long, conflicts_with_all = ["max_depth", "max_string_length", "max_array_length"])]
    unlimited: bool,
}

impl QuotaArgs {
    fn to_quotas(&self) -> ReaderQuotas {
        if self.unlimited {
            return ReaderQuotas::unlimited();
        }
        let defaults = ReaderQuotas::default();
        ReaderQuotas {
            max_depth: self.max_depth.unwrap_or(defaults.max_depth),
            max_string_content_length: self.max_string_length.unwrap_or(defaults.max_string_content_length),
            max_array_length: self.max_array_length.unwrap_or(defaults.max_array_length),
        }
    }
}

#[derive(Args)]
struct DecodeArgs {
    #[command(flatten)]
    common: CommonArgs,

    #[command(flatten)]
    quotas: QuotaArgs,

    /// Pretty-printed XML output (2-space indent)
    #[arg(long)]
    pretty: bool,
}

#[derive(Args)]
struct DumpArgs {
    /// Input file (- for stdin)
    #[arg(short, long)]
    input: String,

    /// Dictionary file: one string per line, line n has key n
    #[arg(short, long)]
    dictionary: Option<String>,

    #[command(flatten)]
    quotas: QuotaArgs,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Fehler: {e}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Command::Encode(args) => run_encode(args),
        Command::Decode(args) => run_decode(args),
        Command::Dump(args) => run_dump(args),
    }
}

fn read_input(path: &str) -> Result<Vec<u8>, String> {
    if path == "-" {
        if std::io::stdin().is_terminal() {
            eprintln!("Lese von stdin (Ctrl+D zum Beenden)...");
        }
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .map_err(|e| format!("Lesefehler (stdin): {e}"))?;
        Ok(buf)
    } else {
        std::fs::read(path).map_err(|e| format!("Lesefehler '{path}': {e}"))
    }
}

/// Laedt ein Dictionary (eine Zeile pro Eintrag) oder liefert ein leeres.
fn load_dictionary(path: Option<&str>) -> Result<StringDictionary, String> {
    let Some(path) = path else {
        return Ok(StringDictionary::new());
    };
    let text = std::fs::read_to_string(path).map_err(|e| format!("Lesefehler '{path}': {e}"))?;
    let entries: Vec<&str> = text.lines().collect();
    let dictionary = StringDictionary::with_entries(&entries);
    if dictionary.len() != entries.len() {
        eprintln!(
            "Hinweis: {} doppelte Eintraege in '{path}' ignoriert",
            entries.len() - dictionary.len()
        );
    }
    Ok(dictionary)
}

fn run_encode(args: EncodeArgs) -> Result<(), String> {
    let dictionary = load_dictionary(args.common.dictionary.as_deref())?;
    let input = read_input(&args.common.input)?;
    let xml = std::str::from_utf8(&input).map_err(|e| format!("Eingabe ist kein UTF-8: {e}"))?;

    let options = WriterOptions::default()
        .with_combine_text_end_element(!args.no_combine)
        .with_prefer_utf16_text(!args.utf8_only);
    let bytes = xml_to_binary_with(xml, &dictionary, options).map_err(|e| format!("Encode-Fehler: {e}"))?;

    let output_path = resolve_output_path(args.common.output.as_deref(), &args.common.input, "bin")?;
    write_to_output(&output_path, |mut writer| {
        writer.write_all(&bytes).map_err(|e| format!("Schreibfehler: {e}"))?;
        writer.flush().map_err(|e| format!("Schreibfehler: {e}"))
    })
}

fn run_decode(args: DecodeArgs) -> Result<(), String> {
    let dictionary = load_dictionary(args.common.dictionary.as_deref())?;
    let input = read_input(&args.common.input)?;
    let reader = BinaryReader::with_dictionary(&input, &dictionary).with_quotas(args.quotas.to_quotas());

    let output_path = resolve_output_path(args.common.output.as_deref(), &args.common.input, "xml")?;
    write_to_output(&output_path, |writer| {
        let result = if args.pretty {
            events_to_pretty_xml_iter_fallible(reader.into_iter(), writer)
        } else {
            events_to_xml_iter_fallible(reader.into_iter(), writer)
        };
        result.map_err(|e| format!("Decode-Fehler: {e}"))
    })
}

fn run_dump(args: DumpArgs) -> Result<(), String> {
    let dictionary = load_dictionary(args.dictionary.as_deref())?;
    let input = read_input(&args.input)?;
    let mut reader = BinaryReader::with_dictionary(&input, &dictionary).with_quotas(args.quotas.to_quotas());

    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    loop {
        let depth_before = reader.depth();
        match reader.advance() {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                let _ = out.flush();
                return Err(format!("Decode-Fehler: {e}"));
            }
        }
        let Some(event) = reader.current() else {
            break;
        };
        let indent = match event {
            XmlEvent::EndElement => reader.depth(),
            _ => depth_before,
        };
        writeln!(out, "{:#08x} {:indent$}{}", reader.position(), "", describe(event), indent = indent * 2)
            .map_err(|e| format!("Schreibfehler: {e}"))?;
    }
    writeln!(out, "{} bytes", input.len()).map_err(|e| format!("Schreibfehler: {e}"))?;
    out.flush().map_err(|e| format!("Schreibfehler: {e}"))
}

/// Einzeilige Beschreibung eines Events.
fn describe(event: &XmlEvent) -> String {
    match event {
        XmlEvent::StartElement(start) => {
            let mut line = format!("<{}>", start.name);
            for ns in &start.namespaces {
                if ns.prefix.is_empty() {
                    line.push_str(&format!(" xmlns=\"{}\"", ns.uri));
                } else {
                    line.push_str(&format!(" xmlns:{}=\"{}\"", ns.prefix, ns.uri));
                }
            }
            for attr in &start.attributes {
                line.push_str(&format!(" {}=\"{}\"", attr.name, attr.value));
            }
            line
        }
        XmlEvent::EndElement => "</>".to_string(),
        XmlEvent::Text(value) => format!("{} {:?}", value_kind(value), value.to_string()),
        XmlEvent::Comment(text) => format!("<!--{text}-->"),
    }
}

fn value_kind(value: &nbfx::TypedValue) -> &'static str {
    use nbfx::TypedValue as V;
    match value {
        V::Bool(_) => "bool",
        V::Int(_) => "int",
        V::UInt64(_) => "uint64",
        V::Float(_) => "float",
        V::Double(_) => "double",
        V::Decimal(_) => "decimal",
        V::DateTime(_) => "datetime",
        V::TimeSpan(_) => "timespan",
        V::Guid(_) => "guid",
        V::UniqueId(_) => "uniqueid",
        V::Text(_) => "text",
        V::Bytes(_) => "bytes",
        V::Dictionary(_) => "dictionary",
        V::QName { .. } => "qname",
        V::List(_) => "list",
    }
}

/// Erstellt einen BufWriter fuer stdout oder eine Datei.
fn create_buf_writer(path: &str) -> Result<std::io::BufWriter<Box<dyn Write>>, String> {
    if path == "-" {
        Ok(std::io::BufWriter::new(Box::new(std::io::stdout())))
    } else {
        let file = std::fs::File::create(path).map_err(|e| format!("Schreibfehler: {e}"))?;
        Ok(std::io::BufWriter::new(Box::new(file)))
    }
}

/// Schreibt Output entweder nach stdout ("-") oder atomar in eine Datei (tmp+rename).
fn write_to_output(
    output_path: &str,
    write_fn: impl FnOnce(std::io::BufWriter<Box<dyn Write>>) -> Result<(), String>,
) -> Result<(), String> {
    if output_path == "-" {
        return write_fn(create_buf_writer("-")?);
    }

    let tmp_path = format!("{output_path}.tmp");
    let writer = create_buf_writer(&tmp_path)?;
    if let Err(e) = write_fn(writer) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(e);
    }
    std::fs::rename(&tmp_path, output_path).map_err(|e| format!("Rename-Fehler: {e}"))
}

/// Leitet den Output-Pfad aus der Eingabe und der gewuenschten Extension ab.
fn resolve_output_path(explicit: Option<&str>, input: &str, ext: &str) -> Result<String, String> {
    if let Some(path) = explicit {
        return Ok(path.to_string());
    }
    if input == "-" {
        return Err("ohne -o braucht es eine Eingabedatei (nicht stdin)".into());
    }
    let path = std::path::Path::new(input);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| "ungueltiger Eingabepfad".to_string())?;
    let parent = path.parent().unwrap_or_else(|| std::path::Path::new(""));
    Ok(parent.join(format!("{stem}.{ext}")).to_string_lossy().to_string())
}
