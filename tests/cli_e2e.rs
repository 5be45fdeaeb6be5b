use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn nbfx_bin() -> &'static str {
    env!("CARGO_BIN_EXE_nbfx")
}

fn test_temp_dir(tag: &str) -> PathBuf {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("nbfx-cli-e2e-{tag}-{}-{ts}", std::process::id()));
    fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn run_nbfx(args: &[&str]) -> Output {
    Command::new(nbfx_bin()).args(args).output().expect("run nbfx")
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("utf-8 path")
}

fn assert_success(output: &Output, what: &str) {
    assert!(
        output.status.success(),
        "{what} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn cli_encode_decode_round_trip() {
    let dir = test_temp_dir("rtt");
    let xml = "<root><a>1</a><b x=\"y\"/></root>";
    let input = dir.join("in.xml");
    let bin = dir.join("out.bin");
    let decoded = dir.join("out.xml");
    fs::write(&input, xml).expect("write xml");

    let enc = run_nbfx(&["encode", "-i", path_str(&input), "-o", path_str(&bin)]);
    assert_success(&enc, "encode");
    let bytes = fs::read(&bin).expect("read bin");
    assert_eq!(&bytes[..6], &[0x40, 0x04, b'r', b'o', b'o', b't']);

    let dec = run_nbfx(&["decode", "-i", path_str(&bin), "-o", path_str(&decoded)]);
    assert_success(&dec, "decode");
    assert_eq!(fs::read_to_string(&decoded).expect("read decoded"), xml);
}

#[test]
fn cli_default_output_path() {
    let dir = test_temp_dir("default-out");
    let input = dir.join("doc.xml");
    fs::write(&input, "<r/>").expect("write xml");

    let enc = run_nbfx(&["encode", "-i", path_str(&input)]);
    assert_success(&enc, "encode");
    let bin = dir.join("doc.bin");
    assert_eq!(fs::read(&bin).expect("read bin"), [0x40, 0x01, b'r', 0x01]);
    assert!(!dir.join("doc.bin.tmp").exists());
}

#[test]
fn cli_decode_to_stdout_pretty() {
    let dir = test_temp_dir("pretty");
    let input = dir.join("in.xml");
    let bin = dir.join("in.bin");
    fs::write(&input, "<root><a>1</a></root>").expect("write xml");
    assert_success(&run_nbfx(&["encode", "-i", path_str(&input), "-o", path_str(&bin)]), "encode");

    let dec = run_nbfx(&["decode", "-i", path_str(&bin), "-o", "-", "--pretty"]);
    assert_success(&dec, "decode");
    assert_eq!(String::from_utf8_lossy(&dec.stdout), "<root>\n  <a>1</a>\n</root>\n");
}

#[test]
fn cli_dictionary_file() {
    let dir = test_temp_dir("dictionary");
    let input = dir.join("in.xml");
    let dictionary = dir.join("dict.txt");
    let bin = dir.join("in.bin");
    let decoded = dir.join("out.xml");
    fs::write(&input, "<Envelope><Body>payload</Body></Envelope>").expect("write xml");
    fs::write(&dictionary, "Envelope\nBody\npayload\n").expect("write dictionary");

    let enc = run_nbfx(&[
        "encode",
        "-i",
        path_str(&input),
        "-o",
        path_str(&bin),
        "-d",
        path_str(&dictionary),
    ]);
    assert_success(&enc, "encode");
    let bytes = fs::read(&bin).expect("read bin");
    assert_eq!(bytes, [0x42, 0x00, 0x42, 0x02, 0xAB, 0x04, 0x01]);

    let without = run_nbfx(&["decode", "-i", path_str(&bin), "-o", path_str(&decoded)]);
    assert!(!without.status.success(), "decode without dictionary should fail");
    assert!(String::from_utf8_lossy(&without.stderr).contains("Fehler"));
    assert!(!decoded.exists());

    let with = run_nbfx(&[
        "decode",
        "-i",
        path_str(&bin),
        "-o",
        path_str(&decoded),
        "-d",
        path_str(&dictionary),
    ]);
    assert_success(&with, "decode");
    assert_eq!(
        fs::read_to_string(&decoded).expect("read decoded"),
        "<Envelope><Body>payload</Body></Envelope>"
    );
}

#[test]
fn cli_depth_quota() {
    let dir = test_temp_dir("quota");
    let input = dir.join("in.xml");
    let bin = dir.join("in.bin");
    fs::write(&input, "<a><b><c/></b></a>").expect("write xml");
    assert_success(&run_nbfx(&["encode", "-i", path_str(&input), "-o", path_str(&bin)]), "encode");

    let limited = run_nbfx(&["decode", "-i", path_str(&bin), "-o", "-", "--max-depth", "2"]);
    assert!(!limited.status.success());

    let unlimited = run_nbfx(&["decode", "-i", path_str(&bin), "-o", "-", "--unlimited"]);
    assert_success(&unlimited, "decode");
    assert_eq!(String::from_utf8_lossy(&unlimited.stdout), "<a><b><c/></b></a>");
}

#[test]
fn cli_dump_lists_events() {
    let dir = test_temp_dir("dump");
    let input = dir.join("in.xml");
    let bin = dir.join("in.bin");
    fs::write(&input, "<root><a>1</a><!--c--></root>").expect("write xml");
    assert_success(&run_nbfx(&["encode", "-i", path_str(&input), "-o", path_str(&bin)]), "encode");

    let dump = run_nbfx(&["dump", "-i", path_str(&bin)]);
    assert_success(&dump, "dump");
    let out = String::from_utf8_lossy(&dump.stdout);
    assert!(out.contains("<root>"), "{out}");
    assert!(out.contains("  <a>"), "{out}");
    assert!(out.contains("text \"1\""), "{out}");
    assert!(out.contains("<!--c-->"), "{out}");
    let size = fs::read(&bin).expect("read bin").len();
    assert!(out.trim_end().ends_with(&format!("{size} bytes")), "{out}");
}

#[test]
fn cli_rejects_malformed_xml() {
    let dir = test_temp_dir("malformed");
    let input = dir.join("in.xml");
    let bin = dir.join("in.bin");
    fs::write(&input, "<root><a></root>").expect("write xml");

    let enc = run_nbfx(&["encode", "-i", path_str(&input), "-o", path_str(&bin)]);
    assert!(!enc.status.success());
    assert!(!bin.exists());
}
