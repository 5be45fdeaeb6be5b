#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let dictionary = nbfx::StringDictionary::with_entries(["Envelope", "Header", "Body", "urn:fuzz"]);
    let mut session = nbfx::ReaderSession::new();
    let _ = session.add(0, "alpha");
    let _ = nbfx::decode_with(data, &dictionary, Some(&mut session), nbfx::ReaderQuotas::default());
});
