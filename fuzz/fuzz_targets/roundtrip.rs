#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(xml) = std::str::from_utf8(data) {
        let dictionary = nbfx::StringDictionary::empty();
        if let Ok(events) = nbfx::xml_to_events(xml) {
            if let Ok(bytes) = nbfx::encode(&events, dictionary) {
                let decoded = nbfx::decode_with(&bytes, dictionary, None, nbfx::ReaderQuotas::unlimited())
                    .expect("writer output must decode");
                let again = nbfx::encode(&decoded, dictionary).expect("decoded events must encode");
                assert_eq!(bytes, again);
            }
        }
    }
});
