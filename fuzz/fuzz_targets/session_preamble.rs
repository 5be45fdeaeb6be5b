#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut session = nbfx::ReaderSession::new();
    let _ = nbfx::decode_with_session(data, nbfx::StringDictionary::empty(), &mut session);
});
