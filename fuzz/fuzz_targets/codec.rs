#![no_main]
use libfuzzer_sys::fuzz_target;
use xsdinfer::{codec, InferOptions};

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let opts = InferOptions::default().with_max_depth(64);
        let _ = codec::deserialize_all(&[text], 0, &opts);
    }
});
