#![no_main]
use libfuzzer_sys::fuzz_target;
use xsdinfer::{codec, infer_from_str, InferOptions};

fuzz_target!(|data: &[u8]| {
    if let Ok(xml) = std::str::from_utf8(data) {
        let opts = InferOptions::default().with_max_depth(64);
        if let Ok(doc) = infer_from_str(xml, &opts) {
            // Was inferiert wurde, muss den Round-Trip ueberstehen.
            let texts = codec::serialize_all(&doc).expect("serialize inferred schema");
            let back = codec::deserialize_all(&texts, 0, &opts).expect("deserialize own output");
            assert_eq!(back, doc);
        }
    }
});
