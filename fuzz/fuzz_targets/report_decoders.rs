#![no_main]

use libfuzzer_sys::fuzz_target;
use reportgate_formats::default_decoders;

fuzz_target!(|data: &[u8]| {
    for decoder in default_decoders(1 << 20) {
        let _ = decoder.decode(data);
    }
});
