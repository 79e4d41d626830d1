#![no_main]

use libfuzzer_sys::fuzz_target;
use reportgate_policy::{EpssTable, KevCatalog};

fuzz_target!(|data: &[u8]| {
    let _ = KevCatalog::parse(data);
    let _ = EpssTable::parse(data);
});
