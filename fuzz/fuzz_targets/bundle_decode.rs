#![no_main]

use libfuzzer_sys::fuzz_target;
use reportgate_formats::Bundle;

// 압축 해제 상한을 작게 두어 압축 폭탄 입력도 빠르게 끝나게 합니다.
const MAX_DECOMPRESSED: u64 = 1 << 20;

fuzz_target!(|data: &[u8]| {
    if let Ok(bundle) = Bundle::from_bytes(data, MAX_DECOMPRESSED) {
        // 디코딩에 성공한 번들은 다시 인코딩해도 같은 내용이어야 함
        let encoded = bundle.to_bytes().expect("decoded bundle must re-encode");
        let again = Bundle::from_bytes(&encoded, MAX_DECOMPRESSED).expect("re-encoded bundle must decode");
        assert_eq!(bundle, again);
    }
});
