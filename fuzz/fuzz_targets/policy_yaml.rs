#![no_main]

use libfuzzer_sys::fuzz_target;
use reportgate_formats::PolicyConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = PolicyConfig::from_yaml(data) {
        let yaml = config.to_yaml().expect("valid policy must serialize");
        let again = PolicyConfig::from_yaml(yaml.as_bytes()).expect("serialized policy must load");
        assert_eq!(config, again);
    }
});
