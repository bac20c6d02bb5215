#![no_main]

use libfuzzer_sys::fuzz_target;
use parsec_vdisplay::config::{AppConfig, ConfigManager};

fuzz_target!(|data: &[u8]| {
    // Arbitrary config.json contents must never panic the loader
    if let Ok(s) = std::str::from_utf8(data) {
        let _parsed: Result<AppConfig, _> = serde_json::from_str(s);
        if let Ok(config) = ConfigManager::validate(s) {
            assert!(parsec_vdisplay::locale::is_supported(&config.language));
        }
    }
});
