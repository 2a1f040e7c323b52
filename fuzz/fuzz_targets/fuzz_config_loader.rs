#![no_main]

use std::path::Path;

use eop_api::config::loader::ConfigLoader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(yaml_str) = std::str::from_utf8(data) {
        // Only panics matter; errors are expected for most inputs.
        let _ = ConfigLoader::default().load_from_str(yaml_str, Path::new("fuzz.yaml"));
    }
});
