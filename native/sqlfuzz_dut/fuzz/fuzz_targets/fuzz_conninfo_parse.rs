#![no_main]
//! Connection string fuzzing
//!
//! Parsing must never panic, and whatever parses must render back to a
//! string that parses to the same options.

use libfuzzer_sys::fuzz_target;
use sqlfuzz_dut::{ConnInfo, Engine};

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    for engine in [Engine::Sqlite, Engine::ClickHouse] {
        let Ok(info) = engine.parse_conninfo(raw) else {
            continue;
        };
        if info.get("pass").is_some_and(|p| !p.is_empty()) {
            continue;
        }
        let rendered = info.to_string();
        let again: Result<ConnInfo, _> = engine.parse_conninfo(&rendered);
        assert_eq!(Ok(info), again, "{rendered}");
    }
});
