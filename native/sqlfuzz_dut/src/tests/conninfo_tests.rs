//! Tests for connection string parsing

#![allow(clippy::unwrap_used, clippy::panic)]

use crate::constants::{CLICKHOUSE_OPTIONS, SQLITE_OPTIONS};
use crate::conninfo::ConnInfo;
use crate::error::{AdapterError, ConfigError};

fn options(info: &ConnInfo) -> Vec<(String, String)> {
    info.iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_clickhouse_defaults_fill_omitted_options() {
    let info = ConnInfo::parse("host=localhost port=9000 user=default pass=", &CLICKHOUSE_OPTIONS)
        .unwrap();
    assert_eq!(
        options(&info),
        vec![
            ("db".to_string(), "db".to_string()),
            ("host".to_string(), "localhost".to_string()),
            ("pass".to_string(), String::new()),
            ("port".to_string(), "9000".to_string()),
            ("user".to_string(), "default".to_string()),
        ]
    );
}

#[test]
fn test_unrecognized_option_is_fatal() {
    let err = ConnInfo::parse("host=localhost foo=bar", &CLICKHOUSE_OPTIONS).unwrap_err();
    assert_eq!(
        err,
        ConfigError::UnrecognizedOption {
            token: "foo=bar".to_string()
        }
    );
    assert_eq!(err.to_string(), "cannot parse option: foo=bar");
}

#[test]
fn test_key_prefix_is_not_a_match() {
    // "hostname" starts with "host" but is not a declared key
    let err = ConnInfo::parse("hostname=x", &CLICKHOUSE_OPTIONS).unwrap_err();
    assert!(matches!(err, ConfigError::UnrecognizedOption { token } if token == "hostname=x"));
}

#[test]
fn test_empty_string_yields_defaults_only() {
    let info = ConnInfo::parse("", &SQLITE_OPTIONS).unwrap();
    assert_eq!(info.get("db"), Some(":memory:"));
    assert_eq!(info.get("busy_timeout"), Some("0"));
    assert_eq!(info.len(), 2);

    let info = ConnInfo::parse("   \t\n ", &CLICKHOUSE_OPTIONS).unwrap();
    assert_eq!(info.get("host"), None);
    assert_eq!(info.get("user"), Some("default"));
}

#[test]
fn test_aliases_map_to_canonical_key() {
    let info = ConnInfo::parse(
        "username=fuzzer password=secret database=shop",
        &CLICKHOUSE_OPTIONS,
    )
    .unwrap();
    assert_eq!(info.get("user"), Some("fuzzer"));
    assert_eq!(info.get("pass"), Some("secret"));
    assert_eq!(info.get("db"), Some("shop"));
    assert_eq!(info.get("username"), None);
}

#[test]
fn test_key_without_value_maps_to_empty_string() {
    let info = ConnInfo::parse("host port=1", &CLICKHOUSE_OPTIONS).unwrap();
    assert_eq!(info.get("host"), Some(""));
}

#[test]
fn test_later_token_wins() {
    let info = ConnInfo::parse("db=a database=b", &SQLITE_OPTIONS).unwrap();
    assert_eq!(info.get("db"), Some("b"));
}

#[test]
fn test_value_may_contain_equals() {
    let info = ConnInfo::parse("pass=a=b", &CLICKHOUSE_OPTIONS).unwrap();
    assert_eq!(info.get("pass"), Some("a=b"));
}

#[test]
fn test_require_missing_option() {
    let info = ConnInfo::parse("port=9000", &CLICKHOUSE_OPTIONS).unwrap();
    let err = info.require("host").unwrap_err();
    assert!(matches!(err, AdapterError::MissingOption { option: "host" }));
}

#[test]
fn test_numeric_option_conversion() {
    let info = ConnInfo::parse("host=h port=9000", &CLICKHOUSE_OPTIONS).unwrap();
    assert_eq!(info.parse_u16("port").unwrap(), 9000);

    let info = ConnInfo::parse("host=h port=nine", &CLICKHOUSE_OPTIONS).unwrap();
    match info.parse_u16("port").unwrap_err() {
        AdapterError::InvalidOption { option, value, .. } => {
            assert_eq!(option, "port");
            assert_eq!(value, "nine");
        }
        other => panic!("expected InvalidOption, got {other:?}"),
    }

    let info = ConnInfo::parse("busy_timeout=-5", &SQLITE_OPTIONS).unwrap();
    assert!(info.parse_u64("busy_timeout").is_err());
}

#[test]
fn test_display_redacts_password() {
    let info = ConnInfo::parse("host=h port=1 pass=hunter2", &CLICKHOUSE_OPTIONS).unwrap();
    let shown = info.to_string();
    assert!(shown.contains("pass=***"));
    assert!(!shown.contains("hunter2"));

    let info = ConnInfo::parse("host=h", &CLICKHOUSE_OPTIONS).unwrap();
    assert!(info.to_string().contains("pass= "));
}
