//! ClickHouse adapter tests that need no server
//!
//! Option handling, statement escaping, array column filtering and the
//! classification rules. Connecting is only checked against a closed port.

#![allow(clippy::unwrap_used)]

use crate::backend::Backend;
use crate::clickhouse_backend::{
    escape_placeholders, retain_array_columns, ClickHouseConnection, ClickHouseOptions,
    CLICKHOUSE_RULES,
};
use crate::conninfo::ConnInfo;
use crate::dut::Classification;
use crate::error::{AdapterError, EngineError};
use crate::relmodel::{Table, TypeRegistry};

fn parse(raw: &str) -> ConnInfo {
    ClickHouseConnection::parse_conninfo(raw).unwrap()
}

#[test]
fn test_options_from_conninfo() {
    let options =
        ClickHouseOptions::from_conninfo(&parse("host=localhost port=8123 user=default pass="))
            .unwrap();
    assert_eq!(
        options,
        ClickHouseOptions {
            url: "http://localhost:8123".to_string(),
            user: "default".to_string(),
            password: String::new(),
            database: "db".to_string(),
        }
    );
}

#[test]
fn test_port_is_used_as_http_port() {
    // a native-protocol port is not remapped
    let options = ClickHouseOptions::from_conninfo(&parse("host=ch port=9000")).unwrap();
    assert_eq!(options.url, "http://ch:9000");
}

#[test]
fn test_missing_host_or_port() {
    let err = ClickHouseOptions::from_conninfo(&parse("port=8123")).unwrap_err();
    assert!(matches!(err, AdapterError::MissingOption { option: "host" }));

    let err = ClickHouseOptions::from_conninfo(&parse("host=localhost")).unwrap_err();
    assert!(matches!(err, AdapterError::MissingOption { option: "port" }));
}

#[test]
fn test_invalid_port_fails_before_connecting() {
    let err = ClickHouseConnection::connect(&parse("host=localhost port=http")).unwrap_err();
    assert!(matches!(err, AdapterError::InvalidOption { option: "port", .. }));

    let err = ClickHouseConnection::connect(&parse("host=localhost port=70000")).unwrap_err();
    assert!(matches!(err, AdapterError::InvalidOption { option: "port", .. }));
}

#[test]
fn test_unreachable_server_is_connect_error() {
    // port 1 on loopback refuses immediately
    let err = ClickHouseConnection::connect(&parse("host=127.0.0.1 port=1")).unwrap_err();
    assert!(
        matches!(err, AdapterError::Connect { engine: "clickhouse", .. }),
        "{err:?}"
    );
}

#[test]
fn test_placeholders_are_escaped() {
    assert_eq!(escape_placeholders("SELECT 1"), "SELECT 1");
    assert_eq!(
        escape_placeholders("SELECT '?' WHERE a = ?"),
        "SELECT '??' WHERE a = ??"
    );
}

#[test]
fn test_only_array_columns_are_kept() {
    let mut registry = TypeRegistry::new();
    let mut table = Table::new("events", "db", true, false);
    retain_array_columns(
        &mut table,
        [
            ("id", "UInt64"),
            ("tags", "Array(String)"),
            ("name", "String"),
            ("scores", "Array(Array(Int8))"),
        ]
        .into_iter()
        .map(|(n, t)| (n.to_string(), t.to_string())),
        &mut registry,
    );

    let names: Vec<_> = table.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["tags", "scores"]);
    let array = registry.lookup("Array").unwrap();
    assert!(table.columns.iter().all(|c| c.ty.same(&array)));
    assert!(registry.lookup("UInt64").is_none());
}

#[test]
fn test_server_errors_are_classified() {
    let rules = &*CLICKHOUSE_RULES;
    let syntax = EngineError::new(
        None,
        "Code: 62. DB::Exception: Syntax error: failed at position 1 ('SELEC')",
    );
    assert_eq!(rules.classify(&syntax), Some(Classification::Syntax));

    let timeout = EngineError::new(
        None,
        "Code: 159. DB::Exception: Timeout exceeded: elapsed 5.1 seconds",
    );
    assert_eq!(rules.classify(&timeout), Some(Classification::Timeout));

    let missing = EngineError::new(
        None,
        "Code: 60. DB::Exception: Table db.nosuch does not exist",
    );
    assert_eq!(rules.classify(&missing), None);
    // 1590 is not 159
    let other = EngineError::new(None, "Code: 1590. DB::Exception: whatever");
    assert_eq!(rules.classify(&other), None);
}

#[test]
fn test_server_rules_match_whole_message() {
    let rules = &*CLICKHOUSE_RULES;
    // server messages may carry a multi-line trace after the text
    let syntax = EngineError::new(
        None,
        "Code: 62. DB::Exception: Syntax error: failed at position 1:\n\nSELEC 1\n\n(SYNTAX_ERROR)",
    );
    assert_eq!(rules.classify(&syntax), Some(Classification::Syntax));

    // rule text quoted inside a different exception
    let quoted = EngineError::new(
        None,
        "Code: 60. DB::Exception: Table db.`DB::Exception: Syntax error` does not exist",
    );
    assert_eq!(rules.classify(&quoted), None);
    let quoted = EngineError::new(
        None,
        "Code: 47. DB::Exception: Missing columns: 'Code: 159. x'",
    );
    assert_eq!(rules.classify(&quoted), None);
}
