/// Global constants for the engine adapters
///
/// This module holds static configuration: option declarations and defaults
/// for each engine, timeouts, SQLite result codes and the fixed type names
/// both engines declare.
use crate::conninfo::OptionSpec;

/// Default timeout for establishing a connection (in seconds)
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

// SQLite primary result codes the adapters interpret
pub const SQLITE_ABORT: i32 = 4;
pub const SQLITE_BUSY: i32 = 5;
pub const SQLITE_LOCKED: i32 = 6;

/// Result codes reported as a timeout rather than retried
pub const SQLITE_BUSY_CODES: &[i32] = &[SQLITE_BUSY, SQLITE_LOCKED];

/// Message SQLite reports when a row callback stops execution early
pub const USER_ABORT_MESSAGE: &str = "callback requested query abort";

/// Options understood by the ClickHouse adapter
pub static CLICKHOUSE_OPTIONS: OptionSpec = OptionSpec {
    keys: &[
        ("host", "host"),
        ("port", "port"),
        ("user", "user"),
        ("username", "user"),
        ("pass", "pass"),
        ("password", "pass"),
        ("db", "db"),
        ("database", "db"),
    ],
    defaults: &[("user", "default"), ("pass", ""), ("db", "db")],
};

/// Options understood by the SQLite adapter
pub static SQLITE_OPTIONS: OptionSpec = OptionSpec {
    keys: &[
        ("db", "db"),
        ("database", "db"),
        ("busy_timeout", "busy_timeout"),
    ],
    defaults: &[("db", ":memory:"), ("busy_timeout", "0")],
};

// ClickHouse type names
pub const CH_BOOL: &str = "UInt8";
pub const CH_INT: &str = "UInt64";
pub const CH_STRING: &str = "String";
pub const CH_ARRAY: &str = "Array";
pub const CH_INTEGER_TYPES: &[&str] = &[
    "UInt8", "UInt16", "UInt32", "UInt64", "Int8", "Int16", "Int32", "Int64",
];

/// Arithmetic operators whose result has the operand type
pub const CH_NUM_OPS: &[&str] = &["+", "-", "*", "%"];
/// Comparisons yielding `UInt8`
pub const CH_CMP_OPS: &[&str] = &["=", "!=", "<", "<=", ">", ">="];
/// String operators yielding `UInt8`
pub const CH_STRING_OPS: &[&str] = &[
    "=", "!=", "<", "<=", ">", ">=", "like", "not like", "ilike",
];

// SQLite type names
pub const SQLITE_INTEGER: &str = "INTEGER";
pub const SQLITE_REAL: &str = "REAL";
pub const SQLITE_TEXT: &str = "TEXT";
pub const SQLITE_NUMERIC: &str = "NUMERIC";
pub const SQLITE_ARRAY: &str = "ARRAY";

/// Marker type shared by both engines for generator-internal values
pub const INTERNAL_TYPE: &str = "internal";
