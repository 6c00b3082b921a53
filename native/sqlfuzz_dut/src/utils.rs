/// Utility functions and helpers shared by the engine adapters
///
/// Runtime construction for driving async clients synchronously, connect
/// timeouts, identifier quoting, statement splitting and engine error
/// extraction.
use crate::constants::DEFAULT_CONNECT_TIMEOUT_SECS;
use crate::error::{AdapterError, EngineError};
use std::future::Future;
use std::time::Duration;
use tokio::runtime::Runtime;

/// Build the single-threaded runtime a connection drives its client with.
///
/// Every call into the client goes through `block_on` on this runtime, so a
/// connection never does work on any thread but its caller's.
pub fn build_runtime() -> Result<Runtime, AdapterError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime)
}

/// Await `fut`, giving up after the default connect timeout.
pub async fn with_connect_timeout<T, E: std::fmt::Display>(
    engine: &'static str,
    fut: impl Future<Output = Result<T, E>>,
) -> Result<T, AdapterError> {
    let timeout = Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS);
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(AdapterError::Connect {
            engine,
            message: e.to_string(),
        }),
        Err(_) => Err(AdapterError::Connect {
            engine,
            message: format!("connection timeout after {DEFAULT_CONNECT_TIMEOUT_SECS} seconds"),
        }),
    }
}

/// Quote an SQLite identifier: wrap in double quotes, doubling embedded ones.
pub fn quote_identifier(id: &str) -> String {
    format!("\"{}\"", id.replace('"', "\"\""))
}

/// Tokens that drive statement completeness. The discriminant is the
/// column in `COMPLETE_TRANSITIONS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SqlToken {
    Semi = 0,
    Ws,
    Other,
    Explain,
    Create,
    Temp,
    Trigger,
    End,
}

/// SQLite's statement-completeness automaton.
///
/// States: 0 start, 1 after a complete statement, 2 inside a statement,
/// 3 after EXPLAIN, 4 after CREATE, 5 inside a trigger body, 6 after `;` in
/// a trigger body, 7 after `; END` in a trigger body.
const COMPLETE_TRANSITIONS: [[u8; 8]; 8] = [
    //  SEMI WS OTHER EXPLAIN CREATE TEMP TRIGGER END
    [1, 0, 2, 3, 4, 2, 2, 2],
    [1, 1, 2, 3, 4, 2, 2, 2],
    [1, 2, 2, 2, 2, 2, 2, 2],
    [1, 3, 3, 2, 4, 2, 2, 2],
    [1, 4, 2, 2, 2, 4, 5, 2],
    [6, 5, 5, 5, 5, 5, 5, 5],
    [6, 6, 5, 5, 5, 5, 5, 7],
    [1, 7, 5, 5, 5, 5, 5, 5],
];

fn is_id_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

/// Scan one token starting at `i`; returns it and the index just past it.
/// Unterminated quotes and comments run to the end of the input.
fn scan_sql_token(bytes: &[u8], i: usize) -> (SqlToken, usize) {
    let len = bytes.len();
    let skip_past = |from: usize, close: u8| {
        let mut j = from;
        while j < len && bytes[j] != close {
            j += 1;
        }
        (j + 1).min(len)
    };

    match bytes[i] {
        b';' => (SqlToken::Semi, i + 1),
        b' ' | b'\t' | b'\n' | b'\r' | 0x0c => (SqlToken::Ws, i + 1),
        b'-' if i + 1 < len && bytes[i + 1] == b'-' => (SqlToken::Ws, skip_past(i + 2, b'\n')),
        b'/' if i + 1 < len && bytes[i + 1] == b'*' => {
            let mut j = i + 2;
            while j + 1 < len && !(bytes[j] == b'*' && bytes[j + 1] == b'/') {
                j += 1;
            }
            (SqlToken::Ws, (j + 2).min(len))
        }
        b'[' => (SqlToken::Other, skip_past(i + 1, b']')),
        q @ (b'\'' | b'"' | b'`') => (SqlToken::Other, skip_past(i + 1, q)),
        b if is_id_byte(b) => {
            let mut j = i + 1;
            while j < len && is_id_byte(bytes[j]) {
                j += 1;
            }
            let word = &bytes[i..j];
            let token = if word.eq_ignore_ascii_case(b"explain") {
                SqlToken::Explain
            } else if word.eq_ignore_ascii_case(b"create") {
                SqlToken::Create
            } else if word.eq_ignore_ascii_case(b"temp") || word.eq_ignore_ascii_case(b"temporary") {
                SqlToken::Temp
            } else if word.eq_ignore_ascii_case(b"trigger") {
                SqlToken::Trigger
            } else if word.eq_ignore_ascii_case(b"end") {
                SqlToken::End
            } else {
                SqlToken::Other
            };
            (token, j)
        }
        _ => (SqlToken::Other, i + 1),
    }
}

/// Split SQL text into statements, in order.
///
/// Each statement keeps its terminating `;`. A `;` inside a quoted string,
/// identifier, comment or `CREATE TRIGGER` body does not end a statement.
/// Text made only of whitespace, comments and semicolons yields nothing.
/// A trailing statement without `;` is returned as is.
pub fn split_statements(sql: &str) -> Vec<&str> {
    let bytes = sql.as_bytes();
    let mut statements = Vec::new();
    let mut state = 0u8;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let (token, next) = scan_sql_token(bytes, i);
        let prev = state;
        state = COMPLETE_TRANSITIONS[state as usize][token as usize];
        i = next;

        if token == SqlToken::Semi && state == 1 && prev > 1 {
            statements.push(&sql[start..i]);
        }
        // nothing but separators so far
        if state <= 1 {
            start = i;
        }
    }

    if state > 1 {
        statements.push(&sql[start..]);
    }
    statements
}

/// Split a libsql error into result code and raw engine message.
pub fn sqlite_engine_error(err: libsql::Error) -> EngineError {
    match err {
        libsql::Error::SqliteFailure(code, message) => EngineError::new(Some(code), message),
        other => EngineError::new(None, other.to_string()),
    }
}

/// Raw server text for ClickHouse exceptions, display text otherwise.
pub fn clickhouse_engine_error(err: clickhouse::error::Error) -> EngineError {
    match err {
        clickhouse::error::Error::BadResponse(message) => EngineError::new(None, message),
        other => EngineError::new(None, other.to_string()),
    }
}
