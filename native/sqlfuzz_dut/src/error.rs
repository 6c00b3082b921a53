/// Error taxonomy shared by every engine adapter
///
/// Each layer has its own error type: configuration parsing, adapter
/// construction and catalog introspection, and per-statement test outcomes.
use std::fmt;
use thiserror::Error;

/// Malformed connection string.
///
/// Always fatal: no partial option map is ever returned alongside it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A token did not match any key the engine declares.
    #[error("cannot parse option: {token}")]
    UnrecognizedOption { token: String },

    #[error("unknown engine '{name}' (expected sqlite or clickhouse)")]
    UnknownEngine { name: String },
}

/// Failures that abort adapter construction or catalog loading.
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A required option has neither a value nor an engine default.
    #[error("missing connection option '{option}'")]
    MissingOption { option: &'static str },

    /// An option value could not be converted when the connection consumed it.
    #[error("invalid value '{value}' for option '{option}': {reason}")]
    InvalidOption {
        option: &'static str,
        value: String,
        reason: String,
    },

    /// The engine refused the connection or the credentials.
    #[error("failed to connect to {engine}: {message}")]
    Connect {
        engine: &'static str,
        message: String,
    },

    /// A metadata query failed while building the catalog.
    #[error("catalog introspection failed on `{query}`: {message}")]
    Catalog { query: String, message: String },

    /// The connection no longer answers a round trip.
    #[error("liveness probe failed: {message}")]
    Liveness { message: String },

    /// The connection was used after `close()`.
    #[error("connection to {engine} is closed")]
    Closed { engine: &'static str },

    /// The runtime driving the async engine client could not be created.
    #[error("failed to start runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl AdapterError {
    pub fn catalog(query: impl Into<String>, err: impl fmt::Display) -> Self {
        AdapterError::Catalog {
            query: query.into(),
            message: err.to_string(),
        }
    }
}

/// A statement-level error reported by the engine itself.
///
/// `code` carries the engine's numeric result code when one exists
/// (SQLite result codes); the message is the raw engine text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    pub code: Option<i32>,
    pub message: String,
}

impl EngineError {
    pub fn new(code: Option<i32>, message: impl Into<String>) -> Self {
        EngineError {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {code})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for EngineError {}

/// Classified outcome of a test statement that did not succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DutError {
    /// The engine refused a malformed statement. Expected and benign.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// The engine hit a busy/lock condition and gave up immediately.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Any other engine error.
    #[error("failure: {0}")]
    Failure(String),

    /// The connection itself is unusable; the session must stop.
    #[error("connection broken: {0}")]
    Broken(String),
}

impl DutError {
    /// Session-ending outcome.
    pub fn is_fatal(&self) -> bool {
        matches!(self, DutError::Broken(_))
    }

    /// Expected rejection that says nothing about engine health.
    pub fn is_benign(&self) -> bool {
        matches!(self, DutError::Syntax(_))
    }

    pub fn message(&self) -> &str {
        match self {
            DutError::Syntax(m) | DutError::Timeout(m) | DutError::Failure(m) | DutError::Broken(m) => {
                m
            }
        }
    }
}
