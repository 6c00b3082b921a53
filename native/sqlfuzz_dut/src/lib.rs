//! `sqlfuzz_dut`: engine adapters for a SQL fuzzer
//!
//! This is the root module of the adapter library. Each supported engine
//! provides a connection that can load a normalised catalog for the query
//! generator and execute generated statements, classifying the outcome.
pub mod backend;
pub mod clickhouse_backend;
pub mod conninfo;
pub mod constants;
pub mod dut;
pub mod engine;
pub mod error;
pub mod loader;
pub mod relmodel;
pub mod schema;
pub mod sqlite;
pub mod utils;

// Re-export the types the fuzz driver works with
pub use backend::{Backend, Dialect, Introspect};
pub use clickhouse_backend::{ClickHouseConnection, ClickHouseDialect, ClickHouseDut, CLICKHOUSE_RULES};
pub use conninfo::{ConnInfo, OptionSpec};
pub use dut::{Classification, Dut, DutAdapter, ErrorRules, Outcome};
pub use engine::Engine;
pub use error::{AdapterError, ConfigError, DutError, EngineError};
pub use loader::load_catalog;
pub use relmodel::{Column, Op, Routine, Table, TypeCategory, TypeRef, TypeRegistry};
pub use schema::{BaseTypes, Catalog, QuoteStyle};
pub use sqlite::{SqliteConnection, SqliteDialect, SqliteDut, SQLITE_RULES};

#[cfg(test)]
mod tests;
