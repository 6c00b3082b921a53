//! Shared test utilities for the adapter tests
//!
//! Fixture databases are built with libsql directly on a throwaway runtime,
//! then closed before an adapter opens them read-only. Adapters drive their
//! own runtime with `block_on`, so the tests that use them are plain
//! `#[test]` functions, never `#[tokio::test]`.

#![allow(clippy::unwrap_used)]

use crate::backend::{Backend, Introspect};
use crate::conninfo::{ConnInfo, OptionSpec};
use crate::dut::{Classification, ErrorRules};
use crate::error::{AdapterError, EngineError};
use crate::relmodel::{Column, Table, TypeRegistry};
use crate::sqlite::SqliteDialect;
use libsql::Builder;
use once_cell::sync::Lazy;
use std::collections::VecDeque;
use std::fs;
use std::path::PathBuf;
use uuid::Uuid;

/// RAII guard that removes a fixture database and its SQLite side files.
///
/// Declare it before any connection so its Drop runs last.
pub struct TestDbGuard {
    db_path: PathBuf,
}

impl TestDbGuard {
    pub fn new(db_path: PathBuf) -> Self {
        TestDbGuard { db_path }
    }
}

impl Drop for TestDbGuard {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.db_path);
        for suffix in ["-wal", "-shm", "-journal"] {
            let _ = fs::remove_file(format!("{}{suffix}", self.db_path.display()));
        }
    }
}

/// Unique fixture path in the system temp directory, e.g.
/// `/tmp/z_sqlfuzz_dut_test-catalog-<uuid>.db`.
pub fn setup_test_db_with_prefix(prefix: &str) -> PathBuf {
    let temp_dir = std::env::temp_dir();
    let db_name = format!("z_sqlfuzz_dut_test-{}-{}.db", prefix, Uuid::new_v4());
    temp_dir.join(db_name)
}

/// Create the database at `path` and run `statements` on it. All handles
/// are dropped before returning.
pub fn create_fixture_db(path: &PathBuf, statements: &[&str]) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    runtime.block_on(async {
        let db = Builder::new_local(path.to_str().unwrap())
            .build()
            .await
            .unwrap();
        let conn = db.connect().unwrap();
        for stmt in statements {
            conn.execute(stmt, ()).await.unwrap();
        }
    });
}

/// A fixture with two tables and a view, plus the guard that removes it.
pub fn sample_db(prefix: &str) -> (TestDbGuard, String) {
    let path = setup_test_db_with_prefix(prefix);
    let guard = TestDbGuard::new(path.clone());
    create_fixture_db(
        &path,
        &[
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, score REAL)",
            "CREATE TABLE events (user_id INTEGER, payload TEXT, amount NUMERIC)",
            "CREATE VIEW user_names AS SELECT name FROM users",
            "INSERT INTO users VALUES (1, 'alice', 1.5)",
        ],
    );
    let path = path.to_str().unwrap().to_string();
    (guard, path)
}

#[allow(clippy::expect_used)]
static SCRIPTED_RULES: Lazy<ErrorRules> = Lazy::new(|| {
    ErrorRules::new(&[
        (r#"near ".*": syntax error"#, Classification::Syntax),
        ("callback requested query abort", Classification::UserAbort),
    ])
    .expect("scripted patterns")
    .with_busy_codes(&[5, 6])
});

static SCRIPTED_OPTIONS: OptionSpec = OptionSpec {
    keys: &[("name", "name")],
    defaults: &[],
};

/// In-memory backend replaying canned answers, for exercising the test
/// executor and the loader without an engine.
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    pub run_results: VecDeque<Result<(), EngineError>>,
    pub probe_ok: bool,
    pub executed: Vec<String>,
    pub probes: usize,
    pub closed: bool,
    /// `(table name, [(column, declared type)])`
    pub tables: Vec<(String, Vec<(String, String)>)>,
    pub fail_listing: bool,
    pub described: Vec<String>,
}

impl ScriptedBackend {
    pub fn healthy() -> Self {
        ScriptedBackend {
            probe_ok: true,
            ..Default::default()
        }
    }

    pub fn answering(mut self, result: Result<(), EngineError>) -> Self {
        self.run_results.push_back(result);
        self
    }

    pub fn with_table(mut self, name: &str, columns: &[(&str, &str)]) -> Self {
        self.tables.push((
            name.to_string(),
            columns
                .iter()
                .map(|(c, t)| ((*c).to_string(), (*t).to_string()))
                .collect(),
        ));
        self
    }
}

impl Backend for ScriptedBackend {
    const ENGINE: &'static str = "scripted";

    fn option_spec() -> &'static OptionSpec {
        &SCRIPTED_OPTIONS
    }

    fn connect(_info: &ConnInfo) -> Result<Self, AdapterError> {
        Ok(ScriptedBackend::healthy())
    }

    fn run(&mut self, stmt: &str) -> Result<(), EngineError> {
        self.executed.push(stmt.to_string());
        self.run_results.pop_front().unwrap_or(Ok(()))
    }

    fn probe(&mut self) -> Result<(), AdapterError> {
        self.probes += 1;
        if self.probe_ok && !self.closed {
            Ok(())
        } else {
            Err(AdapterError::Liveness {
                message: "server has gone away".to_string(),
            })
        }
    }

    fn close(&mut self) {
        self.closed = true;
    }

    fn error_rules(&self) -> &'static ErrorRules {
        &SCRIPTED_RULES
    }
}

impl Introspect for ScriptedBackend {
    type Dialect = SqliteDialect;

    fn list_tables(&mut self) -> Result<Vec<Table>, AdapterError> {
        if self.fail_listing {
            return Err(AdapterError::catalog("list tables", "permission denied"));
        }
        Ok(self
            .tables
            .iter()
            .map(|(name, _)| Table::new(name.as_str(), "main", true, true))
            .collect())
    }

    fn describe_table(
        &mut self,
        table: &mut Table,
        registry: &mut TypeRegistry,
    ) -> Result<(), AdapterError> {
        self.described.push(table.name.clone());
        let columns = self
            .tables
            .iter()
            .find(|(name, _)| *name == table.name)
            .map(|(_, columns)| columns.clone())
            .unwrap_or_default();
        for (name, declared) in columns {
            table.columns.push(Column::new(name, registry.intern(&declared)));
        }
        Ok(())
    }
}
