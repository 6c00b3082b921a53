/// SQLite adapter over an embedded libsql database
///
/// The database is opened read-only. Catalog discovery walks
/// `sqlite_master` and `PRAGMA table_info` row by row; SQLite exposes no
/// queryable catalog of functions, so operators, routines and aggregates are
/// the fixed set this SQLite version ships.
use crate::backend::{binary_ops, routine, Backend, Dialect, Introspect};
use crate::constants::*;
use crate::conninfo::{ConnInfo, OptionSpec};
use crate::dut::{Classification, DutAdapter, ErrorRules};
use crate::error::{AdapterError, ConfigError, EngineError};
use crate::relmodel::{Column, Op, Routine, Table, TypeCategory, TypeRef, TypeRegistry};
use crate::schema::{BaseTypes, QuoteStyle};
use crate::utils::{
    build_runtime, quote_identifier, split_statements, sqlite_engine_error, with_connect_timeout,
};
use libsql::{Builder, OpenFlags};
use once_cell::sync::Lazy;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::{debug, info};

/// Error patterns for SQLite messages. The patterns are literals.
#[allow(clippy::expect_used)]
pub static SQLITE_RULES: Lazy<ErrorRules> = Lazy::new(|| {
    ErrorRules::new(&[
        (r#"near ".*": syntax error"#, Classification::Syntax),
        (regex::escape(USER_ABORT_MESSAGE).as_str(), Classification::UserAbort),
    ])
    .expect("sqlite error patterns")
    .with_busy_codes(SQLITE_BUSY_CODES)
});

/// Test executor for SQLite.
pub type SqliteDut = DutAdapter<SqliteConnection>;

pub struct SqliteConnection {
    path: String,
    // declared before `runtime` so the handles drop first
    conn: Option<libsql::Connection>,
    db: Option<libsql::Database>,
    runtime: Runtime,
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.path)
            .field("open", &self.conn.is_some())
            .finish()
    }
}

impl SqliteConnection {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_some()
    }

    fn connection(&self) -> Result<&libsql::Connection, AdapterError> {
        self.conn
            .as_ref()
            .ok_or(AdapterError::Closed { engine: Self::ENGINE })
    }

    /// Run a metadata query, yielding its rows lazily.
    pub fn metadata_query(&self, sql: &str) -> Result<MetaRows<'_>, AdapterError> {
        let conn = self.connection()?;
        let rows = self
            .runtime
            .block_on(conn.query(sql, ()))
            .map_err(|e| AdapterError::catalog(sql, sqlite_engine_error(e)))?;
        Ok(MetaRows {
            runtime: &self.runtime,
            rows,
            query: sql.to_string(),
        })
    }
}

/// Single-pass sequence over the rows of one metadata query.
pub struct MetaRows<'a> {
    runtime: &'a Runtime,
    rows: libsql::Rows,
    query: String,
}

impl Iterator for MetaRows<'_> {
    type Item = Result<libsql::Row, AdapterError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.runtime
            .block_on(self.rows.next())
            .map_err(|e| AdapterError::catalog(&self.query, sqlite_engine_error(e)))
            .transpose()
    }
}

fn text_column(row: &libsql::Row, idx: i32, query: &str) -> Result<String, AdapterError> {
    row.get::<String>(idx)
        .map_err(|e| AdapterError::catalog(query, sqlite_engine_error(e)))
}

impl Backend for SqliteConnection {
    const ENGINE: &'static str = "sqlite";

    fn option_spec() -> &'static OptionSpec {
        &SQLITE_OPTIONS
    }

    /// A connection string that is a single token without `=` is taken as
    /// the database path.
    fn parse_conninfo(raw: &str) -> Result<ConnInfo, ConfigError> {
        let mut tokens = raw.split_whitespace();
        match (tokens.next(), tokens.next()) {
            (Some(path), None) if !path.contains('=') => {
                ConnInfo::parse(&format!("db={path}"), &SQLITE_OPTIONS)
            }
            _ => ConnInfo::parse(raw, &SQLITE_OPTIONS),
        }
    }

    fn connect(info: &ConnInfo) -> Result<Self, AdapterError> {
        let path = info.require("db")?.to_string();
        let busy_timeout = info.parse_u64("busy_timeout")?;
        let runtime = build_runtime()?;

        let (db, conn) = runtime.block_on(with_connect_timeout(Self::ENGINE, async {
            let db = Builder::new_local(&path)
                .flags(OpenFlags::SQLITE_OPEN_READ_ONLY)
                .build()
                .await?;
            let conn = db.connect()?;
            if busy_timeout > 0 {
                conn.busy_timeout(Duration::from_millis(busy_timeout))?;
            }
            conn.query("SELECT 1", ()).await?;
            Ok::<_, libsql::Error>((db, conn))
        }))?;

        info!(target: "sqlfuzz::sqlite", "opened {path} read-only");
        Ok(SqliteConnection {
            path,
            conn: Some(conn),
            db: Some(db),
            runtime,
        })
    }

    fn run(&mut self, stmt: &str) -> Result<(), EngineError> {
        let conn = self
            .conn
            .as_ref()
            .ok_or_else(|| EngineError::new(None, "connection is closed"))?;

        // Statements run in order. The first error or the first row ends the
        // batch, a row being reported the way exec with an aborting row
        // callback does. Comment-only input runs nothing and succeeds.
        self.runtime.block_on(async {
            for single in split_statements(stmt) {
                let mut rows = conn.query(single, ()).await.map_err(sqlite_engine_error)?;
                if rows.next().await.map_err(sqlite_engine_error)?.is_some() {
                    return Err(EngineError::new(Some(SQLITE_ABORT), USER_ABORT_MESSAGE));
                }
            }
            Ok(())
        })
    }

    fn probe(&mut self) -> Result<(), AdapterError> {
        let conn = self.connection()?;
        self.runtime
            .block_on(async {
                let mut rows = conn.query("SELECT 1", ()).await?;
                rows.next().await?;
                Ok::<_, libsql::Error>(())
            })
            .map_err(|e| AdapterError::Liveness {
                message: sqlite_engine_error(e).to_string(),
            })
    }

    fn close(&mut self) {
        if self.conn.take().is_some() {
            debug!(target: "sqlfuzz::sqlite", "closed {}", self.path);
        }
        self.db = None;
    }

    fn error_rules(&self) -> &'static ErrorRules {
        &SQLITE_RULES
    }
}

impl Introspect for SqliteConnection {
    type Dialect = SqliteDialect;

    fn list_tables(&mut self) -> Result<Vec<Table>, AdapterError> {
        let query = "SELECT tbl_name FROM main.sqlite_master WHERE type = 'table'";
        let mut tables = Vec::new();
        for row in self.metadata_query(query)? {
            let name = text_column(&row?, 0, query)?;
            tables.push(Table::new(name, "main", true, true));
        }
        Ok(tables)
    }

    fn describe_table(
        &mut self,
        table: &mut Table,
        registry: &mut TypeRegistry,
    ) -> Result<(), AdapterError> {
        let query = format!("PRAGMA table_info({})", quote_identifier(&table.name));
        for row in self.metadata_query(&query)? {
            let row = row?;
            let name = text_column(&row, 1, &query)?;
            let declared = text_column(&row, 2, &query)?;
            table.columns.push(Column::new(name, registry.intern(&declared)));
        }
        Ok(())
    }
}

/// Fixed SQL surface of SQLite 3.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn base_types(registry: &mut TypeRegistry) -> BaseTypes {
        BaseTypes {
            booltype: registry.intern(SQLITE_INTEGER),
            inttype: registry.intern(SQLITE_INTEGER),
            internaltype: registry.intern(INTERNAL_TYPE),
            arraytype: registry.intern(SQLITE_ARRAY),
        }
    }

    fn concrete_types(registry: &mut TypeRegistry) -> Vec<TypeRef> {
        [SQLITE_INTEGER, SQLITE_REAL, SQLITE_TEXT, SQLITE_NUMERIC]
            .iter()
            .map(|name| registry.intern(name))
            .collect()
    }

    fn operators(registry: &mut TypeRegistry) -> Vec<Op> {
        let mut ops = binary_ops(registry, &["||"], SQLITE_TEXT, SQLITE_TEXT, SQLITE_TEXT);
        ops.extend(binary_ops(
            registry,
            &[
                "*", "/", "+", "-", ">>", "<<", "&", "|", "<", "<=", ">", ">=", "=", "<>", "IS",
                "IS NOT", "AND", "OR",
            ],
            SQLITE_INTEGER,
            SQLITE_INTEGER,
            SQLITE_INTEGER,
        ));
        ops
    }

    fn routines(registry: &mut TypeRegistry) -> Vec<Routine> {
        let signatures: &[(&str, &str, &[&str])] = &[
            ("last_insert_rowid", "INTEGER", &[]),
            ("random", "INTEGER", &[]),
            ("sqlite_source_id", "TEXT", &[]),
            ("sqlite_version", "TEXT", &[]),
            ("total_changes", "INTEGER", &[]),
            ("abs", "INTEGER", &["REAL"]),
            ("hex", "TEXT", &["TEXT"]),
            ("length", "INTEGER", &["TEXT"]),
            ("lower", "TEXT", &["TEXT"]),
            ("ltrim", "TEXT", &["TEXT"]),
            ("quote", "TEXT", &["TEXT"]),
            ("randomblob", "TEXT", &["INTEGER"]),
            ("round", "INTEGER", &["REAL"]),
            ("rtrim", "TEXT", &["TEXT"]),
            ("soundex", "TEXT", &["TEXT"]),
            ("sqlite_compileoption_get", "TEXT", &["INTEGER"]),
            ("sqlite_compileoption_used", "INTEGER", &["TEXT"]),
            ("trim", "TEXT", &["TEXT"]),
            ("typeof", "TEXT", &["INTEGER"]),
            ("typeof", "TEXT", &["NUMERIC"]),
            ("typeof", "TEXT", &["REAL"]),
            ("typeof", "TEXT", &["TEXT"]),
            ("unicode", "INTEGER", &["TEXT"]),
            ("upper", "TEXT", &["TEXT"]),
            ("zeroblob", "TEXT", &["INTEGER"]),
            ("glob", "INTEGER", &["TEXT", "TEXT"]),
            ("instr", "INTEGER", &["TEXT", "TEXT"]),
            ("like", "INTEGER", &["TEXT", "TEXT"]),
            ("ltrim", "TEXT", &["TEXT", "TEXT"]),
            ("rtrim", "TEXT", &["TEXT", "TEXT"]),
            ("trim", "TEXT", &["TEXT", "TEXT"]),
            ("round", "INTEGER", &["REAL", "INTEGER"]),
            ("substr", "TEXT", &["TEXT", "INTEGER"]),
            ("substr", "TEXT", &["TEXT", "INTEGER", "INTEGER"]),
            ("replace", "TEXT", &["TEXT", "TEXT", "TEXT"]),
        ];
        signatures
            .iter()
            .map(|(name, restype, args)| routine(registry, "", name, restype, args))
            .collect()
    }

    fn aggregates(registry: &mut TypeRegistry) -> Vec<Routine> {
        let signatures: &[(&str, &str, &[&str])] = &[
            ("avg", "INTEGER", &["INTEGER"]),
            ("avg", "REAL", &["REAL"]),
            ("count", "INTEGER", &["REAL"]),
            ("count", "INTEGER", &["TEXT"]),
            ("count", "INTEGER", &["INTEGER"]),
            ("group_concat", "TEXT", &["TEXT"]),
            ("max", "REAL", &["REAL"]),
            ("max", "INTEGER", &["INTEGER"]),
            ("min", "REAL", &["REAL"]),
            ("min", "INTEGER", &["INTEGER"]),
            ("sum", "REAL", &["REAL"]),
            ("sum", "INTEGER", &["INTEGER"]),
            ("total", "REAL", &["INTEGER"]),
            ("total", "REAL", &["REAL"]),
        ];
        signatures
            .iter()
            .map(|(name, restype, args)| routine(registry, "", name, restype, args))
            .collect()
    }

    /// Column affinity rules of SQLite applied to the declared type name.
    fn type_category(ty: &TypeRef, base: &BaseTypes) -> TypeCategory {
        if ty.same(&base.internaltype) {
            return TypeCategory::Internal;
        }
        if ty.same(&base.arraytype) {
            return TypeCategory::Array;
        }
        let declared = ty.name().to_ascii_uppercase();
        if declared.contains("INT") {
            TypeCategory::Integer
        } else if ["CHAR", "CLOB", "TEXT"].iter().any(|s| declared.contains(s)) {
            TypeCategory::String
        } else if declared.is_empty() || declared.contains("BLOB") {
            TypeCategory::Other
        } else {
            TypeCategory::Numeric
        }
    }

    fn true_literal() -> &'static str {
        "1"
    }

    fn false_literal() -> &'static str {
        "0"
    }

    fn quote_style() -> QuoteStyle {
        QuoteStyle::Bare
    }
}
