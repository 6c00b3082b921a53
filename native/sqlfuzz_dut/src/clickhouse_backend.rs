/// ClickHouse adapter over the HTTP client
///
/// Tables come from `system.tables`, columns from `system.columns`. Only
/// array-typed columns are kept, all as the generic `Array` type; the
/// generator does not model the rest of the ClickHouse type system yet.
/// Operators, routines and aggregates are declared, not discovered.
use crate::backend::{binary_ops, routine, Backend, Dialect, Introspect};
use crate::constants::*;
use crate::conninfo::{ConnInfo, OptionSpec};
use crate::dut::{Classification, DutAdapter, ErrorRules};
use crate::error::{AdapterError, EngineError};
use crate::relmodel::{Column, Op, Routine, Table, TypeCategory, TypeRef, TypeRegistry};
use crate::schema::{BaseTypes, QuoteStyle};
use crate::utils::{build_runtime, clickhouse_engine_error, with_connect_timeout};
use clickhouse::{Client, Row};
use once_cell::sync::Lazy;
use serde::Deserialize;
use tokio::runtime::Runtime;
use tracing::{debug, info};

/// Error patterns for ClickHouse server exceptions, which arrive as
/// `Code: N. DB::Exception: ...`. The patterns are literals.
#[allow(clippy::expect_used)]
pub static CLICKHOUSE_RULES: Lazy<ErrorRules> = Lazy::new(|| {
    ErrorRules::new(&[
        (r"(?s)Code: 62\. DB::Exception: Syntax error.*", Classification::Syntax),
        // TIMEOUT_EXCEEDED, TOO_MANY_SIMULTANEOUS_QUERIES
        (r"(?s)Code: (?:159|202)\. .*", Classification::Timeout),
    ])
    .expect("clickhouse error patterns")
});

/// Test executor for ClickHouse.
pub type ClickHouseDut = DutAdapter<ClickHouseConnection>;

#[derive(Debug, Row, Deserialize)]
struct TableNameRow {
    name: String,
}

#[derive(Debug, Row, Deserialize)]
struct ColumnRow {
    name: String,
    #[serde(rename = "type")]
    declared: String,
}

pub struct ClickHouseConnection {
    url: String,
    database: String,
    client: Option<Client>,
    runtime: Runtime,
}

impl std::fmt::Debug for ClickHouseConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClickHouseConnection")
            .field("url", &self.url)
            .field("database", &self.database)
            .field("open", &self.client.is_some())
            .finish()
    }
}

/// Client settings derived from a connection string.
///
/// The client speaks HTTP, so `port` must be the server's HTTP port (8123 by
/// default), not the native-protocol port 9000. The port is used as given.
///
/// Separate from connecting so option handling can be checked without a
/// server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickHouseOptions {
    pub url: String,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl ClickHouseOptions {
    pub fn from_conninfo(info: &ConnInfo) -> Result<Self, AdapterError> {
        let host = info.require("host")?;
        let port = info.parse_u16("port")?;
        Ok(ClickHouseOptions {
            url: format!("http://{host}:{port}"),
            user: info.require("user")?.to_string(),
            password: info.require("pass")?.to_string(),
            database: info.require("db")?.to_string(),
        })
    }

    fn client(&self) -> Client {
        Client::default()
            .with_url(&self.url)
            .with_user(&self.user)
            .with_password(&self.password)
    }
}

/// `?` is the client's bind placeholder; generated SQL must reach the server verbatim.
pub(crate) fn escape_placeholders(stmt: &str) -> String {
    stmt.replace('?', "??")
}

/// Append the array-typed columns among `(name, declared type)` rows, all
/// typed as the generic array type.
pub fn retain_array_columns(
    table: &mut Table,
    rows: impl IntoIterator<Item = (String, String)>,
    registry: &mut TypeRegistry,
) {
    for (name, declared) in rows {
        if declared.starts_with(CH_ARRAY) {
            table.columns.push(Column::new(name, registry.intern(CH_ARRAY)));
        } else {
            debug!(
                target: "sqlfuzz::clickhouse",
                "skipping {}.{name} of type {declared}", table.name
            );
        }
    }
}

impl ClickHouseConnection {
    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn is_open(&self) -> bool {
        self.client.is_some()
    }

    fn client(&self) -> Result<&Client, AdapterError> {
        self.client
            .as_ref()
            .ok_or(AdapterError::Closed { engine: Self::ENGINE })
    }
}

impl Backend for ClickHouseConnection {
    const ENGINE: &'static str = "clickhouse";

    fn option_spec() -> &'static OptionSpec {
        &CLICKHOUSE_OPTIONS
    }

    fn connect(info: &ConnInfo) -> Result<Self, AdapterError> {
        let options = ClickHouseOptions::from_conninfo(info)?;
        let runtime = build_runtime()?;
        let client = options.client();

        // HTTP connects lazily; one round trip proves host and credentials.
        runtime.block_on(with_connect_timeout(
            Self::ENGINE,
            client.query("SELECT 1").execute(),
        ))?;

        info!(target: "sqlfuzz::clickhouse", "connected to {} as {}", options.url, options.user);
        Ok(ClickHouseConnection {
            url: options.url,
            database: options.database,
            client: Some(client),
            runtime,
        })
    }

    fn run(&mut self, stmt: &str) -> Result<(), EngineError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| EngineError::new(None, "connection is closed"))?;
        let sql = escape_placeholders(stmt);
        self.runtime
            .block_on(client.query(&sql).execute())
            .map_err(clickhouse_engine_error)
    }

    fn probe(&mut self) -> Result<(), AdapterError> {
        let client = self.client()?;
        self.runtime
            .block_on(client.query("SELECT 1").execute())
            .map_err(|e| AdapterError::Liveness {
                message: clickhouse_engine_error(e).to_string(),
            })
    }

    fn close(&mut self) {
        if self.client.take().is_some() {
            debug!(target: "sqlfuzz::clickhouse", "closed {}", self.url);
        }
    }

    fn error_rules(&self) -> &'static ErrorRules {
        &CLICKHOUSE_RULES
    }
}

impl Introspect for ClickHouseConnection {
    type Dialect = ClickHouseDialect;

    fn list_tables(&mut self) -> Result<Vec<Table>, AdapterError> {
        let query = "SELECT name FROM system.tables WHERE database = ? ORDER BY name";
        let client = self.client()?;
        let rows = self
            .runtime
            .block_on(
                client
                    .query(query)
                    .bind(&self.database)
                    .fetch_all::<TableNameRow>(),
            )
            .map_err(|e| AdapterError::catalog(query, clickhouse_engine_error(e)))?;

        Ok(rows
            .into_iter()
            .map(|row| Table::new(row.name, self.database.as_str(), true, false))
            .collect())
    }

    fn describe_table(
        &mut self,
        table: &mut Table,
        registry: &mut TypeRegistry,
    ) -> Result<(), AdapterError> {
        let query = "SELECT name, type FROM system.columns \
                     WHERE database = ? AND table = ? ORDER BY position";
        let client = self.client()?;
        let rows = self
            .runtime
            .block_on(
                client
                    .query(query)
                    .bind(&self.database)
                    .bind(&table.name)
                    .fetch_all::<ColumnRow>(),
            )
            .map_err(|e| AdapterError::catalog(query, clickhouse_engine_error(e)))?;

        retain_array_columns(
            table,
            rows.into_iter().map(|row| (row.name, row.declared)),
            registry,
        );
        Ok(())
    }
}

/// Declared SQL surface of ClickHouse.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClickHouseDialect;

impl Dialect for ClickHouseDialect {
    fn base_types(registry: &mut TypeRegistry) -> BaseTypes {
        BaseTypes {
            booltype: registry.intern(CH_BOOL),
            inttype: registry.intern(CH_INT),
            internaltype: registry.intern(INTERNAL_TYPE),
            arraytype: registry.intern(CH_ARRAY),
        }
    }

    fn concrete_types(registry: &mut TypeRegistry) -> Vec<TypeRef> {
        let mut types = vec![registry.intern(CH_STRING), registry.intern(CH_ARRAY)];
        types.extend(CH_INTEGER_TYPES.iter().map(|name| registry.intern(name)));
        types
    }

    fn operators(registry: &mut TypeRegistry) -> Vec<Op> {
        let mut ops = Vec::new();
        for &ty in CH_INTEGER_TYPES {
            ops.extend(binary_ops(registry, CH_NUM_OPS, ty, ty, ty));
            ops.extend(binary_ops(registry, CH_CMP_OPS, ty, ty, CH_BOOL));
            ops.extend(binary_ops(
                registry,
                &["like", "not like", "ilike"],
                ty,
                ty,
                CH_BOOL,
            ));
        }
        ops.extend(binary_ops(registry, CH_STRING_OPS, CH_STRING, CH_STRING, CH_BOOL));
        ops
    }

    fn routines(registry: &mut TypeRegistry) -> Vec<Routine> {
        let mut routines = Vec::new();
        for &ty in CH_INTEGER_TYPES {
            for name in [
                "plus",
                "minus",
                "multiply",
                "divide",
                "intDiv",
                "intDivOrZero",
                "modulo",
                "moduloOrZero",
                "gcd",
                "lcm",
            ] {
                routines.push(routine(registry, name, name, ty, &[ty, ty]));
            }
            for name in ["negate", "abs"] {
                routines.push(routine(registry, name, name, ty, &[ty]));
            }
        }

        let string_signatures: &[(&str, &str, &[&str])] = &[
            ("empty", "UInt8", &["String"]),
            ("length", "UInt64", &["String"]),
            ("lower", "String", &["String"]),
            ("upper", "String", &["String"]),
            ("reverse", "String", &["String"]),
            ("concat", "String", &["String", "String"]),
            ("position", "UInt64", &["String", "String"]),
            ("positionCaseInsensitive", "UInt64", &["String", "String"]),
            ("match", "UInt8", &["String", "String"]),
        ];
        routines.extend(
            string_signatures
                .iter()
                .map(|(name, restype, args)| routine(registry, name, name, restype, args)),
        );
        routines
    }

    fn aggregates(registry: &mut TypeRegistry) -> Vec<Routine> {
        let mut aggregates = Vec::new();
        for &ty in CH_INTEGER_TYPES {
            for name in ["min", "max", "any", "anyLast"] {
                aggregates.push(routine(registry, name, name, ty, &[ty]));
            }
            let sum_type = if ty.starts_with("UInt") { "UInt64" } else { "Int64" };
            aggregates.push(routine(registry, "sum", "sum", sum_type, &[ty]));
            aggregates.push(routine(registry, "count", "count", "UInt64", &[ty]));
        }
        aggregates.push(routine(registry, "count", "count", "UInt64", &[CH_STRING]));
        aggregates.push(routine(registry, "min", "min", CH_STRING, &[CH_STRING]));
        aggregates.push(routine(registry, "max", "max", CH_STRING, &[CH_STRING]));
        aggregates
    }

    fn type_category(ty: &TypeRef, base: &BaseTypes) -> TypeCategory {
        let name = ty.name();
        if ty.same(&base.internaltype) {
            TypeCategory::Internal
        } else if name.starts_with(CH_ARRAY) {
            TypeCategory::Array
        } else if name == "Bool" {
            TypeCategory::Boolean
        } else if name.starts_with("UInt") || name.starts_with("Int") {
            TypeCategory::Integer
        } else if name.starts_with("Float") || name.starts_with("Decimal") {
            TypeCategory::Numeric
        } else if name == CH_STRING || name.starts_with("FixedString") {
            TypeCategory::String
        } else {
            TypeCategory::Other
        }
    }

    fn quote_style() -> QuoteStyle {
        QuoteStyle::SingleQuoted
    }
}
