/// Engine selection for the fuzz driver
///
/// Maps an engine name to its adapter pair so the driver can stay generic:
/// it asks for a catalog once and a `Dut` for the test loop.
use crate::backend::{Backend, Introspect};
use crate::clickhouse_backend::ClickHouseConnection;
use crate::conninfo::ConnInfo;
use crate::dut::{Dut, DutAdapter};
use crate::error::{AdapterError, ConfigError};
use crate::loader::load_catalog;
use crate::relmodel::TypeRegistry;
use crate::schema::Catalog;
use crate::sqlite::SqliteConnection;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Sqlite,
    ClickHouse,
}

impl Engine {
    pub fn name(self) -> &'static str {
        match self {
            Engine::Sqlite => SqliteConnection::ENGINE,
            Engine::ClickHouse => ClickHouseConnection::ENGINE,
        }
    }

    /// Parse `raw` with this engine's option declaration.
    pub fn parse_conninfo(self, raw: &str) -> Result<ConnInfo, ConfigError> {
        match self {
            Engine::Sqlite => SqliteConnection::parse_conninfo(raw),
            Engine::ClickHouse => ClickHouseConnection::parse_conninfo(raw),
        }
    }

    /// Connect, load the catalog, and close the connection again.
    pub fn open_catalog(
        self,
        conninfo: &str,
        registry: &mut TypeRegistry,
    ) -> Result<Catalog, AdapterError> {
        let info = self.parse_conninfo(conninfo)?;
        match self {
            Engine::Sqlite => catalog_from::<SqliteConnection>(&info, registry),
            Engine::ClickHouse => catalog_from::<ClickHouseConnection>(&info, registry),
        }
    }

    pub fn open_dut(self, conninfo: &str) -> Result<Box<dyn Dut>, AdapterError> {
        let info = self.parse_conninfo(conninfo)?;
        Ok(match self {
            Engine::Sqlite => Box::new(DutAdapter::new(SqliteConnection::connect(&info)?)),
            Engine::ClickHouse => Box::new(DutAdapter::new(ClickHouseConnection::connect(&info)?)),
        })
    }
}

impl FromStr for Engine {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sqlite" | "sqlite3" => Ok(Engine::Sqlite),
            "clickhouse" => Ok(Engine::ClickHouse),
            _ => Err(ConfigError::UnknownEngine {
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn catalog_from<B: Introspect>(
    info: &ConnInfo,
    registry: &mut TypeRegistry,
) -> Result<Catalog, AdapterError> {
    let mut backend = B::connect(info)?;
    let catalog = load_catalog(&mut backend, registry);
    backend.close();
    catalog
}
