/// Capability traits every engine adapter implements
///
/// The loader and the test executor are written against these traits only;
/// nothing outside the engine modules touches an engine client type.
use crate::conninfo::{ConnInfo, OptionSpec};
use crate::dut::ErrorRules;
use crate::error::{AdapterError, ConfigError, EngineError};
use crate::relmodel::{Op, Routine, Table, TypeCategory, TypeRef, TypeRegistry};
use crate::schema::{BaseTypes, QuoteStyle};
use tracing::info;

/// A live connection to one engine instance.
pub trait Backend {
    /// Short engine name used in logs and errors.
    const ENGINE: &'static str;

    /// Options this engine accepts in a connection string.
    fn option_spec() -> &'static OptionSpec;

    fn parse_conninfo(raw: &str) -> Result<ConnInfo, ConfigError> {
        ConnInfo::parse(raw, Self::option_spec())
    }

    /// Open a connection. Never returns a half-initialised adapter.
    fn connect(info: &ConnInfo) -> Result<Self, AdapterError>
    where
        Self: Sized;

    /// Run `stmt` and report the engine's own verdict.
    fn run(&mut self, stmt: &str) -> Result<(), EngineError>;

    /// Best-effort send: engine errors are logged and dropped. Whether the
    /// connection survived is for `probe` to tell.
    fn execute(&mut self, stmt: &str) {
        if let Err(e) = self.run(stmt) {
            info!(target: "sqlfuzz::dut", engine = Self::ENGINE, "statement rejected: {e}");
        }
    }

    /// Lightweight round trip proving the connection is still usable.
    fn probe(&mut self) -> Result<(), AdapterError>;

    /// Release the engine handle. Safe to call any number of times.
    fn close(&mut self);

    /// Ordered message patterns used to classify `run` errors.
    fn error_rules(&self) -> &'static ErrorRules;
}

/// Catalog discovery on top of a connection.
pub trait Introspect: Backend {
    type Dialect: Dialect;

    /// One `Table` per table the engine reports, without columns. Zero rows
    /// is a valid, empty answer.
    fn list_tables(&mut self) -> Result<Vec<Table>, AdapterError>;

    /// Append the columns of `table`, resolving type names through `registry`.
    fn describe_table(
        &mut self,
        table: &mut Table,
        registry: &mut TypeRegistry,
    ) -> Result<(), AdapterError>;
}

/// Fixed, version-specific knowledge about an engine's SQL surface.
pub trait Dialect {
    fn base_types(registry: &mut TypeRegistry) -> BaseTypes;

    /// Concrete types the generator may pick from.
    fn concrete_types(registry: &mut TypeRegistry) -> Vec<TypeRef>;

    fn operators(registry: &mut TypeRegistry) -> Vec<Op>;

    fn routines(registry: &mut TypeRegistry) -> Vec<Routine>;

    fn aggregates(registry: &mut TypeRegistry) -> Vec<Routine>;

    fn type_category(ty: &TypeRef, base: &BaseTypes) -> TypeCategory;

    fn quote_style() -> QuoteStyle {
        QuoteStyle::Bare
    }

    fn true_literal() -> &'static str {
        "true"
    }

    fn false_literal() -> &'static str {
        "false"
    }
}

/// Binary operators sharing one signature.
pub(crate) fn binary_ops(
    registry: &mut TypeRegistry,
    names: &[&str],
    left: &str,
    right: &str,
    result: &str,
) -> Vec<Op> {
    names
        .iter()
        .map(|name| {
            Op::new(
                *name,
                registry.intern(left),
                registry.intern(right),
                registry.intern(result),
            )
        })
        .collect()
}

/// Unqualified routine. SQLite declares no specific names and passes "".
pub(crate) fn routine(
    registry: &mut TypeRegistry,
    specific_name: &str,
    name: &str,
    restype: &str,
    args: &[&str],
) -> Routine {
    let restype = registry.intern(restype);
    let args = args.iter().map(|a| registry.intern(a)).collect::<Vec<_>>();
    Routine::new("", specific_name, restype, name).with_args(args)
}
