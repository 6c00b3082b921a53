/// Catalog loading
///
/// Builds a `Catalog` from any `Introspect` backend in a fixed stage order:
/// types, tables and columns, operators, routines, aggregates, indexes.
/// Later stages resolve type names through the registry filled by earlier
/// ones. Any failure aborts the whole load; no partial catalog escapes.
use crate::backend::{Dialect, Introspect};
use crate::error::AdapterError;
use crate::relmodel::TypeRegistry;
use crate::schema::{Catalog, CatalogIndex};
use tracing::{debug, info};

/// Load the catalog of the engine behind `backend`.
///
/// `registry` is the run's type interner; the catalog only holds handles
/// obtained from it.
pub fn load_catalog<B: Introspect>(
    backend: &mut B,
    registry: &mut TypeRegistry,
) -> Result<Catalog, AdapterError> {
    let engine = B::ENGINE;

    let base = B::Dialect::base_types(registry);
    let mut types = B::Dialect::concrete_types(registry);
    debug!(target: "sqlfuzz::catalog", engine, "registered {} types", types.len());

    info!(target: "sqlfuzz::catalog", engine, "loading tables");
    let mut tables = backend.list_tables()?;
    for table in &mut tables {
        backend.describe_table(table, registry)?;
        debug!(
            target: "sqlfuzz::catalog",
            engine,
            "{}.{}: {} columns", table.schema, table.name, table.columns.len()
        );
        for column in &table.columns {
            if !types.iter().any(|t| t.same(&column.ty)) {
                types.push(column.ty.clone());
            }
        }
    }
    info!(target: "sqlfuzz::catalog", engine, "loaded {} tables", tables.len());

    let operators = B::Dialect::operators(registry);
    let routines = B::Dialect::routines(registry);
    let aggregates = B::Dialect::aggregates(registry);
    info!(
        target: "sqlfuzz::catalog",
        engine,
        "registered {} operators, {} routines, {} aggregates",
        operators.len(),
        routines.len(),
        aggregates.len()
    );

    let index = CatalogIndex::build(&types, &tables, &operators, &routines, &aggregates, |ty| {
        B::Dialect::type_category(ty, &base)
    });

    let catalog = Catalog {
        engine,
        base,
        types,
        tables,
        operators,
        routines,
        aggregates,
        true_literal: B::Dialect::true_literal(),
        false_literal: B::Dialect::false_literal(),
        quote_style: B::Dialect::quote_style(),
        index,
    };
    catalog.log_summary();
    Ok(catalog)
}
