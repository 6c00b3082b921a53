/// The finished, engine-agnostic catalog handed to the query generator
///
/// A `Catalog` is produced once by the loader and never mutated afterwards.
/// Derived lookup indexes are built in the last loading stage, after every
/// table, operator, routine and aggregate is known.
use crate::relmodel::{Op, Routine, Table, TypeCategory, TypeRef};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Marker types every engine designates during the type stage.
#[derive(Debug, Clone)]
pub struct BaseTypes {
    pub booltype: TypeRef,
    pub inttype: TypeRef,
    pub internaltype: TypeRef,
    pub arraytype: TypeRef,
}

/// How an engine quotes identifiers in generated SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    Bare,
    SingleQuoted,
    DoubleQuoted,
}

impl QuoteStyle {
    pub fn quote(self, id: &str) -> String {
        match self {
            QuoteStyle::Bare => id.to_string(),
            QuoteStyle::SingleQuoted => format!("'{id}'"),
            QuoteStyle::DoubleQuoted => crate::utils::quote_identifier(id),
        }
    }
}

/// Lookup structures over a loaded catalog. Entries are positions in the
/// catalog's own collections.
#[derive(Debug, Default)]
pub struct CatalogIndex {
    operators_returning_type: HashMap<TypeRef, Vec<usize>>,
    routines_returning_type: HashMap<TypeRef, Vec<usize>>,
    parameterless_routines_returning_type: HashMap<TypeRef, Vec<usize>>,
    aggregates_returning_type: HashMap<TypeRef, Vec<usize>>,
    tables_with_columns_of_type: HashMap<TypeRef, Vec<usize>>,
    base_tables: Vec<usize>,
    types_by_category: BTreeMap<TypeCategory, Vec<TypeRef>>,
}

impl CatalogIndex {
    pub(crate) fn build(
        types: &[TypeRef],
        tables: &[Table],
        operators: &[Op],
        routines: &[Routine],
        aggregates: &[Routine],
        categorize: impl Fn(&TypeRef) -> TypeCategory,
    ) -> Self {
        let mut index = CatalogIndex::default();

        for (i, op) in operators.iter().enumerate() {
            index
                .operators_returning_type
                .entry(op.result.clone())
                .or_default()
                .push(i);
        }

        for (i, routine) in routines.iter().enumerate() {
            index
                .routines_returning_type
                .entry(routine.restype.clone())
                .or_default()
                .push(i);
            if routine.argtypes.is_empty() {
                index
                    .parameterless_routines_returning_type
                    .entry(routine.restype.clone())
                    .or_default()
                    .push(i);
            }
        }

        for (i, aggregate) in aggregates.iter().enumerate() {
            index
                .aggregates_returning_type
                .entry(aggregate.restype.clone())
                .or_default()
                .push(i);
        }

        for (i, table) in tables.iter().enumerate() {
            if table.is_base_table {
                index.base_tables.push(i);
            }
            for column in &table.columns {
                let entry = index
                    .tables_with_columns_of_type
                    .entry(column.ty.clone())
                    .or_default();
                // a table with several columns of one type is listed once
                if entry.last() != Some(&i) {
                    entry.push(i);
                }
            }
        }

        for ty in types {
            index
                .types_by_category
                .entry(categorize(ty))
                .or_default()
                .push(ty.clone());
        }

        index
    }
}

#[derive(Debug)]
pub struct Catalog {
    pub(crate) engine: &'static str,
    pub(crate) base: BaseTypes,
    pub(crate) types: Vec<TypeRef>,
    pub(crate) tables: Vec<Table>,
    pub(crate) operators: Vec<Op>,
    pub(crate) routines: Vec<Routine>,
    pub(crate) aggregates: Vec<Routine>,
    pub(crate) true_literal: &'static str,
    pub(crate) false_literal: &'static str,
    pub(crate) quote_style: QuoteStyle,
    pub(crate) index: CatalogIndex,
}

impl Catalog {
    pub fn engine(&self) -> &'static str {
        self.engine
    }

    pub fn base_types(&self) -> &BaseTypes {
        &self.base
    }

    pub fn types(&self) -> &[TypeRef] {
        &self.types
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn operators(&self) -> &[Op] {
        &self.operators
    }

    pub fn routines(&self) -> &[Routine] {
        &self.routines
    }

    pub fn aggregates(&self) -> &[Routine] {
        &self.aggregates
    }

    pub fn true_literal(&self) -> &str {
        self.true_literal
    }

    pub fn false_literal(&self) -> &str {
        self.false_literal
    }

    pub fn quote_name(&self, id: &str) -> String {
        self.quote_style.quote(id)
    }

    pub fn operators_returning(&self, ty: &TypeRef) -> impl Iterator<Item = &Op> {
        positions(&self.index.operators_returning_type, ty).map(move |i| &self.operators[i])
    }

    pub fn routines_returning(&self, ty: &TypeRef) -> impl Iterator<Item = &Routine> {
        positions(&self.index.routines_returning_type, ty).map(move |i| &self.routines[i])
    }

    pub fn parameterless_routines_returning(
        &self,
        ty: &TypeRef,
    ) -> impl Iterator<Item = &Routine> {
        positions(&self.index.parameterless_routines_returning_type, ty)
            .map(move |i| &self.routines[i])
    }

    pub fn aggregates_returning(&self, ty: &TypeRef) -> impl Iterator<Item = &Routine> {
        positions(&self.index.aggregates_returning_type, ty).map(move |i| &self.aggregates[i])
    }

    pub fn tables_with_column_of(&self, ty: &TypeRef) -> impl Iterator<Item = &Table> {
        positions(&self.index.tables_with_columns_of_type, ty).map(move |i| &self.tables[i])
    }

    pub fn base_tables(&self) -> impl Iterator<Item = &Table> {
        self.index.base_tables.iter().map(move |&i| &self.tables[i])
    }

    pub fn types_in(&self, category: TypeCategory) -> &[TypeRef] {
        self.index
            .types_by_category
            .get(&category)
            .map_or(&[] as &[TypeRef], Vec::as_slice)
    }

    /// Dump what was loaded, for checking an engine adapter by eye.
    pub fn log_summary(&self) {
        debug!(target: "sqlfuzz::catalog", "loaded tables ({}):", self.tables.len());
        for table in &self.tables {
            debug!(
                target: "sqlfuzz::catalog",
                "{}; {}; {}; {}",
                table.name, table.schema, table.is_insertable, table.is_base_table
            );
        }

        debug!(target: "sqlfuzz::catalog", "loaded columns:");
        for table in &self.tables {
            for column in &table.columns {
                debug!(target: "sqlfuzz::catalog", "{}; {}; {}", table.name, column.name, column.ty);
            }
        }

        debug!(target: "sqlfuzz::catalog", "loaded aggregates ({}):", self.aggregates.len());
        for aggregate in &self.aggregates {
            let args = aggregate
                .argtypes
                .iter()
                .map(TypeRef::name)
                .collect::<Vec<_>>()
                .join("; ");
            debug!(
                target: "sqlfuzz::catalog",
                "{}; {}; {}; {}; {}",
                aggregate.specific_name, aggregate.schema, aggregate.name, aggregate.restype, args
            );
        }
    }
}

fn positions<'a>(
    map: &'a HashMap<TypeRef, Vec<usize>>,
    ty: &TypeRef,
) -> impl Iterator<Item = usize> + 'a {
    map.get(ty).into_iter().flatten().copied()
}
