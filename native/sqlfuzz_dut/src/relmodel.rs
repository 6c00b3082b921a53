/// Abstract relational model consumed by the query generator
///
/// Types are interned: every name maps to exactly one `SqlType` for the
/// lifetime of a `TypeRegistry`, and `TypeRef` equality is pointer identity.
/// Tables, columns, operators and routines reference types only through
/// `TypeRef`s handed out by that registry.
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A named SQL type. Only ever constructed by `TypeRegistry`.
#[derive(Debug)]
pub struct SqlType {
    name: String,
}

impl SqlType {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Shared handle to an interned type.
#[derive(Debug, Clone)]
pub struct TypeRef(Arc<SqlType>);

impl TypeRef {
    pub fn name(&self) -> &str {
        self.0.name()
    }

    /// Identity comparison, the only notion of type equality in the model.
    pub fn same(&self, other: &TypeRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for TypeRef {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for TypeRef {}

impl Hash for TypeRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.0), state);
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name-keyed type interner.
///
/// Created once per run and passed explicitly to whoever resolves type
/// names. After catalog loading it is only read.
#[derive(Debug, Default)]
pub struct TypeRegistry {
    types: HashMap<String, TypeRef>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the canonical type for `name`, creating it on first use.
    pub fn intern(&mut self, name: &str) -> TypeRef {
        if let Some(existing) = self.types.get(name) {
            return existing.clone();
        }
        let ty = TypeRef(Arc::new(SqlType {
            name: name.to_string(),
        }));
        self.types.insert(name.to_string(), ty.clone());
        ty
    }

    pub fn lookup(&self, name: &str) -> Option<TypeRef> {
        self.types.get(name).cloned()
    }

    /// True when `ty` is the very object this registry handed out.
    pub fn contains(&self, ty: &TypeRef) -> bool {
        self.types
            .get(ty.name())
            .is_some_and(|registered| registered.same(ty))
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub ty: TypeRef,
}

impl Column {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Column {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Table {
    pub name: String,
    pub schema: String,
    pub is_insertable: bool,
    pub is_base_table: bool,
    pub columns: Vec<Column>,
}

impl Table {
    pub fn new(
        name: impl Into<String>,
        schema: impl Into<String>,
        is_insertable: bool,
        is_base_table: bool,
    ) -> Self {
        Table {
            name: name.into(),
            schema: schema.into(),
            is_insertable,
            is_base_table,
            columns: Vec::new(),
        }
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// One concrete binary operator overload.
#[derive(Debug, Clone)]
pub struct Op {
    pub name: String,
    pub left: TypeRef,
    pub right: TypeRef,
    pub result: TypeRef,
}

impl Op {
    pub fn new(name: impl Into<String>, left: TypeRef, right: TypeRef, result: TypeRef) -> Self {
        Op {
            name: name.into(),
            left,
            right,
            result,
        }
    }
}

/// A function or aggregate signature.
#[derive(Debug, Clone)]
pub struct Routine {
    pub schema: String,
    pub specific_name: String,
    pub name: String,
    pub restype: TypeRef,
    pub argtypes: Vec<TypeRef>,
}

impl Routine {
    pub fn new(
        schema: impl Into<String>,
        specific_name: impl Into<String>,
        restype: TypeRef,
        name: impl Into<String>,
    ) -> Self {
        Routine {
            schema: schema.into(),
            specific_name: specific_name.into(),
            name: name.into(),
            restype,
            argtypes: Vec::new(),
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = TypeRef>) -> Self {
        self.argtypes.extend(args);
        self
    }
}

/// Coarse grouping of types used by the generator's random choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeCategory {
    Boolean,
    Integer,
    Numeric,
    String,
    Array,
    Internal,
    Other,
}
