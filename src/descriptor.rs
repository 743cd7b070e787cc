//! Entity descriptors - the static mapping from a type to its table
//!
//! An entity answers three questions: which table it lives in, which
//! (column, field) pairs it has in a stable order, and which of those columns
//! form its primary key. Everything else in the engine works off that answer.

use chrono::{DateTime, Utc};
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, OnceLock, PoisonError};
use crate::graph::Node;
use crate::links::Association;
use crate::value::Value;
use crate::{Error, Result};

/// A struct field that can be bound into a statement and filled from a cell.
pub trait Field {
    /// Snapshot the field as a statement argument
    fn to_value(&self) -> Value;

    /// Overwrite the field from a decoded cell
    fn set_value(&mut self, column: &str, value: Value) -> Result<()>;
}

fn mismatch(column: &str, expected: &str, got: &Value) -> Error {
    if got.is_null() {
        Error::decode(column, format!("NULL in non-optional {} field", expected))
    } else {
        Error::decode(column, format!("expected {}, found {}", expected, got.kind()))
    }
}

impl Field for i64 {
    fn to_value(&self) -> Value {
        Value::Integer(*self)
    }

    fn set_value(&mut self, column: &str, value: Value) -> Result<()> {
        match value {
            Value::Integer(i) => *self = i,
            other => return Err(mismatch(column, "integer", &other)),
        }
        Ok(())
    }
}

impl Field for i32 {
    fn to_value(&self) -> Value {
        Value::Integer(*self as i64)
    }

    fn set_value(&mut self, column: &str, value: Value) -> Result<()> {
        match value {
            Value::Integer(i) => {
                *self = i32::try_from(i).map_err(|e| Error::decode(column, e.to_string()))?;
            }
            other => return Err(mismatch(column, "integer", &other)),
        }
        Ok(())
    }
}

impl Field for f64 {
    fn to_value(&self) -> Value {
        Value::Real(*self)
    }

    fn set_value(&mut self, column: &str, value: Value) -> Result<()> {
        match value {
            Value::Real(f) => *self = f,
            // SQLite hands back integral REAL values as integers in some expressions
            Value::Integer(i) => *self = i as f64,
            other => return Err(mismatch(column, "real", &other)),
        }
        Ok(())
    }
}

impl Field for String {
    fn to_value(&self) -> Value {
        Value::Text(self.clone())
    }

    fn set_value(&mut self, column: &str, value: Value) -> Result<()> {
        match value {
            Value::Text(s) => *self = s,
            other => return Err(mismatch(column, "text", &other)),
        }
        Ok(())
    }
}

impl Field for DateTime<Utc> {
    fn to_value(&self) -> Value {
        Value::Timestamp(*self)
    }

    fn set_value(&mut self, column: &str, value: Value) -> Result<()> {
        match value {
            Value::Timestamp(ts) => *self = ts,
            Value::Text(s) => {
                *self = DateTime::parse_from_rfc3339(&s)
                    .map_err(|e| Error::decode(column, format!("bad timestamp {:?}: {}", s, e)))?
                    .with_timezone(&Utc);
            }
            other => return Err(mismatch(column, "timestamp", &other)),
        }
        Ok(())
    }
}

impl<T: Field + Default> Field for Option<T> {
    fn to_value(&self) -> Value {
        match self {
            Some(inner) => inner.to_value(),
            None => Value::Null,
        }
    }

    fn set_value(&mut self, column: &str, value: Value) -> Result<()> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        let mut inner = T::default();
        inner.set_value(column, value)?;
        *self = Some(inner);
        Ok(())
    }
}

/// Read-only (column, field) pair used when writing an entity
pub struct Column<'a> {
    pub name: &'static str,
    pub field: &'a dyn Field,
}

impl<'a> Column<'a> {
    pub fn new(name: &'static str, field: &'a dyn Field) -> Self {
        Self { name, field }
    }
}

/// Mutable (column, field) pair used as a bind target when reading an entity
pub struct ColumnMut<'a> {
    pub name: &'static str,
    pub field: &'a mut dyn Field,
}

impl<'a> ColumnMut<'a> {
    pub fn new(name: &'static str, field: &'a mut dyn Field) -> Self {
        Self { name, field }
    }
}

/// A type that can be persisted by the generic engine.
///
/// `columns` and `columns_mut` must list the same names in the same order;
/// [`Descriptor::of`] rejects the mapping otherwise. Relation collections are
/// not columns: owned children are exposed through [`Owner`], link-table
/// membership through [`Entity::association`].
pub trait Entity: Default + 'static {
    /// Table the entity is stored in
    const TABLE: &'static str;

    /// Primary-key column names, each present in `columns`
    const PRIMARY_KEY: &'static [&'static str];

    /// Ordered column snapshot for writes
    fn columns(&self) -> Vec<Column<'_>>;

    /// Ordered bind targets for reads
    fn columns_mut(&mut self) -> Vec<ColumnMut<'_>>;

    /// Link-table membership to record when this entity is written as a child
    fn association(&self) -> Option<Association> {
        None
    }

    /// Accept a reconstructed node from the next join level down
    fn attach(&mut self, node: &Node) -> Result<()> {
        Err(Error::Shape(format!(
            "{} has no child collection for {} rows",
            Self::TABLE,
            node.table()
        )))
    }
}

/// Ownership edge: the entity owns child rows that carry its key in
/// `FOREIGN_KEY`. The foreign key is not one of the child's own columns; it
/// is appended at write time.
pub trait Owner: Entity {
    type Child: Entity;

    /// Column on the child table referencing this entity's key
    const FOREIGN_KEY: &'static str;

    fn children(&self) -> &[Self::Child];
}

/// Validated descriptors, one per entity type, built on first use
static DESCRIPTORS: OnceLock<Mutex<HashMap<TypeId, &'static Descriptor>>> = OnceLock::new();

/// Validated table mapping for one entity type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Descriptor {
    table_name: &'static str,
    columns: Vec<&'static str>,
    primary_key: Vec<&'static str>,
}

impl Descriptor {
    /// Build a descriptor by hand, validating the mapping
    pub fn new(
        table_name: &'static str,
        columns: Vec<&'static str>,
        primary_key: Vec<&'static str>,
    ) -> Result<Self> {
        if table_name.trim().is_empty() {
            return Err(Error::descriptor(table_name, "empty table name"));
        }
        if columns.is_empty() {
            return Err(Error::descriptor(table_name, "no columns"));
        }

        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(*column) {
                return Err(Error::descriptor(table_name, format!("duplicate column {}", column)));
            }
        }

        if primary_key.is_empty() {
            return Err(Error::descriptor(table_name, "no primary key columns"));
        }
        for key in &primary_key {
            if !seen.contains(key) {
                return Err(Error::descriptor(
                    table_name,
                    format!("primary key {} is not a column", key),
                ));
            }
        }

        Ok(Self {
            table_name,
            columns,
            primary_key,
        })
    }

    /// The descriptor of an entity type, derived and validated once per
    /// process. A mapping that fails validation is never cached.
    pub fn of<E: Entity>() -> Result<&'static Descriptor> {
        let cache = DESCRIPTORS.get_or_init(Default::default);
        let mut cache = cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(&desc) = cache.get(&TypeId::of::<E>()) {
            return Ok(desc);
        }

        let desc: &'static Descriptor = Box::leak(Box::new(Self::derive::<E>()?));
        cache.insert(TypeId::of::<E>(), desc);
        tracing::debug!(table = desc.table_name, columns = desc.columns.len(), "descriptor cached");
        Ok(desc)
    }

    /// Derive and validate the descriptor of an entity type
    fn derive<E: Entity>() -> Result<Self> {
        let mut sample = E::default();
        let names: Vec<&'static str> = sample.columns().iter().map(|c| c.name).collect();
        let bind_names: Vec<&'static str> = sample.columns_mut().iter().map(|c| c.name).collect();
        if names != bind_names {
            return Err(Error::descriptor(
                E::TABLE,
                format!("read columns {:?} differ from write columns {:?}", bind_names, names),
            ));
        }
        Self::new(E::TABLE, names, E::PRIMARY_KEY.to_vec())
    }

    pub fn table_name(&self) -> &'static str {
        self.table_name
    }

    pub fn columns(&self) -> &[&'static str] {
        &self.columns
    }

    pub fn primary_key_columns(&self) -> &[&'static str] {
        &self.primary_key
    }

    pub fn is_key(&self, column: &str) -> bool {
        self.primary_key.contains(&column)
    }

    /// Position of a column in descriptor order
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| *c == column)
    }

    /// The single key column, for statements that only support one
    pub fn single_key(&self) -> Result<&'static str> {
        match self.primary_key.as_slice() {
            [key] => Ok(*key),
            keys => Err(Error::Statement(format!(
                "{} has a composite key {:?}; a single key column is required",
                self.table_name, keys
            ))),
        }
    }

    /// Snapshot an entity's fields in descriptor order
    pub fn values<E: Entity>(&self, entity: &E) -> Result<Vec<Value>> {
        self.check_table(E::TABLE)?;
        let columns = entity.columns();
        if columns.len() != self.columns.len() {
            return Err(Error::descriptor(self.table_name, "column count changed between calls"));
        }
        columns
            .iter()
            .zip(&self.columns)
            .map(|(column, expected)| {
                if column.name != *expected {
                    return Err(Error::descriptor(
                        self.table_name,
                        format!("column {} out of order, expected {}", column.name, expected),
                    ));
                }
                Ok(column.field.to_value())
            })
            .collect()
    }

    /// Primary-key values picked out of a full snapshot
    pub fn key_values(&self, values: &[Value]) -> Vec<Value> {
        self.columns
            .iter()
            .zip(values)
            .filter(|(name, _)| self.is_key(name))
            .map(|(_, value)| value.clone())
            .collect()
    }

    /// Integer key of a snapshot, for single integer-keyed tables
    pub fn integer_key(&self, values: &[Value]) -> Result<i64> {
        let key = self.single_key()?;
        let position = self.position(key).unwrap_or_default();
        values
            .get(position)
            .and_then(Value::as_integer)
            .ok_or_else(|| Error::Statement(format!("{}.{} is not an integer key", self.table_name, key)))
    }

    /// Build an entity from a row slice laid out in descriptor order
    pub fn decode<E: Entity>(&self, row: &[Value]) -> Result<E> {
        self.check_table(E::TABLE)?;
        if row.len() != self.columns.len() {
            return Err(Error::Shape(format!(
                "{} expects {} cells, row has {}",
                self.table_name,
                self.columns.len(),
                row.len()
            )));
        }

        let mut entity = E::default();
        for (target, value) in entity.columns_mut().into_iter().zip(row) {
            target.field.set_value(target.name, value.clone())?;
        }
        Ok(entity)
    }

    fn check_table(&self, table: &str) -> Result<()> {
        if table != self.table_name {
            return Err(Error::Shape(format!(
                "descriptor for {} used with {} entity",
                self.table_name, table
            )));
        }
        Ok(())
    }
}
