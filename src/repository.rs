//! Generic entity CRUD over one connection
//!
//! One repository replaces a family of per-entity DAOs: every operation is
//! generic over [`Entity`] and goes through the pure statement builder.

use crate::descriptor::{Descriptor, Entity};
use crate::executor::Executor;
use crate::statement::{self, InsertMode};
use crate::value::Value;
use crate::{Error, Result};

/// Entity-level CRUD bound to a caller-owned connection or transaction
pub struct Repository<'a, X: Executor + ?Sized> {
    conn: &'a X,
}

impl<'a, X: Executor + ?Sized> Repository<'a, X> {
    pub fn new(conn: &'a X) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &'a X {
        self.conn
    }

    // ========== Writes ==========

    /// Insert an entity and return its key
    pub fn insert<E: Entity>(&self, entity: &E, mode: InsertMode) -> Result<i64> {
        self.insert_with(entity, &[], mode)
    }

    /// Insert an entity owned by `parent_id` through `foreign_key`
    pub fn insert_child<E: Entity>(
        &self,
        entity: &E,
        foreign_key: &str,
        parent_id: i64,
        mode: InsertMode,
    ) -> Result<i64> {
        self.insert_with(entity, &[(foreign_key, Value::Integer(parent_id))], mode)
    }

    fn insert_with<E: Entity>(&self, entity: &E, extra: &[(&str, Value)], mode: InsertMode) -> Result<i64> {
        let desc = Descriptor::of::<E>()?;
        let values = desc.values(entity)?;
        let stmt = statement::build_insert(&desc, &values, extra, mode)?;

        match mode {
            InsertMode::Generated => self.conn.insert_returning(&stmt),
            InsertMode::Supplied => {
                let key = desc.integer_key(&values)?;
                self.conn.execute(&stmt)?;
                Ok(key)
            }
        }
    }

    /// Update every non-key column of an entity; returns rows affected
    pub fn update<E: Entity>(&self, entity: &E) -> Result<usize> {
        self.update_scoped(entity, &[])
    }

    /// Update with extra equality guards after the key
    pub fn update_scoped<E: Entity>(&self, entity: &E, scope: &[(&str, Value)]) -> Result<usize> {
        let desc = Descriptor::of::<E>()?;
        let values = desc.values(entity)?;
        let stmt = statement::build_update(&desc, &values, scope)?;
        self.conn.execute(&stmt)
    }

    /// Delete one row by key; returns rows affected
    pub fn delete<E: Entity>(&self, key: impl Into<Value>) -> Result<usize> {
        let desc = Descriptor::of::<E>()?;
        let stmt = statement::build_delete(&desc, &[key.into()])?;
        self.conn.execute(&stmt)
    }

    // ========== Reads ==========

    /// Point select by key; `None` when no row matches
    pub fn get<E: Entity>(&self, key: impl Into<Value>) -> Result<Option<E>> {
        let desc = Descriptor::of::<E>()?;
        let stmt = statement::build_select(&desc, &[key.into()])?;
        let mut rows = self.conn.query(&stmt)?;
        if rows.len() > 1 {
            return Err(Error::Shape(format!(
                "{} key lookup matched {} rows",
                desc.table_name(),
                rows.len()
            )));
        }
        rows.pop().map(|row| desc.decode(&row)).transpose()
    }

    /// Every entity matching a condition, ordered by key.
    ///
    /// `condition` is raw SQL with its own `$N` placeholders; `$N` takes
    /// `args[N-1]` wherever it appears in the text.
    pub fn find_where<E: Entity>(&self, condition: &str, args: Vec<Value>) -> Result<Vec<E>> {
        let desc = Descriptor::of::<E>()?;
        let stmt = statement::build_select_where(&desc, condition, args);
        self.conn
            .query(&stmt)?
            .iter()
            .map(|row| desc.decode(row))
            .collect()
    }

    /// Children owned by `parent_id` through `foreign_key`
    pub fn children_of<E: Entity>(&self, foreign_key: &str, parent_id: i64) -> Result<Vec<E>> {
        self.find_where(&format!("{} = $1", foreign_key), vec![Value::Integer(parent_id)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Class, Object, Resource};
    use crate::storage::SqliteStore;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_entity_round_trip() {
        let store = SqliteStore::open_in_memory().unwrap();
        let repo = Repository::new(store.connection());

        let id = repo.insert(&Class::named("C1"), InsertMode::Generated).unwrap();
        assert_eq!(id, 1);

        let class: Class = repo.get(id).unwrap().unwrap();
        assert_eq!(class.id, 1);
        assert_eq!(class.name, "C1");
        assert!(class.objects.is_empty());
    }

    #[test]
    fn test_absent_optionals_read_back_absent() {
        let store = SqliteStore::open_in_memory().unwrap();
        let repo = Repository::new(store.connection());

        let resource = Resource {
            kind: "tool".into(),
            name: "drill".into(),
            status: "ok".into(),
            quantity: Some(3),
            acquisition_date: Some(Utc.with_ymd_and_hms(2023, 5, 2, 8, 0, 0).unwrap()),
            ..Default::default()
        };
        let id = repo.insert(&resource, InsertMode::Generated).unwrap();

        let read: Resource = repo.get(id).unwrap().unwrap();
        assert_eq!(read, Resource { id, ..resource });
        assert_eq!(read.daily_cost, None);
        assert_eq!(read.supplier, None);
    }

    #[test]
    fn test_supplied_key_insert() {
        let store = SqliteStore::open_in_memory().unwrap();
        let repo = Repository::new(store.connection());

        let class = Class { id: 42, ..Class::named("fixed") };
        assert_eq!(repo.insert(&class, InsertMode::Supplied).unwrap(), 42);
        assert!(repo.get::<Class>(42).unwrap().is_some());

        // the same key twice violates the primary key
        let err = repo.insert(&class, InsertMode::Supplied).unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
    }

    #[test]
    fn test_update_and_delete() {
        let store = SqliteStore::open_in_memory().unwrap();
        let repo = Repository::new(store.connection());

        let id = repo.insert(&Class::named("old"), InsertMode::Generated).unwrap();
        let renamed = Class { id, ..Class::named("new") };
        assert_eq!(repo.update(&renamed).unwrap(), 1);
        assert_eq!(repo.get::<Class>(id).unwrap().unwrap().name, "new");

        assert_eq!(repo.delete::<Class>(id).unwrap(), 1);
        assert!(repo.get::<Class>(id).unwrap().is_none());
        assert_eq!(repo.delete::<Class>(id).unwrap(), 0);
    }

    #[test]
    fn test_children_of_returns_typed_rows() {
        let store = SqliteStore::open_in_memory().unwrap();
        let repo = Repository::new(store.connection());

        let class_id = repo.insert(&Class::named("C"), InsertMode::Generated).unwrap();
        for name in ["O1", "O2"] {
            repo.insert_child(&Object::named(name, 1.5), "CLASS_ID", class_id, InsertMode::Generated)
                .unwrap();
        }

        let objects: Vec<Object> = repo.children_of("CLASS_ID", class_id).unwrap();
        let names: Vec<&str> = objects.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["O1", "O2"]);
        assert!(objects.iter().all(|o| o.datetime.is_none()));

        let none: Vec<Object> = repo.children_of("CLASS_ID", class_id + 1).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_find_where_binds_placeholders_by_number() {
        let store = SqliteStore::open_in_memory().unwrap();
        let repo = Repository::new(store.connection());

        let class_id = repo.insert(&Class::named("C"), InsertMode::Generated).unwrap();
        for (name, value) in [("O1", 1.0), ("O2", 0.25)] {
            repo.insert_child(&Object::named(name, value), "CLASS_ID", class_id, InsertMode::Generated)
                .unwrap();
        }

        let args = || vec![Value::from("O1"), Value::Real(0.5)];
        let in_order: Vec<Object> = repo.find_where("NAME = $1 AND VALUE > $2", args()).unwrap();
        let swapped: Vec<Object> = repo.find_where("VALUE > $2 AND NAME = $1", args()).unwrap();
        assert_eq!(in_order.len(), 1);
        assert_eq!(swapped, in_order);

        let err = repo.find_where::<Object>("NAME = $1", args()).unwrap_err();
        assert!(matches!(err, Error::Statement(_)));
    }
}
