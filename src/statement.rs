//! Statement builder - pure SQL text and argument lists from descriptors
//!
//! Nothing here touches a connection. Placeholders are `$1, $2, ...`,
//! always 1-based, contiguous and ascending within one statement.

use crate::descriptor::Descriptor;
use crate::value::Value;
use crate::{Error, Result};

/// Parameterized SQL text plus its positional arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub args: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            args,
        }
    }

    /// First table named after INSERT INTO / UPDATE / FROM, for log lines
    pub fn table(&self) -> &str {
        let mut words = self.sql.split_whitespace();
        while let Some(word) = words.next() {
            if matches!(word, "INTO" | "UPDATE" | "FROM") {
                return words.next().unwrap_or("");
            }
        }
        ""
    }
}

/// How an INSERT treats the primary key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsertMode {
    /// Key columns are left to the database and read back via `RETURNING`
    #[default]
    Generated,
    /// Key columns are written from the entity, no `RETURNING` clause
    Supplied,
}

fn placeholder(n: usize) -> String {
    format!("${}", n)
}

fn check_arity(desc: &Descriptor, values: &[Value]) -> Result<()> {
    if values.len() != desc.columns().len() {
        return Err(Error::Statement(format!(
            "{} has {} columns but {} values were supplied",
            desc.table_name(),
            desc.columns().len(),
            values.len()
        )));
    }
    Ok(())
}

/// Render `K1 = $n AND K2 = $n+1 ...` for the key columns, numbering from `start`
fn key_predicate(desc: &Descriptor, start: usize) -> String {
    desc.primary_key_columns()
        .iter()
        .enumerate()
        .map(|(i, key)| format!("{} = {}", key, placeholder(start + i)))
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn check_key(desc: &Descriptor, key: &[Value]) -> Result<()> {
    if key.len() != desc.primary_key_columns().len() {
        return Err(Error::Statement(format!(
            "{} key is {:?} but {} key values were supplied",
            desc.table_name(),
            desc.primary_key_columns(),
            key.len()
        )));
    }
    if key.iter().any(Value::is_null) {
        return Err(Error::Statement(format!("{} key contains NULL", desc.table_name())));
    }
    Ok(())
}

/// Build an INSERT for one entity snapshot.
///
/// `values` are in descriptor order. `extra` columns (typically a parent
/// foreign key) are appended after the entity's own columns.
pub fn build_insert(
    desc: &Descriptor,
    values: &[Value],
    extra: &[(&str, Value)],
    mode: InsertMode,
) -> Result<Statement> {
    check_arity(desc, values)?;

    let mut names: Vec<&str> = Vec::new();
    let mut args = Vec::new();
    for (name, value) in desc.columns().iter().zip(values) {
        if mode == InsertMode::Generated && desc.is_key(name) {
            continue;
        }
        names.push(*name);
        args.push(value.clone());
    }
    for (name, value) in extra {
        if desc.position(name).is_some() {
            return Err(Error::Statement(format!(
                "extra column {} is already mapped on {}",
                name,
                desc.table_name()
            )));
        }
        names.push(*name);
        args.push(value.clone());
    }

    let mut sql = if names.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES", desc.table_name())
    } else {
        let placeholders: Vec<String> = (1..=names.len()).map(placeholder).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            desc.table_name(),
            names.join(", "),
            placeholders.join(", ")
        )
    };

    if mode == InsertMode::Generated {
        sql.push_str(" RETURNING ");
        sql.push_str(desc.single_key()?);
    }

    Ok(Statement::new(sql, args))
}

/// Build an UPDATE of every non-key column, keyed by the snapshot's own key.
///
/// `scope` adds equality guards after the key (e.g. the owning parent's
/// foreign key), so a child is only updated under the parent it belongs to.
pub fn build_update(desc: &Descriptor, values: &[Value], scope: &[(&str, Value)]) -> Result<Statement> {
    check_arity(desc, values)?;

    let mut assignments = Vec::new();
    let mut args = Vec::new();
    for (name, value) in desc.columns().iter().zip(values) {
        if desc.is_key(name) {
            continue;
        }
        args.push(value.clone());
        assignments.push(format!("{} = {}", name, placeholder(args.len())));
    }

    if assignments.is_empty() {
        return Err(Error::Statement(format!(
            "{} has no non-key columns to update",
            desc.table_name()
        )));
    }

    let key = desc.key_values(values);
    check_key(desc, &key)?;
    let mut predicate = key_predicate(desc, args.len() + 1);
    args.extend(key);

    for (name, value) in scope {
        args.push(value.clone());
        predicate.push_str(&format!(" AND {} = {}", name, placeholder(args.len())));
    }

    let sql = format!(
        "UPDATE {} SET {} WHERE {}",
        desc.table_name(),
        assignments.join(", "),
        predicate
    );
    Ok(Statement::new(sql, args))
}

/// Build a DELETE of one row by its full key
pub fn build_delete(desc: &Descriptor, key: &[Value]) -> Result<Statement> {
    check_key(desc, key)?;
    let sql = format!("DELETE FROM {} WHERE {}", desc.table_name(), key_predicate(desc, 1));
    Ok(Statement::new(sql, key.to_vec()))
}

/// Build a SELECT of every mapped column for one row by its full key
pub fn build_select(desc: &Descriptor, key: &[Value]) -> Result<Statement> {
    check_key(desc, key)?;
    let sql = format!(
        "SELECT {} FROM {} WHERE {}",
        desc.columns().join(", "),
        desc.table_name(),
        key_predicate(desc, 1)
    );
    Ok(Statement::new(sql, key.to_vec()))
}

/// Build a SELECT of every mapped column filtered by a caller condition.
///
/// The condition uses its own `$N` placeholders matching `args`.
pub fn build_select_where(desc: &Descriptor, condition: &str, args: Vec<Value>) -> Statement {
    let sql = format!(
        "SELECT {} FROM {} WHERE {} ORDER BY {}",
        desc.columns().join(", "),
        desc.table_name(),
        condition,
        desc.primary_key_columns().join(", ")
    );
    Statement::new(sql, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Class, Task};
    use crate::{Descriptor, Entity};

    fn task_desc() -> Descriptor {
        Descriptor::of::<Task>().unwrap().clone()
    }

    #[test]
    fn test_insert_generated_skips_key() {
        let desc = Descriptor::of::<Class>().unwrap();
        let values = desc.values(&Class::named("C1")).unwrap();
        let stmt = build_insert(&desc, &values, &[], InsertMode::Generated).unwrap();
        assert_eq!(stmt.sql, "INSERT INTO CLASSES (NAME) VALUES ($1) RETURNING ID");
        assert_eq!(stmt.args, vec![Value::Text("C1".into())]);
    }

    #[test]
    fn test_insert_supplied_keeps_key_and_appends_extra() {
        let desc = Descriptor::of::<Class>().unwrap();
        let values = vec![Value::Integer(4), Value::Text("C".into())];
        let stmt = build_insert(
            &desc,
            &values,
            &[("OWNER_ID", Value::Integer(1))],
            InsertMode::Supplied,
        )
        .unwrap();
        assert_eq!(stmt.sql, "INSERT INTO CLASSES (ID, NAME, OWNER_ID) VALUES ($1, $2, $3)");
        assert_eq!(stmt.args.len(), 3);
        assert_eq!(stmt.args[2], Value::Integer(1));
    }

    #[test]
    fn test_insert_without_columns_uses_default_values() {
        let desc = Descriptor::new("COUNTERS", vec!["ID"], vec!["ID"]).unwrap();
        let stmt = build_insert(&desc, &[Value::Null], &[], InsertMode::Generated).unwrap();
        assert_eq!(stmt.sql, "INSERT INTO COUNTERS DEFAULT VALUES RETURNING ID");
        assert!(stmt.args.is_empty());
    }

    #[test]
    fn test_extra_column_cannot_shadow_mapped_column() {
        let desc = Descriptor::of::<Class>().unwrap();
        let values = vec![Value::Integer(0), Value::Text("C".into())];
        let err = build_insert(&desc, &values, &[("NAME", Value::Null)], InsertMode::Generated);
        assert!(err.is_err());
    }

    #[test]
    fn test_update_numbers_where_after_set() {
        let desc = task_desc();
        let task = Task {
            id: 7,
            name: "Design".into(),
            status: "open".into(),
            ..Default::default()
        };
        let values = desc.values(&task).unwrap();
        let stmt = build_update(&desc, &values, &[]).unwrap();

        let k = desc.columns().len() - 1;
        assert_eq!(
            stmt.sql,
            "UPDATE TASKS SET NAME = $1, RESPONSIBLE = $2, DEADLINE = $3, STATUS = $4, \
             PRIORITY = $5, ESTIMATED_TIME = $6, DESCRIPTION = $7 WHERE ID = $8"
        );
        assert_eq!(stmt.args.len(), k + 1);
        assert_eq!(stmt.args[k], Value::Integer(7));
        // optional fields that are absent bind as NULL
        assert_eq!(stmt.args[1], Value::Null);
    }

    #[test]
    fn test_update_scope_continues_numbering() {
        let desc = Descriptor::of::<Class>().unwrap();
        let values = vec![Value::Integer(2), Value::Text("C".into())];
        let stmt = build_update(&desc, &values, &[("OWNER_ID", Value::Integer(1))]).unwrap();
        assert_eq!(stmt.sql, "UPDATE CLASSES SET NAME = $1 WHERE ID = $2 AND OWNER_ID = $3");
        assert_eq!(
            stmt.args,
            vec![Value::Text("C".into()), Value::Integer(2), Value::Integer(1)]
        );
    }

    #[test]
    fn test_update_composite_key() {
        let desc = Descriptor::new("MEMBERS", vec!["GROUP_ID", "USER_ID", "ROLE"], vec!["GROUP_ID", "USER_ID"])
            .unwrap();
        let values = vec![Value::Integer(1), Value::Integer(2), Value::Text("admin".into())];
        let stmt = build_update(&desc, &values, &[]).unwrap();
        assert_eq!(stmt.sql, "UPDATE MEMBERS SET ROLE = $1 WHERE GROUP_ID = $2 AND USER_ID = $3");
    }

    #[test]
    fn test_update_with_only_key_columns_is_an_error() {
        let desc = Descriptor::new("COUNTERS", vec!["ID"], vec!["ID"]).unwrap();
        let err = build_update(&desc, &[Value::Integer(1)], &[]).unwrap_err();
        assert!(matches!(err, Error::Statement(_)));
    }

    #[test]
    fn test_update_requires_key_value() {
        let desc = Descriptor::of::<Class>().unwrap();
        let values = vec![Value::Null, Value::Text("C".into())];
        assert!(build_update(&desc, &values, &[]).is_err());
    }

    #[test]
    fn test_point_select_and_delete() {
        let desc = Descriptor::of::<Class>().unwrap();
        let select = build_select(&desc, &[Value::Integer(1)]).unwrap();
        assert_eq!(select.sql, "SELECT ID, NAME FROM CLASSES WHERE ID = $1");

        let delete = build_delete(&desc, &[Value::Integer(1)]).unwrap();
        assert_eq!(delete.sql, "DELETE FROM CLASSES WHERE ID = $1");
        assert_eq!(delete.table(), "CLASSES");

        assert!(build_delete(&desc, &[]).is_err());
    }

    #[test]
    fn test_select_where() {
        let desc = Descriptor::of::<Class>().unwrap();
        let stmt = build_select_where(&desc, "NAME = $1", vec![Value::from("C1")]);
        assert_eq!(stmt.sql, "SELECT ID, NAME FROM CLASSES WHERE NAME = $1 ORDER BY ID");
        assert_eq!(Class::TABLE, stmt.table());
    }
}
