//! Statement execution over a caller-owned connection or transaction

use rusqlite::{Connection, Transaction};
use crate::statement::Statement;
use crate::value::Value;
use crate::{Error, Result};

/// The statement-execution seam the engine runs on.
///
/// The engine never opens, commits or rolls back anything itself: pass a
/// [`Transaction`] when several statements must succeed or fail together.
pub trait Executor {
    /// Run a statement that returns no rows; yields the affected row count
    fn execute(&self, stmt: &Statement) -> Result<usize>;

    /// Run an INSERT ... RETURNING and yield the generated integer key
    fn insert_returning(&self, stmt: &Statement) -> Result<i64>;

    /// Run a query and collect every row as owned values
    fn query(&self, stmt: &Statement) -> Result<Vec<Vec<Value>>>;
}

/// Bind `args[i]` to the parameter named `$i+1`.
///
/// SQLite numbers `$N` parameters by first appearance in the text, not by
/// `N`, so arguments are bound by name. Every argument must have its
/// placeholder and every placeholder its argument.
fn bind_named(prepared: &mut rusqlite::Statement<'_>, stmt: &Statement) -> Result<()> {
    if prepared.parameter_count() != stmt.args.len() {
        return Err(Error::Statement(format!(
            "{} placeholders but {} arguments in: {}",
            prepared.parameter_count(),
            stmt.args.len(),
            stmt.sql
        )));
    }
    for (i, arg) in stmt.args.iter().enumerate() {
        let name = format!("${}", i + 1);
        let index = prepared
            .parameter_index(&name)?
            .ok_or_else(|| Error::Statement(format!("no placeholder {} in: {}", name, stmt.sql)))?;
        prepared.raw_bind_parameter(index, arg)?;
    }
    Ok(())
}

impl Executor for Connection {
    fn execute(&self, stmt: &Statement) -> Result<usize> {
        tracing::debug!(table = stmt.table(), args = stmt.args.len(), "execute: {}", stmt.sql);
        let mut prepared = self.prepare_cached(&stmt.sql)?;
        bind_named(&mut prepared, stmt)?;
        let affected = prepared.raw_execute()?;
        Ok(affected)
    }

    fn insert_returning(&self, stmt: &Statement) -> Result<i64> {
        tracing::debug!(table = stmt.table(), args = stmt.args.len(), "insert: {}", stmt.sql);
        let mut prepared = self.prepare_cached(&stmt.sql)?;
        bind_named(&mut prepared, stmt)?;
        let mut rows = prepared.raw_query();
        let id = match rows.next()? {
            Some(row) => row.get(0)?,
            None => return Err(rusqlite::Error::QueryReturnedNoRows.into()),
        };
        Ok(id)
    }

    fn query(&self, stmt: &Statement) -> Result<Vec<Vec<Value>>> {
        tracing::debug!(table = stmt.table(), args = stmt.args.len(), "query: {}", stmt.sql);
        let mut prepared = self.prepare_cached(&stmt.sql)?;
        let names: Vec<String> = prepared.column_names().iter().map(|s| s.to_string()).collect();

        bind_named(&mut prepared, stmt)?;
        let mut rows = prepared.raw_query();
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(names.len());
            for (i, name) in names.iter().enumerate() {
                values.push(Value::from_sql_ref(name, row.get_ref(i)?)?);
            }
            out.push(values);
        }
        Ok(out)
    }
}

impl Executor for Transaction<'_> {
    fn execute(&self, stmt: &Statement) -> Result<usize> {
        Executor::execute(&**self, stmt)
    }

    fn insert_returning(&self, stmt: &Statement) -> Result<i64> {
        Executor::insert_returning(&**self, stmt)
    }

    fn query(&self, stmt: &Statement) -> Result<Vec<Vec<Value>>> {
        Executor::query(&**self, stmt)
    }
}
