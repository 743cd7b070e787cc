//! Link tables - many-to-many membership between two entities
//!
//! A link table carries exactly two foreign-key columns and no surrogate key.
//! Writing links for a parent is a total replace: every existing row for the
//! parent is removed before the new set is inserted.

use crate::executor::Executor;
use crate::statement::Statement;
use crate::value::Value;
use crate::{Error, Result};

/// Static shape of a link table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTable {
    pub table: &'static str,
    /// Column referencing the parent (owning side of the write)
    pub parent_column: &'static str,
    /// Column referencing the linked peer
    pub peer_column: &'static str,
}

impl LinkTable {
    pub const fn new(table: &'static str, parent_column: &'static str, peer_column: &'static str) -> Self {
        Self {
            table,
            parent_column,
            peer_column,
        }
    }

    /// DELETE every link row of one parent
    pub fn delete_statement(&self, parent_id: i64) -> Statement {
        Statement::new(
            format!("DELETE FROM {} WHERE {} = $1", self.table, self.parent_column),
            vec![Value::Integer(parent_id)],
        )
    }

    /// INSERT one (parent, peer) row
    pub fn insert_statement(&self, parent_id: i64, peer_id: i64) -> Statement {
        Statement::new(
            format!(
                "INSERT INTO {} ({}, {}) VALUES ($1, $2)",
                self.table, self.parent_column, self.peer_column
            ),
            vec![Value::Integer(parent_id), Value::Integer(peer_id)],
        )
    }

    /// SELECT the peer ids of one parent in link-row order
    pub fn select_statement(&self, parent_id: i64) -> Statement {
        Statement::new(
            format!(
                "SELECT {} FROM {} WHERE {} = $1 ORDER BY rowid",
                self.peer_column, self.table, self.parent_column
            ),
            vec![Value::Integer(parent_id)],
        )
    }
}

/// Link membership an entity wants recorded once its own key is known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Association {
    pub link: LinkTable,
    pub peer_ids: Vec<i64>,
}

impl Association {
    pub fn new(link: LinkTable, peer_ids: Vec<i64>) -> Self {
        Self { link, peer_ids }
    }
}

/// Link-table writes and reads over one connection
pub struct LinkManager<'a, X: Executor + ?Sized> {
    conn: &'a X,
}

impl<'a, X: Executor + ?Sized> LinkManager<'a, X> {
    pub fn new(conn: &'a X) -> Self {
        Self { conn }
    }

    /// Replace all links of `parent_id` with `peer_ids`.
    ///
    /// Peers are inserted in the given order without dedup, so a repeated
    /// peer id yields repeated rows. An empty list only clears. If an insert
    /// fails, rows inserted earlier in this call remain and the error comes
    /// back as [`Error::PartialWrite`]. Returns the number of rows inserted.
    pub fn replace_links(&self, link: &LinkTable, parent_id: i64, peer_ids: &[i64]) -> Result<usize> {
        let removed = self.conn.execute(&link.delete_statement(parent_id))?;
        tracing::debug!(table = link.table, parent_id, removed, peers = peer_ids.len(), "replacing links");

        for (written, peer_id) in peer_ids.iter().enumerate() {
            if let Err(e) = self.conn.execute(&link.insert_statement(parent_id, *peer_id)) {
                tracing::warn!(
                    table = link.table,
                    parent_id,
                    peer_id,
                    written,
                    "link replace stopped partway: {}",
                    e
                );
                return Err(Error::partial(link.table, parent_id, e));
            }
        }
        Ok(peer_ids.len())
    }

    /// Append a single link row without touching existing ones
    pub fn add_link(&self, link: &LinkTable, parent_id: i64, peer_id: i64) -> Result<()> {
        self.conn.execute(&link.insert_statement(parent_id, peer_id))?;
        Ok(())
    }

    /// Peer ids currently linked to `parent_id`, duplicates included
    pub fn peer_ids(&self, link: &LinkTable, parent_id: i64) -> Result<Vec<i64>> {
        self.conn
            .query(&link.select_statement(parent_id))?
            .into_iter()
            .map(|row| {
                row.first()
                    .and_then(Value::as_integer)
                    .ok_or_else(|| Error::decode(link.peer_column, "expected an integer peer id"))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TASK_RESOURCE;
    use crate::storage::SqliteStore;

    fn store_with_rows() -> SqliteStore {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .connection()
            .execute_batch(
                "INSERT INTO PROJECTS (ID, NAME, MANAGER, START_DATE) VALUES (1, 'P', 'M', '2024-01-01T00:00:00Z');
                 INSERT INTO TASKS (ID, NAME, DEADLINE, STATUS, PROJECT_ID) VALUES (5, 'T', '2024-02-01T00:00:00Z', 'open', 1);
                 INSERT INTO RESOURCES (ID, TYPE, NAME, STATUS) VALUES (10, 'tool', 'R10', 'ok');
                 INSERT INTO RESOURCES (ID, TYPE, NAME, STATUS) VALUES (11, 'tool', 'R11', 'ok');",
            )
            .unwrap();
        store
    }

    #[test]
    fn test_replace_is_total() {
        let store = store_with_rows();
        let links = LinkManager::new(store.connection());

        links.replace_links(&TASK_RESOURCE, 5, &[10, 11]).unwrap();
        assert_eq!(links.peer_ids(&TASK_RESOURCE, 5).unwrap(), vec![10, 11]);

        links.replace_links(&TASK_RESOURCE, 5, &[11]).unwrap();
        assert_eq!(links.peer_ids(&TASK_RESOURCE, 5).unwrap(), vec![11]);
    }

    #[test]
    fn test_replace_is_idempotent() {
        let store = store_with_rows();
        let links = LinkManager::new(store.connection());

        links.replace_links(&TASK_RESOURCE, 5, &[10, 11]).unwrap();
        links.replace_links(&TASK_RESOURCE, 5, &[10, 11]).unwrap();
        assert_eq!(links.peer_ids(&TASK_RESOURCE, 5).unwrap(), vec![10, 11]);
    }

    #[test]
    fn test_empty_peer_set_clears() {
        let store = store_with_rows();
        let links = LinkManager::new(store.connection());

        links.replace_links(&TASK_RESOURCE, 5, &[10]).unwrap();
        assert_eq!(links.replace_links(&TASK_RESOURCE, 5, &[]).unwrap(), 0);
        assert!(links.peer_ids(&TASK_RESOURCE, 5).unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_peers_are_kept() {
        let store = store_with_rows();
        let links = LinkManager::new(store.connection());

        links.replace_links(&TASK_RESOURCE, 5, &[10, 10]).unwrap();
        assert_eq!(links.peer_ids(&TASK_RESOURCE, 5).unwrap(), vec![10, 10]);

        links.add_link(&TASK_RESOURCE, 5, 11).unwrap();
        assert_eq!(links.peer_ids(&TASK_RESOURCE, 5).unwrap(), vec![10, 10, 11]);
    }

    #[test]
    fn test_failed_insert_leaves_earlier_rows() {
        let store = store_with_rows();
        let links = LinkManager::new(store.connection());

        // 99 violates the RESOURCES foreign key
        let err = links.replace_links(&TASK_RESOURCE, 5, &[10, 99, 11]).unwrap_err();
        match err {
            Error::PartialWrite { key, source, .. } => {
                assert_eq!(key, 5);
                assert!(matches!(*source, Error::Storage(_)));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(links.peer_ids(&TASK_RESOURCE, 5).unwrap(), vec![10]);
    }

    #[test]
    fn test_statements() {
        let stmt = TASK_RESOURCE.insert_statement(5, 10);
        assert_eq!(stmt.sql, "INSERT INTO TASK_RESOURCE (TASK_ID, RESOURCE_ID) VALUES ($1, $2)");
        let stmt = TASK_RESOURCE.delete_statement(5);
        assert_eq!(stmt.sql, "DELETE FROM TASK_RESOURCE WHERE TASK_ID = $1");
    }
}
