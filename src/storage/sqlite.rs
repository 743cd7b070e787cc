//! SQLite storage implementation

use std::path::Path;
use rusqlite::Connection;
use crate::Result;
use super::schema;

/// SQLite database holding the sample entity graphs
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open a database file (creates it and its directory if missing)
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Enable foreign keys and create the schema
    fn initialize_schema(&self) -> Result<()> {
        self.conn.execute_batch(schema::ENABLE_FOREIGN_KEYS)?;
        for stmt in schema::all_schema_statements() {
            self.conn.execute(stmt, [])?;
        }
        Ok(())
    }

    /// Borrow the connection for engine calls
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Mutable access, needed to open a transaction
    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    // ========== Maintenance ==========

    fn count(&self, table: &str) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Delete every row, children before the rows they reference
    pub fn clear_all(&self) -> Result<()> {
        for table in schema::CLEAR_ORDER {
            let removed = self.conn.execute(&format!("DELETE FROM {}", table), [])?;
            tracing::debug!(table, removed, "cleared");
        }
        Ok(())
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<DbStats> {
        Ok(DbStats {
            classes: self.count("CLASSES")?,
            objects: self.count("OBJECTS")?,
            items: self.count("ITEMS")?,
            object_items: self.count("OBJECT_ITEM_LINK")?,
            projects: self.count("PROJECTS")?,
            tasks: self.count("TASKS")?,
            resources: self.count("RESOURCES")?,
            task_resources: self.count("TASK_RESOURCE")?,
        })
    }
}

/// Row counts per table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DbStats {
    pub classes: usize,
    pub objects: usize,
    pub items: usize,
    pub object_items: usize,
    pub projects: usize,
    pub tasks: usize,
    pub resources: usize,
    pub task_resources: usize,
}

impl std::fmt::Display for DbStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database Statistics:")?;
        writeln!(f, "  Classes: {}", self.classes)?;
        writeln!(f, "  Objects: {}", self.objects)?;
        writeln!(f, "  Items: {}", self.items)?;
        writeln!(f, "  Object/item links: {}", self.object_items)?;
        writeln!(f, "  Projects: {}", self.projects)?;
        writeln!(f, "  Tasks: {}", self.tasks)?;
        writeln!(f, "  Resources: {}", self.resources)?;
        writeln!(f, "  Task/resource links: {}", self.task_resources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(store: &SqliteStore) {
        store
            .connection()
            .execute_batch(
                "INSERT INTO CLASSES (ID, NAME) VALUES (1, 'C1');
                 INSERT INTO OBJECTS (ID, NAME, VALUE, CLASS_ID) VALUES (1, 'O1', 1.0, 1);
                 INSERT INTO ITEMS (ID, NAME, VALUE) VALUES (1, 'I1', 2.0);
                 INSERT INTO OBJECT_ITEM_LINK (OBJECT_ID, ITEM_ID) VALUES (1, 1);",
            )
            .unwrap();
    }

    #[test]
    fn test_schema_is_empty_on_open() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(store.stats().unwrap(), DbStats::default());
    }

    #[test]
    fn test_foreign_keys_are_enforced() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = store
            .connection()
            .execute("INSERT INTO OBJECTS (NAME, VALUE, CLASS_ID) VALUES ('orphan', 0, 42)", []);
        assert!(err.is_err());
    }

    #[test]
    fn test_cascade_on_root_delete() {
        let store = SqliteStore::open_in_memory().unwrap();
        seed(&store);

        store.connection().execute("DELETE FROM CLASSES WHERE ID = 1", []).unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.objects, 0);
        assert_eq!(stats.object_items, 0);
        assert_eq!(stats.items, 1);
    }

    #[test]
    fn test_clear_all() {
        let store = SqliteStore::open_in_memory().unwrap();
        seed(&store);
        assert_eq!(store.stats().unwrap().classes, 1);

        store.clear_all().unwrap();
        assert_eq!(store.stats().unwrap(), DbStats::default());
    }

    #[test]
    fn test_open_file_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("graph.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            seed(&store);
        }
        assert!(path.exists());

        // reopening keeps rows and applies the schema idempotently
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.stats().unwrap().classes, 1);
    }

    #[test]
    fn test_stats_display() {
        let stats = DbStats {
            tasks: 3,
            ..Default::default()
        };
        let text = stats.to_string();
        assert!(text.starts_with("Database Statistics:"));
        assert!(text.contains("  Tasks: 3"));
    }
}
