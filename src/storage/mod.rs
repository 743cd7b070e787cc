//! Storage Layer - SQLite database for the sample graphs
//!
//! System of record is SQLite with tables:
//! - CLASSES, OBJECTS(CLASS_ID), ITEMS, OBJECT_ITEM_LINK(OBJECT_ID, ITEM_ID)
//! - PROJECTS, TASKS(PROJECT_ID), RESOURCES, TASK_RESOURCE(TASK_ID, RESOURCE_ID)
//!
//! Every foreign key cascades on delete.

pub mod schema;
pub mod sqlite;

pub use sqlite::{DbStats, SqliteStore};
