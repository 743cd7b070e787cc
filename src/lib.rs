//! # sqlgraph - Descriptor-driven SQL persistence
//!
//! Describe an entity's relational shape once and let the engine do the rest.
//!
//! sqlgraph provides:
//! - Entity descriptors: table name, ordered column/field pairs, primary key
//! - Pure statement building for INSERT/UPDATE/DELETE/SELECT with `$N` placeholders
//! - Link-table management with replace-all semantics for many-to-many edges
//! - Graph writes: parent, owned children and their link rows in one call
//! - Graph reads: one denormalized join folded back into a nested object graph

pub mod value;
pub mod descriptor;
pub mod statement;
pub mod executor;
pub mod repository;
pub mod links;
pub mod graph;
pub mod model;
pub mod storage;
pub mod config;

// Re-exports for convenient access
pub use value::Value;
pub use descriptor::{Column, ColumnMut, Descriptor, Entity, Field, Owner};
pub use statement::{InsertMode, Statement};
pub use executor::Executor;
pub use repository::Repository;
pub use links::{Association, LinkManager, LinkTable};
pub use graph::{GraphReader, GraphWriter, JoinKind, JoinSpec, Node, WrittenGraph};
pub use storage::SqliteStore;

/// Result type alias for sqlgraph operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for sqlgraph operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid descriptor for {table}: {reason}")]
    Descriptor { table: String, reason: String },

    #[error("Cannot build statement: {0}")]
    Statement(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Cannot decode column {column}: {reason}")]
    Decode { column: String, reason: String },

    #[error("Graph shape error: {0}")]
    Shape(String),

    /// A multi-statement write failed after at least one statement was applied.
    /// Rows written before the failure stay in place unless the caller rolls back.
    #[error("Write of {table} {key} stopped partway: {source}")]
    PartialWrite {
        table: String,
        key: i64,
        #[source]
        source: Box<Error>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn descriptor(table: &str, reason: impl Into<String>) -> Self {
        Error::Descriptor {
            table: table.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn decode(column: &str, reason: impl Into<String>) -> Self {
        Error::Decode {
            column: column.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn partial(table: &str, key: i64, source: Error) -> Self {
        Error::PartialWrite {
            table: table.to_string(),
            key,
            source: Box::new(source),
        }
    }
}
