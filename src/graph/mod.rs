//! Graph persistence - parents with owned children and linked peers
//!
//! Writes walk the graph top-down (a parent's key must exist before its
//! children, a child's before its link rows). Reads run one denormalized join
//! and fold the flat rows back into a nested graph.

pub mod reader;
pub mod writer;

pub use reader::{GraphReader, JoinKind, JoinSpec, Level, Node, fold_rows};
pub use writer::{GraphWriter, WrittenGraph};
