//! Sample entities used by the CLI and the tests
//!
//! Two graphs share the same shape: a root owning children, and children
//! linked to peers through a link table.
//!
//! - `Class` owns `Object`s, which link to `Item`s through `OBJECT_ITEM_LINK`
//! - `Project` owns `Task`s, which link to `Resource`s through `TASK_RESOURCE`

mod class;
mod project;

pub use class::{Class, Item, OBJECT_ITEM_LINK, Object};
pub use project::{Project, Resource, TASK_RESOURCE, Task};
