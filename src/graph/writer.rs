//! Graph writer - a root, its owned children and their link rows
//!
//! Statements run top-down on the caller's connection. Nothing is wrapped in
//! a transaction here: a failure after the root row landed leaves the rows
//! written so far and comes back as [`Error::PartialWrite`] naming the root.

use crate::descriptor::{Descriptor, Entity, Owner};
use crate::executor::Executor;
use crate::links::LinkManager;
use crate::repository::Repository;
use crate::statement::InsertMode;
use crate::value::Value;
use crate::{Error, Result};

/// Keys produced by an insert_graph call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenGraph {
    pub root_id: i64,
    /// Child keys in the order the children were given
    pub child_ids: Vec<i64>,
    /// Link rows inserted across all children
    pub link_rows: usize,
}

pub struct GraphWriter<'a, X: Executor + ?Sized> {
    conn: &'a X,
}

impl<'a, X: Executor + ?Sized> GraphWriter<'a, X> {
    pub fn new(conn: &'a X) -> Self {
        Self { conn }
    }

    /// Insert the root, then each child with the root's key, then each
    /// child's link rows in one replace per child.
    ///
    /// A failing root insert is returned unchanged; nothing was written.
    pub fn insert_graph<R: Owner>(&self, root: &R, mode: InsertMode) -> Result<WrittenGraph> {
        let repo = Repository::new(self.conn);
        let root_id = repo.insert(root, mode)?;

        match self.insert_children(&repo, root, root_id, mode) {
            Ok((child_ids, link_rows)) => {
                tracing::info!(
                    table = R::TABLE,
                    root_id,
                    children = child_ids.len(),
                    link_rows,
                    "graph inserted"
                );
                Ok(WrittenGraph {
                    root_id,
                    child_ids,
                    link_rows,
                })
            }
            Err(e) => {
                tracing::warn!(table = R::TABLE, root_id, "graph insert stopped partway: {}", e);
                Err(Error::partial(R::TABLE, root_id, e))
            }
        }
    }

    fn insert_children<R: Owner>(
        &self,
        repo: &Repository<'a, X>,
        root: &R,
        root_id: i64,
        mode: InsertMode,
    ) -> Result<(Vec<i64>, usize)> {
        let links = LinkManager::new(self.conn);
        let mut child_ids = Vec::with_capacity(root.children().len());
        let mut link_rows = 0;

        for child in root.children() {
            let child_id = repo.insert_child(child, R::FOREIGN_KEY, root_id, mode)?;
            child_ids.push(child_id);
            if let Some(assoc) = child.association() {
                link_rows += links.replace_links(&assoc.link, child_id, &assoc.peer_ids)?;
            }
        }
        Ok((child_ids, link_rows))
    }

    /// Update the root and each child, scoping child updates to the root's key.
    ///
    /// Link rows are left alone. Returns the total rows affected; a child
    /// that does not belong to the root matches nothing and adds zero.
    pub fn update_graph<R: Owner>(&self, root: &R) -> Result<usize> {
        let desc = Descriptor::of::<R>()?;
        let root_id = desc.integer_key(&desc.values(root)?)?;
        let repo = Repository::new(self.conn);

        let mut affected = repo.update(root)?;
        for child in root.children() {
            match repo.update_scoped(child, &[(R::FOREIGN_KEY, Value::Integer(root_id))]) {
                Ok(0) => {
                    tracing::warn!(
                        table = R::TABLE,
                        root_id,
                        child_table = <R::Child as Entity>::TABLE,
                        "child update matched no row owned by this root"
                    );
                }
                Ok(n) => affected += n,
                Err(e) => {
                    tracing::warn!(table = R::TABLE, root_id, "graph update stopped partway: {}", e);
                    return Err(Error::partial(R::TABLE, root_id, e));
                }
            }
        }

        tracing::info!(table = R::TABLE, root_id, affected, "graph updated");
        Ok(affected)
    }

    /// Delete the root row only; children and link rows go by the schema's
    /// `ON DELETE CASCADE`.
    pub fn delete_graph<R: Entity>(&self, root_id: i64) -> Result<usize> {
        let removed = Repository::new(self.conn).delete::<R>(root_id)?;
        tracing::info!(table = R::TABLE, root_id, removed, "graph deleted");
        Ok(removed)
    }
}
