//! Graph reader - one join query, folded into a nested graph
//!
//! The join selects every root column, then every column of each level in
//! order. Folding walks each row level by level: a NULL key at a level means
//! the outer join found nothing there, so the walk stops for that row.
//! Nodes are deduplicated by key under their parent, and children keep the
//! order in which their keys were first seen.

use std::collections::HashMap;
use serde::{Deserialize, Serialize};
use crate::descriptor::{Descriptor, Entity};
use crate::executor::Executor;
use crate::links::LinkTable;
use crate::statement::Statement;
use crate::value::Value;
use crate::{Error, Result};

/// Join flavour for every level of a graph read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    /// Keep parents that have no children
    #[default]
    Left,
    /// Drop parents that have no children (a childless root reads as absent)
    Inner,
}

impl JoinKind {
    fn keyword(&self) -> &'static str {
        match self {
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Inner => "INNER JOIN",
        }
    }
}

/// One level below the root of a join
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Level {
    /// Child rows holding the previous level's key in `foreign_key`
    Owned {
        descriptor: Descriptor,
        foreign_key: &'static str,
    },
    /// Peer rows reached from the previous level through a link table
    Linked {
        link: LinkTable,
        descriptor: Descriptor,
    },
}

impl Level {
    pub fn descriptor(&self) -> &Descriptor {
        match self {
            Level::Owned { descriptor, .. } | Level::Linked { descriptor, .. } => descriptor,
        }
    }
}

/// Shape of a graph read: root descriptor plus any number of join levels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinSpec {
    root: Descriptor,
    levels: Vec<Level>,
    kind: JoinKind,
}

impl JoinSpec {
    pub fn new(root: Descriptor) -> Self {
        Self {
            root,
            levels: Vec::new(),
            kind: JoinKind::default(),
        }
    }

    /// Add an ownership level under the current deepest level
    pub fn owned(mut self, child: Descriptor, foreign_key: &'static str) -> Self {
        self.levels.push(Level::Owned {
            descriptor: child,
            foreign_key,
        });
        self
    }

    /// Add an association level under the current deepest level
    pub fn linked(mut self, link: LinkTable, peer: Descriptor) -> Self {
        self.levels.push(Level::Linked {
            link,
            descriptor: peer,
        });
        self
    }

    pub fn with_kind(mut self, kind: JoinKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn root(&self) -> &Descriptor {
        &self.root
    }

    pub fn levels(&self) -> &[Level] {
        &self.levels
    }

    pub fn kind(&self) -> JoinKind {
        self.kind
    }

    /// Cells per result row
    pub fn width(&self) -> usize {
        self.root.columns().len()
            + self
                .levels
                .iter()
                .map(|l| l.descriptor().columns().len())
                .sum::<usize>()
    }

    /// Build the join for one root key.
    ///
    /// Rows are ordered by each owned level's key and each link row's
    /// insertion order, which fixes the first-seen order of children.
    pub fn statement(&self, root_key: Value) -> Result<Statement> {
        if root_key.is_null() {
            return Err(Error::Statement("graph read needs a root key".into()));
        }
        let join = self.kind.keyword();
        let mut select = qualified("t0", &self.root);
        let mut from = format!("{} t0", self.root.table_name());
        let mut order = Vec::new();

        let mut parent_alias = "t0".to_string();
        let mut parent_key = self.root.single_key()?;
        for (i, level) in self.levels.iter().enumerate() {
            let desc = level.descriptor();
            let alias = format!("t{}", i + 1);
            let key = desc.single_key()?;
            select.extend(qualified(&alias, desc));

            match level {
                Level::Owned { foreign_key, .. } => {
                    from.push_str(&format!(
                        "\n  {} {} {} ON {}.{} = {}.{}",
                        join,
                        desc.table_name(),
                        alias,
                        alias,
                        foreign_key,
                        parent_alias,
                        parent_key
                    ));
                    order.push(format!("{}.{}", alias, key));
                }
                Level::Linked { link, .. } => {
                    let link_alias = format!("l{}", i + 1);
                    from.push_str(&format!(
                        "\n  {} {} {} ON {}.{} = {}.{}",
                        join, link.table, link_alias, link_alias, link.parent_column, parent_alias, parent_key
                    ));
                    from.push_str(&format!(
                        "\n  {} {} {} ON {}.{} = {}.{}",
                        join,
                        desc.table_name(),
                        alias,
                        alias,
                        key,
                        link_alias,
                        link.peer_column
                    ));
                    order.push(format!("{}.rowid", link_alias));
                }
            }

            parent_alias = alias;
            parent_key = key;
        }

        let mut sql = format!(
            "SELECT {}\nFROM {}\nWHERE t0.{} = $1",
            select.join(", "),
            from,
            self.root.single_key()?
        );
        if !order.is_empty() {
            sql.push_str("\nORDER BY ");
            sql.push_str(&order.join(", "));
        }
        Ok(Statement::new(sql, vec![root_key]))
    }
}

fn qualified(alias: &str, desc: &Descriptor) -> Vec<String> {
    desc.columns().iter().map(|c| format!("{}.{}", alias, c)).collect()
}

/// Hashable form of a key cell
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum NodeKey {
    Integer(i64),
    Text(String),
}

impl NodeKey {
    /// `None` for a NULL key: no row at this level
    fn from_value(column: &str, value: &Value) -> Result<Option<Self>> {
        match value {
            Value::Null => Ok(None),
            Value::Integer(i) => Ok(Some(NodeKey::Integer(*i))),
            Value::Text(s) => Ok(Some(NodeKey::Text(s.clone()))),
            other => Err(Error::decode(column, format!("{} values cannot key a node", other.kind()))),
        }
    }
}

/// One reconstructed row of the graph with its children
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    table: &'static str,
    values: Vec<Value>,
    children: Vec<Node>,
    index: HashMap<NodeKey, usize>,
}

impl Node {
    fn new(table: &'static str, values: Vec<Value>) -> Self {
        Self {
            table,
            values,
            children: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn table(&self) -> &'static str {
        self.table
    }

    /// Cells of this node in its descriptor's column order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Find the child with `key`, creating it from `cells` on first sight
    fn upsert(&mut self, table: &'static str, key: NodeKey, cells: &[Value]) -> &mut Node {
        let slot = match self.index.get(&key) {
            Some(&slot) => slot,
            None => {
                self.children.push(Node::new(table, cells.to_vec()));
                let slot = self.children.len() - 1;
                self.index.insert(key, slot);
                slot
            }
        };
        &mut self.children[slot]
    }

    /// Decode this node into `E`, attaching decoded children level by level.
    ///
    /// The node must come from `E`'s table; a join level naming another table
    /// is a shape error even when the column counts line up.
    pub fn decode<E: Entity>(&self) -> Result<E> {
        if self.table != E::TABLE {
            return Err(Error::Shape(format!(
                "{} row cannot decode as {}",
                self.table,
                E::TABLE
            )));
        }
        let desc = Descriptor::of::<E>()?;
        let mut entity: E = desc.decode(&self.values)?;
        for child in &self.children {
            entity.attach(child)?;
        }
        Ok(entity)
    }
}

/// Fold flat join rows into a node tree.
///
/// Returns `None` when there are no rows. Root cells are taken from the first
/// row only; they repeat on every row.
pub fn fold_rows(spec: &JoinSpec, rows: &[Vec<Value>]) -> Result<Option<Node>> {
    let Some(first) = rows.first() else {
        return Ok(None);
    };

    let root_width = spec.root().columns().len();
    let width = spec.width();
    let mut keys = Vec::with_capacity(spec.levels().len());
    for level in spec.levels() {
        let desc = level.descriptor();
        let key = desc.single_key()?;
        keys.push((key, desc.position(key).unwrap_or_default()));
    }

    if first.len() != width {
        return Err(Error::Shape(format!("join rows have {} cells, expected {}", first.len(), width)));
    }
    let mut root = Node::new(spec.root().table_name(), first[..root_width].to_vec());

    for row in rows {
        if row.len() != width {
            return Err(Error::Shape(format!("join rows have {} cells, expected {}", row.len(), width)));
        }

        let mut cursor = &mut root;
        let mut offset = root_width;
        for (level, (key_column, key_position)) in spec.levels().iter().zip(&keys) {
            let desc = level.descriptor();
            let cells = &row[offset..offset + desc.columns().len()];
            offset += desc.columns().len();

            let Some(key) = NodeKey::from_value(key_column, &cells[*key_position])? else {
                break;
            };
            cursor = cursor.upsert(desc.table_name(), key, cells);
        }
    }

    Ok(Some(root))
}

/// Runs graph reads over one connection
pub struct GraphReader<'a, X: Executor + ?Sized> {
    conn: &'a X,
}

impl<'a, X: Executor + ?Sized> GraphReader<'a, X> {
    pub fn new(conn: &'a X) -> Self {
        Self { conn }
    }

    /// Read the untyped node tree rooted at `root_key`
    pub fn read_node(&self, spec: &JoinSpec, root_key: impl Into<Value>) -> Result<Option<Node>> {
        let stmt = spec.statement(root_key.into())?;
        let rows = self.conn.query(&stmt)?;
        tracing::debug!(
            table = spec.root().table_name(),
            levels = spec.levels().len(),
            rows = rows.len(),
            "folding join rows"
        );
        fold_rows(spec, &rows)
    }

    /// Read and decode the graph rooted at `root_key`; `None` when absent
    pub fn read_graph<E: Entity>(&self, spec: &JoinSpec, root_key: impl Into<Value>) -> Result<Option<E>> {
        if spec.root().table_name() != E::TABLE {
            return Err(Error::Shape(format!(
                "join rooted at {} cannot decode {}",
                spec.root().table_name(),
                E::TABLE
            )));
        }
        self.read_node(spec, root_key)?
            .map(|node| node.decode::<E>())
            .transpose()
    }
}
