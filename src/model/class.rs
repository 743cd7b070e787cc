use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::descriptor::{Column, ColumnMut, Descriptor, Entity, Owner};
use crate::graph::{JoinKind, JoinSpec, Node};
use crate::links::{Association, LinkTable};
use crate::{Error, Result};

/// Object ↔ Item membership
pub const OBJECT_ITEM_LINK: LinkTable = LinkTable::new("OBJECT_ITEM_LINK", "OBJECT_ID", "ITEM_ID");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Class {
    pub id: i64,
    pub name: String,
    pub objects: Vec<Object>,
}

impl Class {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Class → Object → Item join
    pub fn graph_spec(kind: JoinKind) -> Result<JoinSpec> {
        Ok(JoinSpec::new(Descriptor::of::<Class>()?.clone())
            .owned(Descriptor::of::<Object>()?.clone(), <Class as Owner>::FOREIGN_KEY)
            .linked(OBJECT_ITEM_LINK, Descriptor::of::<Item>()?.clone())
            .with_kind(kind))
    }
}

impl Entity for Class {
    const TABLE: &'static str = "CLASSES";
    const PRIMARY_KEY: &'static [&'static str] = &["ID"];

    fn columns(&self) -> Vec<Column<'_>> {
        vec![Column::new("ID", &self.id), Column::new("NAME", &self.name)]
    }

    fn columns_mut(&mut self) -> Vec<ColumnMut<'_>> {
        vec![ColumnMut::new("ID", &mut self.id), ColumnMut::new("NAME", &mut self.name)]
    }

    fn attach(&mut self, node: &Node) -> Result<()> {
        self.objects.push(node.decode()?);
        Ok(())
    }
}

impl Owner for Class {
    type Child = Object;
    const FOREIGN_KEY: &'static str = "CLASS_ID";

    fn children(&self) -> &[Object] {
        &self.objects
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Object {
    pub id: i64,
    pub name: String,
    pub value: f64,
    pub datetime: Option<DateTime<Utc>>,
    pub items: Vec<Item>,
}

impl Object {
    pub fn named(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            ..Default::default()
        }
    }
}

impl Entity for Object {
    const TABLE: &'static str = "OBJECTS";
    const PRIMARY_KEY: &'static [&'static str] = &["ID"];

    fn columns(&self) -> Vec<Column<'_>> {
        vec![
            Column::new("ID", &self.id),
            Column::new("NAME", &self.name),
            Column::new("VALUE", &self.value),
            Column::new("DATETIME", &self.datetime),
        ]
    }

    fn columns_mut(&mut self) -> Vec<ColumnMut<'_>> {
        vec![
            ColumnMut::new("ID", &mut self.id),
            ColumnMut::new("NAME", &mut self.name),
            ColumnMut::new("VALUE", &mut self.value),
            ColumnMut::new("DATETIME", &mut self.datetime),
        ]
    }

    fn association(&self) -> Option<Association> {
        Some(Association::new(
            OBJECT_ITEM_LINK,
            self.items.iter().map(|item| item.id).collect(),
        ))
    }

    fn attach(&mut self, node: &Node) -> Result<()> {
        if node.table() != Item::TABLE {
            return Err(Error::Shape(format!("objects only link items, got {}", node.table())));
        }
        self.items.push(node.decode()?);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub value: f64,
    pub datetime: Option<DateTime<Utc>>,
}

impl Entity for Item {
    const TABLE: &'static str = "ITEMS";
    const PRIMARY_KEY: &'static [&'static str] = &["ID"];

    fn columns(&self) -> Vec<Column<'_>> {
        vec![
            Column::new("ID", &self.id),
            Column::new("NAME", &self.name),
            Column::new("VALUE", &self.value),
            Column::new("DATETIME", &self.datetime),
        ]
    }

    fn columns_mut(&mut self) -> Vec<ColumnMut<'_>> {
        vec![
            ColumnMut::new("ID", &mut self.id),
            ColumnMut::new("NAME", &mut self.name),
            ColumnMut::new("VALUE", &mut self.value),
            ColumnMut::new("DATETIME", &mut self.datetime),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptors_are_valid() {
        assert_eq!(Descriptor::of::<Class>().unwrap().columns(), &["ID", "NAME"]);
        assert_eq!(Descriptor::of::<Object>().unwrap().columns().len(), 4);
        assert_eq!(Descriptor::of::<Item>().unwrap().table_name(), "ITEMS");
    }

    #[test]
    fn test_object_association_lists_item_ids() {
        let mut object = Object::named("O", 1.0);
        object.items = vec![Item { id: 3, ..Default::default() }, Item { id: 1, ..Default::default() }];
        let assoc = object.association().unwrap();
        assert_eq!(assoc.link, OBJECT_ITEM_LINK);
        assert_eq!(assoc.peer_ids, vec![3, 1]);
    }

    #[test]
    fn test_json_uses_camel_case() {
        let class = Class::named("C1");
        let json = serde_json::to_value(&class).unwrap();
        assert_eq!(json["name"], "C1");
        assert!(json["objects"].as_array().unwrap().is_empty());
    }
}
