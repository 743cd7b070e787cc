use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::descriptor::{Column, ColumnMut, Descriptor, Entity, Owner};
use crate::graph::{JoinKind, JoinSpec, Node};
use crate::links::{Association, LinkTable};
use crate::{Error, Result};

/// Task ↔ Resource usage
pub const TASK_RESOURCE: LinkTable = LinkTable::new("TASK_RESOURCE", "TASK_ID", "RESOURCE_ID");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub manager: String,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub budget: Option<f64>,
    pub description: Option<String>,
    pub tasks: Vec<Task>,
}

impl Project {
    /// Project → Task → Resource join
    pub fn graph_spec(kind: JoinKind) -> Result<JoinSpec> {
        Ok(JoinSpec::new(Descriptor::of::<Project>()?.clone())
            .owned(Descriptor::of::<Task>()?.clone(), <Project as Owner>::FOREIGN_KEY)
            .linked(TASK_RESOURCE, Descriptor::of::<Resource>()?.clone())
            .with_kind(kind))
    }
}

impl Entity for Project {
    const TABLE: &'static str = "PROJECTS";
    const PRIMARY_KEY: &'static [&'static str] = &["ID"];

    fn columns(&self) -> Vec<Column<'_>> {
        vec![
            Column::new("ID", &self.id),
            Column::new("NAME", &self.name),
            Column::new("MANAGER", &self.manager),
            Column::new("START_DATE", &self.start_date),
            Column::new("END_DATE", &self.end_date),
            Column::new("BUDGET", &self.budget),
            Column::new("DESCRIPTION", &self.description),
        ]
    }

    fn columns_mut(&mut self) -> Vec<ColumnMut<'_>> {
        vec![
            ColumnMut::new("ID", &mut self.id),
            ColumnMut::new("NAME", &mut self.name),
            ColumnMut::new("MANAGER", &mut self.manager),
            ColumnMut::new("START_DATE", &mut self.start_date),
            ColumnMut::new("END_DATE", &mut self.end_date),
            ColumnMut::new("BUDGET", &mut self.budget),
            ColumnMut::new("DESCRIPTION", &mut self.description),
        ]
    }

    fn attach(&mut self, node: &Node) -> Result<()> {
        self.tasks.push(node.decode()?);
        Ok(())
    }
}

impl Owner for Project {
    type Child = Task;
    const FOREIGN_KEY: &'static str = "PROJECT_ID";

    fn children(&self) -> &[Task] {
        &self.tasks
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: i64,
    pub name: String,
    pub responsible: Option<String>,
    pub deadline: DateTime<Utc>,
    pub status: String,
    pub priority: Option<String>,
    pub estimated_time: Option<String>,
    pub description: Option<String>,
    pub resources: Vec<Resource>,
}

impl Entity for Task {
    const TABLE: &'static str = "TASKS";
    const PRIMARY_KEY: &'static [&'static str] = &["ID"];

    fn columns(&self) -> Vec<Column<'_>> {
        vec![
            Column::new("ID", &self.id),
            Column::new("NAME", &self.name),
            Column::new("RESPONSIBLE", &self.responsible),
            Column::new("DEADLINE", &self.deadline),
            Column::new("STATUS", &self.status),
            Column::new("PRIORITY", &self.priority),
            Column::new("ESTIMATED_TIME", &self.estimated_time),
            Column::new("DESCRIPTION", &self.description),
        ]
    }

    fn columns_mut(&mut self) -> Vec<ColumnMut<'_>> {
        vec![
            ColumnMut::new("ID", &mut self.id),
            ColumnMut::new("NAME", &mut self.name),
            ColumnMut::new("RESPONSIBLE", &mut self.responsible),
            ColumnMut::new("DEADLINE", &mut self.deadline),
            ColumnMut::new("STATUS", &mut self.status),
            ColumnMut::new("PRIORITY", &mut self.priority),
            ColumnMut::new("ESTIMATED_TIME", &mut self.estimated_time),
            ColumnMut::new("DESCRIPTION", &mut self.description),
        ]
    }

    fn association(&self) -> Option<Association> {
        Some(Association::new(
            TASK_RESOURCE,
            self.resources.iter().map(|resource| resource.id).collect(),
        ))
    }

    fn attach(&mut self, node: &Node) -> Result<()> {
        if node.table() != Resource::TABLE {
            return Err(Error::Shape(format!("tasks only link resources, got {}", node.table())));
        }
        self.resources.push(node.decode()?);
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub daily_cost: Option<f64>,
    pub status: String,
    pub supplier: Option<String>,
    pub quantity: Option<i64>,
    pub acquisition_date: Option<DateTime<Utc>>,
}

impl Entity for Resource {
    const TABLE: &'static str = "RESOURCES";
    const PRIMARY_KEY: &'static [&'static str] = &["ID"];

    fn columns(&self) -> Vec<Column<'_>> {
        vec![
            Column::new("ID", &self.id),
            Column::new("TYPE", &self.kind),
            Column::new("NAME", &self.name),
            Column::new("DAILY_COST", &self.daily_cost),
            Column::new("STATUS", &self.status),
            Column::new("SUPPLIER", &self.supplier),
            Column::new("QUANTITY", &self.quantity),
            Column::new("ACQUISITION_DATE", &self.acquisition_date),
        ]
    }

    fn columns_mut(&mut self) -> Vec<ColumnMut<'_>> {
        vec![
            ColumnMut::new("ID", &mut self.id),
            ColumnMut::new("TYPE", &mut self.kind),
            ColumnMut::new("NAME", &mut self.name),
            ColumnMut::new("DAILY_COST", &mut self.daily_cost),
            ColumnMut::new("STATUS", &mut self.status),
            ColumnMut::new("SUPPLIER", &mut self.supplier),
            ColumnMut::new("QUANTITY", &mut self.quantity),
            ColumnMut::new("ACQUISITION_DATE", &mut self.acquisition_date),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptors_are_valid() {
        for desc in [
            Descriptor::of::<Project>().unwrap(),
            Descriptor::of::<Task>().unwrap(),
            Descriptor::of::<Resource>().unwrap(),
        ] {
            assert_eq!(desc.primary_key_columns(), &["ID"]);
        }
    }

    #[test]
    fn test_graph_spec_levels() {
        let spec = Project::graph_spec(JoinKind::Inner).unwrap();
        assert_eq!(spec.levels().len(), 2);
        assert_eq!(spec.kind(), JoinKind::Inner);
        assert_eq!(spec.width(), 7 + 8 + 8);
    }

    #[test]
    fn test_resource_kind_serializes_as_type() {
        let resource = Resource {
            kind: "tool".into(),
            ..Default::default()
        };
        let json = serde_json::to_value(&resource).unwrap();
        assert_eq!(json["type"], "tool");
        assert!(json["dailyCost"].is_null());
    }

    #[test]
    fn test_task_rejects_foreign_nodes() {
        let spec = Project::graph_spec(JoinKind::Left).unwrap();
        let rows = vec![vec![crate::Value::Null; spec.width()]];
        // a row whose root key is NULL still folds; only its root cells matter
        let node = crate::graph::fold_rows(&spec, &rows).unwrap().unwrap();
        let mut task = Task::default();
        assert!(task.attach(&node).is_err());
    }
}
