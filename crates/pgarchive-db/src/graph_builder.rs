//! Builds a [`DependencyGraph`] from catalog output.
//!
//! Mirrors the two-pass shape of the original graph builder: first record
//! every table and its primary key, then fold in each foreign key as an
//! edge from the referenced (parent) table to the referencing (child)
//! table. A second, display-only pass walks the graph depth-first to
//! produce a nested [`DiagnosticNode`] view per table, flagging self-loops
//! and revisits so operators can see cyclic schemas without the traversal
//! itself ever needing to care about cycles.

use std::collections::{HashMap, HashSet};

use pgarchive_core::error::Result;
use pgarchive_core::graph::{CycleMarker, DependencyGraph, DiagnosticNode, ForeignKeyEdge};
use pgarchive_core::traits::CatalogReader;

/// Query the catalog for `schema` and assemble the dependency graph.
pub async fn build_graph(reader: &dyn CatalogReader, schema: &str) -> Result<DependencyGraph> {
    let tables = reader.tables(schema).await?;
    let foreign_keys = reader.foreign_keys(schema).await?;

    let mut graph = DependencyGraph::new();
    let mut primary_keys: HashMap<String, String> = HashMap::new();
    for table in &tables {
        graph.ensure_table(&table.name);
        if !table.primary_key_columns.is_empty() {
            let joined = table.primary_key_columns.join(", ");
            graph.set_primary_key(&table.name, joined.clone());
            primary_keys.insert(table.name.clone(), joined);
        }
    }

    for fk in &foreign_keys {
        graph.ensure_table(&fk.parent_table);
        graph.ensure_table(&fk.child_table);
        let child_pk_columns = primary_keys
            .get(&fk.child_table)
            .cloned()
            .unwrap_or_else(|| fk.child_columns.join(", "));
        let edge = ForeignKeyEdge::new(
            fk.parent_columns.join(", "),
            child_pk_columns,
            fk.child_columns.join(", "),
        );
        graph.add_edge(&fk.parent_table, &fk.child_table, edge);
    }

    for table_name in tables.iter().map(|t| t.name.clone()).collect::<Vec<_>>() {
        let mut visited = HashSet::new();
        visited.insert(table_name.clone());
        let view = diagnostics_for(&graph, &table_name, &visited);
        graph.set_diagnostics(&table_name, view);
    }

    Ok(graph)
}

fn diagnostics_for(
    graph: &DependencyGraph,
    table: &str,
    visited: &HashSet<String>,
) -> HashMap<String, DiagnosticNode> {
    let mut view = HashMap::new();
    for (child, _edge) in graph.children_in_order(table) {
        if child == table {
            view.insert(child.to_string(), DiagnosticNode::Cycle(CycleMarker::SelfLoop));
            continue;
        }
        if visited.contains(child) {
            view.insert(child.to_string(), DiagnosticNode::Cycle(CycleMarker::Cycle));
            continue;
        }
        let mut child_visited = visited.clone();
        child_visited.insert(child.to_string());
        let nested = diagnostics_for(graph, child, &child_visited);
        view.insert(child.to_string(), DiagnosticNode::Children(nested));
    }
    view
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use pgarchive_core::traits::{ForeignKeyRow, TableInfo};

    use super::*;

    struct FakeCatalog {
        tables: Vec<TableInfo>,
        foreign_keys: Vec<ForeignKeyRow>,
    }

    #[async_trait]
    impl CatalogReader for FakeCatalog {
        async fn tables(&self, _schema: &str) -> Result<Vec<TableInfo>> {
            Ok(self.tables.clone())
        }

        async fn foreign_keys(&self, _schema: &str) -> Result<Vec<ForeignKeyRow>> {
            Ok(self.foreign_keys.clone())
        }
    }

    fn publisher_book_fixture() -> FakeCatalog {
        FakeCatalog {
            tables: vec![
                TableInfo {
                    name: "publisher".to_string(),
                    primary_key_columns: vec!["id".to_string()],
                },
                TableInfo {
                    name: "book".to_string(),
                    primary_key_columns: vec!["id".to_string()],
                },
            ],
            foreign_keys: vec![ForeignKeyRow {
                constraint_name: "book_publisher_id_fkey".to_string(),
                child_table: "book".to_string(),
                child_columns: vec!["publisher_id".to_string()],
                parent_table: "publisher".to_string(),
                parent_columns: vec!["id".to_string()],
            }],
        }
    }

    #[tokio::test]
    async fn builds_edge_from_parent_to_child() {
        let catalog = publisher_book_fixture();
        let graph = build_graph(&catalog, "public").await.unwrap();

        assert!(graph.in_refs("publisher").contains_key("book"));
        assert_eq!(graph.primary_key("publisher"), Some("id"));
        assert!(graph.has_no_children("book"));
    }

    #[tokio::test]
    async fn diagnostics_flag_self_loop() {
        let catalog = FakeCatalog {
            tables: vec![TableInfo {
                name: "tree_node".to_string(),
                primary_key_columns: vec!["id".to_string()],
            }],
            foreign_keys: vec![ForeignKeyRow {
                constraint_name: "tree_node_parent_id_fkey".to_string(),
                child_table: "tree_node".to_string(),
                child_columns: vec!["parent_id".to_string()],
                parent_table: "tree_node".to_string(),
                parent_columns: vec!["id".to_string()],
            }],
        };
        let graph = build_graph(&catalog, "public").await.unwrap();
        let view = graph.diagnostics("tree_node").unwrap();
        assert!(matches!(
            view.get("tree_node"),
            Some(DiagnosticNode::Cycle(CycleMarker::SelfLoop))
        ));
    }
}
