//! Dependency graph types shared between catalog discovery and archival.
//!
//! The graph is built once per process from the live catalog (see
//! `pgarchive-db::catalog` and `pgarchive-db::graph_builder`) and is
//! read-only thereafter. Traversal (the archiver) only ever needs a single
//! level of child lookup; the recursive [`Diagnostics`] view exists purely
//! for operators inspecting the shape of the schema and is never consulted
//! by the archival traversal itself.

use std::collections::HashMap;

use serde::Serialize;

/// One foreign-key relationship from a child (referencing) table to a
/// parent (referenced) table.
///
/// Column lists are comma-joined in declaration order, matching the shape
/// returned by the catalog reader for both single- and multi-column keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ForeignKeyEdge {
    /// Ordered, comma-joined primary key columns of the parent table.
    pub parent_pk_columns: String,
    /// Ordered, comma-joined primary key columns of the child table.
    pub child_pk_columns: String,
    /// Ordered, comma-joined foreign key columns on the child table that
    /// reference the parent's primary key.
    pub child_fk_columns: String,
}

impl ForeignKeyEdge {
    pub fn new(
        parent_pk_columns: impl Into<String>,
        child_pk_columns: impl Into<String>,
        child_fk_columns: impl Into<String>,
    ) -> Self {
        Self {
            parent_pk_columns: parent_pk_columns.into(),
            child_pk_columns: child_pk_columns.into(),
            child_fk_columns: child_fk_columns.into(),
        }
    }
}

/// The one or more foreign-key edges relating a specific child table to a
/// specific parent table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildEdge {
    pub edges: Vec<ForeignKeyEdge>,
}

/// A sentinel recorded by the graph builder when a diagnostic walk
/// revisits a table already on the current path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleMarker {
    /// The child table is the same as its immediate parent.
    SelfLoop,
    /// The child table appears earlier in the path, but is not the
    /// immediate parent.
    Cycle,
}

/// A node in the diagnostic (display-only) nested view of the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticNode {
    /// Further children, keyed by table name.
    Children(HashMap<String, DiagnosticNode>),
    /// Traversal stopped here because the table was already on the path.
    Cycle(CycleMarker),
}

/// The dependency graph: for every table, the set of tables that reference
/// it (its children) and, separately, every table's primary key columns.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    tables: HashMap<String, HashMap<String, ChildEdge>>,
    diagnostics: HashMap<String, HashMap<String, DiagnosticNode>>,
    primary_keys: HashMap<String, String>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure `table` is present as a key, with no children yet.
    pub fn ensure_table(&mut self, table: &str) {
        self.tables.entry(table.to_string()).or_default();
    }

    /// Record `table`'s primary key column list.
    pub fn set_primary_key(&mut self, table: &str, pk_columns: impl Into<String>) {
        self.primary_keys.insert(table.to_string(), pk_columns.into());
    }

    /// Append an edge from `child` back to `parent`.
    pub fn add_edge(&mut self, parent: &str, child: &str, edge: ForeignKeyEdge) {
        self.tables
            .entry(parent.to_string())
            .or_default()
            .entry(child.to_string())
            .or_default()
            .edges
            .push(edge);
    }

    /// Children of `table`, in "busiest first" order (most grandchildren
    /// descending, then table name for determinism).
    pub fn children_in_order(&self, table: &str) -> Vec<(&str, &ChildEdge)> {
        let Some(children) = self.tables.get(table) else {
            return Vec::new();
        };
        let mut ordered: Vec<(&str, &ChildEdge)> = children
            .iter()
            .map(|(name, edge)| (name.as_str(), edge))
            .collect();
        ordered.sort_by(|(a_name, _), (b_name, _)| {
            let a_count = self.tables.get(*a_name).map(HashMap::len).unwrap_or(0);
            let b_count = self.tables.get(*b_name).map(HashMap::len).unwrap_or(0);
            b_count.cmp(&a_count).then_with(|| a_name.cmp(b_name))
        });
        ordered
    }

    /// Whether `table` has no children in the graph.
    pub fn has_no_children(&self, table: &str) -> bool {
        self.tables.get(table).map_or(true, HashMap::is_empty)
    }

    /// Whether `table` is a known key in the graph.
    pub fn contains_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    /// All tables referencing `table` (children), with their edges.
    pub fn in_refs(&self, table: &str) -> HashMap<String, Vec<ForeignKeyEdge>> {
        self.tables
            .get(table)
            .into_iter()
            .flat_map(|children| children.iter())
            .map(|(child, edge)| (child.clone(), edge.edges.clone()))
            .collect()
    }

    /// All tables `table` references (parents), with their edges.
    pub fn out_refs(&self, table: &str) -> HashMap<String, Vec<ForeignKeyEdge>> {
        let mut out = HashMap::new();
        for (parent, children) in &self.tables {
            if parent == table {
                continue;
            }
            if let Some(edge) = children.get(table) {
                out.insert(parent.clone(), edge.edges.clone());
            }
        }
        out
    }

    pub fn primary_key(&self, table: &str) -> Option<&str> {
        self.primary_keys.get(table).map(String::as_str)
    }

    pub fn primary_keys(&self) -> &HashMap<String, String> {
        &self.primary_keys
    }

    pub fn set_diagnostics(&mut self, table: &str, view: HashMap<String, DiagnosticNode>) {
        self.diagnostics.insert(table.to_string(), view);
    }

    pub fn diagnostics(&self, table: &str) -> Option<&HashMap<String, DiagnosticNode>> {
        self.diagnostics.get(table)
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_refs_and_out_refs_are_symmetric() {
        let mut graph = DependencyGraph::new();
        graph.ensure_table("publisher");
        graph.ensure_table("book");
        graph.set_primary_key("publisher", "id");
        graph.add_edge(
            "publisher",
            "book",
            ForeignKeyEdge::new("id", "id", "publisher_id"),
        );

        let in_refs = graph.in_refs("publisher");
        assert_eq!(in_refs.len(), 1);
        assert!(in_refs.contains_key("book"));

        let out_refs = graph.out_refs("book");
        assert!(out_refs.contains_key("publisher"));
    }

    #[test]
    fn has_no_children_when_empty() {
        let mut graph = DependencyGraph::new();
        graph.ensure_table("author");
        assert!(graph.has_no_children("author"));
    }

    #[test]
    fn children_in_order_is_deterministic_when_tied() {
        let mut graph = DependencyGraph::new();
        graph.ensure_table("a");
        graph.add_edge("a", "b", ForeignKeyEdge::new("id", "id", "a_id"));
        graph.add_edge("a", "c", ForeignKeyEdge::new("id", "id", "a_id"));
        let order = graph.children_in_order("a");
        assert_eq!(order.iter().map(|(n, _)| *n).collect::<Vec<_>>(), vec!["b", "c"]);
    }
}
