//! The three operations callers actually reach for: archive a table's rows
//! (and everything that references them), inspect how two tables relate,
//! and inspect how a batch of rows is referenced by their descendants.
//!
//! Thin composition over [`DependencyGraph`] and [`archive_recursive`] —
//! this module resolves table/PK lookups against the graph and issues the
//! one extra catalog-adjacent query `get_rows_references` needs; it holds
//! no state of its own beyond what it was constructed with.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use sqlx::postgres::PgPool;
use sqlx::Row;

use pgarchive_core::config::{ArchiverConfig, Config};
use pgarchive_core::error::{Error, Result};
use pgarchive_core::graph::{DependencyGraph, ForeignKeyEdge};

use crate::archiver::{archive_recursive, ArchiveRow, ArchiveSummary};
use crate::identifier::{qualify, quote};

/// `get_table_references` result: who references `table`, and what `table`
/// itself references.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReferencesBundle {
    pub in_refs: HashMap<String, Vec<ForeignKeyEdge>>,
    pub out_refs: HashMap<String, Vec<ForeignKeyEdge>>,
}

/// `get_rows_references` result: for each requested id, for each child
/// table, for each FK column list tying that child back to the id's table,
/// the matching child rows. Every `(id, child_table, fk_column)` combination
/// the graph knows about is present, with an empty `Vec` when nothing
/// matches — callers never have to distinguish "no edge" from "no rows".
pub type RowsReferences = HashMap<i64, HashMap<String, HashMap<String, Vec<ArchiveRow>>>>;

/// Composes the dependency graph with a live connection pool to answer the
/// three Query API operations.
pub struct QueryApi {
    pool: PgPool,
    graph: Arc<DependencyGraph>,
    config: ArchiverConfig,
    schema: String,
    archive_suffix: String,
}

impl QueryApi {
    pub fn new(
        pool: PgPool,
        graph: Arc<DependencyGraph>,
        config: ArchiverConfig,
        schema: impl Into<String>,
        archive_suffix: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            graph,
            config,
            schema: schema.into(),
            archive_suffix: archive_suffix.into(),
        }
    }

    /// Build a `QueryApi` from a fully-loaded [`Config`] and a built graph.
    pub fn from_config(pool: PgPool, graph: Arc<DependencyGraph>, config: &Config) -> Self {
        Self::new(
            pool,
            graph,
            config.archiver,
            config.db.schema.clone(),
            config.archive_suffix.0.clone(),
        )
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Archive (and, unless `to_archive` is false, mirror) every row of
    /// `table` identified by `ids`, together with every row in every
    /// referencing descendant table. `ids` is chunked by
    /// `ArchiverConfig::chunk_size` before each chunk is handed to
    /// [`archive_recursive`] as its own top-level traversal.
    ///
    /// Assumes `table`'s primary key is a single column, matching the
    /// integer id list callers pass through the CLI (`--ids`).
    pub async fn archive_table(&self, table: &str, ids: &[i64]) -> Result<Vec<ArchiveSummary>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let pk_columns = self
            .graph
            .primary_key(table)
            .ok_or_else(|| Error::NoPrimaryKey(table.to_string()))?
            .to_string();
        let pk_column = pk_columns
            .split(", ")
            .next()
            .unwrap_or(pk_columns.as_str())
            .to_string();

        let chunk_size = self.config.chunk_size.max(1) as usize;
        let mut summaries = Vec::new();
        for chunk in ids.chunks(chunk_size) {
            let rows: Vec<ArchiveRow> = chunk
                .iter()
                .map(|id| {
                    let mut row = serde_json::Map::new();
                    row.insert(pk_column.clone(), Value::from(*id));
                    row
                })
                .collect();

            let chunk_summaries = archive_recursive(
                &self.pool,
                &self.graph,
                &self.config,
                &self.schema,
                &self.archive_suffix,
                table,
                &rows,
                &pk_columns,
                0,
            )
            .await?;
            summaries.extend(chunk_summaries);
        }

        Ok(summaries)
    }

    /// Tables that reference `table` (`in_refs`) and tables `table`
    /// references (`out_refs`).
    pub fn get_table_references(&self, table: &str) -> Result<ReferencesBundle> {
        if !self.graph.contains_table(table) {
            return Err(Error::UnknownTable(table.to_string()));
        }
        Ok(ReferencesBundle {
            in_refs: self.graph.in_refs(table),
            out_refs: self.graph.out_refs(table),
        })
    }

    /// For every id in `ids`, for every child table referencing `table`
    /// through every FK edge, the child rows whose FK column(s) match that
    /// id. Every `(id, child_table, fk_column)` combination is present in
    /// the result, empty when nothing matches.
    ///
    /// Keys the inner map by the edge's FK column list rather than by child
    /// table name alone, so a child table reached through two distinct FK
    /// edges (e.g. `author_book` referencing `book` only) gets independent
    /// buckets instead of one overwriting the other.
    pub async fn get_rows_references(&self, table: &str, ids: &[i64]) -> Result<RowsReferences> {
        if !self.graph.contains_table(table) {
            return Err(Error::UnknownTable(table.to_string()));
        }

        let mut result: RowsReferences = ids.iter().map(|&id| (id, HashMap::new())).collect();

        for (child_table, child_edge) in self.graph.children_in_order(table) {
            for edge in &child_edge.edges {
                for &id in ids {
                    result
                        .entry(id)
                        .or_default()
                        .entry(child_table.to_string())
                        .or_default()
                        .entry(edge.child_fk_columns.clone())
                        .or_default();
                }

                if ids.is_empty() {
                    continue;
                }

                let fk_column = edge
                    .child_fk_columns
                    .split(", ")
                    .next()
                    .unwrap_or(edge.child_fk_columns.as_str());
                let rows = select_rows_by_fk(
                    &self.pool,
                    &self.schema,
                    child_table,
                    &edge.child_pk_columns,
                    &edge.child_fk_columns,
                    fk_column,
                    ids,
                )
                .await?;

                for row in rows {
                    let Some(matched_id) = row.get(fk_column).and_then(Value::as_i64) else {
                        continue;
                    };
                    result
                        .entry(matched_id)
                        .or_default()
                        .entry(child_table.to_string())
                        .or_default()
                        .entry(edge.child_fk_columns.clone())
                        .or_default()
                        .push(row);
                }
            }
        }

        Ok(result)
    }
}

/// `SELECT <pk_columns>, <fk_columns> FROM child WHERE filter_fk_column IN (ids)`,
/// projecting only the child's own PK and the FK columns pointing back at
/// the parent, per §4.4 — not the whole row. Built as a single
/// `jsonb_build_object(...)` projection so the result stays a flat
/// `ArchiveRow` like every other row this crate moves around.
///
/// Assumes a single-column FK, matching the integer id batches
/// `get_rows_references` receives from the CLI; composite FKs are not
/// resolvable against a flat id list and are not attempted here.
async fn select_rows_by_fk(
    pool: &PgPool,
    schema: &str,
    table: &str,
    pk_columns: &str,
    fk_columns: &str,
    filter_fk_column: &str,
    ids: &[i64],
) -> Result<Vec<ArchiveRow>> {
    let qualified = qualify(schema, table)?;
    let quoted_filter_fk = quote(filter_fk_column)?;

    let mut projected: Vec<&str> = Vec::new();
    for column in pk_columns.split(", ").chain(fk_columns.split(", ")) {
        if !projected.contains(&column) {
            projected.push(column);
        }
    }
    let object_fields = projected
        .iter()
        .map(|column| Ok(format!("'{column}', {}", quote(column)?)))
        .collect::<Result<Vec<_>>>()?
        .join(", ");

    let placeholders: Vec<String> = (0..ids.len()).map(|i| format!("${}", i + 1)).collect();
    let sql = format!(
        "SELECT jsonb_build_object({object_fields}) AS row_data FROM {qualified} WHERE {quoted_filter_fk} IN ({})",
        placeholders.join(", ")
    );

    let mut query = sqlx::query(&sql);
    for id in ids {
        query = query.bind(id);
    }

    let rows = query.fetch_all(pool).await.map_err(Error::Database)?;
    rows.into_iter()
        .map(|row| {
            let value: Value = row.try_get("row_data").map_err(Error::Database)?;
            match value {
                Value::Object(map) => Ok(map),
                _ => Ok(serde_json::Map::new()),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pgarchive_core::graph::ForeignKeyEdge;

    fn publisher_book_graph() -> Arc<DependencyGraph> {
        let mut graph = DependencyGraph::new();
        graph.ensure_table("publisher");
        graph.ensure_table("book");
        graph.set_primary_key("publisher", "id");
        graph.set_primary_key("book", "id");
        graph.add_edge(
            "publisher",
            "book",
            ForeignKeyEdge::new("id", "id", "publisher_id"),
        );
        Arc::new(graph)
    }

    fn api_without_pool(graph: Arc<DependencyGraph>) -> QueryApi {
        // No query in these tests ever reaches the pool; a lazily-connecting
        // pool is enough to construct a `QueryApi` for graph-only assertions.
        let pool = PgPool::connect_lazy("postgres://localhost/does-not-matter")
            .expect("lazy pool construction never touches the network");
        QueryApi::new(pool, graph, ArchiverConfig::default(), "public", "archive")
    }

    #[test]
    fn get_table_references_reports_in_and_out_refs() {
        let api = api_without_pool(publisher_book_graph());

        let publisher_refs = api.get_table_references("publisher").unwrap();
        assert!(publisher_refs.in_refs.contains_key("book"));
        assert!(publisher_refs.out_refs.is_empty());

        let book_refs = api.get_table_references("book").unwrap();
        assert!(book_refs.out_refs.contains_key("publisher"));
        assert!(book_refs.in_refs.is_empty());
    }

    #[test]
    fn get_table_references_fails_for_unknown_table() {
        let api = api_without_pool(publisher_book_graph());
        let err = api.get_table_references("ghost").unwrap_err();
        assert!(matches!(err, Error::UnknownTable(_)));
    }

    #[tokio::test]
    async fn archive_table_is_a_no_op_for_empty_ids() {
        let api = api_without_pool(publisher_book_graph());
        let summaries = api.archive_table("publisher", &[]).await.unwrap();
        assert!(summaries.is_empty());
    }

    #[tokio::test]
    async fn get_rows_references_fails_for_unknown_table() {
        let api = api_without_pool(publisher_book_graph());
        let err = api.get_rows_references("ghost", &[1, 2]).await.unwrap_err();
        assert!(matches!(err, Error::UnknownTable(_)));
    }

    #[tokio::test]
    async fn get_rows_references_initializes_every_bucket_with_no_ids() {
        let api = api_without_pool(publisher_book_graph());
        let result = api.get_rows_references("publisher", &[]).await.unwrap();
        assert!(result.is_empty());
    }
}
