//! Recursive, depth-bounded archival traversal.
//!
//! For a starting table and a batch of its rows, walks every table that
//! references it (its children in the dependency graph), recursively
//! archiving each referencing row before finally archiving the rows of the
//! starting table itself — children must be cleared before a parent row
//! can be deleted without violating referential integrity.
//!
//! Each table visited is handled in its own transaction: optionally mirror
//! its rows into an `<table>_<suffix>` archive table, then delete the rows
//! by primary key (or by the foreign key that ties them to the parent
//! batch, when the child has no dependents of its own and can be deleted
//! directly).

use futures::TryStreamExt;
use serde::Serialize;
use serde_json::Value;
use sqlx::postgres::PgPool;
use sqlx::{Postgres, Row, Transaction};
use tracing::{debug, info, warn};

use pgarchive_core::config::ArchiverConfig;
use pgarchive_core::error::{Error, Result};
use pgarchive_core::graph::{DependencyGraph, ForeignKeyEdge};
use pgarchive_core::logging;

use crate::identifier::qualify;

/// One archived/deleted row, keyed by column name.
pub type ArchiveRow = serde_json::Map<String, Value>;

/// Summary of a single table's archival pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArchiveSummary {
    pub table: String,
    pub rows_deleted: u64,
    pub rows_archived: u64,
}

/// Recursively archive `rows` of `table` and everything that references
/// them, depth-first, then archive `table` itself.
///
/// `pk_columns` is the comma-joined primary key column list to use when
/// finally deleting `table`'s own rows.
pub async fn archive_recursive(
    pool: &PgPool,
    graph: &DependencyGraph,
    config: &ArchiverConfig,
    schema: &str,
    archive_suffix: &str,
    table: &str,
    rows: &[ArchiveRow],
    pk_columns: &str,
    depth: u32,
) -> Result<Vec<ArchiveSummary>> {
    info!(
        { logging::SUBSYSTEM } = "archiver",
        { logging::OPERATION } = "archive_recursive",
        { logging::TABLE } = table,
        { logging::DEPTH } = depth,
        { logging::ROWS_COUNT } = rows.len(),
        "starting archive pass"
    );

    if depth >= config.max_depth {
        warn!(
            { logging::SUBSYSTEM } = "archiver",
            { logging::TABLE } = table,
            { logging::DEPTH } = depth,
            { logging::MAX_DEPTH } = config.max_depth,
            "max recursion depth reached, not descending further"
        );
        return Ok(Vec::new());
    }

    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let mut summaries = Vec::new();

    for (child_table, edges) in graph.children_in_order(table) {
        for edge in &edges.edges {
            debug!(
                { logging::SUBSYSTEM } = "archiver",
                { logging::TABLE } = table,
                { logging::CHILD_TABLE } = child_table,
                "descending into referencing table"
            );

            if config.is_debug {
                // Structural preview only: skip the descendant SELECT and
                // recurse using the parent batch as a stand-in for the
                // child rows, so debug mode never touches the database.
                let nested = Box::pin(archive_recursive(
                    pool,
                    graph,
                    config,
                    schema,
                    archive_suffix,
                    child_table,
                    rows,
                    &edge.child_pk_columns,
                    depth + 1,
                ))
                .await?;
                summaries.extend(nested);
                continue;
            }

            if graph.has_no_children(child_table) {
                let summary = archive_by_fk(
                    pool,
                    config,
                    schema,
                    archive_suffix,
                    child_table,
                    edge,
                    rows,
                )
                .await?;
                summaries.push(summary);
                continue;
            }

            let chunk_size = config.chunk_size.max(1) as usize;
            let (sql, binds) = fk_select_sql(schema, child_table, edge, rows)?;
            let mut query = sqlx::query(&sql);
            for value in &binds {
                query = query.bind(value);
            }
            let mut cursor = query.fetch(pool);
            let mut buffer: Vec<ArchiveRow> = Vec::with_capacity(chunk_size);
            while let Some(row) = cursor.try_next().await.map_err(Error::Database)? {
                if let Some(map) = row_data(&row)? {
                    buffer.push(map);
                }
                if buffer.len() >= chunk_size {
                    let chunk = std::mem::take(&mut buffer);
                    let nested = Box::pin(archive_recursive(
                        pool,
                        graph,
                        config,
                        schema,
                        archive_suffix,
                        child_table,
                        &chunk,
                        &edge.child_pk_columns,
                        depth + 1,
                    ))
                    .await?;
                    summaries.extend(nested);
                }
            }
            drop(cursor);
            if !buffer.is_empty() {
                let nested = Box::pin(archive_recursive(
                    pool,
                    graph,
                    config,
                    schema,
                    archive_suffix,
                    child_table,
                    &buffer,
                    &edge.child_pk_columns,
                    depth + 1,
                ))
                .await?;
                summaries.extend(nested);
            }
        }
    }

    let summary = archive_by_ids(pool, config, schema, archive_suffix, table, pk_columns, rows)
        .await?;
    summaries.push(summary);

    Ok(summaries)
}

/// Archive (optionally) and delete `fk_rows` from `table` where the foreign
/// key named in `edge` matches the parent batch, one chunk at a time.
async fn archive_by_fk(
    pool: &PgPool,
    config: &ArchiverConfig,
    schema: &str,
    archive_suffix: &str,
    table: &str,
    edge: &ForeignKeyEdge,
    parent_rows: &[ArchiveRow],
) -> Result<ArchiveSummary> {
    info!(
        { logging::SUBSYSTEM } = "archiver",
        { logging::OPERATION } = "archive_by_fk",
        { logging::TABLE } = table,
        { logging::ROWS_COUNT } = parent_rows.len(),
        "archiving leaf table by foreign key"
    );

    if config.is_debug {
        return Ok(ArchiveSummary {
            table: table.to_string(),
            ..Default::default()
        });
    }

    let mut tx = pool.begin().await.map_err(Error::Database)?;
    let archive_table = if config.to_archive {
        Some(ensure_archive_table(&mut tx, schema, table, archive_suffix).await?)
    } else {
        None
    };

    let parent_pk_cols: Vec<&str> = edge.parent_pk_columns.split(", ").collect();
    let child_fk_cols: Vec<&str> = edge.child_fk_columns.split(", ").collect();
    let parent_values = extract_column_values(parent_rows, &parent_pk_cols)?;

    let deleted = delete_rows_in(&mut tx, schema, table, &child_fk_cols, &parent_values).await?;
    let rows_deleted = deleted.len() as u64;
    let mut rows_archived = 0;
    if let Some(archive_table) = &archive_table {
        rows_archived = insert_rows_chunked(&mut tx, schema, archive_table, &deleted, config.chunk_size).await?;
    }

    tx.commit().await.map_err(Error::Database)?;

    Ok(ArchiveSummary {
        table: table.to_string(),
        rows_deleted,
        rows_archived,
    })
}

/// Archive (optionally) and delete `rows` from `table` by primary key.
async fn archive_by_ids(
    pool: &PgPool,
    config: &ArchiverConfig,
    schema: &str,
    archive_suffix: &str,
    table: &str,
    pk_columns: &str,
    rows: &[ArchiveRow],
) -> Result<ArchiveSummary> {
    info!(
        { logging::SUBSYSTEM } = "archiver",
        { logging::OPERATION } = "archive_by_ids",
        { logging::TABLE } = table,
        { logging::ROWS_COUNT } = rows.len(),
        "archiving table by primary key"
    );

    if config.is_debug {
        return Ok(ArchiveSummary {
            table: table.to_string(),
            ..Default::default()
        });
    }

    let mut tx = pool.begin().await.map_err(Error::Database)?;
    let archive_table = if config.to_archive {
        Some(ensure_archive_table(&mut tx, schema, table, archive_suffix).await?)
    } else {
        None
    };

    let pk_cols: Vec<&str> = pk_columns.split(", ").collect();
    let pk_values = extract_column_values(rows, &pk_cols)?;

    let deleted = delete_rows_in(&mut tx, schema, table, &pk_cols, &pk_values).await?;
    let rows_deleted = deleted.len() as u64;
    let mut rows_archived = 0;
    if let Some(archive_table) = &archive_table {
        rows_archived = insert_rows_chunked(&mut tx, schema, archive_table, &deleted, config.chunk_size).await?;
    }

    tx.commit().await.map_err(Error::Database)?;

    Ok(ArchiveSummary {
        table: table.to_string(),
        rows_deleted,
        rows_archived,
    })
}

/// `CREATE TABLE IF NOT EXISTS "<schema>"."<table>_<suffix>" (LIKE "<schema>"."<table>")`.
async fn ensure_archive_table(
    tx: &mut Transaction<'_, Postgres>,
    schema: &str,
    table: &str,
    suffix: &str,
) -> Result<String> {
    let archive_name = format!("{table}_{suffix}");
    let qualified_source = qualify(schema, table)?;
    let qualified_archive = qualify(schema, &archive_name)?;

    let ddl =
        format!("CREATE TABLE IF NOT EXISTS {qualified_archive} (LIKE {qualified_source})");
    sqlx::query(&ddl)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

    Ok(archive_name)
}

/// `DELETE FROM "<schema>"."<table>" WHERE (<cols>) IN (<values>) RETURNING to_jsonb(<table>.*)`.
///
/// Matched columns and bound values are both cast to `text` so the query
/// works without knowing the target columns' native types up front — the
/// rows this engine moves through are carried as JSON, having lost that
/// type information the moment they were read out with `to_jsonb`.
async fn delete_rows_in(
    tx: &mut Transaction<'_, Postgres>,
    schema: &str,
    table: &str,
    columns: &[&str],
    row_values: &[Vec<Value>],
) -> Result<Vec<ArchiveRow>> {
    if row_values.is_empty() {
        return Ok(Vec::new());
    }

    let qualified = qualify(schema, table)?;
    let quoted_table = crate::identifier::quote(table)?;
    let quoted_columns: Vec<String> = columns
        .iter()
        .map(|c| crate::identifier::quote(c))
        .collect::<Result<Vec<_>>>()?;
    let column_list = quoted_columns
        .iter()
        .map(|c| format!("{c}::text"))
        .collect::<Vec<_>>()
        .join(", ");

    let mut placeholders = Vec::with_capacity(row_values.len());
    let mut bind_values = Vec::with_capacity(row_values.len() * columns.len());
    let mut param_index = 1usize;
    for row in row_values {
        let group: Vec<String> = (0..columns.len())
            .map(|_| {
                let placeholder = format!("${param_index}::text");
                param_index += 1;
                placeholder
            })
            .collect();
        placeholders.push(format!("({})", group.join(", ")));
        bind_values.extend(row.iter().map(value_to_text));
    }

    let sql = format!(
        "DELETE FROM {qualified} WHERE ({column_list}) IN ({}) RETURNING to_jsonb({quoted_table}.*) AS row_data",
        placeholders.join(", ")
    );

    let mut query = sqlx::query(&sql);
    for value in &bind_values {
        query = query.bind(value);
    }

    let rows = query.fetch_all(&mut **tx).await.map_err(Error::Database)?;
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

/// Render a JSON scalar as the text PostgreSQL would produce for the same
/// value, for use in a `column::text = $n::text` comparison. `Null` binds
/// SQL `NULL`, which correctly never matches via `IN`.
fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Insert `rows` into `archive_table` in chunks of `chunk_size`.
async fn insert_rows_chunked(
    tx: &mut Transaction<'_, Postgres>,
    schema: &str,
    archive_table: &str,
    rows: &[ArchiveRow],
    chunk_size: i64,
) -> Result<u64> {
    if rows.is_empty() {
        return Ok(0);
    }

    let chunk_size = chunk_size.max(1) as usize;
    let mut total = 0u64;
    for chunk in rows.chunks(chunk_size) {
        insert_rows(tx, schema, archive_table, chunk).await?;
        total += chunk.len() as u64;
    }
    Ok(total)
}

/// Insert `rows` into `archive_table` via `jsonb_populate_recordset`, which
/// casts each JSON field to the archive table's actual column type for us —
/// the archive table was created `LIKE` its source, so the shapes match.
async fn insert_rows(
    tx: &mut Transaction<'_, Postgres>,
    schema: &str,
    archive_table: &str,
    rows: &[ArchiveRow],
) -> Result<()> {
    if rows.is_empty() {
        return Ok(());
    }
    let qualified = qualify(schema, archive_table)?;
    let batch = Value::Array(rows.iter().map(|r| Value::Object(r.clone())).collect());

    let sql = format!(
        "INSERT INTO {qualified} SELECT * FROM jsonb_populate_recordset(NULL::{qualified}, $1)"
    );

    sqlx::query(&sql)
        .bind(batch)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
    Ok(())
}

/// Build the `SELECT to_jsonb(child.*) ... WHERE (fk_cols) IN (...)` query
/// text and its bind values for a server-side cursor over `table`, matching
/// `edge`'s foreign key against `parent_rows`' referenced PK values. Kept
/// as plain SQL + binds (rather than an executed query) so the caller can
/// drive the result as a streaming cursor instead of buffering it whole.
fn fk_select_sql(
    schema: &str,
    table: &str,
    edge: &ForeignKeyEdge,
    parent_rows: &[ArchiveRow],
) -> Result<(String, Vec<Option<String>>)> {
    let parent_pk_cols: Vec<&str> = edge.parent_pk_columns.split(", ").collect();
    let child_fk_cols: Vec<&str> = edge.child_fk_columns.split(", ").collect();
    let row_values = extract_column_values(parent_rows, &parent_pk_cols)?;

    if row_values.is_empty() {
        // `WHERE (...) IN ()` is invalid SQL; an empty parent batch simply
        // has no matching descendants, so a query that never matches stands
        // in and keeps the caller's control flow uniform.
        let qualified = qualify(schema, table)?;
        let quoted_table = crate::identifier::quote(table)?;
        return Ok((
            format!("SELECT to_jsonb({quoted_table}.*) AS row_data FROM {qualified} WHERE false"),
            Vec::new(),
        ));
    }

    let qualified = qualify(schema, table)?;
    let quoted_table = crate::identifier::quote(table)?;
    let quoted_columns: Vec<String> = child_fk_cols
        .iter()
        .map(|c| crate::identifier::quote(c))
        .collect::<Result<Vec<_>>>()?;
    let column_list = quoted_columns
        .iter()
        .map(|c| format!("{c}::text"))
        .collect::<Vec<_>>()
        .join(", ");

    let mut placeholders = Vec::with_capacity(row_values.len());
    let mut bind_values = Vec::with_capacity(row_values.len() * child_fk_cols.len());
    let mut param_index = 1usize;
    for row in &row_values {
        let group: Vec<String> = (0..child_fk_cols.len())
            .map(|_| {
                let placeholder = format!("${param_index}::text");
                param_index += 1;
                placeholder
            })
            .collect();
        placeholders.push(format!("({})", group.join(", ")));
        bind_values.extend(row.iter().map(value_to_text));
    }

    let sql = format!(
        "SELECT to_jsonb({quoted_table}.*) AS row_data FROM {qualified} WHERE ({column_list}) IN ({})",
        placeholders.join(", ")
    );

    Ok((sql, bind_values))
}

/// Pull the `row_data` jsonb column a `to_jsonb(table.*)` projection
/// returns out of one result row.
fn row_data(row: &sqlx::postgres::PgRow) -> Result<Option<ArchiveRow>> {
    let value: Value = row.try_get("row_data").map_err(Error::Database)?;
    match value {
        Value::Object(map) => Ok(Some(map)),
        _ => Ok(None),
    }
}

/// Extract `columns` from each of `rows` as a flat value tuple, in column
/// order, for use as a `WHERE (col1, col2) IN (...)` bind group.
fn extract_column_values(rows: &[ArchiveRow], columns: &[&str]) -> Result<Vec<Vec<Value>>> {
    rows.iter()
        .map(|row| {
            columns
                .iter()
                .map(|col| {
                    row.get(*col).cloned().ok_or_else(|| {
                        Error::CatalogUnavailable(format!("row missing column `{col}`"))
                    })
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_column_values_reads_in_column_order() {
        let mut row = serde_json::Map::new();
        row.insert("id".to_string(), Value::from(1));
        row.insert("name".to_string(), Value::from("a"));
        let rows = vec![row];
        let values = extract_column_values(&rows, &["name", "id"]).unwrap();
        assert_eq!(values, vec![vec![Value::from("a"), Value::from(1)]]);
    }

    #[test]
    fn extract_column_values_errors_on_missing_column() {
        let row = serde_json::Map::new();
        let rows = vec![row];
        let err = extract_column_values(&rows, &["id"]).unwrap_err();
        assert!(matches!(err, Error::CatalogUnavailable(_)));
    }

    #[test]
    fn fk_select_sql_binds_one_group_per_parent_row() {
        let mut row = serde_json::Map::new();
        row.insert("id".to_string(), Value::from(1));
        let edge = ForeignKeyEdge::new("id", "id", "publisher_id");

        let (sql, binds) = fk_select_sql("public", "book", &edge, &[row]).unwrap();

        assert!(sql.contains("\"publisher_id\"::text"));
        assert!(sql.contains("($1::text)"));
        assert_eq!(binds, vec![Some("1".to_string())]);
    }

    #[test]
    fn fk_select_sql_never_matches_for_empty_parent_batch() {
        let edge = ForeignKeyEdge::new("id", "id", "publisher_id");
        let (sql, binds) = fk_select_sql("public", "book", &edge, &[]).unwrap();
        assert!(sql.contains("WHERE false"));
        assert!(binds.is_empty());
    }
}
