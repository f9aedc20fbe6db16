//! PostgreSQL catalog discovery via `information_schema`.
//!
//! Deliberately avoids `pg_catalog` so the queries here stay stable across
//! the PostgreSQL versions this engine targets, and so the shape of what's
//! returned is documented by the SQL standard rather than by a specific
//! server's internals.

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::Row;

use pgarchive_core::error::{Error, Result};
use pgarchive_core::traits::{CatalogReader, ForeignKeyRow, TableInfo};

/// Reads tables and foreign keys out of a live PostgreSQL connection pool.
pub struct PgCatalogReader {
    pool: PgPool,
}

impl PgCatalogReader {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogReader for PgCatalogReader {
    async fn tables(&self, schema: &str) -> Result<Vec<TableInfo>> {
        let table_rows = sqlx::query(
            r#"
            SELECT table_name
            FROM information_schema.tables
            WHERE table_schema = $1 AND table_type = 'BASE TABLE'
            ORDER BY table_name
            "#,
        )
        .bind(schema)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::CatalogUnavailable(format!("listing tables in `{schema}`: {e}")))?;

        let pk_rows = sqlx::query(
            r#"
            SELECT tc.table_name, kcu.column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.constraint_schema = kcu.constraint_schema
            WHERE tc.constraint_type = 'PRIMARY KEY' AND tc.table_schema = $1
            ORDER BY tc.table_name, kcu.ordinal_position
            "#,
        )
        .bind(schema)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::CatalogUnavailable(format!("reading primary keys for `{schema}`: {e}"))
        })?;

        let mut tables: Vec<TableInfo> = table_rows
            .iter()
            .map(|row| TableInfo {
                name: row.get("table_name"),
                primary_key_columns: Vec::new(),
            })
            .collect();

        for pk_row in &pk_rows {
            let table_name: String = pk_row.get("table_name");
            let column_name: String = pk_row.get("column_name");
            if let Some(table) = tables.iter_mut().find(|t| t.name == table_name) {
                table.primary_key_columns.push(column_name);
            }
        }

        Ok(tables)
    }

    async fn foreign_keys(&self, schema: &str) -> Result<Vec<ForeignKeyRow>> {
        let rows = sqlx::query(
            r#"
            SELECT
                tc.constraint_name,
                tc.table_name AS child_table,
                kcu.column_name AS child_column,
                kcu.ordinal_position,
                ccu.table_name AS parent_table,
                ccu.column_name AS parent_column
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.constraint_schema = kcu.constraint_schema
            JOIN information_schema.constraint_column_usage ccu
                ON tc.constraint_name = ccu.constraint_name
                AND tc.constraint_schema = ccu.constraint_schema
            WHERE tc.constraint_type = 'FOREIGN KEY' AND tc.table_schema = $1
            ORDER BY tc.constraint_name, kcu.ordinal_position
            "#,
        )
        .bind(schema)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            Error::CatalogUnavailable(format!("reading foreign keys for `{schema}`: {e}"))
        })?;

        let mut result: Vec<ForeignKeyRow> = Vec::new();
        for row in &rows {
            let constraint_name: String = row.get("constraint_name");
            let child_table: String = row.get("child_table");
            let child_column: String = row.get("child_column");
            let parent_table: String = row.get("parent_table");
            let parent_column: String = row.get("parent_column");

            if let Some(existing) = result
                .iter_mut()
                .find(|fk| fk.constraint_name == constraint_name)
            {
                existing.child_columns.push(child_column);
                existing.parent_columns.push(parent_column);
            } else {
                result.push(ForeignKeyRow {
                    constraint_name,
                    child_table,
                    child_columns: vec![child_column],
                    parent_table,
                    parent_columns: vec![parent_column],
                });
            }
        }

        Ok(result)
    }
}
