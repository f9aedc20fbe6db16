//! Catalog discovery interface.
//!
//! Defines the seam between the graph builder (which only needs table and
//! foreign-key shape) and whatever reads that shape out of PostgreSQL. The
//! concrete implementation lives in `pgarchive-db`, wired against
//! `information_schema`.

use async_trait::async_trait;

use crate::error::Result;

/// A table discovered in the target schema, along with its primary key
/// column list in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub name: String,
    pub primary_key_columns: Vec<String>,
}

/// A single foreign-key constraint from a child (referencing) table to a
/// parent (referenced) table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRow {
    pub constraint_name: String,
    pub child_table: String,
    pub child_columns: Vec<String>,
    pub parent_table: String,
    pub parent_columns: Vec<String>,
}

/// Reads the tables and foreign keys of a schema from the catalog.
///
/// Implementations are expected to query `information_schema` views rather
/// than `pg_catalog` directly, so behavior stays stable across the
/// PostgreSQL versions this engine targets.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    /// All tables in `schema`, with their primary key columns.
    async fn tables(&self, schema: &str) -> Result<Vec<TableInfo>>;

    /// All foreign-key constraints among tables in `schema`.
    async fn foreign_keys(&self, schema: &str) -> Result<Vec<ForeignKeyRow>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_info_holds_declaration_order() {
        let info = TableInfo {
            name: "book".to_string(),
            primary_key_columns: vec!["id".to_string()],
        };
        assert_eq!(info.primary_key_columns, vec!["id".to_string()]);
    }

    #[test]
    fn foreign_key_row_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ForeignKeyRow>();
    }
}
