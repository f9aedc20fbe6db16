//! # pgarchive-db
//!
//! PostgreSQL-backed implementation of the relational-dependency archival
//! engine: catalog discovery, dependency graph construction, the recursive
//! archival traversal, and the three Query API operations callers actually
//! use.
//!
//! ```text
//! pool / catalog -> graph_builder -> DependencyGraph -> { query_api, archiver }
//! ```

pub mod archiver;
pub mod catalog;
pub mod graph_builder;
pub mod identifier;
pub mod pool;
pub mod query_api;

pub use archiver::{archive_recursive, ArchiveRow, ArchiveSummary};
pub use catalog::PgCatalogReader;
pub use graph_builder::build_graph;
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use query_api::{QueryApi, ReferencesBundle, RowsReferences};
