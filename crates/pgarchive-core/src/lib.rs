//! # pgarchive-core
//!
//! Core types, traits, and abstractions for the PostgreSQL archival engine.
//!
//! This crate provides the foundational data structures and trait
//! definitions that `pgarchive-db` and `pgarchive-cli` depend on: the
//! dependency graph, configuration, error types, and the catalog reader
//! seam.

pub mod config;
pub mod defaults;
pub mod error;
pub mod graph;
pub mod logging;
pub mod traits;

// Re-export commonly used types at crate root
pub use config::{ArchiveSuffix, ArchiverConfig, Config, DBConfig};
pub use error::{Error, Result};
pub use graph::{ChildEdge, CycleMarker, DependencyGraph, DiagnosticNode, ForeignKeyEdge};
pub use traits::{CatalogReader, ForeignKeyRow, TableInfo};
