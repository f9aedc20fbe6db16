//! Structured logging schema and field name constants for the archival engine.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized field names across
//! every subsystem (catalog, graph, archiver, query API, CLI).
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Operation aborted, requires operator attention |
//! | WARN  | Recoverable issue (depth exceeded, pool exhaustion) |
//! | INFO  | Lifecycle events (pool established, archive start/end) |
//! | DEBUG | Decision points, per-edge traversal, generated SQL shape |
//! | TRACE | Per-row/per-chunk iteration |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "catalog", "graph", "archiver", "api", "db", "cli".
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pool", "catalog_reader", "graph_builder", "archiver".
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "archive_recursive", "delete_by_fk", "build_graph".
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Table name being operated on.
pub const TABLE: &str = "table";

/// Child table name in a descendant-pass operation.
pub const CHILD_TABLE: &str = "child_table";

/// Current recursion depth.
pub const DEPTH: &str = "depth";

/// Configured maximum recursion depth.
pub const MAX_DEPTH: &str = "max_depth";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of rows flowing through an operation.
pub const ROWS_COUNT: &str = "rows_count";

/// Configured chunk size.
pub const CHUNK_SIZE: &str = "chunk_size";

// ─── Database fields ───────────────────────────────────────────────────────

/// Number of active connections in the pool.
pub const POOL_SIZE: &str = "pool_size";

/// Number of idle connections in the pool.
pub const POOL_IDLE: &str = "pool_idle";

/// Schema name in use.
pub const SCHEMA: &str = "schema";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Boolean success/failure indicator.
pub const SUCCESS: &str = "success";

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
