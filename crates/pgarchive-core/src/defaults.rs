//! Centralized default constants for the archival engine.
//!
//! **This module is the single source of truth** for all shared default
//! values. All crates reference these constants instead of defining their
//! own magic numbers.

// =============================================================================
// ARCHIVER
// =============================================================================

/// Default number of rows per DELETE-RETURNING / INSERT atom.
pub const CHUNK_SIZE: i64 = 1000;

/// Default maximum recursion depth before the archiver stops descending.
pub const MAX_DEPTH: u32 = 20;

/// Default archive mirror table name suffix (`<table>_<suffix>`).
pub const ARCHIVE_SUFFIX: &str = "archive";

/// Default value for `to_archive` (mirror rows before deleting them).
pub const TO_ARCHIVE: bool = true;

/// Default value for `is_debug` (execute DELETE/INSERT for real).
pub const IS_DEBUG: bool = false;

// =============================================================================
// DATABASE
// =============================================================================

/// Default PostgreSQL port.
pub const DB_PORT: u16 = 5432;

/// Default schema searched for tables and foreign keys.
pub const DB_SCHEMA: &str = "public";

// =============================================================================
// CONNECTION POOL
// =============================================================================

/// Default maximum number of connections in the pool.
pub const POOL_MAX_CONNECTIONS: u32 = 10;

/// Default connection acquire timeout in seconds.
pub const POOL_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default idle connection timeout in seconds.
pub const POOL_IDLE_TIMEOUT_SECS: u64 = 600;

// =============================================================================
// CLI
// =============================================================================

/// Default configuration file path.
pub const CONFIG_PATH: &str = "config.ini";

/// Default log level.
pub const LOG_LEVEL: &str = "info";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archiver_defaults_are_sane() {
        const {
            assert!(CHUNK_SIZE > 0);
            assert!(MAX_DEPTH > 0);
        }
    }

    #[test]
    fn pool_timeouts_ordered() {
        const {
            assert!(POOL_CONNECT_TIMEOUT_SECS < POOL_IDLE_TIMEOUT_SECS);
        }
    }
}
