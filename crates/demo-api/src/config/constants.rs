//! Application-wide constants
//!
//! Defaults used when the corresponding environment variable is unset.

// =============================================================================
// Server Configuration
// =============================================================================

/// Default server host address
pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";

/// Default server port
pub const DEFAULT_SERVER_PORT: u16 = 3000;

// =============================================================================
// Database
// =============================================================================

/// Default database connection URL (file-backed SQLite, created on demand)
pub const DEFAULT_DATABASE_URL: &str = "sqlite://demo-api.db?mode=rwc";

/// Default size of the connection pool
pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 10;
