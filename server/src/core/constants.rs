// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display)
pub const APP_NAME: &str = "Taskdeck";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "taskdeck";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "taskdeck.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "TASKDECK_CONFIG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "TASKDECK_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "TASKDECK_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "TASKDECK_LOG";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 5390;

/// Default log filter when neither TASKDECK_LOG nor RUST_LOG is set
pub const DEFAULT_LOG_FILTER: &str = "info,taskdeck=info,taskdeck_server=info";

/// API path prefix
pub const API_PREFIX: &str = "/api/v1";

/// Request body limit for API routes (1 MiB)
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

// =============================================================================
// Authentication
// =============================================================================

/// Environment variable for the JWT signing secret
pub const ENV_SESSION_SECRET: &str = "TASKDECK_SESSION_SECRET";

/// Minimum length of the JWT signing secret in bytes
pub const MIN_SESSION_SECRET_LEN: usize = 32;

/// Session cookie name
pub const SESSION_COOKIE_NAME: &str = "taskdeck_session";

/// Session token lifetime
pub const DEFAULT_SESSION_TTL_DAYS: u32 = 30;

/// User id injected when authentication is disabled
pub const LOCAL_DEFAULT_USER_ID: &str = "local";

// =============================================================================
// PostgreSQL
// =============================================================================

/// Environment variable for the PostgreSQL connection URL
pub const ENV_POSTGRES_URL: &str = "TASKDECK_POSTGRES_URL";

/// Default maximum pool size
pub const POSTGRES_DEFAULT_MAX_CONNECTIONS: u32 = 20;

/// Default number of warm connections
pub const POSTGRES_DEFAULT_MIN_CONNECTIONS: u32 = 2;

/// Default connection acquire timeout
pub const POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Default idle connection timeout
pub const POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS: u64 = 600;

/// Default max connection lifetime
pub const POSTGRES_DEFAULT_MAX_LIFETIME_SECS: u64 = 1800;

/// Default statement timeout (0 disables)
pub const POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS: u64 = 60;

/// Interval between pool health checks
pub const POSTGRES_HEALTH_CHECK_INTERVAL_SECS: u64 = 60;

// =============================================================================
// Filter Cache
// =============================================================================

/// Environment variable for the filter cache TTL
pub const ENV_FILTER_CACHE_TTL_SECS: &str = "TASKDECK_FILTER_CACHE_TTL_SECS";

/// Filter definitions are reused for this long after a fetch
pub const DEFAULT_FILTER_CACHE_TTL_SECS: u64 = 300;

/// Expired filter cache entries are reclaimed at this interval
pub const DEFAULT_FILTER_CACHE_SWEEP_SECS: u64 = 600;

// =============================================================================
// Task Listing
// =============================================================================

/// Default page size for task listing
pub const DEFAULT_TASK_PAGE_LIMIT: u32 = 50;

/// Largest page size a client may request
pub const MAX_TASK_PAGE_LIMIT: u32 = 500;

/// Most saved filters a single listing request may enable
pub const MAX_FILTER_IDS_PER_REQUEST: usize = 50;

/// Most conditions a single filter may carry
pub const MAX_CONDITIONS_PER_FILTER: usize = 50;

// =============================================================================
// Shutdown
// =============================================================================

/// Grace period for background tasks after the server stops
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 10;
