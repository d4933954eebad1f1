use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use super::cli::CliConfig;
use super::constants::{
    APP_NAME_LOWER, CONFIG_FILE_NAME, DEFAULT_FILTER_CACHE_SWEEP_SECS,
    DEFAULT_FILTER_CACHE_TTL_SECS, DEFAULT_HOST, DEFAULT_PORT, MIN_SESSION_SECRET_LEN,
    POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS, POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS,
    POSTGRES_DEFAULT_MAX_CONNECTIONS, POSTGRES_DEFAULT_MAX_LIFETIME_SECS,
    POSTGRES_DEFAULT_MIN_CONNECTIONS, POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS,
};

// =============================================================================
// File Config Structs (from JSON)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Authentication configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct AuthFileConfig {
    pub enabled: Option<bool>,
    pub session_secret: Option<String>,
}

/// PostgreSQL configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PostgresFileConfig {
    /// PostgreSQL connection URL (or use TASKDECK_POSTGRES_URL env var)
    pub url: Option<String>,
    /// Maximum number of connections in the pool (default: 20)
    pub max_connections: Option<u32>,
    /// Minimum number of connections to keep warm (default: 2)
    pub min_connections: Option<u32>,
    /// Connection acquire timeout in seconds (default: 30)
    pub acquire_timeout_secs: Option<u64>,
    /// Idle connection timeout in seconds (default: 600)
    pub idle_timeout_secs: Option<u64>,
    /// Max connection lifetime in seconds (default: 1800)
    pub max_lifetime_secs: Option<u64>,
    /// Statement timeout in seconds, 0 to disable (default: 60)
    pub statement_timeout_secs: Option<u64>,
}

/// Database configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct DatabaseFileConfig {
    pub postgres: Option<PostgresFileConfig>,
}

/// Filter cache configuration section (from JSON config file)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct FiltersFileConfig {
    /// How long fetched definitions stay valid (default: 300)
    pub cache_ttl_secs: Option<u64>,
    /// How often expired entries are reclaimed (default: 600)
    pub sweep_interval_secs: Option<u64>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub auth: Option<AuthFileConfig>,
    pub database: Option<DatabaseFileConfig>,
    pub filters: Option<FiltersFileConfig>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        // Server
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            if server.host.is_some() {
                current.host = server.host;
            }
            if server.port.is_some() {
                current.port = server.port;
            }
        }

        // Auth
        if let Some(auth) = other.auth {
            let current = self.auth.get_or_insert_with(AuthFileConfig::default);
            if auth.enabled.is_some() {
                current.enabled = auth.enabled;
            }
            if auth.session_secret.is_some() {
                current.session_secret = auth.session_secret;
            }
        }

        // Database
        if let Some(database) = other.database
            && let Some(pg) = database.postgres
        {
            let current = self
                .database
                .get_or_insert_with(DatabaseFileConfig::default)
                .postgres
                .get_or_insert_with(PostgresFileConfig::default);
            if pg.url.is_some() {
                current.url = pg.url;
            }
            if pg.max_connections.is_some() {
                current.max_connections = pg.max_connections;
            }
            if pg.min_connections.is_some() {
                current.min_connections = pg.min_connections;
            }
            if pg.acquire_timeout_secs.is_some() {
                current.acquire_timeout_secs = pg.acquire_timeout_secs;
            }
            if pg.idle_timeout_secs.is_some() {
                current.idle_timeout_secs = pg.idle_timeout_secs;
            }
            if pg.max_lifetime_secs.is_some() {
                current.max_lifetime_secs = pg.max_lifetime_secs;
            }
            if pg.statement_timeout_secs.is_some() {
                current.statement_timeout_secs = pg.statement_timeout_secs;
            }
        }

        // Filters
        if let Some(filters) = other.filters {
            let current = self.filters.get_or_insert_with(FiltersFileConfig::default);
            if filters.cache_ttl_secs.is_some() {
                current.cache_ttl_secs = filters.cache_ttl_secs;
            }
            if filters.sweep_interval_secs.is_some() {
                current.sweep_interval_secs = filters.sweep_interval_secs;
            }
        }
    }
}

// =============================================================================
// Runtime Config Structs (final merged configuration)
// =============================================================================

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Authentication configuration
#[derive(Clone)]
pub struct AuthConfig {
    pub enabled: bool,
    /// JWT signing secret; required when auth is enabled
    pub session_secret: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("enabled", &self.enabled)
            .field(
                "session_secret",
                &self.session_secret.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// PostgreSQL configuration (final/runtime)
#[derive(Debug, Clone, Default)]
pub struct PostgresConfig {
    /// PostgreSQL connection URL
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Minimum number of connections to keep warm
    pub min_connections: u32,
    /// Connection acquire timeout in seconds
    pub acquire_timeout_secs: u64,
    /// Idle connection timeout in seconds
    pub idle_timeout_secs: u64,
    /// Max connection lifetime in seconds
    pub max_lifetime_secs: u64,
    /// Statement timeout in seconds (0 = disabled)
    pub statement_timeout_secs: u64,
}

/// Filter cache configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiltersConfig {
    pub cache_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

impl FiltersConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Final merged application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub postgres: PostgresConfig,
    pub filters: FiltersConfig,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.taskdeck/taskdeck.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        let overlay_path = if let Some(ref path) = cli.config {
            if !path.exists() {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            Some(path.clone())
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        let config = Self::resolve(cli, file_config);
        config.validate()?;
        Ok(config)
    }

    /// Layer defaults, file values and CLI/env overrides
    fn resolve(cli: &CliConfig, file_config: FileConfig) -> Self {
        let file_server = file_config.server.unwrap_or_default();
        let file_auth = file_config.auth.unwrap_or_default();
        let file_pg = file_config
            .database
            .unwrap_or_default()
            .postgres
            .unwrap_or_default();
        let file_filters = file_config.filters.unwrap_or_default();

        let host = cli
            .host
            .clone()
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT);

        // auth.enabled: file config sets default, --no-auth CLI flag disables
        let auth_enabled = if cli.no_auth {
            false
        } else {
            file_auth.enabled.unwrap_or(true)
        };

        let postgres = PostgresConfig {
            url: cli.postgres_url.clone().or(file_pg.url).unwrap_or_default(),
            max_connections: file_pg
                .max_connections
                .unwrap_or(POSTGRES_DEFAULT_MAX_CONNECTIONS),
            min_connections: file_pg
                .min_connections
                .unwrap_or(POSTGRES_DEFAULT_MIN_CONNECTIONS),
            acquire_timeout_secs: file_pg
                .acquire_timeout_secs
                .unwrap_or(POSTGRES_DEFAULT_ACQUIRE_TIMEOUT_SECS),
            idle_timeout_secs: file_pg
                .idle_timeout_secs
                .unwrap_or(POSTGRES_DEFAULT_IDLE_TIMEOUT_SECS),
            max_lifetime_secs: file_pg
                .max_lifetime_secs
                .unwrap_or(POSTGRES_DEFAULT_MAX_LIFETIME_SECS),
            statement_timeout_secs: file_pg
                .statement_timeout_secs
                .unwrap_or(POSTGRES_DEFAULT_STATEMENT_TIMEOUT_SECS),
        };

        let cache_ttl_secs = cli
            .filter_cache_ttl
            .or(file_filters.cache_ttl_secs)
            .unwrap_or(DEFAULT_FILTER_CACHE_TTL_SECS);
        let mut sweep_interval_secs = file_filters
            .sweep_interval_secs
            .unwrap_or(DEFAULT_FILTER_CACHE_SWEEP_SECS);
        // The sweep only reclaims memory; it must not run more often than entries expire
        if sweep_interval_secs <= cache_ttl_secs {
            let raised = cache_ttl_secs.saturating_mul(2);
            tracing::warn!(
                sweep_interval_secs,
                cache_ttl_secs,
                raised,
                "filters.sweep_interval_secs must exceed the cache TTL; raising it"
            );
            sweep_interval_secs = raised;
        }

        Self {
            server: ServerConfig { host, port },
            auth: AuthConfig {
                enabled: auth_enabled,
                session_secret: cli.session_secret.clone().or(file_auth.session_secret),
            },
            postgres,
            filters: FiltersConfig {
                cache_ttl_secs,
                sweep_interval_secs,
            },
        }
    }

    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }

        // Port must be non-zero (port 0 would cause bind failure)
        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be greater than 0");
        }

        if self.filters.cache_ttl_secs == 0 {
            anyhow::bail!("Configuration error: filters.cache_ttl_secs must be greater than 0");
        }

        if self.auth.enabled {
            match &self.auth.session_secret {
                None => anyhow::bail!(
                    "Configuration error: auth.session_secret is required when auth is enabled \
                     (or start with --no-auth)"
                ),
                Some(secret) if secret.len() < MIN_SESSION_SECRET_LEN => anyhow::bail!(
                    "Configuration error: auth.session_secret must be at least {} bytes",
                    MIN_SESSION_SECRET_LEN
                ),
                Some(_) => {}
            }
        }

        Ok(())
    }
}

/// Get the profile config path (~/.taskdeck/taskdeck.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(format!(".{}", APP_NAME_LOWER)).join(CONFIG_FILE_NAME))
}
