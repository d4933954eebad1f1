//! Core application

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::ApiServer;
use crate::api::auth::{create_session_token, default_session_ttl};
use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{DEFAULT_LOG_FILTER, ENV_LOG, MIN_SESSION_SECRET_LEN};
use crate::core::shutdown::ShutdownService;
use crate::data::cache::FilterCache;
use crate::data::filters::FilterQueryCompiler;
use crate::data::{FilterStore, PostgresService};

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub database: Arc<PostgresService>,
    pub cache: Arc<FilterCache>,
    pub compiler: FilterQueryCompiler,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::Token { user_id }) => Self::print_token(&cli_config, &user_id),
            Some(Commands::Start) | None => {
                let app = Self::init(&cli_config).await?;
                Self::start_server(app).await
            }
        }
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;

        let database = Arc::new(
            PostgresService::init(&config.postgres)
                .await
                .context("Failed to initialize PostgreSQL")?,
        );

        let cache = Arc::new(FilterCache::new(
            config.filters.cache_ttl(),
            config.filters.sweep_interval(),
        ));
        let store: Arc<dyn FilterStore> = database.clone();
        let compiler = FilterQueryCompiler::new(store, cache.clone());

        tracing::debug!(
            ttl_secs = cache.ttl().as_secs(),
            sweep_secs = config.filters.sweep_interval_secs,
            "Filter cache initialized"
        );

        Ok(Self {
            shutdown: ShutdownService::new(),
            config,
            database,
            cache,
            compiler,
        })
    }

    /// Print a session token signed with the configured secret
    fn print_token(cli: &CliConfig, user_id: &str) -> Result<()> {
        let config = AppConfig::load(cli)?;
        let secret = config
            .auth
            .session_secret
            .as_deref()
            .filter(|s| s.len() >= MIN_SESSION_SECRET_LEN)
            .with_context(|| {
                format!(
                    "A session secret of at least {} bytes is required to sign tokens",
                    MIN_SESSION_SECRET_LEN
                )
            })?;

        if user_id.trim().is_empty() {
            anyhow::bail!("User id must not be empty");
        }

        let token = create_session_token(secret.as_bytes(), user_id, default_session_ttl())?;
        println!("{}", token);
        Ok(())
    }

    fn init_logging() {
        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_string());

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        app.start_background_tasks().await;

        tracing::info!(
            host = %app.config.server.host,
            port = app.config.server.port,
            auth = app.config.auth.enabled,
            "Starting taskdeck"
        );

        let server = ApiServer::new(app);
        let app = server.start().await?;

        if !app.shutdown.shutdown().await {
            tracing::warn!("Some background tasks did not stop in time");
        }
        app.database.close().await;

        Ok(())
    }

    pub async fn start_background_tasks(&self) {
        self.shutdown
            .register(self.cache.start_sweep_task(self.shutdown.subscribe()))
            .await;

        self.shutdown
            .register(
                self.database
                    .start_health_check_task(self.shutdown.subscribe()),
            )
            .await;

        tracing::debug!("Background tasks started");
    }
}
