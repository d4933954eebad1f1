use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::constants::{
    ENV_CONFIG, ENV_FILTER_CACHE_TTL_SECS, ENV_HOST, ENV_PORT, ENV_POSTGRES_URL,
    ENV_SESSION_SECRET,
};

#[derive(Parser)]
#[command(name = "taskdeck")]
#[command(version, about = "Task tracking server with saved filters", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Disable authentication (for development)
    #[arg(long, global = true)]
    pub no_auth: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Secret used to sign session tokens (at least 32 bytes)
    #[arg(long, global = true, env = ENV_SESSION_SECRET, hide_env_values = true)]
    pub session_secret: Option<String>,

    /// PostgreSQL connection URL
    #[arg(long, global = true, env = ENV_POSTGRES_URL, hide_env_values = true)]
    pub postgres_url: Option<String>,

    /// How long fetched filter definitions are reused, in seconds
    #[arg(long, global = true, env = ENV_FILTER_CACHE_TTL_SECS)]
    pub filter_cache_ttl: Option<u64>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the server (default command)
    Start,
    /// Print a signed session token for a user
    Token {
        /// User id to put in the token subject
        #[arg(long, short = 'u')]
        user_id: String,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub no_auth: bool,
    pub config: Option<PathBuf>,
    pub session_secret: Option<String>,
    pub postgres_url: Option<String>,
    pub filter_cache_ttl: Option<u64>,
}

impl From<Cli> for CliConfig {
    fn from(cli: Cli) -> Self {
        Self {
            host: cli.host,
            port: cli.port,
            no_auth: cli.no_auth,
            config: cli.config,
            session_secret: cli.session_secret,
            postgres_url: cli.postgres_url,
            filter_cache_ttl: cli.filter_cache_ttl,
        }
    }
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let mut cli = Cli::parse();
    let command = cli.command.take();
    (cli.into(), command)
}
