use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, builder::BoolishValueParser};

/// Command-line arguments for the TechTrend cache service.
#[derive(Debug, Parser)]
#[command(name = "techtrend", version, about = "TechTrend article cache service")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "TECHTREND_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the cache admin HTTP service.
    Serve(Box<ServeArgs>),
    /// Show how an article-list query string is normalized, classified and keyed.
    Inspect(InspectArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct InspectArgs {
    /// Query string, e.g. `page=2&search=rust%20async`.
    #[arg(value_name = "QUERY")]
    pub query: String,

    /// Pretty-print the JSON output.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    Memory,
    Redis,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the administrative listener host.
    #[arg(long = "server-admin-host", value_name = "HOST")]
    pub server_admin_host: Option<String>,

    /// Override the administrative listener port.
    #[arg(long = "server-admin-port", value_name = "PORT")]
    pub admin_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Turn caching on or off.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override the cache backend.
    #[arg(long = "cache-backend", value_name = "BACKEND", value_enum)]
    pub cache_backend: Option<BackendArg>,

    /// Override the Redis connection URL.
    #[arg(long = "cache-redis-url", value_name = "URL")]
    pub cache_redis_url: Option<String>,

    /// Override the in-memory backend capacity.
    #[arg(long = "cache-memory-capacity", value_name = "ENTRIES")]
    pub cache_memory_capacity: Option<u64>,
}
