//! Command line and environment configuration.

use std::net::SocketAddr;
use std::num::NonZeroUsize;
use std::time::Duration;

use actors::WorkerSettings;
use api::{PipelineConfig, Role};
use clap::Parser;
use db::DbConfig;
use pipeline_core::{JobType, TypeAllowlist};

#[derive(Parser, Debug)]
#[command(name = "pipeline")]
#[command(version)]
#[command(about = "Export/import job pipeline services")]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Run one or all pipeline services
    Serve(ServeArgs),
}

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Services to run: all, registry, scheduler, receptionist or handler
    #[arg(long, default_value = "all", env = "PIPELINE_ROLE")]
    pub role: Role,

    /// Address the HTTP server listens on
    #[arg(long, default_value = "127.0.0.1:3000", env = "PIPELINE_BIND")]
    pub bind: SocketAddr,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "info", env = "PIPELINE_LOG_LEVEL")]
    pub log_level: String,

    // === Remote services ===
    /// Registry base URL for the receptionist and handler roles
    #[arg(long, default_value = "http://127.0.0.1:3001", env = "PIPELINE_REGISTRY_URL")]
    pub registry_url: String,

    /// Scheduler base URL for the receptionist and handler roles
    #[arg(long, default_value = "http://127.0.0.1:3002", env = "PIPELINE_SCHEDULER_URL")]
    pub scheduler_url: String,

    /// Timeout for calls to other services, in milliseconds
    #[arg(long, default_value = "5000", env = "PIPELINE_REQUEST_TIMEOUT_MS")]
    pub request_timeout_ms: u64,

    // === Storage ===
    /// SurrealDB endpoint for the registry ("mem://", "rocksdb://path")
    #[arg(long, default_value = "mem://", env = "PIPELINE_DB_ENDPOINT")]
    pub db_endpoint: String,

    /// SurrealDB namespace
    #[arg(long, default_value = "pipeline", env = "PIPELINE_DB_NAMESPACE")]
    pub db_namespace: String,

    /// SurrealDB database name
    #[arg(long, default_value = "registry", env = "PIPELINE_DB_DATABASE")]
    pub db_database: String,

    /// Root user for remote SurrealDB endpoints
    #[arg(long, env = "PIPELINE_DB_USER", requires = "db_pass")]
    pub db_user: Option<String>,

    /// Root password for remote SurrealDB endpoints
    #[arg(long, env = "PIPELINE_DB_PASS", requires = "db_user", hide_env_values = true)]
    pub db_pass: Option<String>,

    // === Workers ===
    /// Number of handler workers
    #[arg(long, default_value = "1", env = "PIPELINE_WORKERS")]
    pub workers: NonZeroUsize,

    /// Wait between polls of an empty queue, in milliseconds
    #[arg(long, default_value = "5000", env = "PIPELINE_POLL_INTERVAL_MS")]
    pub poll_interval_ms: u64,

    /// Wait before re-polling while a worker is busy, in milliseconds
    #[arg(long, default_value = "1000", env = "PIPELINE_BUSY_BACKOFF_MS")]
    pub busy_backoff_ms: u64,

    /// Delay before a worker's first poll, in milliseconds
    #[arg(long, default_value = "2000", env = "PIPELINE_STARTUP_DELAY_MS")]
    pub startup_delay_ms: u64,

    /// Fail jobs that run longer than this many seconds
    #[arg(long, env = "PIPELINE_JOB_TIMEOUT_SECS")]
    pub job_timeout_secs: Option<u64>,

    /// Multiplier applied to every simulated processing duration
    #[arg(long, default_value = "1.0", env = "PIPELINE_DURATION_SCALE", value_parser = parse_scale)]
    pub duration_scale: f64,

    /// Base URL of produced result locations
    #[arg(long, default_value = "https://example.com/results", env = "PIPELINE_RESULT_BASE_URL")]
    pub result_base_url: String,

    // === Submission ===
    /// Accepted export types, comma separated (default: epub,pdf)
    #[arg(long, env = "PIPELINE_EXPORT_TYPES", value_delimiter = ',')]
    pub export_types: Vec<JobType>,

    /// Accepted import types, comma separated (default: word,pdf,wattpad,evernote)
    #[arg(long, env = "PIPELINE_IMPORT_TYPES", value_delimiter = ',')]
    pub import_types: Vec<JobType>,
}

/// Largest accepted `--duration-scale`.
const MAX_DURATION_SCALE: f64 = 1000.0;

fn parse_scale(raw: &str) -> Result<f64, String> {
    let scale: f64 = raw
        .parse()
        .map_err(|_| format!("'{}' is not a number", raw))?;
    if scale.is_finite() && scale > 0.0 && scale <= MAX_DURATION_SCALE {
        Ok(scale)
    } else {
        Err(format!(
            "duration scale must be greater than 0 and at most {}",
            MAX_DURATION_SCALE
        ))
    }
}

impl ServeArgs {
    pub fn into_config(self) -> PipelineConfig {
        let mut allowlist = TypeAllowlist::default();
        if !self.export_types.is_empty() {
            allowlist.export = self.export_types;
        }
        if !self.import_types.is_empty() {
            allowlist.import = self.import_types;
        }

        let mut db = DbConfig::endpoint(self.db_endpoint)
            .with_namespace(self.db_namespace)
            .with_database(self.db_database);
        if let (Some(user), Some(pass)) = (self.db_user, self.db_pass) {
            db = db.with_credentials(user, pass);
        }

        PipelineConfig {
            role: self.role,
            bind: self.bind,
            registry_url: self.registry_url,
            scheduler_url: self.scheduler_url,
            db,
            workers: self.workers.get(),
            worker: WorkerSettings {
                poll_interval: Duration::from_millis(self.poll_interval_ms),
                busy_backoff: Duration::from_millis(self.busy_backoff_ms),
                startup_delay: Duration::from_millis(self.startup_delay_ms),
                job_timeout: self.job_timeout_secs.map(Duration::from_secs),
            },
            duration_scale: self.duration_scale,
            result_base_url: self.result_base_url,
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            allowlist,
        }
    }
}
