//! Runtime configuration for one pipeline process.

use std::net::SocketAddr;
use std::time::Duration;

use actors::{ProcessingProfile, WorkerSettings};
use db::DbConfig;
use pipeline_core::TypeAllowlist;

/// Which services a process runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Role {
    /// Every service in one process, sharing an in-process store and queue.
    #[default]
    All,
    Registry,
    Scheduler,
    Receptionist,
    Handler,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::All => "all",
            Role::Registry => "registry",
            Role::Scheduler => "scheduler",
            Role::Receptionist => "receptionist",
            Role::Handler => "handler",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Role::All),
            "registry" => Ok(Role::Registry),
            "scheduler" => Ok(Role::Scheduler),
            "receptionist" => Ok(Role::Receptionist),
            "handler" => Ok(Role::Handler),
            other => Err(format!(
                "unknown role '{}', expected one of: all, registry, scheduler, receptionist, handler",
                other
            )),
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub role: Role,
    /// Address the HTTP server listens on.
    pub bind: SocketAddr,
    /// Registry base URL, used when the registry runs in another process.
    pub registry_url: String,
    /// Scheduler base URL, used when the scheduler runs in another process.
    pub scheduler_url: String,
    pub db: DbConfig,
    /// Number of handler workers.
    pub workers: usize,
    pub worker: WorkerSettings,
    /// Multiplier applied to every simulated duration.
    pub duration_scale: f64,
    pub result_base_url: String,
    /// Timeout for calls to other services.
    pub request_timeout: Duration,
    pub allowlist: TypeAllowlist,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            role: Role::All,
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            registry_url: "http://127.0.0.1:3001".to_string(),
            scheduler_url: "http://127.0.0.1:3002".to_string(),
            db: DbConfig::memory(),
            workers: 1,
            worker: WorkerSettings::default(),
            duration_scale: 1.0,
            result_base_url: "https://example.com/results".to_string(),
            request_timeout: Duration::from_secs(5),
            allowlist: TypeAllowlist::default(),
        }
    }
}

impl PipelineConfig {
    /// Standard durations scaled by `duration_scale`.
    pub fn processing_profile(&self) -> ProcessingProfile {
        ProcessingProfile::standard().scaled(self.duration_scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline_core::{Direction, JobType};

    #[test]
    fn roles_parse_from_names() {
        for role in [
            Role::All,
            Role::Registry,
            Role::Scheduler,
            Role::Receptionist,
            Role::Handler,
        ] {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("gateway".parse::<Role>().is_err());
    }

    #[test]
    fn defaults_match_the_documented_knobs() {
        let config = PipelineConfig::default();
        assert_eq!(config.bind.port(), 3000);
        assert_eq!(config.workers, 1);
        assert_eq!(config.worker.poll_interval, Duration::from_secs(5));
        assert_eq!(config.worker.startup_delay, Duration::from_secs(2));
        assert!(config.worker.job_timeout.is_none());
    }

    #[test]
    fn duration_scale_shrinks_the_profile() {
        let config = PipelineConfig {
            duration_scale: 0.1,
            ..Default::default()
        };
        let profile = config.processing_profile();
        assert_eq!(
            profile.duration_for(Direction::Export, JobType::Epub).unwrap(),
            Duration::from_secs(1)
        );
    }
}
