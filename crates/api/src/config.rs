use std::str::FromStr;
use std::time::Duration;

/// Which [`JobStore`](jobrelay_db::JobStore) implementation to run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// PostgreSQL at `DATABASE_URL`.
    Postgres,
    /// Process memory; records are lost on restart.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(StoreBackend::Postgres),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => Err(format!("unknown store backend '{other}'")),
        }
    }
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    /// `*` allows any origin.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Time allowed for in-flight jobs to finish on shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Job store implementation (default: `postgres`).
    pub store_backend: StoreBackend,
    /// Maximum number of jobs executing at once (default: `16`).
    pub max_concurrent_jobs: usize,
    /// Worker execution limit in seconds; `0` disables it (default: `300`).
    pub job_timeout_secs: u64,
    /// Capacity of the trigger queue between dispatcher and runner (default: `1024`).
    pub trigger_queue_capacity: usize,
    /// How often the reconciler scans for stale pending jobs (default: `60`).
    pub reconcile_interval_secs: u64,
    /// Age after which a pending job is re-triggered (default: `300`).
    pub stale_pending_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                   | Default    |
    /// |---------------------------|------------|
    /// | `HOST`                    | `0.0.0.0`  |
    /// | `PORT`                    | `3000`     |
    /// | `CORS_ORIGINS`            | `*`        |
    /// | `REQUEST_TIMEOUT_SECS`    | `30`       |
    /// | `SHUTDOWN_TIMEOUT_SECS`   | `30`       |
    /// | `STORE_BACKEND`           | `postgres` |
    /// | `MAX_CONCURRENT_JOBS`     | `16`       |
    /// | `JOB_TIMEOUT_SECS`        | `300`      |
    /// | `TRIGGER_QUEUE_CAPACITY`  | `1024`     |
    /// | `RECONCILE_INTERVAL_SECS` | `60`       |
    /// | `STALE_PENDING_SECS`      | `300`      |
    ///
    /// Panics on unparseable values; misconfiguration should fail at start-up.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_concurrent_jobs: usize = parse_var("MAX_CONCURRENT_JOBS", "16");
        assert!(max_concurrent_jobs > 0, "MAX_CONCURRENT_JOBS must be at least 1");

        let trigger_queue_capacity: usize = parse_var("TRIGGER_QUEUE_CAPACITY", "1024");
        assert!(
            trigger_queue_capacity > 0,
            "TRIGGER_QUEUE_CAPACITY must be at least 1"
        );

        Self {
            host,
            port: parse_var("PORT", "3000"),
            cors_origins,
            request_timeout_secs: parse_var("REQUEST_TIMEOUT_SECS", "30"),
            shutdown_timeout_secs: parse_var("SHUTDOWN_TIMEOUT_SECS", "30"),
            store_backend: parse_var("STORE_BACKEND", "postgres"),
            max_concurrent_jobs,
            job_timeout_secs: parse_var("JOB_TIMEOUT_SECS", "300"),
            trigger_queue_capacity,
            reconcile_interval_secs: parse_var("RECONCILE_INTERVAL_SECS", "60"),
            stale_pending_secs: parse_var("STALE_PENDING_SECS", "300"),
        }
    }

    /// Worker execution limit, `None` when disabled.
    pub fn job_timeout(&self) -> Option<Duration> {
        (self.job_timeout_secs > 0).then(|| Duration::from_secs(self.job_timeout_secs))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            cors_origins: vec!["*".into()],
            request_timeout_secs: 30,
            shutdown_timeout_secs: 30,
            store_backend: StoreBackend::Postgres,
            max_concurrent_jobs: 16,
            job_timeout_secs: 300,
            trigger_queue_capacity: 1024,
            reconcile_interval_secs: 60,
            stale_pending_secs: 300,
        }
    }
}

fn parse_var<T>(name: &str, default: &str) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(name).unwrap_or_else(|_| default.into());
    raw.parse()
        .unwrap_or_else(|e| panic!("{name} has an invalid value '{raw}': {e}"))
}
