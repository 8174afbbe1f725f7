//! Process configuration read from environment variables.
//!
//! Every variable is optional. A variable that is set but cannot be parsed
//! fails startup instead of silently falling back to the default.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use filequeue_infra::jobs::WorkerPoolConfig;
use filequeue_observability::LogFormat;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid value {value:?} for {var}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: IpAddr,
    pub port: u16,
    pub workers: usize,
    pub poll_interval: Duration,
    pub processing_delay: Duration,
    pub job_timeout: Option<Duration>,
    pub max_upload_bytes: Option<u64>,
    pub bcrypt_cost: u32,
    pub default_locale: String,
    pub locales_dir: Option<PathBuf>,
    pub database_url: Option<String>,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            workers: 2,
            poll_interval: Duration::from_millis(500),
            processing_delay: Duration::from_millis(2000),
            job_timeout: None,
            max_upload_bytes: None,
            bcrypt_cost: 10,
            default_locale: "en".to_string(),
            locales_dir: None,
            database_url: None,
            log_format: LogFormat::Json,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let workers = parse_or(&get, "WORKER_COUNT", defaults.workers)?;
        if workers == 0 {
            return Err(ConfigError {
                var: "WORKER_COUNT",
                value: "0".to_string(),
                reason: "at least one worker is required".to_string(),
            });
        }

        let job_timeout = parse_opt::<u64>(&get, "JOB_TIMEOUT_MS")?;
        if job_timeout == Some(0) {
            return Err(ConfigError {
                var: "JOB_TIMEOUT_MS",
                value: "0".to_string(),
                reason: "timeout must be positive; leave unset to disable".to_string(),
            });
        }

        Ok(Self {
            bind_addr: parse_or(&get, "BIND_ADDR", defaults.bind_addr)?,
            port: parse_or(&get, "PORT", defaults.port)?,
            workers,
            poll_interval: millis_or(&get, "QUEUE_POLL_INTERVAL_MS", defaults.poll_interval)?,
            processing_delay: millis_or(&get, "JOB_PROCESSING_DELAY_MS", defaults.processing_delay)?,
            job_timeout: job_timeout.map(Duration::from_millis),
            max_upload_bytes: parse_opt(&get, "MAX_UPLOAD_BYTES")?,
            bcrypt_cost: parse_or(&get, "BCRYPT_COST", defaults.bcrypt_cost)?,
            default_locale: get("DEFAULT_LOCALE")
                .map(|v| v.trim().to_ascii_lowercase())
                .unwrap_or(defaults.default_locale),
            locales_dir: get("LOCALES_DIR").map(PathBuf::from),
            database_url: get("DATABASE_URL"),
            log_format: parse_or(&get, "LOG_FORMAT", defaults.log_format)?,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }

    pub fn worker_pool(&self) -> WorkerPoolConfig {
        let config = WorkerPoolConfig::default()
            .with_workers(self.workers)
            .with_poll_interval(self.poll_interval);
        match self.job_timeout {
            Some(timeout) => config.with_job_timeout(timeout),
            None => config,
        }
    }
}

fn parse_opt<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(var)
        .map(|value| {
            value.trim().parse::<T>().map_err(|e| ConfigError {
                var,
                reason: e.to_string(),
                value,
            })
        })
        .transpose()
}

fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(parse_opt(get, var)?.unwrap_or(default))
}

fn millis_or(
    get: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: Duration,
) -> Result<Duration, ConfigError> {
    Ok(parse_opt::<u64>(get, var)?
        .map(Duration::from_millis)
        .unwrap_or(default))
}
