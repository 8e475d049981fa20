//! Typed configuration from environment variables.
//!
//! Loads once at startup, fails fast on malformed values. In local dev,
//! call `dotenvy::dotenv().ok()` before loading.

use crate::error::{Error, Result};
use std::path::PathBuf;

/// Variable holding the worker pool size.
pub const NUM_THREADS_VAR: &str = "TP_NUM_OF_THREADS";
pub const RESULTS_DIR_VAR: &str = "RESULTS_DIR";
pub const EVENT_CAPACITY_VAR: &str = "EVENT_CAPACITY";

const DEFAULT_RESULTS_DIR: &str = "results";
const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Settings the job engine needs to start.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Number of worker loops. Always at least one.
    pub num_workers: usize,
    /// Directory holding one result record per job.
    pub results_dir: PathBuf,
    /// Buffer size of the lifecycle event channel.
    pub event_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            num_workers: default_num_workers(),
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl PoolConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let num_workers = match lookup(NUM_THREADS_VAR) {
            Some(raw) => parse_positive(NUM_THREADS_VAR, &raw)?,
            None => default_num_workers(),
        };
        let event_capacity = match lookup(EVENT_CAPACITY_VAR) {
            Some(raw) => parse_positive(EVENT_CAPACITY_VAR, &raw)?,
            None => DEFAULT_EVENT_CAPACITY,
        };
        let results_dir = lookup(RESULTS_DIR_VAR)
            .filter(|dir| !dir.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_DIR));

        Ok(Self {
            num_workers,
            results_dir,
            event_capacity,
        })
    }

    pub fn with_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers.max(1);
        self
    }

    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = dir.into();
        self
    }
}

/// Process-level configuration: the pool plus logging and telemetry.
#[derive(Debug, Clone)]
pub struct Config {
    pub pool: PoolConfig,
    pub otel_endpoint: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            pool: PoolConfig::from_lookup(&lookup)?,
            otel_endpoint: lookup("OTEL_ENDPOINT"),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }
}

fn default_num_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn parse_positive(name: &str, raw: &str) -> Result<usize> {
    match raw.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(Error::Config(format!(
            "{name} must be a positive integer, got {raw:?}"
        ))),
    }
}
