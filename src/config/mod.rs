use std::env;
use std::time::Duration;

use crate::job::{DEFAULT_WORKERS, MAX_WORKERS, MIN_WORKERS};

/// Configuration for the external converters and the worker pool
#[derive(Debug, Clone)]
pub struct Config {
    pub soffice_path: String,
    pub powershell_path: String,
    pub conversion_timeout: Duration,
    pub default_workers: usize,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            soffice_path: env::var("SOFFICE_PATH").unwrap_or(defaults.soffice_path),
            powershell_path: env::var("POWERSHELL_PATH").unwrap_or(defaults.powershell_path),
            conversion_timeout: env::var("CONVERSION_TIMEOUT")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(defaults.conversion_timeout),
            default_workers: env::var("DOCBUNDLE_WORKERS")
                .ok()
                .and_then(|v| v.parse::<usize>().ok())
                .map(|n| n.clamp(MIN_WORKERS, MAX_WORKERS))
                .unwrap_or(defaults.default_workers),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            soffice_path: "soffice".to_string(),
            powershell_path: "powershell".to_string(),
            conversion_timeout: Duration::from_secs(600),
            default_workers: DEFAULT_WORKERS,
        }
    }
}
