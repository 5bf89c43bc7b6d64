use crate::error::ConfigError;
use crate::pool::{PoolConfig, DEFAULT_THREADS};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_TICKERS_PATH: &str = "./tickers.json";
pub const DEFAULT_OUTPUT_TABLE: &str = "ext4_tickers";

/// Run settings, read from the environment (and `.env`).
///
/// | variable          | default               |
/// |-------------------|-----------------------|
/// | `THREAD_COUNT`    | 8                     |
/// | `PROCESS_COUNT`   | number of CPUs        |
/// | `TICKERS_PATH`    | `./tickers.json`      |
/// | `OUTPUT_TABLE`    | `ext4_tickers`        |
/// | `DATABASE_URL`    | none                  |
/// | `USER_AGENT`      | reqwest's default     |
/// | `REQUEST_TIMEOUT` | none (seconds, 0 = none) |
#[derive(Clone, Debug, PartialEq)]
pub struct Config {
    pub pool: PoolConfig,
    pub tickers_path: PathBuf,
    pub output_table: String,
    pub database_url: Option<String>,
    pub user_agent: Option<String>,
    pub request_timeout: Option<Duration>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|var| dotenv::var(var).ok())
    }

    /// Build from any variable source; empty values count as unset.
    pub fn from_lookup<L>(lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&'static str) -> Option<String>,
    {
        let get = |var| lookup(var).filter(|value| !value.trim().is_empty());
        let number = |var: &'static str| -> Result<Option<u64>, ConfigError> {
            get(var)
                .map(|value| {
                    value
                        .trim()
                        .parse::<u64>()
                        .map_err(|source| ConfigError::Invalid { var, value, source })
                })
                .transpose()
        };

        let inner = number("THREAD_COUNT")?.map_or(DEFAULT_THREADS, |n| n as usize);
        let outer = number("PROCESS_COUNT")?.map_or_else(num_cpus::get, |n| n as usize);

        Ok(Self {
            pool: PoolConfig::new(outer, inner),
            tickers_path: get("TICKERS_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_TICKERS_PATH), PathBuf::from),
            output_table: get("OUTPUT_TABLE").unwrap_or_else(|| DEFAULT_OUTPUT_TABLE.to_string()),
            database_url: get("DATABASE_URL"),
            user_agent: get("USER_AGENT"),
            // 0 would time every request out at once
            request_timeout: number("REQUEST_TIMEOUT")?
                .filter(|&secs| secs > 0)
                .map(Duration::from_secs),
        })
    }
}
