//! Scrape IBKR contract information pages for a catalog of tickers.
//!
//! 1. [`catalog`] loads the tickers;
//! 2. [`pool`] fetches ([`fetch`]) and parses ([`extract`]) every page with a two-tier worker
//!    pool, merging the results into a [`store::ResultStore`];
//! 3. [`transform`] maps the merged records onto output columns;
//! 4. [`persist`] writes the table to PostgreSQL.

pub mod catalog;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod persist;
pub mod pool;
pub mod store;
pub mod transform;

mod sql;
mod tui;

pub use descriptor::{Record, TickerDescriptor};
pub use error::{FetchError, PoolError, TaskError};
pub use extract::{ContractPage, Extract, Fields};
pub use fetch::{Fetch, HttpFetcher};
pub use pool::{Pool, PoolConfig, Scraped};
pub use store::ResultStore;

/// Shortcut for required API elements.
pub mod http {
    pub use reqwest::Client as HttpClient;
    pub use tokio_postgres::Client as PgClient;
}

pub(crate) fn time_elapsed(time: std::time::Instant) -> String {
    format!(
        "\x1b[38;5;208melapsed time: {} ms\x1b[0m",
        time.elapsed().as_millis()
    )
}
