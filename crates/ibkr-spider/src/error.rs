use reqwest::StatusCode;
use thiserror::Error;

/// A failed GET of a contract page.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("GET {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET {url} returned {status}")]
    Status { url: String, status: StatusCode },
}

/// Page content that could not be turned into fields.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("malformed page: {0}")]
    Malformed(String),
}

/// Why a single ticker is missing from the results. Never fatal to the run.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("unable to fetch data for {key}: {source}")]
    Fetch {
        key: String,
        #[source]
        source: FetchError,
    },

    #[error("unable to parse data for {key}: {source}")]
    Parse {
        key: String,
        #[source]
        source: ExtractError,
    },
}

impl TaskError {
    /// Dedup key of the ticker that failed.
    pub fn key(&self) -> &str {
        match self {
            TaskError::Fetch { key, .. } | TaskError::Parse { key, .. } => key,
        }
    }
}

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("{worker} did not run to completion: {source}")]
    Join {
        worker: String,
        #[source]
        source: tokio::task::JoinError,
    },

    #[error("failed to build progress bars: {0}")]
    Progress(#[from] indicatif::style::TemplateError),
}

/// Failure to write the transformed table.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("invalid table name \"{0}\"")]
    InvalidTable(String),

    #[error("column {column} has unsupported type {ty}")]
    ColumnType { column: String, ty: String },

    #[error(transparent)]
    Postgres(#[from] tokio_postgres::Error),
}

/// An environment variable that is present, but unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {var} \"{value}\": must be a valid integer")]
    Invalid {
        var: &'static str,
        value: String,
        #[source]
        source: std::num::ParseIntError,
    },
}
