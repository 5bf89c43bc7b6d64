use crate::descriptor::TickerDescriptor;
use std::path::Path;
use tracing::{debug, error, trace};

/// Reads a `.json` file from `path`.
pub async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    trace!("reading file path: {}", path.display());
    let file = tokio::fs::read(path).await?;
    trace!("file read; deserializing bytes ...");
    let data: T = serde_json::from_slice(&file)?;
    Ok(data)
}

/// Load the ticker catalog: a JSON array of [`TickerDescriptor`] objects.
///
/// Entries are returned as-is and in file order; duplicates are left for the pool to resolve.
pub async fn load(path: impl AsRef<Path>) -> anyhow::Result<Vec<TickerDescriptor>> {
    let path = path.as_ref();
    let tickers: Vec<TickerDescriptor> = read_json(path).await.map_err(|err| {
        error!("failed to load ticker catalog {}, error({err})", path.display());
        err
    })?;
    debug!("loaded {} tickers from {}", tickers.len(), path.display());

    Ok(tickers)
}
