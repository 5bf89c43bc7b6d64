use crate::error::FetchError;
use crate::http::HttpClient;
use std::future::Future;
use std::time::Duration;
use tracing::trace;

/// Retrieves the raw content behind a URL.
pub trait Fetch: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// [`Fetch`] over HTTP; any non-2xx status is a failure.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: HttpClient,
}

impl HttpFetcher {
    /// Build the underlying [`reqwest`] client, with an optional user agent and per-request
    /// timeout. There is no retry policy.
    pub fn new(user_agent: Option<&str>, timeout: Option<Duration>) -> reqwest::Result<Self> {
        let mut builder = reqwest::ClientBuilder::new();
        if let Some(user_agent) = user_agent {
            builder = builder.user_agent(user_agent);
        }
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

}

impl Fetch for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        trace!("fetching contract from {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        response.text().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })
    }
}
