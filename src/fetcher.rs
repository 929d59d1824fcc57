//! Single-shot category page fetching over an optional forward proxy.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ORIGIN, USER_AGENT};
use reqwest::{Client, Proxy, StatusCode};
use std::error::Error;
use std::fmt;
use std::time::Duration;
use url::Url;

const ACCEPT_VALUE: &str = "application/json, text/plain, */*";
const ORIGIN_VALUE: &str = "https://www.hermes.com";
const USER_AGENT_VALUE: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/138.0.0.0 Safari/537.36";

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors surfaced while fetching category markup.
#[derive(Debug)]
pub enum FetchError {
    /// The proxy URL could not be applied to the HTTP client.
    InvalidProxy(reqwest::Error),
    /// The HTTP client itself failed to build.
    ClientBuild(reqwest::Error),
    /// Transport-level failure reaching the target (connect, DNS, TLS,
    /// timeout, body read).
    Transport(reqwest::Error),
    /// The target answered with a non-success status.
    Status(StatusCode),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidProxy(err) => write!(f, "invalid proxy: {err}"),
            Self::ClientBuild(err) => write!(f, "http client build failed: {err}"),
            Self::Transport(err) => write!(f, "transport error: {err}"),
            Self::Status(status) => write!(f, "unexpected status: {status}"),
        }
    }
}

impl Error for FetchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidProxy(err) | Self::ClientBuild(err) | Self::Transport(err) => Some(err),
            Self::Status(_) => None,
        }
    }
}

/// Seam for fetching markup, so polling loops can run against stubs.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Performs one GET of the target and returns the response body.
    async fn fetch(&self, target: &Url) -> Result<String, FetchError>;
}

/// Fetches category pages with a browser-like header set.
///
/// No retry and no per-request tuning: a failure is surfaced to the caller,
/// and swallowing it is the poll loop's responsibility.
#[derive(Debug, Clone)]
pub struct CategoryFetcher {
    client: Client,
}

impl CategoryFetcher {
    /// Builds a fetcher, routing through `proxy` when one is given.
    pub fn new(proxy: Option<&str>) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
        headers.insert(ORIGIN, HeaderValue::from_static(ORIGIN_VALUE));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let mut builder = Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(FETCH_TIMEOUT);

        if let Some(proxy) = proxy {
            builder = builder.proxy(Proxy::all(proxy).map_err(FetchError::InvalidProxy)?);
        }

        let client = builder.build().map_err(FetchError::ClientBuild)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetch for CategoryFetcher {
    async fn fetch(&self, target: &Url) -> Result<String, FetchError> {
        let response = self
            .client
            .get(target.clone())
            .send()
            .await
            .map_err(FetchError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        response.text().await.map_err(FetchError::Transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_without_proxy() {
        CategoryFetcher::new(None).expect("plain client builds");
    }

    #[test]
    fn builds_with_http_proxy() {
        CategoryFetcher::new(Some("http://127.0.0.1:8080")).expect("proxied client builds");
    }

    #[test]
    fn rejects_unparseable_proxy() {
        let err = CategoryFetcher::new(Some("not a proxy url")).expect_err("bad proxy");
        assert!(matches!(err, FetchError::InvalidProxy(_)));
    }
}
