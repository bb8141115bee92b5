//! HTTP transport for the weather sources.

use std::future::Future;
use std::time::Duration;

use outage_core::ReqwestErrorExt;
use url::Url;

use crate::error::FetchError;
use crate::response::error_reason;
use crate::retry::{with_retry, RetryConfig};

const REQUEST_TIMEOUT_SECS: u64 = 60;
const USER_AGENT: &str = concat!("outage-forecast/", env!("CARGO_PKG_VERSION"));

/// Something that can GET a weather URL and hand back the response body.
pub trait Transport: Send + Sync {
    fn get(&self, url: &Url) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Open-Meteo HTTP client with bounded retries.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: reqwest::Client,
    retry: RetryConfig,
}

impl OpenMeteoClient {
    pub fn new(retry: RetryConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| FetchError::Network(e.into_network_error()))?;

        Ok(Self { client, retry })
    }

    /// GET `url` with retries and return the body of a successful response.
    #[tracing::instrument(skip_all, fields(host = url.host_str().unwrap_or_default(), path = url.path()))]
    pub async fn fetch_body(&self, url: &Url) -> Result<String, FetchError> {
        let response = with_retry(&self.retry, || self.client.get(url.clone()).send())
            .await
            .map_err(|e| FetchError::Network(e.into_network_error()))?;

        Self::handle_response(response).await
    }

    async fn handle_response(response: reqwest::Response) -> Result<String, FetchError> {
        let status = response.status();

        if status.is_success() {
            response
                .text()
                .await
                .map_err(|e| FetchError::Network(e.into_network_error()))
        } else {
            let text = response.text().await.unwrap_or_default();
            Err(FetchError::Api {
                status: status.as_u16(),
                message: error_reason(&text),
            })
        }
    }
}

impl Transport for OpenMeteoClient {
    async fn get(&self, url: &Url) -> Result<String, FetchError> {
        tracing::debug!("GET {}", url.path());
        self.fetch_body(url).await
    }
}
