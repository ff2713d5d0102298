use super::CorrelationService;
use crate::{
    config::EngineConfig,
    error::EngineError,
    record::{CorrelationRecord, StockMetrics, ValidationResponse, parse_correlation_records},
    ticker::{Ticker, join_tickers},
};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

/// [`CorrelationService`] over the correlation gateway's REST API.
///
/// Endpoints:
/// - `GET /correlation?main=AAPL,MSFT&comparisons=AAPL,MSFT`
/// - `GET /validate?ticker=NFLX` -> `{ "exists": bool }`
/// - `GET /stockinfo?ticker=NFLX` -> `{ "beta": f64, "returns": f64 }`
#[derive(Debug, Clone)]
pub struct HttpCorrelationService {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpCorrelationService {
    pub fn new(config: &EngineConfig) -> Result<Self, EngineError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|error| EngineError::Config(format!("HTTP client: {error}")))?;

        Ok(Self {
            client,
            base_url: base_url(&config.base_url)?,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get<T>(&self, path: &str, query: &[(&str, &str)]) -> Result<T, String>
    where
        T: DeserializeOwned,
    {
        let url = self
            .base_url
            .join(path)
            .map_err(|error| format!("invalid endpoint {path}: {error}"))?;

        debug!(%url, ?query, "requesting correlation service");

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|error| format!("HTTP request failed: {error}"))?;

        if !response.status().is_success() {
            return Err(format!("HTTP error: {}", response.status()));
        }

        response
            .json::<T>()
            .await
            .map_err(|error| format!("JSON parse failed: {error}"))
    }
}

#[async_trait]
impl CorrelationService for HttpCorrelationService {
    async fn correlations(
        &self,
        main: &[Ticker],
        comparisons: &[Ticker],
    ) -> Result<Vec<CorrelationRecord>, EngineError> {
        let main = join_tickers(main);
        let comparisons = join_tickers(comparisons);

        let body = self
            .get::<serde_json::Value>(
                "correlation",
                &[("main", main.as_str()), ("comparisons", comparisons.as_str())],
            )
            .await
            .map_err(EngineError::Fetch)?;

        parse_correlation_records(body)
    }

    async fn validate(&self, ticker: &Ticker) -> Result<bool, EngineError> {
        self.get::<ValidationResponse>("validate", &[("ticker", ticker.as_str())])
            .await
            .map(|response| response.exists)
            .map_err(|reason| EngineError::Validation {
                ticker: ticker.clone(),
                reason,
            })
    }

    async fn metrics(&self, ticker: &Ticker) -> Result<StockMetrics, EngineError> {
        self.get::<StockMetrics>("stockinfo", &[("ticker", ticker.as_str())])
            .await
            .map_err(|reason| EngineError::Metrics {
                ticker: ticker.clone(),
                reason,
            })
    }
}

/// Parse the configured base URL, ensuring relative endpoint joins keep its path.
fn base_url(raw: &str) -> Result<Url, EngineError> {
    let mut url =
        Url::parse(raw).map_err(|error| EngineError::Config(format!("base URL {raw:?}: {error}")))?;

    if url.cannot_be_a_base() {
        return Err(EngineError::Config(format!(
            "base URL {raw:?} cannot be a base"
        )));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}
