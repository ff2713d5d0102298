//! External correlation, validation and metrics lookups.

use crate::{
    error::EngineError,
    record::{CorrelationRecord, StockMetrics},
    ticker::Ticker,
};
use async_trait::async_trait;

/// HTTP implementation backed by `reqwest`.
pub mod http;

/// Remote service supplying pre-computed correlations and per-ticker data.
#[async_trait]
pub trait CorrelationService: Send + Sync + 'static {
    /// Pairwise correlations between every ticker in `main` and every ticker in
    /// `comparisons`. Failures are [`EngineError::Fetch`].
    async fn correlations(
        &self,
        main: &[Ticker],
        comparisons: &[Ticker],
    ) -> Result<Vec<CorrelationRecord>, EngineError>;

    /// Whether `ticker` exists. Failures are [`EngineError::Validation`].
    async fn validate(&self, ticker: &Ticker) -> Result<bool, EngineError>;

    /// Display-only metrics for `ticker`. Failures are [`EngineError::Metrics`].
    async fn metrics(&self, ticker: &Ticker) -> Result<StockMetrics, EngineError>;
}
