//! Boundary schemas for the correlation service responses.
//!
//! Wire records are deserialised into their raw shape first, then validated into
//! typed records. Malformed correlation records are dropped one at a time so a
//! single bad row never discards an otherwise usable response.

use crate::{error::EngineError, ticker::Ticker};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Correlation record exactly as returned by the `/correlation` endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RawCorrelationRecord {
    pub ticker: String,
    pub compared_ticker: String,
    /// Correlation coefficient, expected in [-1, 1].
    pub data: f64,
}

/// Validated pairwise correlation observation.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CorrelationRecord {
    pub ticker: Ticker,
    pub compared_ticker: Ticker,
    pub value: f64,
}

impl CorrelationRecord {
    pub fn new(ticker: Ticker, compared_ticker: Ticker, value: f64) -> Self {
        Self {
            ticker,
            compared_ticker,
            value,
        }
    }
}

/// Reason a wire record was rejected at the boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordRejection {
    #[error("record shape invalid: {0}")]
    Shape(String),

    #[error("record ticker invalid: {0}")]
    Ticker(#[from] EngineError),

    #[error("correlation value {0} is not a finite value in [-1, 1]")]
    Value(f64),
}

impl TryFrom<RawCorrelationRecord> for CorrelationRecord {
    type Error = RecordRejection;

    fn try_from(raw: RawCorrelationRecord) -> Result<Self, Self::Error> {
        if !raw.data.is_finite() || raw.data.abs() > 1.0 {
            return Err(RecordRejection::Value(raw.data));
        }

        Ok(Self {
            ticker: Ticker::parse(&raw.ticker)?,
            compared_ticker: Ticker::parse(&raw.compared_ticker)?,
            value: raw.data,
        })
    }
}

/// Validate a `/correlation` response body.
///
/// A body that is not a JSON array is a fetch failure. Individual malformed
/// elements are logged and skipped.
pub fn parse_correlation_records(
    body: serde_json::Value,
) -> Result<Vec<CorrelationRecord>, EngineError> {
    let serde_json::Value::Array(elements) = body else {
        return Err(EngineError::Fetch(
            "correlation response is not a JSON array".to_string(),
        ));
    };

    let records = elements
        .into_iter()
        .enumerate()
        .filter_map(|(index, element)| {
            let result = serde_json::from_value::<RawCorrelationRecord>(element)
                .map_err(|error| RecordRejection::Shape(error.to_string()))
                .and_then(CorrelationRecord::try_from);

            match result {
                Ok(record) => Some(record),
                Err(rejection) => {
                    warn!(index, %rejection, "dropping malformed correlation record");
                    None
                }
            }
        })
        .collect();

    Ok(records)
}

/// Response of the `/validate` endpoint.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct ValidationResponse {
    pub exists: bool,
}

/// Display-only metrics returned by the `/stockinfo` endpoint.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize, Serialize)]
pub struct StockMetrics {
    pub beta: f64,
    /// Percentage return over the service's reference period.
    pub returns: f64,
}
