use crate::error::EngineError;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Uppercase identifier of a tradable instrument, eg/ "AAPL".
///
/// Never empty and never contains whitespace or `,`, since selections are sent
/// to the correlation service as comma-separated lists.
#[derive(
    Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Display, Deserialize, Serialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(SmolStr);

impl Ticker {
    /// Trim and uppercase user or wire input into a [`Ticker`].
    pub fn parse(input: &str) -> Result<Self, EngineError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(EngineError::TickerEmpty);
        }

        if trimmed.chars().any(|c| c.is_whitespace() || c == ',') {
            return Err(EngineError::TickerMalformed(trimmed.to_string()));
        }

        Ok(Self(SmolStr::new(trimmed.to_uppercase())))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for Ticker {
    type Error = EngineError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Ticker> for String {
    fn from(value: Ticker) -> Self {
        value.0.to_string()
    }
}

/// Join tickers into the comma-separated list format the correlation service expects.
pub fn join_tickers(tickers: &[Ticker]) -> String {
    tickers
        .iter()
        .map(Ticker::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// Unordered pair of two distinct tickers.
///
/// Stored in canonical order (`low < high`) so `(A, B)` and `(B, A)` compare and hash equal.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize)]
pub struct TickerPair {
    low: Ticker,
    high: Ticker,
}

impl TickerPair {
    /// Returns `None` for a self-pair.
    pub fn new(a: Ticker, b: Ticker) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Some(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn low(&self) -> &Ticker {
        &self.low
    }

    pub fn high(&self) -> &Ticker {
        &self.high
    }

    pub fn contains(&self, ticker: &Ticker) -> bool {
        &self.low == ticker || &self.high == ticker
    }

    /// True if both tickers of the pair are in `tickers`.
    pub fn within(&self, tickers: &[Ticker]) -> bool {
        tickers.contains(&self.low) && tickers.contains(&self.high)
    }
}
