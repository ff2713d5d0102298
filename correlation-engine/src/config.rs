use crate::{error::EngineError, graph::Cutoff, ticker::Ticker};
use std::time::Duration;
use tracing::warn;
use url::Url;

/// Correlation gateway used when `CORRELATION_API_URL` is not set.
pub const DEFAULT_API_URL: &str = "https://vm1x96ins8.execute-api.us-east-2.amazonaws.com/";

/// Tickers selected at session start when `CORRELATION_DEFAULT_TICKERS` is not set.
pub const DEFAULT_TICKERS: [&str; 5] = ["AAPL", "MSFT", "GOOGL", "AMZN", "META"];

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const ENV_API_URL: &str = "CORRELATION_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "CORRELATION_TIMEOUT_SECS";
pub const ENV_DEFAULT_TICKERS: &str = "CORRELATION_DEFAULT_TICKERS";
pub const ENV_CUTOFF: &str = "CORRELATION_CUTOFF";

/// Engine configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Correlation service base URL
    pub base_url: String,
    /// Timeout applied to every service request
    pub request_timeout: Duration,
    /// Tickers selected at session start
    pub default_tickers: Vec<Ticker>,
    /// Initial graph cutoff
    pub default_cutoff: Cutoff,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            default_tickers: parse_tickers(DEFAULT_TICKERS.iter().copied()),
            default_cutoff: Cutoff::default(),
        }
    }
}

impl EngineConfig {
    /// Create a new configuration with custom base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set request timeout
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set tickers selected at session start
    pub fn with_default_tickers(mut self, tickers: Vec<Ticker>) -> Self {
        self.default_tickers = tickers;
        self
    }

    /// Set initial cutoff
    pub fn with_default_cutoff(mut self, cutoff: Cutoff) -> Self {
        self.default_cutoff = cutoff;
        self
    }

    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, EngineError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from `lookup`, falling back to defaults for absent or
    /// unparsable values. Only a malformed base URL is an error.
    pub fn from_lookup<Lookup>(lookup: Lookup) -> Result<Self, EngineError>
    where
        Lookup: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(base_url) = lookup(ENV_API_URL) {
            Url::parse(&base_url).map_err(|error| {
                EngineError::Config(format!("{ENV_API_URL}={base_url:?}: {error}"))
            })?;
            config.base_url = base_url;
        }

        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout = Duration::from_secs(secs),
                _ => warn!(%raw, "ignoring invalid {ENV_TIMEOUT_SECS}"),
            }
        }

        if let Some(raw) = lookup(ENV_DEFAULT_TICKERS) {
            config.default_tickers = parse_tickers(raw.split(','));
        }

        if let Some(raw) = lookup(ENV_CUTOFF) {
            match raw.parse::<f64>().ok().map(Cutoff::new) {
                Some(Ok(cutoff)) => config.default_cutoff = cutoff,
                _ => warn!(%raw, "ignoring invalid {ENV_CUTOFF}"),
            }
        }

        Ok(config)
    }
}

fn parse_tickers<'a, Iter>(raw: Iter) -> Vec<Ticker>
where
    Iter: IntoIterator<Item = &'a str>,
{
    raw.into_iter()
        .filter(|token| !token.trim().is_empty())
        .filter_map(|token| match Ticker::parse(token) {
            Ok(ticker) => Some(ticker),
            Err(error) => {
                warn!(%error, "ignoring invalid default ticker");
                None
            }
        })
        .collect()
}
