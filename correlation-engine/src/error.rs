use crate::ticker::Ticker;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All errors generated in `correlation-engine`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Error)]
pub enum EngineError {
    #[error("ticker must not be empty")]
    TickerEmpty,

    #[error("ticker {0:?} contains whitespace or a list separator")]
    TickerMalformed(String),

    #[error("{0} is already in your list")]
    DuplicateTicker(Ticker),

    #[error("{0} is not a valid stock ticker")]
    InvalidTicker(Ticker),

    #[error("{0} is not in your list")]
    UnknownTicker(Ticker),

    #[error("correlation cutoff must be a finite value in [0, 1], got {0}")]
    CutoffOutOfRange(f64),

    #[error("failed to fetch correlation data: {0}")]
    Fetch(String),

    #[error("failed to validate ticker {ticker}: {reason}")]
    Validation { ticker: Ticker, reason: String },

    #[error("failed to fetch metrics for {ticker}: {reason}")]
    Metrics { ticker: Ticker, reason: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

/// How an [`EngineError`] is presented to the user.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum ErrorSurface {
    /// Dismissible banner; the last good dataset stays on screen.
    Dismissible,
    /// Message attached to the input that caused it; state is untouched.
    Field,
    /// Logged only.
    Silent,
    /// The process cannot start.
    Fatal,
}

impl EngineError {
    /// Determine where this error is surfaced.
    pub fn surface(&self) -> ErrorSurface {
        match self {
            EngineError::Fetch(_) => ErrorSurface::Dismissible,
            EngineError::TickerEmpty
            | EngineError::TickerMalformed(_)
            | EngineError::DuplicateTicker(_)
            | EngineError::InvalidTicker(_)
            | EngineError::UnknownTicker(_)
            | EngineError::CutoffOutOfRange(_)
            | EngineError::Validation { .. } => ErrorSurface::Field,
            EngineError::Metrics { .. } => ErrorSurface::Silent,
            EngineError::Config(_) => ErrorSurface::Fatal,
        }
    }
}
