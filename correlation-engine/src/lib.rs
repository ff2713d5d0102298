//! Correlation Engine
//!
//! Turns pairwise correlation records fetched from a remote service into a
//! symmetric [`CorrelationMatrix`] and a cutoff-filtered [`CorrelationGraph`] over
//! the user's selected tickers, and keeps both consistent as the selection changes.
//!
//! The crate includes:
//! - Ticker identifiers and record decoding
//! - Pair normalisation, matrix and graph builders
//! - An immutable [`DashboardState`] reducer with out-of-order fetch protection
//! - A [`CorrelationService`] trait with a `reqwest` implementation
//! - An async [`Dashboard`] dispatcher that runs the reducer's effects

/// Error types and how each one is surfaced to the user.
pub mod error;

/// Environment driven engine configuration.
pub mod config;

pub mod ticker;
pub mod record;
pub mod normalize;
pub mod matrix;
pub mod graph;
pub mod selection;
pub mod state;
pub mod service;
pub mod dashboard;

pub use config::EngineConfig;
pub use dashboard::Dashboard;
pub use error::{EngineError, ErrorSurface};
pub use ticker::{Ticker, TickerPair};

// Dataset builders
pub use graph::{CorrelationGraph, Cutoff, EdgeColor, GraphEdge, GraphNode};
pub use matrix::{CorrelationMatrix, CorrelationStrength, cell_color, cell_label};
pub use normalize::{PairMap, normalize};
pub use record::{CorrelationRecord, StockMetrics, parse_correlation_records};
pub use selection::SelectionState;

// Dashboard state machine
pub use state::{
    Action, CellInspection, DashboardState, DashboardView, Effect, FetchSeq, FetchStatus,
    PendingFetch, Transition,
};

pub use service::{CorrelationService, http::HttpCorrelationService};
