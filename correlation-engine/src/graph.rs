//! Node/edge network of the selected tickers, filtered by a correlation magnitude cutoff.

use crate::{
    error::EngineError,
    normalize::PairMap,
    ticker::{Ticker, TickerPair},
};
use serde::{Deserialize, Serialize};

/// Multiplier from correlation magnitude to edge width.
pub const EDGE_WIDTH_SCALE: f64 = 1.5;

/// Minimum absolute correlation for a pair to appear as an edge, in [0, 1].
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Cutoff(f64);

impl Cutoff {
    pub const DEFAULT: f64 = 0.5;

    pub fn new(value: f64) -> Result<Self, EngineError> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(EngineError::CutoffOutOfRange(value))
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// True if a pair with this coefficient qualifies as an edge.
    pub fn admits(&self, value: f64) -> bool {
        value.abs() >= self.0
    }
}

impl Default for Cutoff {
    fn default() -> Self {
        Self(Self::DEFAULT)
    }
}

impl TryFrom<f64> for Cutoff {
    type Error = EngineError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Cutoff> for f64 {
    fn from(value: Cutoff) -> Self {
        value.0
    }
}

/// Colour family of an edge, selected by the sign of its coefficient.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum EdgeColor {
    Positive,
    Negative,
}

impl EdgeColor {
    pub fn for_value(value: f64) -> Self {
        if value < 0.0 {
            Self::Negative
        } else {
            Self::Positive
        }
    }

    pub fn rgba(&self) -> &'static str {
        match self {
            Self::Positive => "rgba(0,128,0,0.6)",
            Self::Negative => "rgba(255,0,0,0.6)",
        }
    }
}

/// Edge width, linear in the coefficient's magnitude.
pub fn edge_width(value: f64) -> f64 {
    value.abs() * EDGE_WIDTH_SCALE
}

#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct GraphNode {
    pub id: Ticker,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GraphEdge {
    pub source: Ticker,
    pub target: Ticker,
    pub value: f64,
    pub color: EdgeColor,
    pub width: f64,
}

impl GraphEdge {
    fn new(pair: &TickerPair, value: f64) -> Self {
        Self {
            source: pair.low().clone(),
            target: pair.high().clone(),
            value,
            color: EdgeColor::for_value(value),
            width: edge_width(value),
        }
    }

    pub fn touches(&self, ticker: &Ticker) -> bool {
        &self.source == ticker || &self.target == ticker
    }

    pub fn label(&self) -> String {
        format!("{:.2}", self.value)
    }
}

/// One node per selected ticker plus the edges whose magnitude meets the cutoff.
///
/// Edges appear in the iteration order of the source [`PairMap`], so raising the
/// cutoff only ever removes edges without reordering the survivors.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CorrelationGraph {
    nodes: Vec<GraphNode>,
    edges: Vec<GraphEdge>,
}

impl CorrelationGraph {
    pub fn build(tickers: &[Ticker], pairs: &PairMap, cutoff: Cutoff) -> Self {
        let nodes = tickers
            .iter()
            .map(|ticker| GraphNode { id: ticker.clone() })
            .collect();

        let edges = pairs
            .iter()
            .filter(|(pair, value)| pair.within(tickers) && cutoff.admits(*value))
            .map(|(pair, value)| GraphEdge::new(pair, value))
            .collect();

        Self { nodes, edges }
    }

    pub fn nodes(&self) -> &[GraphNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Unordered ticker pairs connected by an edge.
    pub fn edge_pairs(&self) -> Vec<TickerPair> {
        self.edges
            .iter()
            .filter_map(|edge| TickerPair::new(edge.source.clone(), edge.target.clone()))
            .collect()
    }

    /// Drop the node for `ticker` and every edge touching it.
    pub fn without(&self, ticker: &Ticker) -> Self {
        Self {
            nodes: self
                .nodes
                .iter()
                .filter(|node| &node.id != ticker)
                .cloned()
                .collect(),
            edges: self
                .edges
                .iter()
                .filter(|edge| !edge.touches(ticker))
                .cloned()
                .collect(),
        }
    }
}
