//! Dense symmetric correlation matrix over the selected tickers.

use crate::{normalize::PairMap, ticker::Ticker};
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};

/// Background colour of a "not available" cell.
pub const CELL_COLOR_MISSING: &str = "#f8f9fa";

/// Label of a "not available" cell.
pub const CELL_LABEL_MISSING: &str = "N/A";

/// N×N correlation grid whose axis order is the selection order.
///
/// Invariants:
/// - `cells[i][i] == Some(1.0)`
/// - `cells[i][j] == cells[j][i]`
/// - `cells[i][j]` is `None` iff no pairwise record exists for that pair.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CorrelationMatrix {
    tickers: Vec<Ticker>,
    cells: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    /// Build the matrix for `tickers` from normalised pairs.
    ///
    /// Pairs referencing a ticker outside `tickers` are ignored.
    pub fn build(tickers: &[Ticker], pairs: &PairMap) -> Self {
        match tickers.len() {
            0 => Self::default(),
            // A lone ticker is perfectly correlated with itself and has no pairs to fill.
            1 => Self {
                tickers: tickers.to_vec(),
                cells: vec![vec![Some(1.0)]],
            },
            size => {
                let mut cells = vec![vec![None; size]; size];
                for (index, row) in cells.iter_mut().enumerate() {
                    row[index] = Some(1.0);
                }

                let indices = tickers
                    .iter()
                    .enumerate()
                    .map(|(index, ticker)| (ticker, index))
                    .collect::<FnvHashMap<_, _>>();

                for (pair, value) in pairs.iter() {
                    if let (Some(&i), Some(&j)) = (indices.get(pair.low()), indices.get(pair.high()))
                    {
                        cells[i][j] = Some(value);
                        cells[j][i] = Some(value);
                    }
                }

                Self {
                    tickers: tickers.to_vec(),
                    cells,
                }
            }
        }
    }

    pub fn tickers(&self) -> &[Ticker] {
        &self.tickers
    }

    pub fn cells(&self) -> &[Vec<Option<f64>>] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    pub fn index_of(&self, ticker: &Ticker) -> Option<usize> {
        self.tickers.iter().position(|candidate| candidate == ticker)
    }

    /// Cell at `(row, col)`, `None` if out of bounds or not available.
    pub fn cell(&self, row: usize, col: usize) -> Option<f64> {
        self.cells.get(row).and_then(|cells| cells.get(col)).copied().flatten()
    }

    /// Coefficient between two tickers on the matrix axis.
    pub fn value(&self, a: &Ticker, b: &Ticker) -> Option<f64> {
        self.cell(self.index_of(a)?, self.index_of(b)?)
    }

    /// Project the matrix onto the axis without `ticker`, dropping its row and column.
    ///
    /// Returns an unchanged copy if `ticker` is not on the axis.
    pub fn without(&self, ticker: &Ticker) -> Self {
        let Some(removed) = self.index_of(ticker) else {
            return self.clone();
        };

        let tickers = self
            .tickers
            .iter()
            .filter(|candidate| *candidate != ticker)
            .cloned()
            .collect();

        let cells = self
            .cells
            .iter()
            .enumerate()
            .filter(|(row, _)| *row != removed)
            .map(|(_, cells)| {
                cells
                    .iter()
                    .enumerate()
                    .filter(|(col, _)| *col != removed)
                    .map(|(_, cell)| *cell)
                    .collect()
            })
            .collect();

        Self { tickers, cells }
    }
}

/// Heat-map background for a cell: white to green for positive, white to red otherwise.
pub fn cell_color(value: Option<f64>) -> String {
    let Some(value) = value else {
        return CELL_COLOR_MISSING.to_string();
    };

    let intensity = (value.abs().min(1.0) * 255.0).round() as u8;
    let fade = 255 - intensity;
    if value > 0.0 {
        format!("rgb({fade}, 255, {fade})")
    } else {
        format!("rgb(255, {fade}, {fade})")
    }
}

/// Two-decimal cell label, or [`CELL_LABEL_MISSING`].
pub fn cell_label(value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{value:.2}"),
        None => CELL_LABEL_MISSING.to_string(),
    }
}

/// Qualitative reading of a correlation coefficient.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum CorrelationStrength {
    StrongPositive,
    ModeratePositive,
    Weak,
    ModerateNegative,
    StrongNegative,
}

impl CorrelationStrength {
    pub fn classify(value: f64) -> Self {
        if value > 0.7 {
            Self::StrongPositive
        } else if value < -0.7 {
            Self::StrongNegative
        } else if value > 0.3 {
            Self::ModeratePositive
        } else if value < -0.3 {
            Self::ModerateNegative
        } else {
            Self::Weak
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::StrongPositive => {
                "These stocks are highly positively correlated and tend to move together."
            }
            Self::StrongNegative => {
                "These stocks are highly negatively correlated and tend to move in opposite directions."
            }
            Self::ModeratePositive => "These stocks have a moderate positive correlation.",
            Self::ModerateNegative => "These stocks have a moderate negative correlation.",
            Self::Weak => "These stocks have little to no correlation.",
        }
    }
}
