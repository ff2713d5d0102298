use crate::{error::EngineError, ticker::Ticker};
use serde::{Deserialize, Serialize};

/// Watch list of every ticker the user has added, and the subset currently displayed.
///
/// `selected_tickers` is a subset of `all_tickers`, neither holds duplicates, and
/// `selected_tickers` order is the matrix axis order. Every operation returns a new
/// value.
#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct SelectionState {
    all_tickers: Vec<Ticker>,
    selected_tickers: Vec<Ticker>,
}

impl SelectionState {
    /// Start a session with `tickers` both known and selected, dropping repeats.
    pub fn new<Iter>(tickers: Iter) -> Self
    where
        Iter: IntoIterator<Item = Ticker>,
    {
        let mut all_tickers = Vec::new();
        for ticker in tickers {
            if !all_tickers.contains(&ticker) {
                all_tickers.push(ticker);
            }
        }

        Self {
            selected_tickers: all_tickers.clone(),
            all_tickers,
        }
    }

    pub fn all_tickers(&self) -> &[Ticker] {
        &self.all_tickers
    }

    pub fn selected_tickers(&self) -> &[Ticker] {
        &self.selected_tickers
    }

    pub fn contains(&self, ticker: &Ticker) -> bool {
        self.all_tickers.contains(ticker)
    }

    pub fn is_selected(&self, ticker: &Ticker) -> bool {
        self.selected_tickers.contains(ticker)
    }

    /// Append a new ticker to both collections.
    pub fn add(&self, ticker: Ticker) -> Result<Self, EngineError> {
        if self.contains(&ticker) {
            return Err(EngineError::DuplicateTicker(ticker));
        }

        let mut next = self.clone();
        next.all_tickers.push(ticker.clone());
        next.selected_tickers.push(ticker);
        Ok(next)
    }

    /// Forget `ticker` entirely.
    pub fn remove(&self, ticker: &Ticker) -> Result<Self, EngineError> {
        self.ensure_known(ticker)?;
        Ok(Self {
            all_tickers: without(&self.all_tickers, ticker),
            selected_tickers: without(&self.selected_tickers, ticker),
        })
    }

    /// Hide `ticker` while keeping it in the watch list.
    pub fn deselect(&self, ticker: &Ticker) -> Result<Self, EngineError> {
        self.ensure_known(ticker)?;
        Ok(Self {
            all_tickers: self.all_tickers.clone(),
            selected_tickers: without(&self.selected_tickers, ticker),
        })
    }

    /// Show a known ticker again, appended to the end of the axis.
    pub fn select(&self, ticker: &Ticker) -> Result<Self, EngineError> {
        self.ensure_known(ticker)?;

        let mut next = self.clone();
        if !next.is_selected(ticker) {
            next.selected_tickers.push(ticker.clone());
        }
        Ok(next)
    }

    /// Select every known ticker, in watch list order.
    pub fn select_all(&self) -> Self {
        Self {
            all_tickers: self.all_tickers.clone(),
            selected_tickers: self.all_tickers.clone(),
        }
    }

    pub fn deselect_all(&self) -> Self {
        Self {
            all_tickers: self.all_tickers.clone(),
            selected_tickers: Vec::new(),
        }
    }

    /// True if `next` displays a ticker this selection does not.
    pub fn gains_in(&self, next: &SelectionState) -> bool {
        next.selected_tickers
            .iter()
            .any(|ticker| !self.is_selected(ticker))
    }

    fn ensure_known(&self, ticker: &Ticker) -> Result<(), EngineError> {
        if self.contains(ticker) {
            Ok(())
        } else {
            Err(EngineError::UnknownTicker(ticker.clone()))
        }
    }
}

fn without(tickers: &[Ticker], ticker: &Ticker) -> Vec<Ticker> {
    tickers
        .iter()
        .filter(|candidate| *candidate != ticker)
        .cloned()
        .collect()
}
