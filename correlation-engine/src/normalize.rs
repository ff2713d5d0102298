use crate::{
    record::CorrelationRecord,
    ticker::{Ticker, TickerPair},
};
use indexmap::{IndexMap, map::Entry};
use tracing::debug;

/// Deduplicated correlation values keyed by unordered [`TickerPair`].
///
/// Iteration order is first-seen order of the source records, which keeps every
/// structure derived from a `PairMap` deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairMap(IndexMap<TickerPair, f64>);

impl PairMap {
    pub fn get(&self, a: &Ticker, b: &Ticker) -> Option<f64> {
        TickerPair::new(a.clone(), b.clone()).and_then(|pair| self.0.get(&pair).copied())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TickerPair, f64)> {
        self.0.iter().map(|(pair, value)| (pair, *value))
    }

    /// New map holding only pairs whose tickers are both in `tickers`.
    pub fn restrict(&self, tickers: &[Ticker]) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(pair, _)| pair.within(tickers))
                .map(|(pair, value)| (pair.clone(), *value))
                .collect(),
        )
    }

    /// New map without any pair touching `ticker`.
    pub fn without(&self, ticker: &Ticker) -> Self {
        Self(
            self.0
                .iter()
                .filter(|(pair, _)| !pair.contains(ticker))
                .map(|(pair, value)| (pair.clone(), *value))
                .collect(),
        )
    }
}

/// Canonicalise raw pairwise records into a [`PairMap`].
///
/// Self-pairs are dropped. For duplicate unordered pairs the first-seen value wins,
/// including when a later duplicate carries a different value.
pub fn normalize<'a, Iter>(records: Iter) -> PairMap
where
    Iter: IntoIterator<Item = &'a CorrelationRecord>,
{
    let mut pairs: IndexMap<TickerPair, f64> = IndexMap::new();

    for record in records {
        let Some(pair) = TickerPair::new(record.ticker.clone(), record.compared_ticker.clone())
        else {
            continue;
        };

        match pairs.entry(pair) {
            Entry::Vacant(entry) => {
                entry.insert(record.value);
            }
            Entry::Occupied(entry) if *entry.get() != record.value => {
                debug!(
                    low = %entry.key().low(),
                    high = %entry.key().high(),
                    kept = *entry.get(),
                    discarded = record.value,
                    "conflicting duplicate correlation record, keeping first-seen value"
                );
            }
            Entry::Occupied(_) => {}
        }
    }

    PairMap(pairs)
}
