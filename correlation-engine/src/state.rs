//! Immutable dashboard snapshot and the reducer that evolves it.
//!
//! Every [`Action`] produces a new [`DashboardState`] plus the [`Effect`]s the
//! dispatcher must run. Selection changes that introduce a ticker issue a
//! correlation fetch tagged with a fresh sequence number and only the response
//! carrying the latest number is ever committed. Removals, deselections and cutoff
//! changes are projected locally from the cached pairs without touching the network.

use crate::{
    error::EngineError,
    graph::{CorrelationGraph, Cutoff},
    matrix::{CorrelationMatrix, CorrelationStrength},
    normalize::{PairMap, normalize},
    record::{CorrelationRecord, StockMetrics},
    selection::SelectionState,
    ticker::Ticker,
};
use chrono::{DateTime, Utc};
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, sync::Arc};
use tracing::{debug, info, warn};

/// Monotonically increasing tag of a correlation fetch.
pub type FetchSeq = u64;

/// Freshness of the displayed dataset.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub enum FetchStatus {
    /// No dataset has been committed yet and nothing is in flight.
    Idle,
    /// The fetch tagged `seq` is the one whose response will be committed.
    Fetching { seq: FetchSeq },
    /// A committed dataset is displayed and nothing is in flight.
    Ready,
}

/// Selection waiting on the correlation fetch tagged `seq`.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct PendingFetch {
    pub seq: FetchSeq,
    pub selection: SelectionState,
}

/// Matrix cell the user is inspecting.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CellInspection {
    pub a: Ticker,
    pub b: Ticker,
    pub correlation: f64,
    pub strength: CorrelationStrength,
}

impl CellInspection {
    fn read(matrix: &CorrelationMatrix, a: &Ticker, b: &Ticker) -> Option<Self> {
        if a == b {
            return None;
        }

        let correlation = matrix.value(a, b)?;
        Some(Self {
            a: a.clone(),
            b: b.clone(),
            correlation,
            strength: CorrelationStrength::classify(correlation),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Admit a ticker that passed validation.
    Add(Ticker),
    Remove(Ticker),
    Select(Ticker),
    Deselect(Ticker),
    SelectAll,
    DeselectAll,
    SetCutoff(Cutoff),
    CorrelationsLoaded {
        seq: FetchSeq,
        records: Vec<CorrelationRecord>,
        time_received: DateTime<Utc>,
    },
    CorrelationsFailed {
        seq: FetchSeq,
        error: EngineError,
    },
    MetricsLoaded {
        ticker: Ticker,
        metrics: StockMetrics,
    },
    MetricsFailed {
        ticker: Ticker,
        error: EngineError,
    },
    InspectCell {
        a: Ticker,
        b: Ticker,
    },
    ClearInspection,
    /// Surface an error raised outside the reducer, eg/ a failed ticker validation.
    Reject(EngineError),
    DismissError,
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Effect {
    FetchCorrelations { seq: FetchSeq, tickers: Vec<Ticker> },
    FetchMetrics { tickers: Vec<Ticker> },
}

/// Result of reducing an [`Action`].
#[derive(Debug, Clone)]
pub struct Transition {
    pub state: DashboardState,
    pub effects: Vec<Effect>,
}

/// Immutable snapshot of the dashboard.
///
/// Derived artifacts are shared behind [`Arc`]s and replaced wholesale, so a
/// snapshot held by a renderer always reflects a single fetch generation.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardState {
    selection: SelectionState,
    cutoff: Cutoff,
    pairs: Arc<PairMap>,
    matrix: Arc<CorrelationMatrix>,
    graph: Arc<CorrelationGraph>,
    metrics: Arc<FnvHashMap<Ticker, StockMetrics>>,
    pending: Option<PendingFetch>,
    last_seq: FetchSeq,
    loaded: bool,
    inspection: Option<CellInspection>,
    error: Option<EngineError>,
    time_updated: Option<DateTime<Utc>>,
}

impl DashboardState {
    /// Empty, idle dashboard.
    pub fn new(cutoff: Cutoff) -> Self {
        Self {
            selection: SelectionState::default(),
            cutoff,
            pairs: Arc::default(),
            matrix: Arc::default(),
            graph: Arc::default(),
            metrics: Arc::default(),
            pending: None,
            last_seq: 0,
            loaded: false,
            inspection: None,
            error: None,
            time_updated: None,
        }
    }

    /// Begin a session on the default ticker set.
    pub fn start<Iter>(tickers: Iter, cutoff: Cutoff) -> Transition
    where
        Iter: IntoIterator<Item = Ticker>,
    {
        let mut state = Self::new(cutoff);
        let selection = SelectionState::new(tickers);

        let effects = if selection.all_tickers().is_empty() {
            Vec::new()
        } else {
            vec![state.begin_fetch(selection)]
        };

        Transition { state, effects }
    }

    pub fn reduce(&self, action: Action) -> Transition {
        let mut state = self.clone();
        let effects = state.apply(action);
        Transition { state, effects }
    }

    /// Committed selection, matching the displayed matrix and graph.
    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    /// Selection the user most recently asked for, which may still be waiting on a fetch.
    pub fn intended_selection(&self) -> &SelectionState {
        self.pending
            .as_ref()
            .map(|pending| &pending.selection)
            .unwrap_or(&self.selection)
    }

    pub fn cutoff(&self) -> Cutoff {
        self.cutoff
    }

    pub fn pairs(&self) -> &Arc<PairMap> {
        &self.pairs
    }

    pub fn matrix(&self) -> &Arc<CorrelationMatrix> {
        &self.matrix
    }

    pub fn graph(&self) -> &Arc<CorrelationGraph> {
        &self.graph
    }

    pub fn metrics(&self, ticker: &Ticker) -> Option<&StockMetrics> {
        self.metrics.get(ticker)
    }

    pub fn pending(&self) -> Option<&PendingFetch> {
        self.pending.as_ref()
    }

    pub fn status(&self) -> FetchStatus {
        match (&self.pending, self.loaded) {
            (Some(pending), _) => FetchStatus::Fetching { seq: pending.seq },
            (None, true) => FetchStatus::Ready,
            (None, false) => FetchStatus::Idle,
        }
    }

    pub fn inspection(&self) -> Option<&CellInspection> {
        self.inspection.as_ref()
    }

    pub fn error(&self) -> Option<&EngineError> {
        self.error.as_ref()
    }

    pub fn time_updated(&self) -> Option<DateTime<Utc>> {
        self.time_updated
    }

    /// Serialisable view of the snapshot.
    pub fn view(&self) -> DashboardView<'_> {
        DashboardView {
            status: self.status(),
            selection: &self.selection,
            intended_selection: self.intended_selection(),
            cutoff: self.cutoff.value(),
            matrix: &self.matrix,
            graph: &self.graph,
            metrics: self.metrics.iter().collect(),
            inspection: self.inspection.as_ref(),
            error: self.error.as_ref().map(ToString::to_string),
            time_updated: self.time_updated,
        }
    }

    fn apply(&mut self, action: Action) -> Vec<Effect> {
        match action {
            Action::Add(ticker) => match self.intended_selection().add(ticker) {
                Ok(selection) => vec![self.begin_fetch(selection)],
                Err(error) => self.reject(error),
            },
            Action::Remove(ticker) => self.project(&ticker, SelectionState::remove),
            Action::Deselect(ticker) => self.project(&ticker, SelectionState::deselect),
            Action::Select(ticker) => match self.intended_selection().select(&ticker) {
                Ok(selection) => self.expand(selection),
                Err(error) => self.reject(error),
            },
            Action::SelectAll => {
                let selection = self.intended_selection().select_all();
                self.expand(selection)
            }
            Action::DeselectAll => {
                self.commit_local(self.selection.deselect_all());
                if let Some(pending) = self.pending.as_mut() {
                    pending.selection = pending.selection.deselect_all();
                }
                Vec::new()
            }
            Action::SetCutoff(cutoff) => {
                self.cutoff = cutoff;
                self.graph = Arc::new(CorrelationGraph::build(
                    self.selection.selected_tickers(),
                    &self.pairs,
                    cutoff,
                ));
                Vec::new()
            }
            Action::CorrelationsLoaded {
                seq,
                records,
                time_received,
            } => self.commit_fetch(seq, &records, time_received),
            Action::CorrelationsFailed { seq, error } => {
                match self.pending.take() {
                    Some(pending) if pending.seq == seq => {
                        warn!(seq, %error, "correlation fetch failed, keeping last dataset");
                        self.error = Some(error);
                    }
                    other => {
                        debug!(seq, "discarding failure of superseded correlation fetch");
                        self.pending = other;
                    }
                }
                Vec::new()
            }
            Action::MetricsLoaded { ticker, metrics } => {
                if self.intended_selection().is_selected(&ticker) {
                    Arc::make_mut(&mut self.metrics).insert(ticker, metrics);
                } else {
                    debug!(%ticker, "discarding metrics for unselected ticker");
                }
                Vec::new()
            }
            Action::MetricsFailed { ticker, error } => {
                debug!(%ticker, %error, "metrics unavailable");
                Vec::new()
            }
            Action::InspectCell { a, b } => {
                if let Some(inspection) = CellInspection::read(&self.matrix, &a, &b) {
                    self.inspection = Some(inspection);
                }
                Vec::new()
            }
            Action::ClearInspection => {
                self.inspection = None;
                Vec::new()
            }
            Action::Reject(error) => self.reject(error),
            Action::DismissError => {
                self.error = None;
                Vec::new()
            }
        }
    }

    fn reject(&mut self, error: EngineError) -> Vec<Effect> {
        debug!(%error, "rejected dashboard action");
        self.error = Some(error);
        Vec::new()
    }

    fn begin_fetch(&mut self, selection: SelectionState) -> Effect {
        self.last_seq += 1;
        let seq = self.last_seq;
        let tickers = selection.selected_tickers().to_vec();

        info!(seq, tickers = tickers.len(), "issuing correlation fetch");
        self.pending = Some(PendingFetch { seq, selection });

        Effect::FetchCorrelations { seq, tickers }
    }

    /// Fetch only if `selection` shows a ticker the intended selection does not.
    fn expand(&mut self, selection: SelectionState) -> Vec<Effect> {
        if self.intended_selection().gains_in(&selection) {
            vec![self.begin_fetch(selection)]
        } else {
            Vec::new()
        }
    }

    /// Apply a shrinking selection change to the committed dataset and to any pending one.
    fn project(
        &mut self,
        ticker: &Ticker,
        shrink: fn(&SelectionState, &Ticker) -> Result<SelectionState, EngineError>,
    ) -> Vec<Effect> {
        let committed = shrink(&self.selection, ticker);
        let pending = self
            .pending
            .as_ref()
            .map(|pending| shrink(&pending.selection, ticker));

        if committed.is_err() && !matches!(pending, Some(Ok(_))) {
            return self.reject(EngineError::UnknownTicker(ticker.clone()));
        }

        if let Ok(selection) = committed {
            self.commit_local(selection);
        }
        if let (Some(pending), Some(Ok(selection))) = (self.pending.as_mut(), pending) {
            pending.selection = selection;
        }

        if !self.intended_selection().contains(ticker) {
            Arc::make_mut(&mut self.metrics).remove(ticker);
        }

        Vec::new()
    }

    /// Project the committed dataset onto a selection with no new tickers.
    fn commit_local(&mut self, selection: SelectionState) {
        let dropped = self
            .selection
            .selected_tickers()
            .iter()
            .filter(|ticker| !selection.is_selected(ticker))
            .cloned()
            .collect::<Vec<_>>();

        for ticker in &dropped {
            self.pairs = Arc::new(self.pairs.without(ticker));
            self.matrix = Arc::new(self.matrix.without(ticker));
            self.graph = Arc::new(self.graph.without(ticker));
        }

        let inspected_dropped = self.inspection.as_ref().is_some_and(|inspection| {
            dropped.contains(&inspection.a) || dropped.contains(&inspection.b)
        });
        if inspected_dropped {
            self.inspection = None;
        }

        self.selection = selection;
    }

    fn commit_fetch(
        &mut self,
        seq: FetchSeq,
        records: &[CorrelationRecord],
        time_received: DateTime<Utc>,
    ) -> Vec<Effect> {
        let pending = match self.pending.take() {
            Some(pending) if pending.seq == seq => pending,
            other => {
                debug!(seq, latest = self.last_seq, "discarding stale correlation response");
                self.pending = other;
                return Vec::new();
            }
        };

        let selection = pending.selection;
        let tickers = selection.selected_tickers();

        let pairs = normalize(records).restrict(tickers);
        self.matrix = Arc::new(CorrelationMatrix::build(tickers, &pairs));
        self.graph = Arc::new(CorrelationGraph::build(tickers, &pairs, self.cutoff));
        self.pairs = Arc::new(pairs);

        self.inspection = self
            .inspection
            .take()
            .and_then(|inspection| CellInspection::read(&self.matrix, &inspection.a, &inspection.b));

        if matches!(self.error, Some(EngineError::Fetch(_))) {
            self.error = None;
        }

        info!(
            seq,
            tickers = tickers.len(),
            pairs = self.pairs.len(),
            edges = self.graph.edges().len(),
            "committed correlation dataset"
        );

        let missing = tickers
            .iter()
            .filter(|ticker| !self.metrics.contains_key(*ticker))
            .cloned()
            .collect::<Vec<_>>();

        self.selection = selection;
        self.loaded = true;
        self.time_updated = Some(time_received);

        if missing.is_empty() {
            Vec::new()
        } else {
            vec![Effect::FetchMetrics { tickers: missing }]
        }
    }
}

/// Borrowed, serialisable rendering of a [`DashboardState`].
#[derive(Debug, Serialize)]
pub struct DashboardView<'a> {
    pub status: FetchStatus,
    pub selection: &'a SelectionState,
    pub intended_selection: &'a SelectionState,
    pub cutoff: f64,
    pub matrix: &'a CorrelationMatrix,
    pub graph: &'a CorrelationGraph,
    pub metrics: BTreeMap<&'a Ticker, &'a StockMetrics>,
    pub inspection: Option<&'a CellInspection>,
    pub error: Option<String>,
    pub time_updated: Option<DateTime<Utc>>,
}
