//! Async dispatcher driving a [`DashboardState`] against a [`CorrelationService`].
//!
//! User commands are reduced immediately. [`Effect`]s are run on spawned tasks that
//! report back over an mpsc channel; the owner feeds those outcomes back into the
//! reducer with [`Dashboard::poll_outcome`] or [`Dashboard::settle`].

use crate::{
    config::EngineConfig,
    error::EngineError,
    graph::Cutoff,
    service::CorrelationService,
    state::{Action, DashboardState, Effect, Transition},
    ticker::Ticker,
};
use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Actions produced by a single spawned effect.
type Outcome = Vec<Action>;

pub struct Dashboard<Service> {
    service: Arc<Service>,
    state: DashboardState,
    outcome_tx: mpsc::UnboundedSender<Outcome>,
    outcome_rx: mpsc::UnboundedReceiver<Outcome>,
    in_flight: usize,
}

impl<Service> Dashboard<Service>
where
    Service: CorrelationService,
{
    /// Start a session on the configured default tickers and issue the initial fetch.
    pub fn start(service: Service, config: &EngineConfig) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let Transition { state, effects } =
            DashboardState::start(config.default_tickers.clone(), config.default_cutoff);

        info!(
            tickers = config.default_tickers.len(),
            cutoff = config.default_cutoff.value(),
            "starting correlation dashboard"
        );

        let mut dashboard = Self {
            service: Arc::new(service),
            state,
            outcome_tx,
            outcome_rx,
            in_flight: 0,
        };
        dashboard.run_effects(effects);
        dashboard
    }

    pub fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Reduce `action` and run the effects it requests.
    pub fn dispatch(&mut self, action: Action) {
        let Transition { state, effects } = self.state.reduce(action);
        self.state = state;
        self.run_effects(effects);
    }

    /// Validate `input` against the service and add it to the watch list.
    ///
    /// Malformed, duplicate and unknown tickers are surfaced on the state and
    /// returned without touching the selection.
    pub async fn add_ticker(&mut self, input: &str) -> Result<Ticker, EngineError> {
        let ticker = self.parse(input)?;

        if self.state.intended_selection().contains(&ticker) {
            return Err(self.reject(EngineError::DuplicateTicker(ticker)));
        }

        let validation = self.service.validate(&ticker).await;
        match validation {
            Ok(true) => {
                self.dispatch(Action::Add(ticker.clone()));
                Ok(ticker)
            }
            Ok(false) => Err(self.reject(EngineError::InvalidTicker(ticker))),
            Err(error) => Err(self.reject(error)),
        }
    }

    pub fn remove_ticker(&mut self, ticker: Ticker) {
        self.dispatch(Action::Remove(ticker));
    }

    pub fn select(&mut self, ticker: Ticker) {
        self.dispatch(Action::Select(ticker));
    }

    pub fn deselect(&mut self, ticker: Ticker) {
        self.dispatch(Action::Deselect(ticker));
    }

    pub fn select_all(&mut self) {
        self.dispatch(Action::SelectAll);
    }

    pub fn deselect_all(&mut self) {
        self.dispatch(Action::DeselectAll);
    }

    /// Set the graph cutoff, rejecting values outside `[0, 1]`.
    pub fn set_cutoff(&mut self, value: f64) -> Result<(), EngineError> {
        let cutoff = Cutoff::new(value).map_err(|error| self.reject(error))?;
        self.dispatch(Action::SetCutoff(cutoff));
        Ok(())
    }

    pub fn inspect(&mut self, a: Ticker, b: Ticker) {
        self.dispatch(Action::InspectCell { a, b });
    }

    pub fn clear_inspection(&mut self) {
        self.dispatch(Action::ClearInspection);
    }

    pub fn dismiss_error(&mut self) {
        self.dispatch(Action::DismissError);
    }

    /// True if no spawned effect is still outstanding.
    pub fn is_settled(&self) -> bool {
        self.in_flight == 0
    }

    /// Wait for the next effect outcome and reduce it. Returns false once settled.
    pub async fn poll_outcome(&mut self) -> bool {
        if self.is_settled() {
            return false;
        }

        match self.outcome_rx.recv().await {
            Some(actions) => {
                self.in_flight -= 1;
                for action in actions {
                    self.dispatch(action);
                }
                true
            }
            None => false,
        }
    }

    /// Reduce outcomes until every spawned effect has reported back.
    pub async fn settle(&mut self) {
        while self.poll_outcome().await {}
    }

    fn parse(&mut self, input: &str) -> Result<Ticker, EngineError> {
        Ticker::parse(input).map_err(|error| self.reject(error))
    }

    fn reject(&mut self, error: EngineError) -> EngineError {
        self.dispatch(Action::Reject(error.clone()));
        error
    }

    fn run_effects(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            self.run_effect(effect);
        }
    }

    fn run_effect(&mut self, effect: Effect) {
        let service = Arc::clone(&self.service);
        let outcome_tx = self.outcome_tx.clone();
        self.in_flight += 1;

        match effect {
            Effect::FetchCorrelations { seq, tickers } => {
                tokio::spawn(async move {
                    let action = match service.correlations(&tickers, &tickers).await {
                        Ok(records) => Action::CorrelationsLoaded {
                            seq,
                            records,
                            time_received: Utc::now(),
                        },
                        Err(error) => Action::CorrelationsFailed { seq, error },
                    };

                    if outcome_tx.send(vec![action]).is_err() {
                        debug!(seq, "dashboard dropped before correlation fetch completed");
                    }
                });
            }
            Effect::FetchMetrics { tickers } => {
                tokio::spawn(async move {
                    let lookups = tickers.iter().map(|ticker| service.metrics(ticker));
                    let results = join_all(lookups).await;
                    let actions = results
                        .into_iter()
                        .zip(tickers)
                        .map(|(result, ticker)| match result {
                            Ok(metrics) => Action::MetricsLoaded { ticker, metrics },
                            Err(error) => Action::MetricsFailed { ticker, error },
                        })
                        .collect::<Vec<_>>();

                    if outcome_tx.send(actions).is_err() {
                        debug!("dashboard dropped before metrics lookup completed");
                    }
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        record::{CorrelationRecord, StockMetrics},
        state::FetchStatus,
        ticker::join_tickers,
    };
    use async_trait::async_trait;
    use std::{
        collections::{HashMap, HashSet},
        sync::Mutex,
    };
    use tokio::sync::oneshot;

    type Response = Result<Vec<CorrelationRecord>, EngineError>;

    #[derive(Default)]
    struct MockInner {
        universe: Vec<CorrelationRecord>,
        gates: HashMap<String, oneshot::Receiver<Response>>,
        correlation_calls: Vec<Vec<Ticker>>,
        unknown: HashSet<Ticker>,
        metrics_failures: HashSet<Ticker>,
    }

    #[derive(Clone, Default)]
    struct MockService {
        inner: Arc<Mutex<MockInner>>,
    }

    impl MockService {
        fn with_universe(universe: Vec<CorrelationRecord>) -> Self {
            let service = Self::default();
            service.inner.lock().unwrap().universe = universe;
            service
        }

        /// Hold the response for a fetch of exactly `tickers` until the sender fires.
        fn gate(&self, tickers: &[Ticker]) -> oneshot::Sender<Response> {
            let (tx, rx) = oneshot::channel();
            self.inner
                .lock()
                .unwrap()
                .gates
                .insert(join_tickers(tickers), rx);
            tx
        }

        fn correlation_calls(&self) -> Vec<Vec<Ticker>> {
            self.inner.lock().unwrap().correlation_calls.clone()
        }
    }

    #[async_trait]
    impl CorrelationService for MockService {
        async fn correlations(
            &self,
            main: &[Ticker],
            _: &[Ticker],
        ) -> Result<Vec<CorrelationRecord>, EngineError> {
            let gate = {
                let mut inner = self.inner.lock().unwrap();
                inner.correlation_calls.push(main.to_vec());
                inner.gates.remove(&join_tickers(main))
            };

            match gate {
                Some(gate) => gate
                    .await
                    .unwrap_or_else(|_| Err(EngineError::Fetch("gate dropped".to_string()))),
                None => Ok(self.inner.lock().unwrap().universe.clone()),
            }
        }

        async fn validate(&self, ticker: &Ticker) -> Result<bool, EngineError> {
            Ok(!self.inner.lock().unwrap().unknown.contains(ticker))
        }

        async fn metrics(&self, ticker: &Ticker) -> Result<StockMetrics, EngineError> {
            if self.inner.lock().unwrap().metrics_failures.contains(ticker) {
                return Err(EngineError::Metrics {
                    ticker: ticker.clone(),
                    reason: "HTTP error: 500 Internal Server Error".to_string(),
                });
            }
            Ok(StockMetrics {
                beta: 1.1,
                returns: 12.5,
            })
        }
    }

    fn ticker(symbol: &str) -> Ticker {
        Ticker::parse(symbol).unwrap()
    }

    fn tickers(symbols: &[&str]) -> Vec<Ticker> {
        symbols.iter().map(|symbol| ticker(symbol)).collect()
    }

    fn record(a: &str, b: &str, value: f64) -> CorrelationRecord {
        CorrelationRecord::new(ticker(a), ticker(b), value)
    }

    fn config(symbols: &[&str]) -> EngineConfig {
        EngineConfig::default().with_default_tickers(tickers(symbols))
    }

    fn universe() -> Vec<CorrelationRecord> {
        vec![
            record("AAPL", "MSFT", 0.8),
            record("AAPL", "GOOGL", 0.7),
            record("MSFT", "GOOGL", 0.5),
        ]
    }

    #[tokio::test]
    async fn test_start_loads_defaults_and_metrics() {
        let service = MockService::with_universe(universe());
        let mut dashboard = Dashboard::start(service.clone(), &config(&["AAPL", "MSFT"]));

        assert_eq!(dashboard.state().status(), FetchStatus::Fetching { seq: 1 });
        dashboard.settle().await;

        let state = dashboard.state();
        assert_eq!(state.status(), FetchStatus::Ready);
        assert_eq!(state.matrix().value(&ticker("AAPL"), &ticker("MSFT")), Some(0.8));
        assert_eq!(state.graph().edges().len(), 1);
        assert!(state.metrics(&ticker("AAPL")).is_some());
        assert!(state.metrics(&ticker("MSFT")).is_some());
        assert_eq!(service.correlation_calls(), vec![tickers(&["AAPL", "MSFT"])]);
    }

    #[tokio::test]
    async fn test_out_of_order_responses_commit_latest() {
        let service = MockService::default();
        let first = service.gate(&tickers(&["AAPL", "MSFT"]));
        let second = service.gate(&tickers(&["AAPL", "MSFT", "GOOGL"]));

        let mut dashboard = Dashboard::start(service.clone(), &config(&["AAPL", "MSFT"]));
        dashboard.add_ticker("googl").await.unwrap();
        assert_eq!(dashboard.state().status(), FetchStatus::Fetching { seq: 2 });

        // Newer response arrives first and is committed
        second.send(Ok(universe())).unwrap();
        assert!(dashboard.poll_outcome().await);
        assert_eq!(dashboard.state().matrix().len(), 3);

        // Older response arrives last and must not overwrite it
        first.send(Ok(vec![record("AAPL", "MSFT", -0.9)])).unwrap();
        dashboard.settle().await;

        let state = dashboard.state();
        assert_eq!(state.status(), FetchStatus::Ready);
        assert_eq!(
            state.matrix().tickers(),
            tickers(&["AAPL", "MSFT", "GOOGL"]).as_slice()
        );
        assert_eq!(state.matrix().value(&ticker("AAPL"), &ticker("MSFT")), Some(0.8));
    }

    #[tokio::test]
    async fn test_add_ticker_rejections() {
        let service = MockService::with_universe(universe());
        service.inner.lock().unwrap().unknown.insert(ticker("ZZZZ"));

        let mut dashboard = Dashboard::start(service.clone(), &config(&["AAPL", "MSFT"]));
        dashboard.settle().await;

        struct TestCase {
            input: &'static str,
            expected: EngineError,
        }

        let tests = vec![
            TestCase {
                // TC0: blank input
                input: "   ",
                expected: EngineError::TickerEmpty,
            },
            TestCase {
                // TC1: already in the watch list, case-insensitively
                input: "msft",
                expected: EngineError::DuplicateTicker(ticker("MSFT")),
            },
            TestCase {
                // TC2: service says the ticker does not exist
                input: "zzzz",
                expected: EngineError::InvalidTicker(ticker("ZZZZ")),
            },
        ];

        for (index, test) in tests.into_iter().enumerate() {
            let actual = dashboard.add_ticker(test.input).await;
            assert_eq!(actual, Err(test.expected.clone()), "TC{} failed", index);
            assert_eq!(dashboard.state().error(), Some(&test.expected), "TC{} failed", index);
            assert!(dashboard.is_settled(), "TC{} failed", index);
        }

        assert_eq!(
            dashboard.state().selection().all_tickers(),
            tickers(&["AAPL", "MSFT"]).as_slice()
        );
        assert_eq!(service.correlation_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_local_changes_skip_network() {
        let service = MockService::with_universe(universe());
        let mut dashboard =
            Dashboard::start(service.clone(), &config(&["AAPL", "MSFT", "GOOGL"]));
        dashboard.settle().await;

        dashboard.remove_ticker(ticker("MSFT"));
        dashboard.set_cutoff(0.75).unwrap();
        dashboard.deselect(ticker("GOOGL"));

        assert!(dashboard.is_settled());
        assert_eq!(service.correlation_calls().len(), 1);

        let state = dashboard.state();
        assert_eq!(state.matrix().tickers(), tickers(&["AAPL"]).as_slice());
        assert!(state.graph().edges().is_empty());
        assert!(state.metrics(&ticker("MSFT")).is_none());

        // Re-selecting a hidden ticker needs its correlations again
        dashboard.select(ticker("GOOGL"));
        assert!(!dashboard.is_settled());
        dashboard.settle().await;
        assert_eq!(
            service.correlation_calls().last(),
            Some(&tickers(&["AAPL", "GOOGL"]))
        );
        assert_eq!(
            dashboard.state().matrix().value(&ticker("AAPL"), &ticker("GOOGL")),
            Some(0.7)
        );
    }

    #[tokio::test]
    async fn test_invalid_cutoff_is_rejected() {
        let service = MockService::with_universe(universe());
        let mut dashboard = Dashboard::start(service, &config(&["AAPL", "MSFT"]));
        dashboard.settle().await;

        assert_eq!(
            dashboard.set_cutoff(1.5),
            Err(EngineError::CutoffOutOfRange(1.5))
        );
        assert_eq!(dashboard.state().cutoff().value(), 0.5);

        dashboard.dismiss_error();
        assert_eq!(dashboard.state().error(), None);
    }

    #[tokio::test]
    async fn test_metrics_failure_is_silent() {
        let service = MockService::with_universe(universe());
        service
            .inner
            .lock()
            .unwrap()
            .metrics_failures
            .insert(ticker("MSFT"));

        let mut dashboard = Dashboard::start(service, &config(&["AAPL", "MSFT"]));
        dashboard.settle().await;

        let state = dashboard.state();
        assert_eq!(state.error(), None);
        assert!(state.metrics(&ticker("AAPL")).is_some());
        assert!(state.metrics(&ticker("MSFT")).is_none());
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_dataset() {
        let service = MockService::with_universe(universe());
        let mut dashboard = Dashboard::start(service.clone(), &config(&["AAPL", "MSFT"]));
        dashboard.settle().await;

        let gate = service.gate(&tickers(&["AAPL", "MSFT", "GOOGL"]));
        dashboard.add_ticker("GOOGL").await.unwrap();
        gate.send(Err(EngineError::Fetch("HTTP error: 502 Bad Gateway".to_string())))
            .unwrap();
        dashboard.settle().await;

        let state = dashboard.state();
        assert_eq!(state.status(), FetchStatus::Ready);
        assert_eq!(state.matrix().tickers(), tickers(&["AAPL", "MSFT"]).as_slice());
        assert!(matches!(state.error(), Some(EngineError::Fetch(_))));
    }
}
