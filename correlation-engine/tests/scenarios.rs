use correlation_engine::{
    Action, CorrelationGraph, CorrelationMatrix, CorrelationRecord, Cutoff, DashboardState,
    Effect, FetchStatus, PairMap, Ticker, TickerPair, normalize,
};
use chrono::{DateTime, Utc};
use itertools::{Itertools, iproduct};
use std::collections::HashSet;

fn ticker(symbol: &str) -> Ticker {
    Ticker::parse(symbol).unwrap()
}

fn tickers(symbols: &[&str]) -> Vec<Ticker> {
    symbols.iter().map(|symbol| ticker(symbol)).collect()
}

fn records(raw: &[(&str, &str, f64)]) -> Vec<CorrelationRecord> {
    raw.iter()
        .map(|(a, b, value)| CorrelationRecord::new(ticker(a), ticker(b), *value))
        .collect()
}

fn cutoff(value: f64) -> Cutoff {
    Cutoff::new(value).unwrap()
}

fn build(
    selected: &[&str],
    raw: &[(&str, &str, f64)],
    cutoff_value: f64,
) -> (PairMap, CorrelationMatrix, CorrelationGraph) {
    let selected = tickers(selected);
    let pairs = normalize(&records(raw));
    let matrix = CorrelationMatrix::build(&selected, &pairs);
    let graph = CorrelationGraph::build(&selected, &pairs, cutoff(cutoff_value));
    (pairs, matrix, graph)
}

fn edge_set(graph: &CorrelationGraph) -> HashSet<TickerPair> {
    graph.edge_pairs().into_iter().collect()
}

/// Every off-diagonal pair of a five ticker universe, with a few gaps and a duplicate.
fn universe() -> Vec<(&'static str, &'static str, f64)> {
    vec![
        ("AAPL", "MSFT", 0.82),
        ("AAPL", "GOOGL", 0.71),
        ("AAPL", "AMZN", 0.64),
        ("AAPL", "META", -0.12),
        ("MSFT", "GOOGL", 0.55),
        ("MSFT", "AMZN", 0.47),
        ("GOOGL", "MSFT", 0.55),
        ("GOOGL", "AMZN", -0.68),
        ("AMZN", "META", 0.31),
    ]
}

const UNIVERSE_TICKERS: [&str; 5] = ["AAPL", "MSFT", "GOOGL", "AMZN", "META"];

#[test]
fn test_single_ticker_without_data() {
    let (_, matrix, graph) = build(&["AAPL"], &[], 0.5);

    assert_eq!(matrix.cells(), &[vec![Some(1.0)]]);
    assert_eq!(graph.nodes().len(), 1);
    assert_eq!(graph.nodes()[0].id, ticker("AAPL"));
    assert!(graph.edges().is_empty());
}

#[test]
fn test_pair_against_cutoff() {
    struct TestCase {
        cutoff: f64,
        expected_edges: usize,
    }

    let tests = vec![
        TestCase {
            // TC0: coefficient clears the cutoff
            cutoff: 0.6,
            expected_edges: 1,
        },
        TestCase {
            // TC1: coefficient below the cutoff
            cutoff: 0.9,
            expected_edges: 0,
        },
    ];

    for (index, test) in tests.into_iter().enumerate() {
        let (_, matrix, graph) = build(&["AAPL", "MSFT"], &[("AAPL", "MSFT", 0.8)], test.cutoff);

        assert_eq!(
            matrix.cells(),
            &[vec![Some(1.0), Some(0.8)], vec![Some(0.8), Some(1.0)]],
            "TC{} failed",
            index
        );
        assert_eq!(graph.edges().len(), test.expected_edges, "TC{} failed", index);
        assert_eq!(graph.nodes().len(), 2, "TC{} failed", index);
    }

    let (_, _, graph) = build(&["AAPL", "MSFT"], &[("AAPL", "MSFT", 0.8)], 0.6);
    let edge = &graph.edges()[0];
    assert_eq!((&edge.source, &edge.target), (&ticker("AAPL"), &ticker("MSFT")));
    assert_eq!(edge.value, 0.8);
}

#[test]
fn test_reversed_duplicate_is_one_pair() {
    let (pairs, matrix, graph) = build(
        &["AAPL", "MSFT"],
        &[("AAPL", "MSFT", 0.8), ("MSFT", "AAPL", 0.8)],
        0.5,
    );

    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs.get(&ticker("MSFT"), &ticker("AAPL")), Some(0.8));
    assert_eq!(matrix.value(&ticker("AAPL"), &ticker("MSFT")), Some(0.8));
    assert_eq!(graph.edges().len(), 1);
}

#[test]
fn test_remove_projects_submatrix_without_fetching() {
    let raw = records(&[
        ("AAPL", "MSFT", 0.8),
        ("AAPL", "GOOGL", 0.7),
        ("MSFT", "GOOGL", 0.5),
    ]);
    let time = DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap();

    let start = DashboardState::start(tickers(&["AAPL", "MSFT", "GOOGL"]), cutoff(0.5));
    let ready = start
        .state
        .reduce(Action::CorrelationsLoaded {
            seq: 1,
            records: raw.clone(),
            time_received: time,
        })
        .state;
    let original = ready.matrix().clone();

    let removed = ready.reduce(Action::Remove(ticker("MSFT")));
    assert!(
        !removed
            .effects
            .iter()
            .any(|effect| matches!(effect, Effect::FetchCorrelations { .. }))
    );
    assert_eq!(removed.state.status(), FetchStatus::Ready);

    let reduced = tickers(&["AAPL", "GOOGL"]);
    let matrix = removed.state.matrix();
    assert_eq!(matrix.tickers(), reduced.as_slice());
    for (a, b) in iproduct!(&reduced, &reduced) {
        assert_eq!(matrix.value(a, b), original.value(a, b), "{a}/{b}");
    }

    // Identical to building fresh from the same records
    let fresh = CorrelationMatrix::build(&reduced, &normalize(&raw));
    assert_eq!(**matrix, fresh);
}

#[test]
fn test_empty_selection() {
    let (_, matrix, graph) = build(&[], &[("AAPL", "MSFT", 0.8)], 0.5);

    assert!(matrix.is_empty());
    assert!(matrix.cells().is_empty());
    assert!(graph.nodes().is_empty());
    assert!(graph.edges().is_empty());
}

#[test]
fn test_empty_response_gives_null_matrix() {
    let (_, matrix, graph) = build(&["AAPL", "MSFT", "GOOGL"], &[], 0.0);

    for (row, col) in iproduct!(0..3, 0..3) {
        let expected = (row == col).then_some(1.0);
        assert_eq!(matrix.cell(row, col), expected, "[{row}][{col}]");
    }
    assert_eq!(graph.nodes().len(), 3);
    assert!(graph.edges().is_empty());
}

#[test]
fn test_matrix_symmetry_and_diagonal() {
    // Every non-empty subset of the universe
    for size in 1..=UNIVERSE_TICKERS.len() {
        for subset in UNIVERSE_TICKERS.iter().copied().combinations(size) {
            let (_, matrix, _) = build(&subset, &universe(), 0.5);

            for (i, j) in iproduct!(0..size, 0..size) {
                assert_eq!(matrix.cell(i, j), matrix.cell(j, i), "{subset:?} [{i}][{j}]");
            }
            for i in 0..size {
                assert_eq!(matrix.cell(i, i), Some(1.0), "{subset:?} [{i}][{i}]");
            }
        }
    }

    for order in ["AAPL", "GOOGL", "AMZN"].into_iter().permutations(3) {
        let (_, matrix, _) = build(&order, &universe(), 0.5);
        assert_eq!(
            matrix.value(&ticker("GOOGL"), &ticker("AMZN")),
            Some(-0.68),
            "{order:?}"
        );
    }
}

#[test]
fn test_missing_pair_is_null_not_zero() {
    let (_, matrix, _) = build(&["MSFT", "META"], &universe(), 0.5);
    assert_eq!(matrix.value(&ticker("MSFT"), &ticker("META")), None);
}

#[test]
fn test_cutoff_monotonicity() {
    let selected = tickers(&UNIVERSE_TICKERS);
    let pairs = normalize(&records(&universe()));
    let cutoffs = (0..=20u32).map(|step| f64::from(step) * 0.05).collect::<Vec<_>>();

    for (low, high) in cutoffs.iter().copied().tuple_combinations() {
        let loose = CorrelationGraph::build(&selected, &pairs, Cutoff::new(low.min(1.0)).unwrap());
        let strict = CorrelationGraph::build(&selected, &pairs, Cutoff::new(high.min(1.0)).unwrap());

        assert!(
            edge_set(&strict).is_subset(&edge_set(&loose)),
            "edges at {high} not within edges at {low}"
        );

        // Survivors keep their relative order
        let survivors = loose
            .edges()
            .iter()
            .filter(|edge| strict.edges().contains(edge))
            .collect::<Vec<_>>();
        assert_eq!(survivors, strict.edges().iter().collect::<Vec<_>>());
    }
}

#[test]
fn test_graph_is_deterministic() {
    let selected = tickers(&UNIVERSE_TICKERS);
    let pairs = normalize(&records(&universe()));

    let first = CorrelationGraph::build(&selected, &pairs, cutoff(0.45));
    let second = CorrelationGraph::build(&selected, &pairs, cutoff(0.45));

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn test_removal_matches_fresh_build() {
    let raw = records(&universe());

    for removed in UNIVERSE_TICKERS {
        let removed = ticker(removed);
        let full = tickers(&UNIVERSE_TICKERS);
        let reduced = full
            .iter()
            .filter(|ticker| **ticker != removed)
            .cloned()
            .collect::<Vec<_>>();

        let pairs = normalize(&raw);
        let projected = CorrelationMatrix::build(&full, &pairs).without(&removed);
        let fresh = CorrelationMatrix::build(&reduced, &pairs.restrict(&reduced));
        assert_eq!(projected, fresh, "removing {removed}");

        let projected = CorrelationGraph::build(&full, &pairs, cutoff(0.3)).without(&removed);
        let fresh = CorrelationGraph::build(&reduced, &pairs, cutoff(0.3));
        assert_eq!(projected, fresh, "removing {removed}");
    }
}
