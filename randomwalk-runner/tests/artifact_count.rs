//! Property test: every dispatched job leaves exactly one artifact.
//!
//! The completion barrier relies on this, so it is checked for arbitrary
//! mixes of known, unknown and short-history symbols and pool sizes.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use randomwalk_core::data::InMemoryProvider;
use randomwalk_core::domain::run_namespace;
use randomwalk_core::{HistoricalSeries, PathSimulator, RunId};
use randomwalk_runner::{
    ArtifactStore, CompletionMonitor, InMemoryArtifactStore, PollSchedule, SimulationJob,
    WorkerPool,
};

#[derive(Debug, Clone, Copy)]
enum Kind {
    Good,
    Unknown,
    LateStart,
    TooShort,
}

fn arb_kind() -> impl Strategy<Value = Kind> {
    prop_oneof![
        Just(Kind::Good),
        Just(Kind::Unknown),
        Just(Kind::LateStart),
        Just(Kind::TooShort),
    ]
}

fn series(symbol: &str, first: NaiveDate, n: usize) -> HistoricalSeries {
    HistoricalSeries::from_pairs(
        symbol,
        (0..n).map(|i| {
            let close = 50.0 + (i as f64 * 0.3).sin() * 5.0;
            (first + Duration::days(i as i64), close)
        }),
    )
    .unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn artifacts_written_equals_jobs_dispatched(
        kinds in prop::collection::vec(arb_kind(), 0..24),
        workers in 1usize..6,
    ) {
        let start = NaiveDate::from_ymd_opt(2017, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2019, 1, 1).unwrap();

        let mut provider = InMemoryProvider::new();
        let mut symbols = Vec::new();
        for (i, kind) in kinds.iter().enumerate() {
            let symbol = format!("S{i}");
            match kind {
                Kind::Good => provider.insert(series(&symbol, start, 60)),
                Kind::Unknown => {}
                Kind::LateStart => provider.insert(series(&symbol, start + Duration::days(30), 60)),
                Kind::TooShort => provider.insert(series(&symbol, start, 2)),
            }
            symbols.push(symbol);
        }

        let store = InMemoryArtifactStore::new();
        let jobs = SimulationJob::for_symbols(&symbols, start, end);
        let summary = WorkerPool::new(workers)
            .with_simulator(PathSimulator::new(2))
            .run(&jobs, &provider, &store, &RunId::for_window(start, end))
            .unwrap();

        let namespace = run_namespace(start, end);
        prop_assert_eq!(summary.jobs(), kinds.len());
        prop_assert_eq!(store.count(&namespace).unwrap(), kinds.len());
        prop_assert_eq!(
            summary.succeeded + summary.data_unavailable + summary.date_range_mismatch,
            kinds.len()
        );

        let fast = PollSchedule {
            initial: std::time::Duration::from_millis(1),
            max: std::time::Duration::from_millis(1),
            factor: 2,
        };
        let report = CompletionMonitor::new(&store, namespace, kinds.len())
            .with_schedule(fast)
            .wait()
            .unwrap();
        prop_assert!(report.is_complete());
    }
}
