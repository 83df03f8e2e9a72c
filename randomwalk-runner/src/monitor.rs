//! Completion barrier over a shared artifact namespace.
//!
//! Jobs on any number of machines each leave exactly one artifact in the run
//! namespace, so the run is done when the artifact count reaches the number
//! of dispatched jobs. The monitor polls the count with capped exponential
//! backoff.
//!
//! Precondition: the namespace holds no unrelated artifacts before dispatch.
//! Leftovers from an earlier run are counted like fresh ones and make the
//! barrier release early. [`CompletionMonitor::preexisting_artifacts`] lets
//! the caller check before dispatching; the monitor never deletes anything.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::MonitorSettings;
use crate::store::{ArtifactStore, StoreError};

/// Shortest delay between two store queries built from settings.
pub const MIN_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("artifact store query failed {failures} times in a row: {source}")]
    Store {
        failures: u32,
        #[source]
        source: StoreError,
    },
}

/// Expected vs observed artifact counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionBarrier {
    expected: usize,
    observed: usize,
}

impl CompletionBarrier {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            observed: 0,
        }
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn observed(&self) -> usize {
        self.observed
    }

    /// Replace the observed count with a fresh store count.
    /// Returns true once the barrier is complete.
    pub fn observe(&mut self, count: usize) -> bool {
        self.observed = count;
        self.is_complete()
    }

    /// Add `n` locally known completions.
    pub fn record(&mut self, n: usize) -> bool {
        self.observed = self.observed.saturating_add(n);
        self.is_complete()
    }

    pub fn is_complete(&self) -> bool {
        self.observed >= self.expected
    }

    pub fn remaining(&self) -> usize {
        self.expected.saturating_sub(self.observed)
    }
}

/// Capped exponential backoff between polls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSchedule {
    pub initial: Duration,
    pub max: Duration,
    pub factor: u32,
}

impl Default for PollSchedule {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(5),
            factor: 2,
        }
    }
}

impl PollSchedule {
    /// Intervals are floored at [`MIN_POLL`] so unchecked settings cannot
    /// spin on the store.
    pub fn from_settings(settings: &MonitorSettings) -> Self {
        Self {
            initial: settings.initial_poll().max(MIN_POLL),
            max: settings.max_poll().max(MIN_POLL),
            factor: settings.backoff_factor,
        }
    }

    /// The delay that follows `current`.
    pub fn next(&self, current: Duration) -> Duration {
        current.saturating_mul(self.factor.max(1)).min(self.max)
    }

    /// Delays in order: initial, initial × factor, ... capped at max.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        std::iter::successors(Some(self.initial.min(self.max)), move |d| Some(self.next(*d)))
    }
}

/// How a wait ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionReport {
    Complete {
        observed: usize,
        expected: usize,
        elapsed: Duration,
        polls: u32,
    },
    /// `max_wait` elapsed first. Some job never left its artifact.
    TimedOut {
        observed: usize,
        expected: usize,
        elapsed: Duration,
        polls: u32,
    },
}

impl CompletionReport {
    pub fn is_complete(&self) -> bool {
        matches!(self, CompletionReport::Complete { .. })
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            CompletionReport::Complete { elapsed, .. } | CompletionReport::TimedOut { elapsed, .. } => {
                *elapsed
            }
        }
    }

    pub fn observed(&self) -> usize {
        match self {
            CompletionReport::Complete { observed, .. } | CompletionReport::TimedOut { observed, .. } => {
                *observed
            }
        }
    }

    pub fn expected(&self) -> usize {
        match self {
            CompletionReport::Complete { expected, .. } | CompletionReport::TimedOut { expected, .. } => {
                *expected
            }
        }
    }
}

/// Polls a store namespace until the barrier completes.
pub struct CompletionMonitor<'a> {
    store: &'a dyn ArtifactStore,
    namespace: String,
    expected: usize,
    schedule: PollSchedule,
    max_wait: Option<Duration>,
    max_query_failures: u32,
}

impl<'a> CompletionMonitor<'a> {
    pub fn new(store: &'a dyn ArtifactStore, namespace: impl Into<String>, expected: usize) -> Self {
        let defaults = MonitorSettings::default();
        Self {
            store,
            namespace: namespace.into(),
            expected,
            schedule: PollSchedule::default(),
            max_wait: None,
            max_query_failures: defaults.max_query_failures,
        }
    }

    pub fn with_settings(mut self, settings: &MonitorSettings) -> Self {
        self.schedule = PollSchedule::from_settings(settings);
        self.max_wait = settings.max_wait();
        self.max_query_failures = settings.max_query_failures.max(1);
        self
    }

    pub fn with_schedule(mut self, schedule: PollSchedule) -> Self {
        self.schedule = schedule;
        self
    }

    pub fn with_max_wait(mut self, max_wait: Option<Duration>) -> Self {
        self.max_wait = max_wait;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Artifacts already in the namespace. Non-zero before dispatch means the
    /// barrier will release early.
    pub fn preexisting_artifacts(&self) -> Result<usize, StoreError> {
        self.store.count(&self.namespace)
    }

    /// Block until `observed >= expected`, `max_wait` passes, or the store
    /// keeps failing.
    pub fn wait(&self) -> Result<CompletionReport, MonitorError> {
        let started = Instant::now();
        let mut barrier = CompletionBarrier::new(self.expected);
        let mut delay = self.schedule.initial.min(self.schedule.max);
        let mut polls = 0u32;
        let mut consecutive_failures = 0u32;

        info!(
            namespace = %self.namespace,
            expected = self.expected,
            "waiting for artifacts"
        );

        loop {
            polls += 1;
            match self.store.count(&self.namespace) {
                Ok(count) => {
                    consecutive_failures = 0;
                    let previous = barrier.observed();
                    if barrier.observe(count) {
                        let elapsed = started.elapsed();
                        info!(
                            observed = count,
                            expected = self.expected,
                            elapsed_ms = elapsed.as_millis() as u64,
                            polls,
                            "all artifacts present"
                        );
                        return Ok(CompletionReport::Complete {
                            observed: count,
                            expected: self.expected,
                            elapsed,
                            polls,
                        });
                    }
                    if count != previous {
                        info!(observed = count, expected = self.expected, "progress");
                    } else {
                        debug!(observed = count, remaining = barrier.remaining(), "no change");
                    }
                }
                Err(e) => {
                    consecutive_failures += 1;
                    if consecutive_failures >= self.max_query_failures {
                        return Err(MonitorError::Store {
                            failures: consecutive_failures,
                            source: e,
                        });
                    }
                    warn!(
                        error = %e,
                        failures = consecutive_failures,
                        "artifact count query failed, retrying"
                    );
                }
            }

            let elapsed = started.elapsed();
            let sleep_for = match self.max_wait {
                Some(max_wait) if elapsed >= max_wait => {
                    warn!(
                        observed = barrier.observed(),
                        expected = self.expected,
                        elapsed_ms = elapsed.as_millis() as u64,
                        "gave up waiting for artifacts"
                    );
                    return Ok(CompletionReport::TimedOut {
                        observed: barrier.observed(),
                        expected: self.expected,
                        elapsed,
                        polls,
                    });
                }
                Some(max_wait) => delay.min(max_wait - elapsed),
                None => delay,
            };
            std::thread::sleep(sleep_for);
            delay = self.schedule.next(delay);
        }
    }
}
