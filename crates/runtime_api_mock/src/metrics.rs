use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MockRuntimeMetricsSnapshot {
    pub invocations_enqueued: u64,
    pub invocations_delivered: u64,
    pub active_polls: u64,
    pub polls_rejected_unavailable: u64,
    pub responses_resolved: u64,
    pub function_errors_resolved: u64,
    pub init_errors_received: u64,
    pub unmatched_completions: u64,
    pub undelivered_at_stop: u64,
    pub discarded_after_init_error: u64,
}

/// Runtime counters for assertions on delivery accounting.
/// All counters are lock-free atomics; hot paths must remain O(1).
#[derive(Default)]
pub(crate) struct MockRuntimeMetrics {
    invocations_enqueued: AtomicU64,
    invocations_delivered: AtomicU64,
    polls_rejected_unavailable: AtomicU64,
    responses_resolved: AtomicU64,
    function_errors_resolved: AtomicU64,
    init_errors_received: AtomicU64,
    unmatched_completions: AtomicU64,
    undelivered_at_stop: AtomicU64,
    discarded_after_init_error: AtomicU64,
}

impl MockRuntimeMetrics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_enqueued(&self) {
        self.invocations_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delivered(&self) {
        self.invocations_delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unavailable(&self) {
        self.polls_rejected_unavailable
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_response_resolved(&self) {
        self.responses_resolved.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_function_error_resolved(&self) {
        self.function_errors_resolved
            .fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_init_error(&self) {
        self.init_errors_received.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unmatched_completion(&self) {
        self.unmatched_completions.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_undelivered(&self, count: u64) {
        self.undelivered_at_stop.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_discarded_after_init_error(&self, count: u64) {
        self.discarded_after_init_error
            .fetch_add(count, Ordering::Relaxed);
    }

    /// Build a point-in-time snapshot; `active_polls` comes from the live gauge.
    /// Allocation: none. Complexity: O(1).
    pub(crate) fn snapshot(&self, active_polls: u64) -> MockRuntimeMetricsSnapshot {
        MockRuntimeMetricsSnapshot {
            invocations_enqueued: self.invocations_enqueued.load(Ordering::Relaxed),
            invocations_delivered: self.invocations_delivered.load(Ordering::Relaxed),
            active_polls,
            polls_rejected_unavailable: self.polls_rejected_unavailable.load(Ordering::Relaxed),
            responses_resolved: self.responses_resolved.load(Ordering::Relaxed),
            function_errors_resolved: self.function_errors_resolved.load(Ordering::Relaxed),
            init_errors_received: self.init_errors_received.load(Ordering::Relaxed),
            unmatched_completions: self.unmatched_completions.load(Ordering::Relaxed),
            undelivered_at_stop: self.undelivered_at_stop.load(Ordering::Relaxed),
            discarded_after_init_error: self.discarded_after_init_error.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn snapshot_reflects_recorded_counters() {
        let metrics = MockRuntimeMetrics::new();
        metrics.record_enqueued();
        metrics.record_enqueued();
        metrics.record_delivered();
        metrics.record_unmatched_completion();
        metrics.record_undelivered(1);

        let snapshot = metrics.snapshot(3);
        assert_eq!(
            snapshot,
            MockRuntimeMetricsSnapshot {
                invocations_enqueued: 2,
                invocations_delivered: 1,
                active_polls: 3,
                unmatched_completions: 1,
                undelivered_at_stop: 1,
                ..MockRuntimeMetricsSnapshot::default()
            }
        );
    }
}
