use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Counters for a sync run, safe to bump from concurrently running drafts
///
/// Every input draft is counted as processed once. Each then ends up in
/// exactly one of created, updated, failed, or none of them when its diff
/// was empty or a callback suppressed the operation.
#[derive(Debug)]
pub struct SyncStatistics {
    label: String,
    processed: AtomicUsize,
    created: AtomicUsize,
    updated: AtomicUsize,
    failed: AtomicUsize,
    processing_nanos: AtomicU64,
}

impl SyncStatistics {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            processed: AtomicUsize::new(0),
            created: AtomicUsize::new(0),
            updated: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            processing_nanos: AtomicU64::new(0),
        }
    }

    pub fn increment_processed(&self, count: usize) {
        self.processed.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_updated(&self) {
        self.updated.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_processing_time(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.processing_nanos.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }

    pub fn updated(&self) -> usize {
        self.updated.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::Relaxed)
    }

    /// Processed drafts that needed no write
    pub fn unchanged(&self) -> usize {
        self.processed()
            .saturating_sub(self.created() + self.updated() + self.failed())
    }

    /// Total time spent inside `sync` calls
    pub fn processing_time(&self) -> Duration {
        Duration::from_nanos(self.processing_nanos.load(Ordering::Relaxed))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn report(&self) -> String {
        format!(
            "Summary: {} {} were processed in total ({} created, {} updated and {} {} failed to sync).",
            self.processed(),
            self.label,
            self.created(),
            self.updated(),
            self.failed(),
            self.label
        )
    }
}

impl Default for SyncStatistics {
    fn default() -> Self {
        Self::new("resources")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_report_format() {
        let stats = SyncStatistics::new("products");
        stats.increment_processed(3);
        stats.increment_updated();
        stats.increment_failed();
        stats.increment_failed();

        assert_eq!(
            stats.report(),
            "Summary: 3 products were processed in total (0 created, 1 updated and 2 products failed to sync)."
        );
        assert_eq!(stats.unchanged(), 0);
    }

    #[test]
    fn test_unchanged_is_remainder() {
        let stats = SyncStatistics::default();
        stats.increment_processed(5);
        stats.increment_created();
        stats.increment_updated();
        assert_eq!(stats.unchanged(), 3);
    }

    #[test]
    fn test_processing_time_accumulates() {
        let stats = SyncStatistics::default();
        stats.add_processing_time(Duration::from_millis(40));
        stats.add_processing_time(Duration::from_millis(2));
        assert_eq!(stats.processing_time(), Duration::from_millis(42));
    }

    #[test]
    fn test_concurrent_increments() {
        let stats = Arc::new(SyncStatistics::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let stats = stats.clone();
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        stats.increment_processed(1);
                        stats.increment_created();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stats.processed(), 8000);
        assert_eq!(stats.created(), 8000);
    }
}
