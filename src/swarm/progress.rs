//! Gather progress counter
//!
//! The only state shared between concurrently running fetch tasks. Completing
//! tasks bump `completed`; monitors read it at any time without locking.

use std::sync::atomic::{AtomicUsize, Ordering};

/// Monotonic progress of one gather run.
#[derive(Debug, Default)]
pub struct GatherProgress {
    completed: AtomicUsize,
    total: AtomicUsize,
}

impl GatherProgress {
    /// Create an idle counter (0 of 0).
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a run over `total` domains.
    pub(crate) fn begin(&self, total: usize) {
        self.completed.store(0, Ordering::SeqCst);
        self.total.store(total, Ordering::SeqCst);
    }

    /// Record one finished domain, returning the new completed count.
    pub(crate) fn complete_one(&self) -> usize {
        self.completed.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Domains finished so far.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    /// Domains in the current run.
    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    /// `(completed / total) * 100`; 0 before a run starts.
    pub fn percent(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        (self.completed().min(total) as f64 / total as f64) * 100.0
    }

    /// Whether every domain of the current run has finished.
    pub fn is_complete(&self) -> bool {
        let total = self.total();
        total > 0 && self.completed() >= total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_idle_progress_is_zero() {
        let progress = GatherProgress::new();
        assert_eq!(progress.percent(), 0.0);
        assert!(!progress.is_complete());
    }

    #[test]
    fn test_percent_advances() {
        let progress = GatherProgress::new();
        progress.begin(4);
        assert_eq!(progress.complete_one(), 1);
        assert!((progress.percent() - 25.0).abs() < f64::EPSILON);
        progress.complete_one();
        progress.complete_one();
        progress.complete_one();
        assert!((progress.percent() - 100.0).abs() < f64::EPSILON);
        assert!(progress.is_complete());
    }

    #[tokio::test]
    async fn test_concurrent_completions_are_counted() {
        let progress = Arc::new(GatherProgress::new());
        progress.begin(64);

        let mut handles = Vec::new();
        for _ in 0..64 {
            let progress = progress.clone();
            handles.push(tokio::spawn(async move {
                progress.complete_one();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(progress.completed(), 64);
        assert!(progress.is_complete());
    }
}
