use crate::events::NotificationRecord;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Collapses repeated deliveries of the same notification.
///
/// The window is anchored at the first emission of a key: copies arriving
/// before it elapses are swallowed and do not extend it.
#[derive(Debug)]
pub struct Deduplicator {
    window: Duration,
    seen: HashMap<String, Instant>,
}

impl Deduplicator {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            seen: HashMap::new(),
        }
    }

    /// Returns `true` when the record should be emitted.
    pub fn admit(&mut self, record: &NotificationRecord) -> bool {
        let now = record.received_at;
        let window = self.window;
        self.seen
            .retain(|_, first| now.saturating_duration_since(*first) < window);
        if self.seen.contains_key(&record.dedup_key) {
            tracing::debug!(app = %record.source_app, "duplicate notification suppressed");
            return false;
        }
        if !window.is_zero() {
            self.seen.insert(record.dedup_key.clone(), now);
        }
        true
    }

    pub fn tracked(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(title: &str, at: Instant) -> NotificationRecord {
        NotificationRecord::new("Mail", title, "body", at)
    }

    #[test]
    fn duplicates_inside_window_collapse() {
        let t0 = Instant::now();
        let mut dedup = Deduplicator::new(Duration::from_millis(300));
        assert!(dedup.admit(&record("a", t0)));
        assert!(!dedup.admit(&record("a", t0 + Duration::from_millis(100))));
        assert!(!dedup.admit(&record("a", t0 + Duration::from_millis(299))));
        assert!(dedup.admit(&record("b", t0 + Duration::from_millis(150))));
    }

    #[test]
    fn window_does_not_slide_on_duplicates() {
        let t0 = Instant::now();
        let mut dedup = Deduplicator::new(Duration::from_millis(300));
        assert!(dedup.admit(&record("a", t0)));
        assert!(!dedup.admit(&record("a", t0 + Duration::from_millis(200))));
        assert!(dedup.admit(&record("a", t0 + Duration::from_millis(300))));
    }

    #[test]
    fn expired_keys_are_pruned() {
        let t0 = Instant::now();
        let mut dedup = Deduplicator::new(Duration::from_millis(50));
        dedup.admit(&record("a", t0));
        dedup.admit(&record("b", t0));
        assert_eq!(dedup.tracked(), 2);
        dedup.admit(&record("c", t0 + Duration::from_millis(60)));
        assert_eq!(dedup.tracked(), 1);
    }

    #[test]
    fn zero_window_disables_suppression() {
        let t0 = Instant::now();
        let mut dedup = Deduplicator::new(Duration::ZERO);
        assert!(dedup.admit(&record("a", t0)));
        assert!(dedup.admit(&record("a", t0)));
    }
}
