use dynamic_island::events::IslandEvent;
use dynamic_island::notification::{NotificationBackend, NotificationSource, RawNotification, SourceConfig};
use dynamic_island::queue::EventQueue;
use serial_test::serial;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

fn fast_config() -> SourceConfig {
    SourceConfig {
        poll_interval: Duration::from_millis(5),
        dedup_window: Duration::from_millis(300),
        backoff_initial: Duration::from_millis(5),
        backoff_max: Duration::from_millis(20),
    }
}

/// Scripted backend: fails the first `failures` subscriptions, then hands
/// out one queued batch per poll.
#[derive(Clone, Default)]
struct Scripted {
    failures: Arc<AtomicUsize>,
    subscribes: Arc<AtomicUsize>,
    batches: Arc<Mutex<VecDeque<Vec<RawNotification>>>>,
}

impl Scripted {
    fn queue_batch(&self, batch: Vec<RawNotification>) {
        self.batches.lock().unwrap().push_back(batch);
    }
}

impl NotificationBackend for Scripted {
    fn subscribe(&mut self) -> anyhow::Result<()> {
        self.subscribes.fetch_add(1, Ordering::SeqCst);
        let left = self.failures.load(Ordering::SeqCst);
        if left > 0 {
            self.failures.store(left - 1, Ordering::SeqCst);
            anyhow::bail!("access denied");
        }
        Ok(())
    }

    fn poll(&mut self) -> anyhow::Result<Vec<RawNotification>> {
        Ok(self.batches.lock().unwrap().pop_front().unwrap_or_default())
    }
}

fn wait_for(queue: &EventQueue, count: usize) -> Vec<IslandEvent> {
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut events = Vec::new();
    while events.len() < count && Instant::now() < deadline {
        if let Ok(Some(event)) = queue.recv_timeout(Duration::from_millis(50)) {
            events.push(event);
        }
    }
    events
}

#[test]
#[serial]
fn recovers_after_denied_subscription() {
    let backend = Scripted::default();
    backend.failures.store(3, Ordering::SeqCst);
    backend.queue_batch(vec![RawNotification::new("WhatsApp", "Alice", "Hi")]);
    let subscribes = Arc::clone(&backend.subscribes);

    let queue = EventQueue::new(16);
    let mut source = NotificationSource::new(fast_config(), Box::new(backend));
    source.start(queue.sender());

    let events = wait_for(&queue, 1);
    source.stop();

    assert_eq!(events.len(), 1);
    match &events[0] {
        IslandEvent::Notification(record) => assert_eq!(record.title, "Alice"),
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(subscribes.load(Ordering::SeqCst), 4);
}

#[test]
#[serial]
fn duplicate_deliveries_are_collapsed() {
    let backend = Scripted::default();
    backend.queue_batch(vec![
        RawNotification::new("WhatsApp", "Alice", "Hi"),
        RawNotification::new("WhatsApp", " Alice ", "hi"),
        RawNotification::new("Mail", "Bob", "Lunch?"),
    ]);
    backend.queue_batch(vec![RawNotification::new("WhatsApp", "Alice", "Hi")]);

    let queue = EventQueue::new(16);
    let mut source = NotificationSource::new(fast_config(), Box::new(backend));
    source.start(queue.sender());
    let events = wait_for(&queue, 2);
    // Give the second batch time to be polled and rejected.
    std::thread::sleep(Duration::from_millis(50));
    source.stop();

    let titles: Vec<String> = events
        .into_iter()
        .chain(queue.drain())
        .filter_map(|e| match e {
            IslandEvent::Notification(r) => Some(r.title),
            _ => None,
        })
        .collect();
    assert_eq!(titles, vec!["Alice", "Bob"]);
}

#[test]
#[serial]
fn stop_joins_worker_and_allows_restart() {
    let backend = Scripted::default();
    let queue = EventQueue::new(4);
    let mut source = NotificationSource::new(fast_config(), Box::new(backend.clone()));

    source.start(queue.sender());
    assert!(source.is_running());
    source.stop();
    assert!(!source.is_running());

    backend.queue_batch(vec![RawNotification::new("Mail", "Again", "")]);
    source.start(queue.sender());
    let events = wait_for(&queue, 1);
    source.stop();
    assert_eq!(events.len(), 1);
}

#[test]
#[serial]
fn worker_exits_when_queue_closes() {
    let backend = Scripted::default();
    for _ in 0..50 {
        backend.queue_batch(vec![RawNotification::new("Mail", "x", "")]);
    }
    let queue = EventQueue::new(4);
    queue.close();
    let mut source = NotificationSource::new(fast_config(), Box::new(backend));
    source.start(queue.sender());
    std::thread::sleep(Duration::from_millis(50));
    // Must not hang even though the worker already returned.
    source.stop();
    assert!(!source.is_running());
}
