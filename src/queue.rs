use crate::error::IslandError;
use crate::events::IslandEvent;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::{Duration, Instant};

pub const DEFAULT_CAPACITY: usize = 64;

type PushHook = Box<dyn Fn() + Send + Sync>;

struct Inner {
    items: VecDeque<IslandEvent>,
    closed: bool,
}

struct Shared {
    capacity: usize,
    inner: Mutex<Inner>,
    ready: Condvar,
    dropped: AtomicU64,
    on_push: Mutex<Option<PushHook>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panicking producer must not take the consumer down with it.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Consumer end of the queue.
pub struct EventQueue {
    shared: Arc<Shared>,
}

/// Cloneable producer handle.
#[derive(Clone)]
pub struct EventSender {
    shared: Arc<Shared>,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            shared: Arc::new(Shared {
                capacity,
                inner: Mutex::new(Inner {
                    items: VecDeque::with_capacity(capacity),
                    closed: false,
                }),
                ready: Condvar::new(),
                dropped: AtomicU64::new(0),
                on_push: Mutex::new(None),
            }),
        }
    }

    pub fn sender(&self) -> EventSender {
        EventSender {
            shared: Arc::clone(&self.shared),
        }
    }

    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    pub fn len(&self) -> usize {
        self.shared.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of events discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Install a callback run after every successful push, used to wake a
    /// UI loop that is not blocked on the queue.
    pub fn set_on_push<F>(&self, hook: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut slot = self
            .shared
            .on_push
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(Box::new(hook));
    }

    pub fn try_recv(&self) -> Option<IslandEvent> {
        self.shared.lock().items.pop_front()
    }

    /// Wait up to `timeout` for the next event.
    ///
    /// Returns `Err(QueueClosed)` once the queue is closed and empty.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<IslandEvent>, IslandError> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.shared.lock();
        loop {
            if let Some(event) = inner.items.pop_front() {
                return Ok(Some(event));
            }
            if inner.closed {
                return Err(IslandError::QueueClosed);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }
            let (guard, _) = self
                .shared
                .ready
                .wait_timeout(inner, deadline - now)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            inner = guard;
        }
    }

    /// Take everything currently queued, oldest first.
    pub fn drain(&self) -> Vec<IslandEvent> {
        self.shared.lock().items.drain(..).collect()
    }

    /// Reject further pushes and wake any waiting consumer.
    pub fn close(&self) {
        self.shared.lock().closed = true;
        self.shared.ready.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }
}

impl EventSender {
    /// Enqueue without blocking, evicting the oldest event when full.
    pub fn push(&self, event: impl Into<IslandEvent>) -> Result<(), IslandError> {
        let event = event.into();
        {
            let mut inner = self.shared.lock();
            if inner.closed {
                return Err(IslandError::QueueClosed);
            }
            if inner.items.len() >= self.shared.capacity {
                inner.items.pop_front();
                let dropped = self.shared.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::debug!(error = %IslandError::QueueOverflow { dropped }, "dropped oldest event");
            }
            inner.items.push_back(event);
        }
        self.shared.ready.notify_one();
        if let Ok(hook) = self.shared.on_push.lock() {
            if let Some(hook) = hook.as_ref() {
                hook();
            }
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::CommandEvent;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn overflow_keeps_newest_events() {
        let queue = EventQueue::new(3);
        let tx = queue.sender();
        for cmd in [
            CommandEvent::MediaNext,
            CommandEvent::MediaPrevious,
            CommandEvent::MediaPlayPause,
            CommandEvent::ToggleVisibility,
            CommandEvent::FireTestNotification,
        ] {
            tx.push(cmd).unwrap();
        }
        assert_eq!(queue.dropped(), 2);
        assert_eq!(
            queue.drain(),
            vec![
                IslandEvent::Command(CommandEvent::MediaPlayPause),
                IslandEvent::Command(CommandEvent::ToggleVisibility),
                IslandEvent::Command(CommandEvent::FireTestNotification),
            ]
        );
    }

    #[test]
    fn close_wakes_waiting_consumer() {
        let queue = EventQueue::new(4);
        let tx = queue.sender();
        let shared = Arc::clone(&queue.shared);
        let closer = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            shared.lock().closed = true;
            shared.ready.notify_all();
        });
        let result = queue.recv_timeout(Duration::from_secs(5));
        closer.join().unwrap();
        assert_eq!(result, Err(IslandError::QueueClosed));
        assert_eq!(tx.push(CommandEvent::MediaNext), Err(IslandError::QueueClosed));
    }

    #[test]
    fn push_hook_runs_for_each_event() {
        let queue = EventQueue::new(2);
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        queue.set_on_push(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let tx = queue.sender();
        tx.push(CommandEvent::MediaNext).unwrap();
        tx.push(CommandEvent::MediaNext).unwrap();
        tx.push(CommandEvent::MediaNext).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn recv_timeout_returns_none_when_idle() {
        let queue = EventQueue::new(2);
        assert_eq!(queue.recv_timeout(Duration::from_millis(5)), Ok(None));
    }
}
