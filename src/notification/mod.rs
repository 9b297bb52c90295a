mod dedup;
#[cfg(windows)]
mod listener;

pub use dedup::Deduplicator;
#[cfg(windows)]
pub use listener::ListenerBackend;

use crate::error::IslandError;
use crate::events::NotificationRecord;
use crate::queue::EventSender;
use crate::settings::Settings;
use chrono::{DateTime, Utc};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// A notification as the platform hands it over.
#[derive(Debug, Clone, PartialEq)]
pub struct RawNotification {
    pub source_app: String,
    pub title: String,
    pub body: String,
    pub posted_at: Option<DateTime<Utc>>,
}

impl RawNotification {
    pub fn new(source_app: impl Into<String>, title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            source_app: source_app.into(),
            title: title.into(),
            body: body.into(),
            posted_at: None,
        }
    }

    pub fn into_record(self, received_at: Instant) -> NotificationRecord {
        let record = NotificationRecord::new(
            self.source_app.trim(),
            self.title.trim(),
            self.body.trim(),
            received_at,
        );
        match self.posted_at {
            Some(posted_at) => record.with_posted_at(posted_at),
            None => record,
        }
    }
}

pub trait NotificationBackend: Send {
    /// Establish the subscription. Called again after any failure.
    fn subscribe(&mut self) -> anyhow::Result<()>;
    /// Notifications that arrived since the previous call.
    fn poll(&mut self) -> anyhow::Result<Vec<RawNotification>>;
}

/// Backend for targets without a supported notification facility.
#[derive(Debug, Default)]
pub struct UnsupportedBackend;

impl NotificationBackend for UnsupportedBackend {
    fn subscribe(&mut self) -> anyhow::Result<()> {
        anyhow::bail!("notification capture is only supported on Windows")
    }

    fn poll(&mut self) -> anyhow::Result<Vec<RawNotification>> {
        Ok(Vec::new())
    }
}

pub fn default_backend() -> Box<dyn NotificationBackend> {
    #[cfg(windows)]
    {
        Box::new(ListenerBackend::default())
    }
    #[cfg(not(windows))]
    {
        Box::new(UnsupportedBackend)
    }
}

/// Exponential retry delay with a ceiling.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    attempts: u32,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max: max.max(initial),
            attempts: 0,
        }
    }

    /// Delay before the next attempt; doubles on every call up to the ceiling.
    pub fn next_delay(&mut self) -> Duration {
        let factor = 2u32.saturating_pow(self.attempts.min(20));
        self.attempts = self.attempts.saturating_add(1);
        self.initial.saturating_mul(factor).min(self.max)
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub poll_interval: Duration,
    pub dedup_window: Duration,
    pub backoff_initial: Duration,
    pub backoff_max: Duration,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for SourceConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            dedup_window: settings.dedup_window(),
            backoff_initial: settings.backoff_initial(),
            backoff_max: settings.backoff_max(),
        }
    }
}

struct WorkerHandle {
    stop_tx: Sender<()>,
    join: JoinHandle<Box<dyn NotificationBackend>>,
}

/// Owns the notification worker thread.
pub struct NotificationSource {
    config: SourceConfig,
    backend: Option<Box<dyn NotificationBackend>>,
    worker: Option<WorkerHandle>,
}

impl NotificationSource {
    pub fn new(config: SourceConfig, backend: Box<dyn NotificationBackend>) -> Self {
        Self {
            config,
            backend: Some(backend),
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    /// Spawn the worker. Subscription happens on the worker, so this never
    /// fails even when the OS denies access.
    pub fn start(&mut self, tx: EventSender) {
        if self.worker.is_some() {
            return;
        }
        let Some(backend) = self.backend.take() else {
            return;
        };
        let (stop_tx, stop_rx) = mpsc::channel();
        let config = self.config.clone();
        let join = thread::Builder::new()
            .name("notification-source".into())
            .spawn(move || worker_loop(config, backend, tx, stop_rx));
        match join {
            Ok(join) => self.worker = Some(WorkerHandle { stop_tx, join }),
            Err(err) => tracing::error!(?err, "failed to spawn notification worker"),
        }
    }

    pub fn stop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
            match worker.join.join() {
                Ok(backend) => self.backend = Some(backend),
                Err(_) => tracing::error!("notification worker panicked"),
            }
        }
    }
}

impl Drop for NotificationSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Sleep for `delay` unless asked to stop. Returns `true` on stop.
fn wait_for_stop(stop_rx: &Receiver<()>, delay: Duration) -> bool {
    match stop_rx.recv_timeout(delay) {
        Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
        Err(RecvTimeoutError::Timeout) => false,
    }
}

fn worker_loop(
    config: SourceConfig,
    mut backend: Box<dyn NotificationBackend>,
    tx: EventSender,
    stop_rx: Receiver<()>,
) -> Box<dyn NotificationBackend> {
    let mut backoff = Backoff::new(config.backoff_initial, config.backoff_max);
    let mut dedup = Deduplicator::new(config.dedup_window);
    let mut subscribed = false;

    loop {
        if !subscribed {
            match backend.subscribe() {
                Ok(()) => {
                    tracing::info!(after_attempts = backoff.attempts(), "notification subscription established");
                    subscribed = true;
                }
                Err(err) => {
                    let error = IslandError::SubscriptionUnavailable(format!("{err:#}"));
                    let first = backoff.attempts() == 0;
                    let delay = backoff.next_delay();
                    if first {
                        tracing::warn!(%error, ?delay, "retrying notification subscription");
                    } else {
                        tracing::debug!(%error, ?delay, "retrying notification subscription");
                    }
                    if wait_for_stop(&stop_rx, delay) {
                        break;
                    }
                    continue;
                }
            }
        }

        match backend.poll() {
            Ok(batch) => {
                backoff.reset();
                for raw in batch {
                    let record = raw.into_record(Instant::now());
                    if !dedup.admit(&record) {
                        continue;
                    }
                    tracing::debug!(app = %record.source_app, title = %record.title, "notification received");
                    if tx.push(record).is_err() {
                        tracing::debug!("event queue closed; stopping notification worker");
                        return backend;
                    }
                }
            }
            Err(err) => {
                let delay = backoff.next_delay();
                tracing::warn!(error = %format!("{err:#}"), ?delay, "notification poll failed; resubscribing");
                subscribed = false;
                if wait_for_stop(&stop_rx, delay) {
                    break;
                }
                continue;
            }
        }

        if wait_for_stop(&stop_rx, config.poll_interval) {
            break;
        }
    }
    backend
}
