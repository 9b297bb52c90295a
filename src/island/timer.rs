use std::time::{Duration, Instant};

/// Auto-collapse countdown kept as a deadline.
///
/// Nothing runs in the background: the owner checks [`CollapseTimer::fire_if_due`]
/// on every tick. Pausing stores the remaining time and clears the deadline;
/// resuming recomputes the deadline from it.
#[derive(Debug, Clone)]
pub struct CollapseTimer {
    duration: Duration,
    deadline: Option<Instant>,
    paused_remaining: Option<Duration>,
}

impl CollapseTimer {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            deadline: None,
            paused_remaining: None,
        }
    }

    /// Arm for the full duration, replacing any earlier countdown.
    pub fn arm(&mut self, now: Instant, paused: bool) {
        if paused {
            self.deadline = None;
            self.paused_remaining = Some(self.duration);
        } else {
            self.deadline = Some(now + self.duration);
            self.paused_remaining = None;
        }
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
        self.paused_remaining = None;
    }

    pub fn pause(&mut self, now: Instant) {
        if let Some(deadline) = self.deadline.take() {
            self.paused_remaining = Some(deadline.saturating_duration_since(now));
        }
    }

    pub fn resume(&mut self, now: Instant) {
        if let Some(remaining) = self.paused_remaining.take() {
            self.deadline = Some(now + remaining);
        }
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some() || self.paused_remaining.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.paused_remaining.is_some()
    }

    /// Deadline of a running countdown; `None` when idle or paused.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.paused_remaining
            .or_else(|| self.deadline.map(|d| d.saturating_duration_since(now)))
    }

    /// Disarm and return `true` if the deadline has passed.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
