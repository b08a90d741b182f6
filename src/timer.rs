//! Deadline queue standing in for `setTimeout`/`clearTimeout`.
//!
//! Time is a virtual offset from an arbitrary origin. The simulator advances
//! it directly; the real-time driver maps it onto a wall-clock instant.

use std::collections::BTreeSet;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Default)]
pub struct Timers {
    now: Duration,
    next_id: u64,
    queue: BTreeSet<(Duration, TimerId)>,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Move the clock forward. Never moves it backwards.
    pub fn set_now(&mut self, now: Duration) {
        self.now = self.now.max(now);
    }

    pub fn schedule(&mut self, delay: Duration) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.queue.insert((self.now + delay, id));
        id
    }

    pub fn cancel(&mut self, id: TimerId) -> bool {
        let key = self.queue.iter().find(|(_, t)| *t == id).copied();
        match key {
            Some(key) => self.queue.remove(&key),
            None => false,
        }
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.queue.first().map(|(deadline, _)| *deadline)
    }

    /// Pop the earliest timer due at or before `now`, advancing the clock to
    /// its deadline.
    pub fn pop_due(&mut self, now: Duration) -> Option<TimerId> {
        let (deadline, id) = *self.queue.first()?;
        if deadline > now {
            return None;
        }
        self.queue.remove(&(deadline, id));
        self.set_now(deadline);
        Some(id)
    }
}
