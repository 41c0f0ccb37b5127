//! Cancel-and-reschedule timers keyed by concern.
//!
//! The engine never sleeps. Hosts call `EditSession::tick` from their
//! event loop and due concerns fire then. Scheduling a concern that is
//! already pending replaces its deadline, so only the last call inside a
//! window survives.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Time source
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Rc<Cell<Instant>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            now: Rc::new(Cell::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// One pending deadline per key
#[derive(Debug)]
pub struct Debouncer<K> {
    pending: Vec<(K, Instant)>,
}

impl<K: PartialEq + Clone> Debouncer<K> {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// Fire `key` at `now + delay`, replacing any earlier deadline
    pub fn schedule(&mut self, key: K, now: Instant, delay: Duration) {
        let deadline = now + delay;
        match self.pending.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = deadline,
            None => self.pending.push((key, deadline)),
        }
    }

    pub fn cancel(&mut self, key: &K) -> bool {
        let before = self.pending.len();
        self.pending.retain(|(k, _)| k != key);
        self.pending.len() != before
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.iter().any(|(k, _)| k == key)
    }

    /// Remove and return every key whose deadline has passed, earliest
    /// first
    pub fn take_due(&mut self, now: Instant) -> Vec<K> {
        let mut due: Vec<(K, Instant)> = Vec::new();
        self.pending.retain(|(key, deadline)| {
            if *deadline <= now {
                due.push((key.clone(), *deadline));
                false
            } else {
                true
            }
        });
        due.sort_by_key(|(_, deadline)| *deadline);
        due.into_iter().map(|(key, _)| key).collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.iter().map(|(_, deadline)| *deadline).min()
    }
}

impl<K: PartialEq + Clone> Default for Debouncer<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reschedule_replaces_deadline() {
        let clock = ManualClock::new();
        let mut debouncer = Debouncer::new();
        debouncer.schedule("save", clock.now(), Duration::from_millis(1000));

        clock.advance(Duration::from_millis(800));
        debouncer.schedule("save", clock.now(), Duration::from_millis(1000));

        clock.advance(Duration::from_millis(800));
        assert!(debouncer.take_due(clock.now()).is_empty());

        clock.advance(Duration::from_millis(200));
        assert_eq!(debouncer.take_due(clock.now()), vec!["save"]);
        assert!(!debouncer.is_pending(&"save"));
    }

    #[test]
    fn test_keys_are_independent() {
        let clock = ManualClock::new();
        let mut debouncer = Debouncer::new();
        debouncer.schedule("save", clock.now(), Duration::from_millis(1000));
        debouncer.schedule("color", clock.now(), Duration::from_millis(300));
        assert!(debouncer.cancel(&"save"));
        assert!(!debouncer.cancel(&"save"));

        clock.advance(Duration::from_secs(2));
        assert_eq!(debouncer.take_due(clock.now()), vec!["color"]);
        assert_eq!(debouncer.next_deadline(), None);
    }

    #[test]
    fn test_clones_share_time() {
        let clock = ManualClock::new();
        let other = clock.clone();
        let start = clock.now();
        other.advance(Duration::from_millis(5));
        assert_eq!(clock.now() - start, Duration::from_millis(5));
    }
}
