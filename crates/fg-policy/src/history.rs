// history.rs: Per-(actor, resource) timestamps of successful rate-limited runs.
//
// Shared between concurrent evaluations, so every access goes through a
// Mutex. Reads never prune; only `record` rewrites an entry.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::error::PolicyError;

type HistoryKey = (String, String);

#[derive(Debug, Default)]
pub struct ActorHistory {
    entries: Mutex<HashMap<HistoryKey, Vec<DateTime<Utc>>>>,
}

impl ActorHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many runs by `actor` against `resource` fall inside the window
    /// ending at `now`.
    pub fn count_within(
        &self,
        actor: &str,
        resource: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<usize, PolicyError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| PolicyError::HistoryPoisoned)?;
        Ok(entries
            .get(&key(actor, resource))
            .map(|stamps| stamps.iter().filter(|t| in_window(**t, now, window)).count())
            .unwrap_or(0))
    }

    /// Drop timestamps that have left the window, then append `now`.
    ///
    /// Returns how many runs are in the window afterwards.
    pub fn record(
        &self,
        actor: &str,
        resource: &str,
        now: DateTime<Utc>,
        window: Duration,
    ) -> Result<usize, PolicyError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| PolicyError::HistoryPoisoned)?;
        let stamps = entries.entry(key(actor, resource)).or_default();
        stamps.retain(|t| in_window(*t, now, window));
        stamps.push(now);
        Ok(stamps.len())
    }

    /// Raw number of stored timestamps, including any not yet pruned.
    pub fn stored(&self, actor: &str, resource: &str) -> usize {
        self.entries
            .lock()
            .map(|e| e.get(&key(actor, resource)).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

fn key(actor: &str, resource: &str) -> HistoryKey {
    (actor.to_string(), resource.to_string())
}

fn in_window(stamp: DateTime<Utc>, now: DateTime<Utc>, window: Duration) -> bool {
    now - stamp < window
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counting_does_not_prune() {
        let history = ActorHistory::new();
        let t0 = Utc::now();
        let window = Duration::seconds(60);
        history.record("bob", "svc-1", t0, window).unwrap();

        let later = t0 + Duration::seconds(120);
        assert_eq!(history.count_within("bob", "svc-1", later, window).unwrap(), 0);
        assert_eq!(history.stored("bob", "svc-1"), 1);
    }

    #[test]
    fn record_prunes_expired_entries() {
        let history = ActorHistory::new();
        let t0 = Utc::now();
        let window = Duration::seconds(60);
        history.record("bob", "svc-1", t0, window).unwrap();
        history
            .record("bob", "svc-1", t0 + Duration::seconds(30), window)
            .unwrap();
        let in_window = history
            .record("bob", "svc-1", t0 + Duration::seconds(61), window)
            .unwrap();
        assert_eq!(in_window, 2);
        assert_eq!(history.stored("bob", "svc-1"), 2);
    }

    #[test]
    fn resources_are_tracked_separately() {
        let history = ActorHistory::new();
        let now = Utc::now();
        let window = Duration::seconds(60);
        history.record("bob", "svc-1", now, window).unwrap();
        assert_eq!(history.count_within("bob", "svc-2", now, window).unwrap(), 0);
        assert_eq!(history.count_within("alice", "svc-1", now, window).unwrap(), 0);
    }
}
