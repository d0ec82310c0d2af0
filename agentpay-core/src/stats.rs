//! Live counters of both processors, shared with the HTTP status route.

use agentpay_sdk::objects::{AgentStatus, ExecutorStatus, WatcherStatus, now_millis};
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Default)]
pub struct WatcherStats {
    running: AtomicBool,
    poll_cycles: AtomicU64,
    feed_failures: AtomicU64,
    events_forwarded: AtomicU64,
    publish_failures: AtomicU64,
    /// Epoch milliseconds, 0 until the first cycle finishes.
    last_poll: AtomicI64,
}

#[derive(Debug, Default)]
pub struct ExecutorStats {
    running: AtomicBool,
    messages_received: AtomicU64,
    messages_discarded: AtomicU64,
    settlements_completed: AtomicU64,
    settlements_rejected: AtomicU64,
    duplicates_skipped: AtomicU64,
    last_message: AtomicI64,
}

#[derive(Debug, Default)]
pub struct AgentStats {
    pub watcher: WatcherStats,
    pub executor: ExecutorStats,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

fn status_label(running: &AtomicBool) -> String {
    if running.load(Ordering::Relaxed) {
        "running".to_string()
    } else {
        "stopped".to_string()
    }
}

fn millis_to_rfc3339(millis: &AtomicI64) -> Option<String> {
    let millis = millis.load(Ordering::Relaxed);
    if millis == 0 {
        return None;
    }
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .ok()?
        .format(&Rfc3339)
        .ok()
}

impl WatcherStats {
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Relaxed);
    }

    pub fn cycle_finished(&self) {
        bump(&self.poll_cycles);
        self.last_poll.store(now_millis(), Ordering::Relaxed);
    }

    pub fn feed_failed(&self) {
        bump(&self.feed_failures);
    }

    pub fn forwarded(&self) {
        bump(&self.events_forwarded);
    }

    pub fn publish_failed(&self) {
        bump(&self.publish_failures);
    }

    pub fn events_forwarded(&self) -> u64 {
        self.events_forwarded.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> WatcherStatus {
        WatcherStatus {
            status: status_label(&self.running),
            last_poll: millis_to_rfc3339(&self.last_poll),
            poll_cycles: self.poll_cycles.load(Ordering::Relaxed),
            feed_failures: self.feed_failures.load(Ordering::Relaxed),
            events_forwarded: self.events_forwarded.load(Ordering::Relaxed),
            publish_failures: self.publish_failures.load(Ordering::Relaxed),
        }
    }
}

impl ExecutorStats {
    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::Relaxed);
    }

    pub fn received(&self) {
        bump(&self.messages_received);
        self.last_message.store(now_millis(), Ordering::Relaxed);
    }

    pub fn discarded(&self) {
        bump(&self.messages_discarded);
    }

    pub fn completed(&self) {
        bump(&self.settlements_completed);
    }

    pub fn rejected(&self) {
        bump(&self.settlements_rejected);
    }

    pub fn duplicate(&self) {
        bump(&self.duplicates_skipped);
    }

    pub fn settlements_completed(&self) -> u64 {
        self.settlements_completed.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> ExecutorStatus {
        ExecutorStatus {
            status: status_label(&self.running),
            last_message: millis_to_rfc3339(&self.last_message),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            messages_discarded: self.messages_discarded.load(Ordering::Relaxed),
            settlements_completed: self.settlements_completed.load(Ordering::Relaxed),
            settlements_rejected: self.settlements_rejected.load(Ordering::Relaxed),
            duplicates_skipped: self.duplicates_skipped.load(Ordering::Relaxed),
        }
    }
}

impl AgentStats {
    pub fn snapshot(&self) -> AgentStatus {
        AgentStatus {
            watcher: self.watcher.snapshot(),
            executor: self.executor.snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot() {
        let stats = AgentStats::default();
        let initial = stats.snapshot();
        assert_eq!(initial.watcher.status, "stopped");
        assert!(initial.watcher.last_poll.is_none());

        stats.watcher.set_running(true);
        stats.watcher.cycle_finished();
        stats.watcher.forwarded();
        stats.executor.received();
        stats.executor.rejected();

        let snap = stats.snapshot();
        assert_eq!(snap.watcher.status, "running");
        assert_eq!(snap.watcher.poll_cycles, 1);
        assert_eq!(snap.watcher.events_forwarded, 1);
        assert!(snap.watcher.last_poll.is_some());
        assert_eq!(snap.executor.messages_received, 1);
        assert_eq!(snap.executor.settlements_rejected, 1);
        assert_eq!(snap.executor.settlements_completed, 0);
        assert!(snap.executor.last_message.is_some());
    }
}
