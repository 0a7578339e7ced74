//! Table-level change notification for live queries.
//!
//! Each table has its own broadcast channel. Writers call [`InvalidationTracker::notify`]
//! after a commit that changed rows; live queries hold a receiver and re-run
//! when anything arrives. Dropping the receiver is the whole unsubscribe.

use log::debug;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::broadcast;

/// Buffered notifications per table before slow observers start lagging.
const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Default)]
pub struct InvalidationTracker {
    channels: Mutex<HashMap<&'static str, broadcast::Sender<u64>>>,
    sequence: AtomicU64,
    closed: AtomicBool,
}

impl InvalidationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers interest in `table`.
    ///
    /// Each received value is the commit sequence number of a write to the
    /// table. After [`close`](Self::close) the returned receiver is already
    /// closed.
    pub fn subscribe(&self, table: &'static str) -> broadcast::Receiver<u64> {
        let Ok(mut channels) = self.channels.lock() else {
            return closed_receiver();
        };
        if self.closed.load(Ordering::Acquire) {
            return closed_receiver();
        }
        channels
            .entry(table)
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Announces a committed change to `table` and returns its sequence number.
    pub fn notify(&self, table: &'static str) -> u64 {
        let sequence = self.sequence.fetch_add(1, Ordering::AcqRel) + 1;
        if let Ok(channels) = self.channels.lock() {
            if let Some(sender) = channels.get(table) {
                // No receivers is fine: nobody is watching this table.
                let delivered = sender.send(sequence).unwrap_or(0);
                debug!(
                    "event=table_invalidated module=db table={table} seq={sequence} observers={delivered}"
                );
            }
        }
        sequence
    }

    /// Number of live observers of `table`.
    pub fn observer_count(&self, table: &'static str) -> usize {
        self.channels
            .lock()
            .ok()
            .and_then(|channels| channels.get(table).map(broadcast::Sender::receiver_count))
            .unwrap_or(0)
    }

    /// Drops every channel so all current observers see the end of the stream.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        if let Ok(mut channels) = self.channels.lock() {
            channels.clear();
        }
    }
}

fn closed_receiver() -> broadcast::Receiver<u64> {
    let (_, receiver) = broadcast::channel(1);
    receiver
}

#[cfg(test)]
mod tests {
    use super::InvalidationTracker;
    use tokio::sync::broadcast::error::{RecvError, TryRecvError};

    #[test]
    fn notify_reaches_subscribers_of_same_table_only() {
        let tracker = InvalidationTracker::new();
        let mut items = tracker.subscribe("items");
        let mut other = tracker.subscribe("other");

        let seq = tracker.notify("items");

        assert_eq!(items.try_recv().unwrap(), seq);
        assert!(matches!(other.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn sequence_numbers_increase_in_notify_order() {
        let tracker = InvalidationTracker::new();
        let mut rx = tracker.subscribe("items");

        let first = tracker.notify("items");
        let second = tracker.notify("items");

        assert!(second > first);
        assert_eq!(rx.try_recv().unwrap(), first);
        assert_eq!(rx.try_recv().unwrap(), second);
    }

    #[test]
    fn dropping_receiver_unregisters_observer() {
        let tracker = InvalidationTracker::new();
        let rx = tracker.subscribe("items");
        assert_eq!(tracker.observer_count("items"), 1);

        drop(rx);
        assert_eq!(tracker.observer_count("items"), 0);
    }

    #[tokio::test]
    async fn close_ends_current_and_future_subscriptions() {
        let tracker = InvalidationTracker::new();
        let mut before = tracker.subscribe("items");

        tracker.close();
        let mut after = tracker.subscribe("items");

        assert!(matches!(before.recv().await, Err(RecvError::Closed)));
        assert!(matches!(after.recv().await, Err(RecvError::Closed)));
        assert_eq!(tracker.observer_count("items"), 0);
    }
}
