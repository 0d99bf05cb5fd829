//! Events emitted by the indexer for downstream consumers.

use jigdex_types::Txid;

/// Indexer-level events that observers can subscribe to via the [`EventBus`].
///
/// Events fire strictly after the store transaction that produced them has
/// committed, so observers always see a consistent persistent state.
/// Delivery is at-least-once; the executor must tolerate duplicate
/// `ReadyToExecute` fires.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndexerEvent {
    /// A transaction became ready and has no unexecuted predecessors — the
    /// executor may replay it now.
    ReadyToExecute { txid: Txid },
    /// A transaction record was created.
    Added { txid: Txid },
    /// A transaction and its derived state were deleted.
    Deleted { txid: Txid },
    /// A transaction was added to the trust set.
    Trusted { txid: Txid },
    /// A transaction was removed from the trust set.
    Untrusted { txid: Txid },
    /// A transaction was banned.
    Banned { txid: Txid },
    /// A transaction was unbanned.
    Unbanned { txid: Txid },
    /// A transaction's indexed state was revoked.
    Unindexed { txid: Txid },
}

/// Synchronous fan-out event bus.
///
/// Listeners are invoked inline on the emitting thread; keep handlers fast to
/// avoid stalling ingestion. Side effects that talk to the network (webhook
/// notifications and the like) belong in a listener, never inside a store
/// transaction.
pub struct EventBus {
    listeners: Vec<Box<dyn Fn(&IndexerEvent) + Send + Sync>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Box<dyn Fn(&IndexerEvent) + Send + Sync>) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &IndexerEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn emit_calls_all_listeners() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();

        let c1 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        }));

        let c2 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c2.fetch_add(10, Ordering::SeqCst);
        }));

        bus.emit(&IndexerEvent::Added {
            txid: Txid::new([1; 32]),
        });
        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn emit_with_no_listeners_is_noop() {
        let bus = EventBus::new();
        bus.emit(&IndexerEvent::ReadyToExecute {
            txid: Txid::ZERO,
        }); // should not panic
    }

    #[test]
    fn listener_receives_correct_event_variant() {
        let ready = Arc::new(AtomicUsize::new(0));
        let deleted = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();

        let r = Arc::clone(&ready);
        let d = Arc::clone(&deleted);
        bus.subscribe(Box::new(move |event| match event {
            IndexerEvent::ReadyToExecute { .. } => {
                r.fetch_add(1, Ordering::SeqCst);
            }
            IndexerEvent::Deleted { .. } => {
                d.fetch_add(1, Ordering::SeqCst);
            }
            _ => {}
        }));

        bus.emit(&IndexerEvent::ReadyToExecute {
            txid: Txid::ZERO,
        });
        bus.emit(&IndexerEvent::Deleted { txid: Txid::ZERO });

        assert_eq!(ready.load(Ordering::SeqCst), 1);
        assert_eq!(deleted.load(Ordering::SeqCst), 1);
    }
}
