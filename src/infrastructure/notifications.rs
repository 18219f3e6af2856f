//! Fan-out of [`NotificationEvent`]s to connected observers.
//!
//! The hub knows nothing about accounts. It owns the observer set behind its
//! own lock, independent of the ledger's, and treats any failed delivery as
//! the death of that observer.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::NotificationEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Protocol upgrade done, not yet registered.
    Connecting,
    /// Registered and eligible for broadcasts.
    Active,
    /// Unregistered; the channel is released and cannot be reused.
    Closed,
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ConnectionError {
    #[error("connection is closed")]
    Closed,
    #[error("outbound buffer is full")]
    Backpressure,
}

/// Outbound half of an observer's channel, as seen by the hub.
pub trait Connection: Send + Sync {
    fn id(&self) -> ConnectionId;

    /// Queues a serialized event. Must not block: a peer that cannot keep up
    /// reports an error instead.
    fn send(&self, payload: &str) -> Result<(), ConnectionError>;

    /// Releases the channel. Safe to call more than once.
    fn close(&self);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub pruned: usize,
}

#[derive(Default)]
pub struct NotificationHub {
    observers: Mutex<HashMap<ConnectionId, Arc<dyn Connection>>>,
}

impl NotificationHub {
    pub fn new() -> Self {
        Self::default()
    }

    fn observers(&self) -> MutexGuard<'_, HashMap<ConnectionId, Arc<dyn Connection>>> {
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds an observer. Returns `false` if the same id was already registered.
    pub fn register(&self, connection: Arc<dyn Connection>) -> bool {
        let id = connection.id();
        let mut observers = self.observers();
        if observers.contains_key(&id) {
            debug!(connection_id = %id, "observer already registered");
            return false;
        }
        observers.insert(id, connection);
        info!(connection_id = %id, observers = observers.len(), "observer registered");
        true
    }

    /// Removes an observer. Returns `false` if it was not registered.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        let mut observers = self.observers();
        match observers.remove(&id) {
            Some(_) => {
                info!(connection_id = %id, observers = observers.len(), "observer unregistered");
                true
            }
            None => false,
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers().len()
    }

    pub fn is_registered(&self, id: ConnectionId) -> bool {
        self.observers().contains_key(&id)
    }

    /// Serializes `event` once and delivers it to every registered observer.
    ///
    /// Observers whose delivery fails are closed and dropped from the set in
    /// the same pass. Failures never reach the caller.
    pub fn broadcast(&self, event: &NotificationEvent) -> BroadcastReport {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize {} notification: {}", event.event_type(), e);
                return BroadcastReport::default();
            }
        };

        // Sends only enqueue, so holding the guard across the pass is cheap
        // and keeps concurrent broadcasts in one order for every observer.
        let mut observers = self.observers();
        let mut report = BroadcastReport::default();
        let mut dead = Vec::new();
        for (id, connection) in observers.iter() {
            match connection.send(&payload) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(connection_id = %id, "Failed to deliver notification: {}", e);
                    dead.push(*id);
                }
            }
        }
        for id in dead {
            if let Some(connection) = observers.remove(&id) {
                connection.close();
                report.pruned += 1;
            }
        }

        info!(
            event_type = event.event_type(),
            delivered = report.delivered,
            pruned = report.pruned,
            observers = observers.len(),
            "notification broadcast"
        );
        report
    }

    /// Closes and drops every observer.
    pub fn close_all(&self) {
        let drained: Vec<_> = self.observers().drain().map(|(_, c)| c).collect();
        let count = drained.len();
        for connection in drained {
            connection.close();
        }
        if count > 0 {
            info!("Closed {} observers", count);
        }
    }
}

impl fmt::Debug for NotificationHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationHub")
            .field("observers", &self.observer_count())
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use mockall::mock;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Records every payload it receives; fails once closed.
    pub(crate) struct RecordingConnection {
        id: ConnectionId,
        received: Mutex<Vec<String>>,
        closed: AtomicBool,
    }

    impl RecordingConnection {
        pub(crate) fn new() -> Arc<Self> {
            Arc::new(Self {
                id: ConnectionId::new(),
                received: Mutex::new(Vec::new()),
                closed: AtomicBool::new(false),
            })
        }

        pub(crate) fn received(&self) -> Vec<String> {
            self.received.lock().unwrap().clone()
        }

        pub(crate) fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }

    impl Connection for RecordingConnection {
        fn id(&self) -> ConnectionId {
            self.id
        }

        fn send(&self, payload: &str) -> Result<(), ConnectionError> {
            if self.is_closed() {
                return Err(ConnectionError::Closed);
            }
            self.received.lock().unwrap().push(payload.to_string());
            Ok(())
        }

        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    mock! {
        pub Observer {}

        impl Connection for Observer {
            fn id(&self) -> ConnectionId;
            fn send(&self, payload: &str) -> Result<(), ConnectionError>;
            fn close(&self);
        }
    }

    #[test]
    fn test_broadcast_reaches_all_and_prunes_closed_observer() {
        let hub = NotificationHub::new();
        let observers: Vec<_> = (0..5).map(|_| RecordingConnection::new()).collect();
        for observer in &observers {
            assert!(hub.register(observer.clone()));
        }
        observers[2].close();

        let report = hub.broadcast(&NotificationEvent::BalanceUpdate {
            new_balance: dec!(600),
        });

        assert_eq!(report, BroadcastReport { delivered: 4, pruned: 1 });
        assert_eq!(hub.observer_count(), 4);
        assert!(!hub.is_registered(observers[2].id()));

        let expected = r#"{"type":"balanceUpdate","newBalance":600.0}"#;
        for (i, observer) in observers.iter().enumerate() {
            if i == 2 {
                assert!(observer.received().is_empty());
            } else {
                assert_eq!(observer.received(), vec![expected.to_string()]);
            }
        }
    }

    #[test]
    fn test_register_is_idempotent() {
        let hub = NotificationHub::new();
        let observer = RecordingConnection::new();
        assert!(hub.register(observer.clone()));
        assert!(!hub.register(observer.clone()));
        assert_eq!(hub.observer_count(), 1);

        hub.broadcast(&NotificationEvent::TransactionAlert {
            message: "once".to_string(),
        });
        assert_eq!(observer.received().len(), 1);
    }

    #[test]
    fn test_unregister_is_safe_to_repeat() {
        let hub = NotificationHub::new();
        let observer = RecordingConnection::new();
        hub.register(observer.clone());
        assert!(hub.unregister(observer.id()));
        assert!(!hub.unregister(observer.id()));
        assert!(!hub.unregister(ConnectionId::new()));

        let report = hub.broadcast(&NotificationEvent::TransactionAlert {
            message: "nobody listening".to_string(),
        });
        assert_eq!(report, BroadcastReport::default());
        assert!(observer.received().is_empty());
    }

    #[test]
    fn test_failed_delivery_closes_observer() {
        let hub = NotificationHub::new();
        let id = ConnectionId::new();
        let mut observer = MockObserver::new();
        observer.expect_id().return_const(id);
        observer
            .expect_send()
            .times(1)
            .returning(|_| Err(ConnectionError::Backpressure));
        observer.expect_close().times(1).return_const(());
        hub.register(Arc::new(observer));

        let report = hub.broadcast(&NotificationEvent::TransactionAlert {
            message: "stalled".to_string(),
        });
        assert_eq!(report, BroadcastReport { delivered: 0, pruned: 1 });
        assert!(!hub.is_registered(id));

        // pruned observers receive nothing further
        let report = hub.broadcast(&NotificationEvent::TransactionAlert {
            message: "again".to_string(),
        });
        assert_eq!(report.delivered, 0);
    }

    #[test]
    fn test_close_all_empties_hub() {
        let hub = NotificationHub::new();
        let observers: Vec<_> = (0..3).map(|_| RecordingConnection::new()).collect();
        for observer in &observers {
            hub.register(observer.clone());
        }
        hub.close_all();
        assert_eq!(hub.observer_count(), 0);
        assert!(observers.iter().all(|o| o.is_closed()));
    }

    #[test]
    fn test_concurrent_register_during_broadcasts() {
        let hub = Arc::new(NotificationHub::new());
        let observers: Vec<_> = (0..32).map(|_| RecordingConnection::new()).collect();

        std::thread::scope(|scope| {
            for observer in &observers {
                let hub = hub.clone();
                let observer = observer.clone();
                scope.spawn(move || hub.register(observer));
            }
            for i in 0..8 {
                let hub = hub.clone();
                scope.spawn(move || {
                    hub.broadcast(&NotificationEvent::TransactionAlert {
                        message: format!("event {}", i),
                    })
                });
            }
        });

        assert_eq!(hub.observer_count(), 32);
        for observer in &observers {
            let received = observer.received();
            assert!(received.len() <= 8);
            // no observer ever sees the same event twice
            let mut unique = received.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), received.len());
        }
    }
}
