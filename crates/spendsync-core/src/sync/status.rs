//! Sync status and its observer registry.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

/// Coarse state of a sync engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Idle,
    Syncing,
    /// The last sync failed; cleared by the next successful one.
    Error,
}

impl SyncStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Syncing => "syncing",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single status change, delivered to every listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncTransition {
    pub from: SyncStatus,
    pub to: SyncStatus,
}

type Listener = Arc<dyn Fn(SyncTransition) + Send + Sync>;

#[derive(Default)]
struct Registry {
    status: RwLock<SyncStatus>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
}

impl Registry {
    fn is_subscribed(&self, id: u64) -> bool {
        self.listeners.lock().iter().any(|(listener_id, _)| *listener_id == id)
    }

    fn remove(&self, id: u64) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }
}

/// Current status plus the listeners observing it.
///
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct StatusChannel {
    registry: Arc<Registry>,
}

impl fmt::Debug for StatusChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatusChannel")
            .field("status", &self.current())
            .field("listeners", &self.registry.listeners.lock().len())
            .finish()
    }
}

impl StatusChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-blocking read of the current status.
    pub fn current(&self) -> SyncStatus {
        *self.registry.status.read()
    }

    /// Register a listener, called once per transition in registration order.
    pub fn subscribe(
        &self,
        listener: impl Fn(SyncTransition) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.listeners.lock().push((id, Arc::new(listener)));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Move to `to` and notify listeners. Setting the current status again
    /// is not a transition and notifies nobody.
    pub(crate) fn transition(&self, to: SyncStatus) {
        let from = {
            let mut status = self.registry.status.write();
            let from = *status;
            *status = to;
            from
        };
        if from == to {
            return;
        }

        // Listeners run without any lock held so they may subscribe,
        // unsubscribe or read the status themselves.
        let listeners: Vec<(u64, Listener)> = self.registry.listeners.lock().clone();
        let transition = SyncTransition { from, to };
        for (id, listener) in listeners {
            if self.registry.is_subscribed(id) {
                listener(transition);
            }
        }
    }
}

/// Handle returned by [`StatusChannel::subscribe`].
///
/// Dropping it does not unsubscribe; call [`Subscription::unsubscribe`].
#[must_use = "keep the subscription to be able to unsubscribe later"]
#[derive(Debug, Clone)]
pub struct Subscription {
    id: u64,
    registry: Weak<Registry>,
}

impl Subscription {
    /// Stop receiving transitions. Returns `false` if already unsubscribed.
    ///
    /// Safe to call from inside a listener, including the listener itself.
    pub fn unsubscribe(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.remove(self.id))
    }
}
