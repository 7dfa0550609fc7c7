pub mod local;
pub mod token;

use shared_types::{AppError, SessionEvent, SessionIdentity};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

pub use local::LocalSessionProvider;
pub use token::TokenSessionProvider;

/// Callback invoked on every session change.
pub type SessionListener = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

/// Handle returned by [`SessionProvider::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

// ── Trait ────────────────────────────────────────────────────────────

/// Source of the authenticated session, owned outside this crate.
pub trait SessionProvider: Send + Sync {
    /// The current session, `None` when signed out.
    fn current_session(
        &self,
    ) -> impl Future<Output = Result<Option<SessionIdentity>, AppError>> + Send;

    /// Register a change listener. Fires on sign-in, sign-out and token refresh.
    fn subscribe(&self, listener: SessionListener) -> SubscriptionId;

    /// Remove a listener. Returns false if the id was not registered.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;

    /// Number of registered listeners.
    fn listener_count(&self) -> usize;
}

// ── Listener bookkeeping ─────────────────────────────────────────────

/// Listener table shared by the bundled providers.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<BTreeMap<SubscriptionId, SessionListener>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: SessionListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, listener);
        id
    }

    pub fn remove(&self, id: SubscriptionId) -> bool {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&id)
            .is_some()
    }

    pub fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every listener in subscription order.
    ///
    /// The table is snapshotted first so a listener may subscribe or
    /// unsubscribe without deadlocking.
    pub fn notify(&self, event: &SessionEvent) {
        let snapshot: Vec<SessionListener> = self
            .listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        tracing::debug!(
            kind = ?event.kind,
            session_id = event.session_id().unwrap_or(""),
            listeners = snapshot.len(),
            "Session change"
        );
        for listener in snapshot {
            listener(event);
        }
    }
}
