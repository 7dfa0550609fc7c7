use shared_types::{AppError, SessionEvent, SessionIdentity};
use std::sync::{PoisonError, RwLock};

use super::{ListenerRegistry, SessionListener, SessionProvider, SubscriptionId};

/// In-process session holder.
///
/// Used directly in development and tests, and as the backing state of
/// [`super::TokenSessionProvider`]. Listeners fire synchronously on the
/// calling thread.
#[derive(Default)]
pub struct LocalSessionProvider {
    current: RwLock<Option<SessionIdentity>>,
    listeners: ListenerRegistry,
}

impl LocalSessionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `session` already signed in. No event is fired.
    pub fn with_session(session: SessionIdentity) -> Self {
        Self {
            current: RwLock::new(Some(session)),
            listeners: ListenerRegistry::new(),
        }
    }

    pub fn sign_in(&self, session: SessionIdentity) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(session.clone());
        self.listeners.notify(&SessionEvent::signed_in(session));
    }

    pub fn sign_out(&self) {
        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if previous.is_some() {
            self.listeners.notify(&SessionEvent::signed_out());
        }
    }

    /// Announce a token refresh for the current session. No-op when signed out.
    pub fn refresh_token(&self) {
        let current = self.snapshot();
        if let Some(session) = current {
            self.listeners.notify(&SessionEvent::token_refreshed(session));
        }
    }

    pub fn snapshot(&self) -> Option<SessionIdentity> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SessionProvider for LocalSessionProvider {
    async fn current_session(&self) -> Result<Option<SessionIdentity>, AppError> {
        Ok(self.snapshot())
    }

    fn subscribe(&self, listener: SessionListener) -> SubscriptionId {
        self.listeners.add(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.remove(id)
    }

    fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}
