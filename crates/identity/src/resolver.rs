//! Binds the current session to a resident profile and publishes the result.
//!
//! Every resolution attempt is tagged with the session id it resolved for.
//! Session-change notifications move the "current session" forward, and an
//! attempt whose tag no longer matches is dropped instead of published, so a
//! slow lookup for a previous session can never overwrite a newer result.
//! Activation and deactivation start a new epoch, which drops every attempt
//! begun before them.

use shared_types::{
    ResolutionError, ResolutionErrorKind, ResolutionResult, SessionEvent, SessionIdentity,
};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::{mpsc, watch};
use tokio::task::{JoinHandle, JoinSet};

use crate::config::ResolverConfig;
use crate::lookup::{self, Resolution};
use crate::session::{SessionListener, SessionProvider, SubscriptionId};
use crate::store::ProfileStore;

/// Last session identity announced by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ObservedSession {
    /// No notification seen yet; any attempt may publish.
    Unknown,
    Known(Option<String>),
}

impl ObservedSession {
    fn admits(&self, tag: Option<&str>) -> bool {
        match self {
            ObservedSession::Unknown => true,
            ObservedSession::Known(current) => current.as_deref() == tag,
        }
    }
}

/// Publication gate shared by every attempt.
#[derive(Debug)]
struct Watermark {
    epoch: u64,
    session: ObservedSession,
}

impl Watermark {
    fn admits(&self, epoch: u64, tag: Option<&str>) -> bool {
        self.epoch == epoch && self.session.admits(tag)
    }
}

struct Shared<S, P> {
    sessions: Arc<S>,
    store: Arc<P>,
    config: ResolverConfig,
    result: watch::Sender<ResolutionResult>,
    observed: Mutex<Watermark>,
}

impl<S, P> Shared<S, P>
where
    S: SessionProvider + 'static,
    P: ProfileStore + 'static,
{
    /// Record a session change and clear the result if the identity moved.
    fn observe(&self, event: &SessionEvent) {
        let mut observed = self.observed.lock().unwrap_or_else(PoisonError::into_inner);
        let next = event.session_id().map(str::to_string);
        let unchanged = observed.session == ObservedSession::Known(next.clone());
        observed.session = ObservedSession::Known(next);
        if !unchanged {
            self.result.send_replace(ResolutionResult::loading());
        }
    }

    /// Forget the observed session and drop attempts already in flight.
    fn reset(&self) {
        let mut observed = self.observed.lock().unwrap_or_else(PoisonError::into_inner);
        observed.epoch += 1;
        observed.session = ObservedSession::Unknown;
    }

    fn epoch(&self) -> u64 {
        self.observed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .epoch
    }

    /// Look up the session and its profile. Writes nothing.
    async fn compute(&self) -> (Option<String>, ResolutionResult) {
        let session: SessionIdentity = match self.sessions.current_session().await {
            Ok(Some(session)) => session,
            Ok(None) => {
                return (
                    None,
                    ResolutionResult::failed(ResolutionError::not_authenticated()),
                )
            }
            Err(e) => {
                tracing::warn!(error = %e, "Session query failed; treating as signed out");
                return (
                    None,
                    ResolutionResult::failed(ResolutionError::not_authenticated()),
                );
            }
        };

        let result = match lookup::run_pipeline(self.store.as_ref(), &session).await {
            Resolution::Resolved { record, stage } => {
                tracing::info!(
                    session_id = %session.id,
                    profile_id = %record.profile_id,
                    stage = stage.as_str(),
                    "Profile resolved"
                );
                ResolutionResult::resolved(&record)
            }
            Resolution::NotFound => {
                tracing::warn!(session_id = %session.id, "No profile found for session");
                Resolution::NotFound.into_result()
            }
            Resolution::StoreFailure { stage, message } => {
                tracing::error!(
                    session_id = %session.id,
                    stage = stage.as_str(),
                    error = %message,
                    "Profile store failure"
                );
                Resolution::StoreFailure { stage, message }.into_result()
            }
        };
        (Some(session.id), result)
    }

    /// Publish unless a newer session or epoch began since the attempt started.
    fn publish(&self, epoch: u64, tag: Option<&str>, result: &ResolutionResult) -> bool {
        let observed = self.observed.lock().unwrap_or_else(PoisonError::into_inner);
        if !observed.admits(epoch, tag) {
            tracing::debug!(
                attempt_session = tag.unwrap_or(""),
                attempt_epoch = epoch,
                current_epoch = observed.epoch,
                "Discarding stale resolution"
            );
            return false;
        }
        self.result.send_replace(result.clone());
        true
    }

    async fn attempt(&self, mock_id: Option<&str>) -> ResolutionResult {
        let epoch = self.epoch();
        let (tag, mut result) = self.compute().await;

        if let Some(mock_id) = mock_id.map(str::trim).filter(|id| !id.is_empty()) {
            let substitutable = matches!(
                result.error_kind(),
                Some(ResolutionErrorKind::NotAuthenticated | ResolutionErrorKind::ProfileNotFound)
            );
            if substitutable && self.config.dev_fallback_enabled() {
                tracing::warn!(mock_id, "Using development mock profile");
                result = ResolutionResult::mock(mock_id);
            }
        }

        self.publish(epoch, tag.as_deref(), &result);
        result
    }

    /// Start a background attempt owned by `attempts`, reaping finished ones.
    fn spawn_attempt(self: &Arc<Self>, attempts: &mut JoinSet<()>) {
        while attempts.try_join_next().is_some() {}
        let shared = Arc::clone(self);
        attempts.spawn(async move {
            shared.attempt(None).await;
        });
    }
}

struct Activation {
    subscription: SubscriptionId,
    pump: JoinHandle<()>,
}

/// Resolves the current session to a resident profile.
///
/// Consumers read the result through [`IdentityResolver::subscribe`] or
/// [`IdentityResolver::current`]. Failures never surface as `Err`; they are
/// carried in [`ResolutionResult::error`].
pub struct IdentityResolver<S, P>
where
    S: SessionProvider + 'static,
    P: ProfileStore + 'static,
{
    shared: Arc<Shared<S, P>>,
    activation: Mutex<Option<Activation>>,
}

impl<S, P> IdentityResolver<S, P>
where
    S: SessionProvider + 'static,
    P: ProfileStore + 'static,
{
    pub fn new(sessions: Arc<S>, store: Arc<P>, config: ResolverConfig) -> Self {
        let (result, _) = watch::channel(ResolutionResult::idle());
        Self {
            shared: Arc::new(Shared {
                sessions,
                store,
                config,
                result,
                observed: Mutex::new(Watermark {
                    epoch: 0,
                    session: ObservedSession::Unknown,
                }),
            }),
            activation: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.shared.config
    }

    /// Register the session listener and start the first resolution.
    ///
    /// Must be called from within a Tokio runtime. A second call while
    /// active does nothing, so the provider only ever sees one listener.
    pub fn activate(&self) {
        let mut activation = self.activation.lock().unwrap_or_else(PoisonError::into_inner);
        if activation.is_some() {
            return;
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<SessionEvent>();
        let weak: Weak<Shared<S, P>> = Arc::downgrade(&self.shared);
        let listener: SessionListener = Arc::new(move |event: &SessionEvent| {
            if let Some(shared) = weak.upgrade() {
                shared.observe(event);
            }
            let _ = tx.send(event.clone());
        });
        // Changes made while inactive were never observed.
        self.shared.reset();
        let subscription = self.shared.sessions.subscribe(listener);
        self.shared.result.send_replace(ResolutionResult::loading());

        // Attempts live in the pump's JoinSet, so aborting the pump aborts them.
        let shared = Arc::clone(&self.shared);
        let pump = tokio::spawn(async move {
            let mut attempts = JoinSet::new();
            shared.spawn_attempt(&mut attempts);
            while let Some(event) = rx.recv().await {
                tracing::debug!(kind = ?event.kind, "Re-resolving after session change");
                shared.spawn_attempt(&mut attempts);
            }
        });

        *activation = Some(Activation { subscription, pump });
    }

    /// Deregister the session listener and cancel background attempts.
    /// Safe to call repeatedly.
    ///
    /// The last published result stays readable. Attempts already running
    /// never publish; later manual calls publish for whichever session is
    /// current, since no session changes are observed while inactive.
    pub fn deactivate(&self) {
        let taken = self
            .activation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(activation) = taken {
            self.shared.sessions.unsubscribe(activation.subscription);
            activation.pump.abort();
            self.shared.reset();
        }
    }

    pub fn is_active(&self) -> bool {
        self.activation
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResolutionResult> {
        self.shared.result.subscribe()
    }

    pub fn current(&self) -> ResolutionResult {
        self.shared.result.borrow().clone()
    }

    /// Run one resolution attempt and return what it computed.
    ///
    /// The same value is published unless the session changed while the
    /// attempt was in flight.
    pub async fn resolve(&self) -> ResolutionResult {
        self.shared.attempt(None).await
    }

    /// Re-run [`Self::resolve`], typically after a write that may have changed
    /// profile linkage.
    pub async fn refresh(&self) -> ResolutionResult {
        self.resolve().await
    }

    /// Like [`Self::resolve`], but substitutes `mock_id` for a missing session or
    /// profile when the resolver was built with a non-production config.
    pub async fn resolve_with_dev_fallback(&self, mock_id: Option<&str>) -> ResolutionResult {
        self.shared.attempt(mock_id).await
    }

    /// [`Self::resolve_with_dev_fallback`] using the configured mock id.
    pub async fn resolve_with_configured_fallback(&self) -> ResolutionResult {
        let mock_id = self.shared.config.dev_mock_profile_id.clone();
        self.resolve_with_dev_fallback(mock_id.as_deref()).await
    }
}

impl<S, P> Drop for IdentityResolver<S, P>
where
    S: SessionProvider + 'static,
    P: ProfileStore + 'static,
{
    fn drop(&mut self) {
        self.deactivate();
    }
}
