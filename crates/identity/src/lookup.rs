//! Two-stage profile lookup: direct session linkage first, legacy email second.
//!
//! The email stage only runs when the linkage stage reports [`LookupOutcome::NotFound`].
//! A store failure in the first stage ends the pipeline so the legacy path can
//! never mask it.

use shared_types::{
    AppError, ProfileRecord, ResolutionError, ResolutionResult, SessionIdentity,
};

use crate::store::ProfileStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStage {
    Primary,
    Fallback,
}

impl LookupStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            LookupStage::Primary => "primary",
            LookupStage::Fallback => "fallback",
        }
    }
}

/// Outcome of a single stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(ProfileRecord),
    NotFound,
    StoreError(String),
}

impl From<Result<Option<ProfileRecord>, AppError>> for LookupOutcome {
    fn from(result: Result<Option<ProfileRecord>, AppError>) -> Self {
        match result {
            Ok(Some(record)) => LookupOutcome::Found(record),
            Ok(None) => LookupOutcome::NotFound,
            Err(e) if e.is_not_found() => LookupOutcome::NotFound,
            Err(e) => LookupOutcome::StoreError(e.to_string()),
        }
    }
}

/// Outcome of the whole pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved {
        record: ProfileRecord,
        stage: LookupStage,
    },
    NotFound,
    StoreFailure {
        stage: LookupStage,
        message: String,
    },
}

impl Resolution {
    pub fn into_result(self) -> ResolutionResult {
        match self {
            Resolution::Resolved { record, .. } => ResolutionResult::resolved(&record),
            Resolution::NotFound => ResolutionResult::failed(ResolutionError::profile_not_found()),
            Resolution::StoreFailure { message, .. } => {
                ResolutionResult::failed(ResolutionError::store_failure(message))
            }
        }
    }
}

pub async fn primary_lookup<P: ProfileStore>(store: &P, session: &SessionIdentity) -> LookupOutcome {
    store.find_active_by_session(&session.id).await.into()
}

/// Legacy email stage. Sessions without a usable email are `NotFound` without a query.
pub async fn fallback_lookup<P: ProfileStore>(store: &P, session: &SessionIdentity) -> LookupOutcome {
    match session.usable_email() {
        Some(email) => store.find_active_legacy_by_email(email).await.into(),
        None => LookupOutcome::NotFound,
    }
}

pub async fn run_pipeline<P: ProfileStore>(store: &P, session: &SessionIdentity) -> Resolution {
    match primary_lookup(store, session).await {
        LookupOutcome::Found(record) => {
            return Resolution::Resolved {
                record,
                stage: LookupStage::Primary,
            }
        }
        LookupOutcome::StoreError(message) => {
            return Resolution::StoreFailure {
                stage: LookupStage::Primary,
                message,
            }
        }
        LookupOutcome::NotFound => {}
    }

    tracing::debug!(
        session_id = %session.id,
        has_email = session.usable_email().is_some(),
        "No linked profile; trying legacy email lookup"
    );

    match fallback_lookup(store, session).await {
        LookupOutcome::Found(record) => Resolution::Resolved {
            record,
            stage: LookupStage::Fallback,
        },
        LookupOutcome::NotFound => Resolution::NotFound,
        LookupOutcome::StoreError(message) => Resolution::StoreFailure {
            stage: LookupStage::Fallback,
            message,
        },
    }
}
