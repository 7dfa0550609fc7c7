use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ProfileRecord;

/// Why a resolution attempt did not produce a profile.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ResolutionErrorKind {
    /// No session identity is available.
    NotAuthenticated,
    /// Neither the linked nor the legacy email lookup found an active row.
    ProfileNotFound,
    /// The profile store failed for a reason other than "no rows".
    StoreFailure,
}

impl fmt::Display for ResolutionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionErrorKind::NotAuthenticated => write!(f, "NotAuthenticated"),
            ResolutionErrorKind::ProfileNotFound => write!(f, "ProfileNotFound"),
            ResolutionErrorKind::StoreFailure => write!(f, "StoreFailure"),
        }
    }
}

/// Error state carried inside a [`ResolutionResult`].
///
/// `message` is what consumers render. `detail` keeps the underlying cause
/// for logs and is never shown to the user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolutionError {
    pub kind: ResolutionErrorKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ResolutionError {
    pub fn not_authenticated() -> Self {
        Self {
            kind: ResolutionErrorKind::NotAuthenticated,
            message: "You are not signed in".to_string(),
            detail: None,
        }
    }

    pub fn profile_not_found() -> Self {
        Self {
            kind: ResolutionErrorKind::ProfileNotFound,
            message: "No profile found for this identity; contact support".to_string(),
            detail: None,
        }
    }

    pub fn store_failure(detail: impl Into<String>) -> Self {
        Self {
            kind: ResolutionErrorKind::StoreFailure,
            message: "Could not load your profile. Please try again.".to_string(),
            detail: Some(detail.into()),
        }
    }
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ResolutionError {}

/// Coarse lifecycle state derived from a [`ResolutionResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionPhase {
    Idle,
    Loading,
    Resolved,
    Error,
}

/// The profile binding handed to UI consumers.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolutionResult {
    pub profile_id: Option<String>,
    pub display_code: Option<String>,
    pub full_name: Option<String>,
    pub parent_unit_id: Option<String>,
    pub is_loading: bool,
    pub error: Option<ResolutionError>,
    #[serde(default)]
    pub is_mock: bool,
}

impl ResolutionResult {
    /// Nothing attempted yet.
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn loading() -> Self {
        Self {
            is_loading: true,
            ..Self::default()
        }
    }

    pub fn resolved(record: &ProfileRecord) -> Self {
        Self {
            profile_id: Some(record.profile_id.clone()),
            display_code: Some(record.display_code.clone()),
            full_name: Some(record.full_name.clone()),
            parent_unit_id: record.parent_unit_id.clone(),
            is_loading: false,
            error: None,
            is_mock: false,
        }
    }

    /// All profile fields cleared, error set.
    pub fn failed(error: ResolutionError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    /// Development stand-in carrying only the caller-supplied id.
    pub fn mock(profile_id: impl Into<String>) -> Self {
        Self {
            profile_id: Some(profile_id.into()),
            is_mock: true,
            ..Self::default()
        }
    }

    pub fn error_kind(&self) -> Option<ResolutionErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    pub fn phase(&self) -> ResolutionPhase {
        if self.is_loading {
            ResolutionPhase::Loading
        } else if self.error.is_some() {
            ResolutionPhase::Error
        } else if self.profile_id.is_some() {
            ResolutionPhase::Resolved
        } else {
            ResolutionPhase::Idle
        }
    }
}
