pub mod memory;

#[cfg(feature = "server")]
pub mod postgres;

use shared_types::{AppError, ProfileRecord};
use std::future::Future;

pub use memory::MemoryProfileStore;

#[cfg(feature = "server")]
pub use postgres::PgProfileStore;

// ── Trait ────────────────────────────────────────────────────────────

/// Read-only access to resident profiles.
///
/// Both lookups only consider active rows and return at most one record.
/// When several rows match, the one with the lowest `profile_id` wins.
/// `Ok(None)` means "no rows"; every `Err` that is not `NotFound` is a
/// real store failure.
pub trait ProfileStore: Send + Sync {
    /// Active profile whose `linked_session_id` equals `session_id`.
    fn find_active_by_session(
        &self,
        session_id: &str,
    ) -> impl Future<Output = Result<Option<ProfileRecord>, AppError>> + Send;

    /// Active, not-yet-linked profile whose `contact_email` equals `email`.
    fn find_active_legacy_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<ProfileRecord>, AppError>> + Send;
}
