use shared_types::{AppError, ProfileRecord};
use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use super::ProfileStore;

/// In-memory profile store for development and tests.
///
/// Rows are kept in a `BTreeMap` keyed by `profile_id`, so scans run in
/// primary-key order and duplicate matches resolve the same way every time.
#[derive(Default)]
pub struct MemoryProfileStore {
    rows: RwLock<BTreeMap<String, ProfileRecord>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: impl IntoIterator<Item = ProfileRecord>) -> Self {
        let store = Self::new();
        for record in records {
            store.upsert(record);
        }
        store
    }

    /// Insert or replace a row. Returns the previous row with the same id.
    pub fn upsert(&self, record: ProfileRecord) -> Option<ProfileRecord> {
        self.rows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.profile_id.clone(), record)
    }

    pub fn remove(&self, profile_id: &str) -> Option<ProfileRecord> {
        self.rows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(profile_id)
    }

    /// Flip `is_active`. Returns false if the row does not exist.
    pub fn set_active(&self, profile_id: &str, active: bool) -> bool {
        match self
            .rows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(profile_id)
        {
            Some(row) => {
                row.is_active = active;
                true
            }
            None => false,
        }
    }

    /// Point a row at a session, as the account-linking flow does.
    pub fn link(&self, profile_id: &str, session_id: Option<&str>) -> bool {
        match self
            .rows
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(profile_id)
        {
            Some(row) => {
                row.linked_session_id = session_id.map(str::to_string);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.rows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn first_match(
        &self,
        lookup: &'static str,
        key: &str,
        pred: impl Fn(&ProfileRecord) -> bool,
    ) -> Option<ProfileRecord> {
        let rows = self.rows.read().unwrap_or_else(PoisonError::into_inner);
        let mut matches = rows.values().filter(|r| pred(*r));
        let first = matches.next().cloned();
        let extra = matches.count();
        if extra > 0 {
            if let Some(row) = &first {
                tracing::warn!(
                    lookup,
                    key,
                    chosen = %row.profile_id,
                    duplicates = extra,
                    "Multiple active profiles matched; using lowest profile_id"
                );
            }
        }
        first
    }
}

impl ProfileStore for MemoryProfileStore {
    async fn find_active_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<ProfileRecord>, AppError> {
        Ok(self.first_match("session", session_id, |r| r.is_linked_to(session_id)))
    }

    async fn find_active_legacy_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ProfileRecord>, AppError> {
        Ok(self.first_match("email", email, |r| r.matches_legacy_email(email)))
    }
}
