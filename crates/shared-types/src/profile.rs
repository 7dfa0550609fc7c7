use serde::{Deserialize, Serialize};

/// A resident profile as stored in the `residents` table.
///
/// Read-only from this workspace's point of view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "server", derive(sqlx::FromRow))]
pub struct ProfileRecord {
    pub profile_id: String,
    /// Short resident code shown on dashboards.
    pub display_code: String,
    pub full_name: String,
    /// Flat the resident belongs to.
    pub parent_unit_id: Option<String>,
    /// Owning session identity. `None` for rows created before accounts were linked.
    pub linked_session_id: Option<String>,
    pub contact_email: Option<String>,
    pub is_active: bool,
}

impl ProfileRecord {
    /// True when this row may be bound to `session_id` by direct linkage.
    pub fn is_linked_to(&self, session_id: &str) -> bool {
        self.is_active && self.linked_session_id.as_deref() == Some(session_id)
    }

    /// True when this row may be bound by the legacy email match.
    ///
    /// Rows already linked to a session never match by email.
    pub fn matches_legacy_email(&self, email: &str) -> bool {
        self.is_active
            && self.linked_session_id.is_none()
            && self.contact_email.as_deref() == Some(email)
    }
}
