use shared_types::{AppError, ProfileRecord};
use sqlx::{Pool, Postgres};

use super::ProfileStore;
use crate::error_convert::SqlxErrorExt;

/// Profile store backed by the `residents` table.
///
/// Queries go through the shared pool; its acquire timeout is the only
/// timeout applied, and it surfaces as a `DatabaseError`.
#[derive(Clone)]
pub struct PgProfileStore {
    pool: Pool<Postgres>,
}

impl PgProfileStore {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }
}

impl ProfileStore for PgProfileStore {
    #[tracing::instrument(skip(self))]
    async fn find_active_by_session(
        &self,
        session_id: &str,
    ) -> Result<Option<ProfileRecord>, AppError> {
        let row = sqlx::query_as::<_, ProfileRecord>(
            r#"
            SELECT id::text AS profile_id,
                   resident_code AS display_code,
                   full_name,
                   flat_id::text AS parent_unit_id,
                   auth_user_id AS linked_session_id,
                   email AS contact_email,
                   is_active
            FROM residents
            WHERE auth_user_id = $1 AND is_active = TRUE
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

        Ok(row)
    }

    #[tracing::instrument(skip(self))]
    async fn find_active_legacy_by_email(
        &self,
        email: &str,
    ) -> Result<Option<ProfileRecord>, AppError> {
        let row = sqlx::query_as::<_, ProfileRecord>(
            r#"
            SELECT id::text AS profile_id,
                   resident_code AS display_code,
                   full_name,
                   flat_id::text AS parent_unit_id,
                   auth_user_id AS linked_session_id,
                   email AS contact_email,
                   is_active
            FROM residents
            WHERE email = $1 AND auth_user_id IS NULL AND is_active = TRUE
            ORDER BY id ASC
            LIMIT 1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(SqlxErrorExt::into_app_error)?;

        Ok(row)
    }
}
