use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared_types::{AppError, SessionIdentity};

use super::{LocalSessionProvider, SessionListener, SessionProvider, SubscriptionId};

/// A refresh token must never establish a session.
const TOKEN_TYPE_ACCESS: &str = "access";
const TOKEN_TYPE_REFRESH: &str = "refresh";

/// Claims carried by the hosted auth service's access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: i64,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
    /// Empty for tokens minted before the `typ` claim existed.
    #[serde(default)]
    pub typ: String,
}

/// Session provider that establishes sessions from signed HS256 access tokens.
///
/// Token validation happens here; session state and change notifications are
/// delegated to an inner [`LocalSessionProvider`].
pub struct TokenSessionProvider {
    secret: String,
    sessions: LocalSessionProvider,
}

impl TokenSessionProvider {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            sessions: LocalSessionProvider::new(),
        }
    }

    /// Build from the `JWT_SECRET` env var (after loading `.env`).
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        match std::env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => Ok(Self::new(secret)),
            _ => Err(AppError::internal("JWT_SECRET must be set")),
        }
    }

    /// Validate an access token. Rejects refresh tokens and expired tokens.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, AppError> {
        let data = decode::<SessionClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|e| AppError::unauthorized(format!("Invalid access token: {e}")))?;

        if data.claims.typ == TOKEN_TYPE_REFRESH {
            return Err(AppError::unauthorized(
                "Refresh tokens cannot be used to sign in",
            ));
        }
        Ok(data.claims)
    }

    /// Validate `token` and make its subject the current session.
    pub fn sign_in_with_token(&self, token: &str) -> Result<SessionIdentity, AppError> {
        let claims = self.validate(token)?;
        let session = SessionIdentity::new(claims.sub, claims.email);
        tracing::info!(session_id = %session.id, "Session established from access token");
        self.sessions.sign_in(session.clone());
        Ok(session)
    }

    /// Validate a re-issued token for the same subject and announce a refresh.
    pub fn refresh_with_token(&self, token: &str) -> Result<(), AppError> {
        let claims = self.validate(token)?;
        match self.sessions.snapshot() {
            Some(current) if current.id == claims.sub => {
                self.sessions.refresh_token();
                Ok(())
            }
            Some(_) => Err(AppError::unauthorized(
                "Refreshed token belongs to a different subject",
            )),
            None => Err(AppError::unauthorized("No active session to refresh")),
        }
    }

    pub fn sign_out(&self) {
        self.sessions.sign_out();
    }

    /// Mint an access token. Meant for local development and tests.
    pub fn issue_token(
        &self,
        session: &SessionIdentity,
        ttl_minutes: i64,
    ) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: session.id.clone(),
            email: session.email.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(ttl_minutes)).timestamp(),
            jti: Some(uuid::Uuid::new_v4().to_string()),
            typ: TOKEN_TYPE_ACCESS.to_string(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::internal(format!("Failed to sign token: {e}")))
    }
}

impl SessionProvider for TokenSessionProvider {
    async fn current_session(&self) -> Result<Option<SessionIdentity>, AppError> {
        self.sessions.current_session().await
    }

    fn subscribe(&self, listener: SessionListener) -> SubscriptionId {
        self.sessions.subscribe(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.sessions.unsubscribe(id)
    }

    fn listener_count(&self) -> usize {
        self.sessions.listener_count()
    }
}
