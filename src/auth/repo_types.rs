use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Name stamped on every token issued by login.
pub const PERSONAL_TOKEN_NAME: &str = "Personal Access Token";

/// Bearer credential row. The JWT handed to the client refers to it by `id`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AccessToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub revoked: bool,
    pub expires_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
}

impl AccessToken {
    pub fn new(user_id: Uuid, expires_at: OffsetDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: PERSONAL_TOKEN_NAME.to_string(),
            revoked: false,
            expires_at,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// Usable for authentication at `now`.
    pub fn is_active(&self, now: OffsetDateTime) -> bool {
        !self.revoked && self.expires_at > now
    }
}
