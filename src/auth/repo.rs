use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::AccessToken;

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn insert(&self, token: &AccessToken) -> anyhow::Result<()>;
    async fn find(&self, id: Uuid) -> anyhow::Result<Option<AccessToken>>;
    /// Marks the token revoked. Returns false when no such token exists.
    async fn revoke(&self, id: Uuid) -> anyhow::Result<bool>;
}

#[derive(Clone)]
pub struct PgTokenStore {
    db: PgPool,
}

impl PgTokenStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    async fn insert(&self, token: &AccessToken) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO access_tokens (id, user_id, name, revoked, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(token.id)
        .bind(token.user_id)
        .bind(&token.name)
        .bind(token.revoked)
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(&self.db)
        .await
        .context("insert access token")?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> anyhow::Result<Option<AccessToken>> {
        let token = sqlx::query_as::<_, AccessToken>(
            r#"
            SELECT id, user_id, name, revoked, expires_at, created_at
              FROM access_tokens
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find access token")?;
        Ok(token)
    }

    async fn revoke(&self, id: Uuid) -> anyhow::Result<bool> {
        let res = sqlx::query(r#"UPDATE access_tokens SET revoked = TRUE WHERE id = $1"#)
            .bind(id)
            .execute(&self.db)
            .await
            .context("revoke access token")?;
        Ok(res.rows_affected() > 0)
    }
}
