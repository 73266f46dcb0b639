use crate::entities::{dao::AuthToken, parse_ts, Store};
use chrono::{DateTime, Utc};
use std::future::Future;

type TokenRow = (String, String, String, String, String);

fn token_from_row(row: TokenRow) -> AuthToken {
    let (id, user_id, token_hash, created_at, expires_at) = row;
    AuthToken {
        id,
        user_id,
        token_hash,
        created_at: parse_ts(&created_at, "auth_tokens.created_at"),
        expires_at: parse_ts(&expires_at, "auth_tokens.expires_at"),
    }
}

pub trait TokenStore: Send + Sync + 'static {
    fn insert_token(
        &self,
        token: &AuthToken,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn find_token_by_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = Result<Option<AuthToken>, sqlx::Error>> + Send;
    fn delete_token(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    /// Remove tokens whose expiry is at or before `now`; returns the
    /// number of rows deleted.
    fn delete_expired_tokens(
        &self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, sqlx::Error>> + Send;
}

impl TokenStore for Store {
    async fn insert_token(&self, token: &AuthToken) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO auth_tokens (id, user_id, token_hash, created_at, expires_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&token.id)
        .bind(&token.user_id)
        .bind(&token.token_hash)
        .bind(token.created_at.to_rfc3339())
        .bind(token.expires_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_token_by_hash(&self, token_hash: &str) -> Result<Option<AuthToken>, sqlx::Error> {
        let row: Option<TokenRow> = sqlx::query_as(
            "SELECT id, user_id, token_hash, created_at, expires_at \
             FROM auth_tokens WHERE token_hash = ?1",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(token_from_row))
    }

    async fn delete_token(&self, token_hash: &str) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM auth_tokens WHERE token_hash = ?1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_expired_tokens(&self, now: DateTime<Utc>) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE expires_at <= ?1")
            .bind(now.to_rfc3339())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
