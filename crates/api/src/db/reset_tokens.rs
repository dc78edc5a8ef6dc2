//! Password reset token repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crime_track_core::{ResetCode, UserId};

use super::{RepositoryError, ResetTokenStore, conflict_on_unique};
use crate::models::PasswordResetToken;

#[derive(Debug, sqlx::FromRow)]
struct ResetTokenRow {
    user_id: i32,
    code: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ResetTokenRow> for PasswordResetToken {
    type Error = RepositoryError;

    fn try_from(row: ResetTokenRow) -> Result<Self, Self::Error> {
        let code = ResetCode::parse(&row.code).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid reset code in database: {e}"))
        })?;

        Ok(Self {
            user_id: UserId::new(row.user_id),
            code,
            created_at: row.created_at,
        })
    }
}

/// `PostgreSQL`-backed [`ResetTokenStore`].
#[derive(Clone)]
pub struct ResetTokenRepository {
    pool: PgPool,
}

impl ResetTokenRepository {
    /// Create a new reset token repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResetTokenStore for ResetTokenRepository {
    async fn find_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<PasswordResetToken>, RepositoryError> {
        let row = sqlx::query_as::<_, ResetTokenRow>(
            "SELECT user_id, code, created_at FROM password_reset_tokens WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn insert(&self, token: &PasswordResetToken) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO password_reset_tokens (user_id, code, created_at) VALUES ($1, $2, $3)",
        )
        .bind(token.user_id)
        .bind(&token.code)
        .bind(token.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "reset code already outstanding"))?;

        Ok(())
    }

    async fn delete_for_user(&self, user_id: UserId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM password_reset_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn consume(&self, user_id: UserId, code: &ResetCode) -> Result<bool, RepositoryError> {
        let consumed = sqlx::query_scalar::<_, i32>(
            "DELETE FROM password_reset_tokens WHERE user_id = $1 AND code = $2 RETURNING user_id",
        )
        .bind(user_id)
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(consumed.is_some())
    }
}
