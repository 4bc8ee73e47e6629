use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshToken {
    id: Uuid,
    token: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct RefreshTokenCreate {
    pub token: String,
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl ResourceTyped for RefreshToken {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::RefreshToken
    }
}

impl RefreshToken {
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn expires_at(&self) -> &DateTime<Utc> {
        &self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub async fn create(mm: &ModelManager, data: RefreshTokenCreate) -> DatabaseResult<Self> {
        let token = sqlx::query_as(
            "INSERT INTO refresh_tokens (id, token, user_id, expires_at) VALUES ($1,$2,$3,$4) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&data.token)
        .bind(data.user_id)
        .bind(data.expires_at)
        .fetch_one(mm.executor())
        .await?;

        Ok(token)
    }

    /// Drops every token the user holds and stores `data` in one transaction.
    pub async fn replace_for_user(
        mm: &ModelManager,
        data: RefreshTokenCreate,
    ) -> DatabaseResult<Self> {
        let mut tx = mm.executor().begin().await?;

        sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(data.user_id)
            .execute(&mut *tx)
            .await?;

        let token = sqlx::query_as(
            "INSERT INTO refresh_tokens (id, token, user_id, expires_at) VALUES ($1,$2,$3,$4) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&data.token)
        .bind(data.user_id)
        .bind(data.expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(token)
    }

    /// Deletes `self` and stores its successor atomically; `None` if `self` was already consumed.
    pub async fn rotate(
        self,
        mm: &ModelManager,
        data: RefreshTokenCreate,
    ) -> DatabaseResult<Option<Self>> {
        let mut tx = mm.executor().begin().await?;

        let deleted = sqlx::query("DELETE FROM refresh_tokens WHERE id = $1")
            .bind(self.id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if deleted == 0 {
            return Ok(None);
        }

        let token = sqlx::query_as(
            "INSERT INTO refresh_tokens (id, token, user_id, expires_at) VALUES ($1,$2,$3,$4) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(&data.token)
        .bind(data.user_id)
        .bind(data.expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(token))
    }

    pub async fn find_by_token(mm: &ModelManager, token: &str) -> DatabaseResult<Option<Self>> {
        let result = sqlx::query_as("SELECT * FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .fetch_optional(mm.executor())
            .await?;
        Ok(result)
    }

    pub async fn delete(self, mm: &ModelManager) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM refresh_tokens WHERE id = $1")
            .bind(self.id)
            .execute(mm.executor())
            .await?;
        Ok(())
    }

    pub async fn delete_for_user(mm: &ModelManager, user_id: Uuid) -> DatabaseResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE user_id = $1")
            .bind(user_id)
            .execute(mm.executor())
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_expired(mm: &ModelManager) -> DatabaseResult<u64> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= now()")
            .execute(mm.executor())
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod test {
    use chrono::Duration;

    use super::*;

    #[test]
    fn expiry_is_inclusive() {
        let now = Utc::now();
        let token = RefreshToken {
            id: Uuid::new_v4(),
            token: String::from("t"),
            user_id: Uuid::new_v4(),
            expires_at: now,
            created_at: now - Duration::days(7),
        };

        assert!(token.is_expired(now));
        assert!(!token.is_expired(now - Duration::seconds(1)));
    }
}
