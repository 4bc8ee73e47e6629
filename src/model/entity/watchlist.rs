use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct WatchlistItem {
    id: Uuid,
    user_id: Uuid,
    symbol: String,
    added_at: DateTime<Utc>,
}

impl ResourceTyped for WatchlistItem {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Watchlist
    }
}

impl WatchlistItem {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn added_at(&self) -> &DateTime<Utc> {
        &self.added_at
    }

    /// Fails with a unique violation when the symbol is already watched.
    pub async fn add(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        symbol: &str,
    ) -> DatabaseResult<Self> {
        let item = sqlx::query_as(
            "INSERT INTO watchlist (id, user_id, symbol) VALUES ($1,$2,$3) RETURNING *",
        )
        .bind(Uuid::new_v4())
        .bind(actor.user_id())
        .bind(symbol)
        .fetch_one(mm.executor())
        .await?;
        Ok(item)
    }

    /// `false` when the symbol was not on the list.
    pub async fn remove(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        symbol: &str,
    ) -> DatabaseResult<bool> {
        let result = sqlx::query("DELETE FROM watchlist WHERE user_id = $1 AND symbol = $2")
            .bind(actor.user_id())
            .bind(symbol)
            .execute(mm.executor())
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn all_for_user(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
    ) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as("SELECT * FROM watchlist WHERE user_id = $1 ORDER BY added_at, symbol")
            .bind(actor.user_id())
            .fetch_all(mm.executor())
            .await?;
        Ok(rows)
    }
}

#[async_trait]
impl HasOwner for WatchlistItem {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.user_id)
    }
}
