use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::domain::ledger::Holding;
use crate::model::access::HasOwner;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;

/// Shares of one symbol held in a portfolio. Rows only exist while quantity > 0.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Position {
    id: Uuid,
    portfolio_id: Uuid,
    symbol: String,
    quantity: Decimal,
    average_cost: Decimal,
    current_price: Decimal,
    updated_at: DateTime<Utc>,
}

impl ResourceTyped for Position {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Position
    }
}

impl Position {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn quantity(&self) -> Decimal {
        self.quantity
    }

    pub fn average_cost(&self) -> Decimal {
        self.average_cost
    }

    pub fn current_price(&self) -> Decimal {
        self.current_price
    }

    pub fn updated_at(&self) -> &DateTime<Utc> {
        &self.updated_at
    }

    pub fn holding(&self) -> Holding {
        Holding {
            quantity: self.quantity,
            average_cost: self.average_cost,
        }
    }

    pub async fn all_by_portfolio(
        mm: &ModelManager,
        portfolio_id: Uuid,
    ) -> DatabaseResult<Vec<Self>> {
        let rows = sqlx::query_as("SELECT * FROM positions WHERE portfolio_id = $1 ORDER BY symbol")
            .bind(portfolio_id)
            .fetch_all(mm.executor())
            .await?;
        Ok(rows)
    }

    /// Stores the latest quote for the position.
    pub async fn mark(self, mm: &ModelManager, price: Decimal) -> DatabaseResult<Self> {
        let position = sqlx::query_as(
            "UPDATE positions SET current_price = $1, updated_at = now() WHERE id = $2 RETURNING *",
        )
        .bind(price)
        .bind(self.id)
        .fetch_optional(mm.executor())
        .await?;

        // The row may have been sold off concurrently; keep the in-memory view then.
        Ok(position.unwrap_or(Self {
            current_price: price,
            ..self
        }))
    }

    pub(crate) async fn find_in_tx(
        conn: &mut PgConnection,
        portfolio_id: Uuid,
        symbol: &str,
    ) -> DatabaseResult<Option<Self>> {
        let position = sqlx::query_as(
            "SELECT * FROM positions WHERE portfolio_id = $1 AND symbol = $2 FOR UPDATE",
        )
        .bind(portfolio_id)
        .bind(symbol)
        .fetch_optional(conn)
        .await?;
        Ok(position)
    }

    pub(crate) async fn store_in_tx(
        conn: &mut PgConnection,
        portfolio_id: Uuid,
        symbol: &str,
        holding: Holding,
        price: Decimal,
    ) -> DatabaseResult<Self> {
        let position = sqlx::query_as(
            r#"
            INSERT INTO positions (id, portfolio_id, symbol, quantity, average_cost, current_price)
            VALUES ($1,$2,$3,$4,$5,$6)
            ON CONFLICT (portfolio_id, symbol) DO UPDATE SET
                quantity = EXCLUDED.quantity,
                average_cost = EXCLUDED.average_cost,
                current_price = EXCLUDED.current_price,
                updated_at = now()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(portfolio_id)
        .bind(symbol)
        .bind(holding.quantity)
        .bind(holding.average_cost)
        .bind(price)
        .fetch_one(conn)
        .await?;
        Ok(position)
    }

    pub(crate) async fn remove_in_tx(
        conn: &mut PgConnection,
        portfolio_id: Uuid,
        symbol: &str,
    ) -> DatabaseResult<()> {
        sqlx::query("DELETE FROM positions WHERE portfolio_id = $1 AND symbol = $2")
            .bind(portfolio_id)
            .bind(symbol)
            .execute(conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl HasOwner for Position {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        let owner: Uuid = sqlx::query_scalar("SELECT user_id FROM portfolios WHERE id = $1")
            .bind(self.portfolio_id)
            .fetch_one(mm.executor())
            .await?;
        Ok(owner)
    }
}
