use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use sqlx::prelude::FromRow;
use tracing::debug;
use uuid::Uuid;

use crate::domain::ledger::{self, Side};
use crate::model::access::HasOwner;
use crate::model::entity::{Position, Trade};
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, error::DatabaseResult};
use crate::web::AuthenticatedUser;

/// A user's simulated trading account. There is at most one per user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Portfolio {
    id: Uuid,
    user_id: Uuid,
    cash_balance: Decimal,
    initial_balance: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Everything an order wrote.
#[derive(Debug)]
pub struct OrderExecution {
    pub portfolio: Portfolio,
    /// `None` when the order closed the position.
    pub position: Option<Position>,
    pub trade: Trade,
}

#[derive(Debug, Clone)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
}

impl ResourceTyped for Portfolio {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Portfolio
    }
}

impl Portfolio {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn cash_balance(&self) -> Decimal {
        self.cash_balance
    }

    pub fn initial_balance(&self) -> Decimal {
        self.initial_balance
    }

    pub fn created_at(&self) -> &DateTime<Utc> {
        &self.created_at
    }

    pub fn updated_at(&self) -> &DateTime<Utc> {
        &self.updated_at
    }

    async fn ensure_in(
        conn: &mut PgConnection,
        user_id: Uuid,
        initial_balance: Decimal,
    ) -> DatabaseResult<()> {
        sqlx::query(
            r#"
            INSERT INTO portfolios (id, user_id, cash_balance, initial_balance)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(initial_balance)
        .execute(conn)
        .await?;
        Ok(())
    }

    /// The actor's portfolio, opened with `initial_balance` on first access.
    pub async fn get_or_create(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        initial_balance: Decimal,
    ) -> DatabaseResult<Self> {
        let mut conn = mm.executor().acquire().await?;
        Self::ensure_in(&mut conn, actor.user_id(), initial_balance).await?;

        let portfolio = sqlx::query_as("SELECT * FROM portfolios WHERE user_id = $1")
            .bind(actor.user_id())
            .fetch_one(&mut *conn)
            .await?;
        Ok(portfolio)
    }

    /// Fills `order` against the actor's portfolio.
    ///
    /// The portfolio row is locked for the whole transaction, so concurrent
    /// orders of one user are applied one after another. A rejected order
    /// rolls back without writing anything.
    pub async fn execute_order(
        mm: &ModelManager,
        actor: &AuthenticatedUser,
        initial_balance: Decimal,
        order: OrderRequest,
    ) -> DatabaseResult<OrderExecution> {
        ledger::validate(order.quantity, order.price)?;

        let mut tx = mm.executor().begin().await?;
        Self::ensure_in(&mut tx, actor.user_id(), initial_balance).await?;

        let portfolio: Portfolio =
            sqlx::query_as("SELECT * FROM portfolios WHERE user_id = $1 FOR UPDATE")
                .bind(actor.user_id())
                .fetch_one(&mut *tx)
                .await?;

        let existing = Position::find_in_tx(&mut tx, portfolio.id, &order.symbol).await?;
        let fill = ledger::execute(
            order.side,
            portfolio.cash_balance,
            existing.as_ref().map(Position::holding),
            order.quantity,
            order.price,
        )?;

        let portfolio: Portfolio = sqlx::query_as(
            "UPDATE portfolios SET cash_balance = $1, updated_at = now() WHERE id = $2 RETURNING *",
        )
        .bind(fill.cash_after)
        .bind(portfolio.id)
        .fetch_one(&mut *tx)
        .await?;

        let position = match fill.holding_after {
            Some(holding) => Some(
                Position::store_in_tx(&mut tx, portfolio.id, &order.symbol, holding, order.price)
                    .await?,
            ),
            None => {
                Position::remove_in_tx(&mut tx, portfolio.id, &order.symbol).await?;
                None
            }
        };

        let trade = Trade::record_in_tx(&mut tx, portfolio.id, &order.symbol, &fill).await?;
        tx.commit().await?;

        debug!(
            portfolio = %portfolio.id,
            symbol = %order.symbol,
            side = %order.side,
            quantity = %order.quantity,
            price = %order.price,
            "order filled"
        );

        Ok(OrderExecution {
            portfolio,
            position,
            trade,
        })
    }

    /// Drops every position and trade and restores the starting cash.
    pub async fn reset(self, mm: &ModelManager) -> DatabaseResult<Self> {
        let mut tx = mm.executor().begin().await?;

        sqlx::query("SELECT id FROM portfolios WHERE id = $1 FOR UPDATE")
            .bind(self.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM positions WHERE portfolio_id = $1")
            .bind(self.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM trades WHERE portfolio_id = $1")
            .bind(self.id)
            .execute(&mut *tx)
            .await?;

        let portfolio = sqlx::query_as(
            r#"
            UPDATE portfolios
            SET cash_balance = initial_balance, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(self.id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(portfolio)
    }
}

#[async_trait]
impl HasOwner for Portfolio {
    type OwnerId = Uuid;

    async fn get_owner_id(
        &self,
        _mm: &ModelManager,
        _actor: &AuthenticatedUser,
    ) -> DatabaseResult<Self::OwnerId> {
        Ok(self.user_id)
    }
}
