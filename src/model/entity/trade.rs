use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::PgConnection;
use sqlx::prelude::FromRow;
use uuid::Uuid;

use crate::domain::ledger::Fill;
use crate::model::repo::ResourceTyped;
use crate::model::{ModelManager, Page, error::DatabaseResult};

/// An executed order. The trade log is append-only.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, utoipa::ToSchema)]
pub struct Trade {
    id: Uuid,
    portfolio_id: Uuid,
    symbol: String,
    side: String,
    quantity: Decimal,
    price: Decimal,
    total: Decimal,
    realized_pnl: Decimal,
    executed_at: DateTime<Utc>,
}

impl ResourceTyped for Trade {
    fn get_resource_type() -> crate::model::ResourceType {
        crate::model::ResourceType::Trade
    }
}

impl Trade {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn side(&self) -> &str {
        &self.side
    }

    pub fn total(&self) -> Decimal {
        self.total
    }

    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    pub(crate) async fn record_in_tx(
        conn: &mut PgConnection,
        portfolio_id: Uuid,
        symbol: &str,
        fill: &Fill,
    ) -> DatabaseResult<Self> {
        let trade = sqlx::query_as(
            r#"
            INSERT INTO trades (id, portfolio_id, symbol, side, quantity, price, total, realized_pnl)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(portfolio_id)
        .bind(symbol)
        .bind(fill.side.to_string())
        .bind(fill.quantity)
        .bind(fill.price)
        .bind(fill.total)
        .bind(fill.realized_pnl)
        .fetch_one(conn)
        .await?;
        Ok(trade)
    }

    /// Newest first.
    pub async fn page_by_portfolio(
        mm: &ModelManager,
        portfolio_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Page<Self>> {
        let items = sqlx::query_as(
            r#"
            SELECT * FROM trades
            WHERE portfolio_id = $1
            ORDER BY executed_at DESC, id
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(portfolio_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(mm.executor())
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM trades WHERE portfolio_id = $1")
            .bind(portfolio_id)
            .fetch_one(mm.executor())
            .await?;

        Ok(Page::new(items, total, limit, offset))
    }

    pub async fn realized_total(mm: &ModelManager, portfolio_id: Uuid) -> DatabaseResult<Decimal> {
        let total: Decimal = sqlx::query_scalar(
            "SELECT COALESCE(SUM(realized_pnl), 0) FROM trades WHERE portfolio_id = $1",
        )
        .bind(portfolio_id)
        .fetch_one(mm.executor())
        .await?;
        Ok(total)
    }
}
