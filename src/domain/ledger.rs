//! Paper-trading position accounting.
//!
//! Cash and holdings are plain [`Decimal`]s; the model layer persists what these
//! functions return.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Scale kept for average cost after a weighted recompute.
pub const AVERAGE_COST_SCALE: u32 = 6;

/// Decimal places stored for share quantities.
pub const QUANTITY_SCALE: u32 = 6;

/// Decimal places stored for prices and cash amounts.
pub const PRICE_SCALE: u32 = 4;

/// Exclusive bound of quantities, prices and average costs (`NUMERIC(20, 6)`).
pub const MAX_UNITS: Decimal = Decimal::from_parts(0x107A_4000, 0x5AF3, 0, false, 0);

/// Exclusive bound of cash balances and trade totals (`NUMERIC(20, 4)`).
pub const MAX_BALANCE: Decimal = Decimal::from_parts(0x6FC1_0000, 0x0023_86F2, 0, false, 0);

pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    #[error("quantity must be positive, got {0}")]
    InvalidQuantity(Decimal),
    #[error("price must be positive, got {0}")]
    InvalidPrice(Decimal),
    #[error("insufficient funds: required {required}, available {available}")]
    InsufficientFunds { required: Decimal, available: Decimal },
    #[error("insufficient shares: requested {requested}, held {held}")]
    InsufficientShares { requested: Decimal, held: Decimal },
    #[error("{field} {value} has more than {scale} decimal places")]
    TooPrecise {
        field: &'static str,
        value: Decimal,
        scale: u32,
    },
    #[error("{field} {value} is out of range")]
    OutOfRange { field: &'static str, value: Decimal },
    #[error("order total rounds to zero")]
    TotalTooSmall,
    #[error("order amounts overflow")]
    Overflow,
    #[error("price {price} is more than {tolerance_percent}% away from the latest quote {quote}")]
    PriceOffQuote {
        price: Decimal,
        quote: Decimal,
        tolerance_percent: Decimal,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

impl TryFrom<&str> for Side {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            other => Err(format!("unknown side {other:?}")),
        }
    }
}

/// Quantity held of one symbol and its average cost basis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Holding {
    pub quantity: Decimal,
    pub average_cost: Decimal,
}

impl Holding {
    pub fn cost_basis(&self) -> Decimal {
        self.quantity * self.average_cost
    }

    pub fn market_value(&self, price: Decimal) -> Decimal {
        self.quantity * price
    }

    pub fn unrealized_pnl(&self, price: Decimal) -> Decimal {
        (price - self.average_cost) * self.quantity
    }
}

/// Outcome of a filled order.
#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub side: Side,
    pub quantity: Decimal,
    pub price: Decimal,
    /// `quantity * price`, debited on buys and credited on sells.
    pub total: Decimal,
    pub cash_after: Decimal,
    /// `None` when the position is closed.
    pub holding_after: Option<Holding>,
    /// Zero for buys.
    pub realized_pnl: Decimal,
}

fn check_amount(field: &'static str, value: Decimal, scale: u32, max: Decimal) -> LedgerResult<()> {
    if value.normalize().scale() > scale {
        return Err(LedgerError::TooPrecise { field, value, scale });
    }
    if value >= max {
        return Err(LedgerError::OutOfRange { field, value });
    }
    Ok(())
}

/// Rejects inputs the persisted columns would round or refuse.
pub fn validate(quantity: Decimal, price: Decimal) -> LedgerResult<()> {
    if quantity <= Decimal::ZERO {
        return Err(LedgerError::InvalidQuantity(quantity));
    }
    if price <= Decimal::ZERO {
        return Err(LedgerError::InvalidPrice(price));
    }
    check_amount("quantity", quantity, QUANTITY_SCALE, MAX_UNITS)?;
    check_amount("price", price, PRICE_SCALE, MAX_UNITS)
}

/// An explicit order price has to stay within `tolerance_percent` of the quote.
pub fn check_price_near_quote(
    price: Decimal,
    quote: Decimal,
    tolerance_percent: Decimal,
) -> LedgerResult<()> {
    let allowed = quote
        .checked_mul(tolerance_percent)
        .and_then(|d| d.checked_div(Decimal::ONE_HUNDRED))
        .ok_or(LedgerError::Overflow)?;
    let distance = price.checked_sub(quote).ok_or(LedgerError::Overflow)?.abs();

    if distance > allowed {
        return Err(LedgerError::PriceOffQuote {
            price,
            quote,
            tolerance_percent,
        });
    }
    Ok(())
}

/// `quantity * price` at cash precision. A zero total would move shares for free.
fn order_total(quantity: Decimal, price: Decimal) -> LedgerResult<Decimal> {
    let total = quantity
        .checked_mul(price)
        .ok_or(LedgerError::Overflow)?
        .round_dp(PRICE_SCALE);
    if total.is_zero() {
        return Err(LedgerError::TotalTooSmall);
    }
    if total >= MAX_BALANCE {
        return Err(LedgerError::OutOfRange {
            field: "total",
            value: total,
        });
    }
    Ok(total)
}

pub fn buy(
    cash: Decimal,
    holding: Option<Holding>,
    quantity: Decimal,
    price: Decimal,
) -> LedgerResult<Fill> {
    validate(quantity, price)?;

    let total = order_total(quantity, price)?;
    if total > cash {
        return Err(LedgerError::InsufficientFunds {
            required: total,
            available: cash,
        });
    }

    let holding_after = match holding {
        Some(h) => {
            let new_quantity = h.quantity.checked_add(quantity).ok_or(LedgerError::Overflow)?;
            if new_quantity >= MAX_UNITS {
                return Err(LedgerError::OutOfRange {
                    field: "quantity",
                    value: new_quantity,
                });
            }
            let average_cost = h
                .quantity
                .checked_mul(h.average_cost)
                .and_then(|basis| basis.checked_add(total))
                .and_then(|basis| basis.checked_div(new_quantity))
                .ok_or(LedgerError::Overflow)?
                .round_dp(AVERAGE_COST_SCALE);
            Holding {
                quantity: new_quantity,
                average_cost,
            }
        }
        None => Holding {
            quantity,
            average_cost: price,
        },
    };

    Ok(Fill {
        side: Side::Buy,
        quantity,
        price,
        total,
        cash_after: cash - total,
        holding_after: Some(holding_after),
        realized_pnl: Decimal::ZERO,
    })
}

pub fn sell(
    cash: Decimal,
    holding: Option<Holding>,
    quantity: Decimal,
    price: Decimal,
) -> LedgerResult<Fill> {
    validate(quantity, price)?;

    let held = holding.map(|h| h.quantity).unwrap_or(Decimal::ZERO);
    let holding = match holding {
        Some(h) if quantity <= h.quantity => h,
        _ => {
            return Err(LedgerError::InsufficientShares {
                requested: quantity,
                held,
            });
        }
    };

    let total = order_total(quantity, price)?;
    let remaining = holding.quantity - quantity;

    let cash_after = cash.checked_add(total).ok_or(LedgerError::Overflow)?;
    if cash_after >= MAX_BALANCE {
        return Err(LedgerError::OutOfRange {
            field: "cash balance",
            value: cash_after,
        });
    }

    let realized_pnl = (price - holding.average_cost)
        .checked_mul(quantity)
        .ok_or(LedgerError::Overflow)?
        .round_dp(PRICE_SCALE);

    Ok(Fill {
        side: Side::Sell,
        quantity,
        price,
        total,
        cash_after,
        holding_after: (!remaining.is_zero()).then_some(Holding {
            quantity: remaining,
            average_cost: holding.average_cost,
        }),
        realized_pnl,
    })
}

pub fn execute(
    side: Side,
    cash: Decimal,
    holding: Option<Holding>,
    quantity: Decimal,
    price: Decimal,
) -> LedgerResult<Fill> {
    match side {
        Side::Buy => buy(cash, holding, quantity, price),
        Side::Sell => sell(cash, holding, quantity, price),
    }
}

/// Totals of a portfolio marked to market.
#[derive(Debug, Clone, PartialEq, Serialize, utoipa::ToSchema)]
pub struct Valuation {
    pub cash: Decimal,
    pub market_value: Decimal,
    pub cost_basis: Decimal,
    pub unrealized_pnl: Decimal,
    pub total_value: Decimal,
    /// Percent change of `total_value` against the starting balance.
    pub total_return: Decimal,
}

pub fn value_portfolio(
    cash: Decimal,
    initial_balance: Decimal,
    marked: impl IntoIterator<Item = (Holding, Decimal)>,
) -> Valuation {
    let (market_value, cost_basis) = marked
        .into_iter()
        .fold((Decimal::ZERO, Decimal::ZERO), |(mv, cb), (h, price)| {
            (mv + h.market_value(price), cb + h.cost_basis())
        });

    let total_value = cash + market_value;
    let total_return = if initial_balance.is_zero() {
        Decimal::ZERO
    } else {
        ((total_value - initial_balance) / initial_balance * Decimal::ONE_HUNDRED).round_dp(2)
    };

    Valuation {
        cash,
        market_value,
        cost_basis,
        unrealized_pnl: market_value - cost_basis,
        total_value,
        total_return,
    }
}
