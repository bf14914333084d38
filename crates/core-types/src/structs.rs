use crate::enums::{OrderSide, OrderType, PriceType};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tradable instrument as resolved by the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contract {
    /// The exchange code of the stock (e.g., "2330").
    pub code: String,
    pub name: String,
    /// Previous close used by the exchange to derive the daily price limits.
    pub reference: Decimal,
    pub limit_up: Decimal,
    /// The lowest price the exchange accepts today. Used as the protective
    /// limit price of `ROD` exit orders.
    pub limit_down: Decimal,
}

/// One daily OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Bar {
    /// The highest `high` across `bars`, or `None` for an empty slice.
    pub fn highest_high(bars: &[Bar]) -> Option<Decimal> {
        bars.iter().map(|b| b.high).max()
    }
}

/// A point-in-time quote for a single instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub code: String,
    /// Last traded price. Zero means no trade yet or a stale quote.
    pub close: Decimal,
}

/// A position currently held in the stock account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub code: String,
    /// Shares held.
    pub quantity: u64,
    /// Average acquisition price.
    pub cost_price: Decimal,
    /// The broker's last known price for the position. May be stale or zero.
    pub last_price: Decimal,
}

/// A fully specified order, ready to be sent to the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub client_order_id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    /// Quantity in shares.
    pub quantity: u64,
    pub price_type: PriceType,
    /// Limit price. Zero for market orders.
    pub price: Decimal,
    pub order_type: OrderType,
}

/// The broker's acknowledgement of a placed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub order_id: String,
    pub client_order_id: Uuid,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: u64,
    pub price_type: PriceType,
    pub price: Decimal,
    pub order_type: OrderType,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}
