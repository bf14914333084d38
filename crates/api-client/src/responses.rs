use crate::error::ApiError;
use chrono::{DateTime, NaiveDate};
use core_types::{Bar, Contract, Holding, OrderSide, OrderType, PriceType, Snapshot};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A stock contract from `GET /api/v1/contracts/stocks/{code}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ContractResponse {
    pub code: String,
    #[serde(default)]
    pub name: String,
    pub reference: Decimal,
    pub limit_up: Decimal,
    pub limit_down: Decimal,
}

impl From<ContractResponse> for Contract {
    fn from(raw: ContractResponse) -> Self {
        Contract {
            code: raw.code,
            name: raw.name,
            reference: raw.reference,
            limit_up: raw.limit_up,
            limit_down: raw.limit_down,
        }
    }
}

/// Request body of `POST /api/v1/snapshots`.
#[derive(Debug, Serialize)]
pub struct SnapshotRequest<'a> {
    pub codes: Vec<&'a str>,
}

/// One entry of the `POST /api/v1/snapshots` response.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotResponse {
    pub code: String,
    pub close: Decimal,
    /// Exchange timestamp in nanoseconds. Informational only.
    #[serde(default)]
    pub ts: Option<i64>,
}

impl From<SnapshotResponse> for Snapshot {
    fn from(raw: SnapshotResponse) -> Self {
        Snapshot {
            code: raw.code,
            close: raw.close,
        }
    }
}

/// The columnar daily-bar payload of `GET /api/v1/kbars`.
///
/// Every column holds one value per bar; `ts` is the bar's epoch timestamp in
/// nanoseconds.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct KbarsResponse {
    #[serde(default)]
    pub ts: Vec<i64>,
    #[serde(rename = "Open", default)]
    pub open: Vec<Decimal>,
    #[serde(rename = "High", default)]
    pub high: Vec<Decimal>,
    #[serde(rename = "Low", default)]
    pub low: Vec<Decimal>,
    #[serde(rename = "Close", default)]
    pub close: Vec<Decimal>,
    #[serde(rename = "Volume", default)]
    pub volume: Vec<Decimal>,
}

impl KbarsResponse {
    /// Transposes the columns into bars, rejecting ragged payloads.
    pub fn into_bars(self) -> Result<Vec<Bar>, ApiError> {
        let len = self.ts.len();
        let columns = [
            self.open.len(),
            self.high.len(),
            self.low.len(),
            self.close.len(),
            self.volume.len(),
        ];
        if columns.iter().any(|&c| c != len) {
            return Err(ApiError::InvalidData(format!(
                "kbars columns have mismatched lengths: ts={len}, ohlcv={columns:?}"
            )));
        }

        (0..len)
            .map(|i| {
                Ok(Bar {
                    date: date_from_nanos(self.ts[i])?,
                    open: self.open[i],
                    high: self.high[i],
                    low: self.low[i],
                    close: self.close[i],
                    volume: self.volume[i],
                })
            })
            .collect()
    }
}

fn date_from_nanos(ts: i64) -> Result<NaiveDate, ApiError> {
    if ts < 0 {
        return Err(ApiError::InvalidData(format!("Invalid bar timestamp: {ts}")));
    }
    Ok(DateTime::from_timestamp_nanos(ts).date_naive())
}

/// A single stock position from `GET /api/v1/positions`.
#[derive(Debug, Clone, Deserialize)]
pub struct PositionResponse {
    pub code: String,
    /// Shares held. Zero for positions closed earlier in the day.
    pub quantity: i64,
    /// Average cost.
    pub price: Decimal,
    #[serde(default)]
    pub last_price: Decimal,
}

impl PositionResponse {
    /// Converts an open position into a `Holding`; closed or short rows yield `None`.
    pub fn into_holding(self) -> Option<Holding> {
        let quantity = u64::try_from(self.quantity).ok().filter(|&q| q > 0)?;
        Some(Holding {
            code: self.code,
            quantity,
            cost_price: self.price,
            last_price: self.last_price,
        })
    }
}

/// Request body of `POST /api/v1/orders`.
#[derive(Debug, Serialize)]
pub struct OrderPayload<'a> {
    pub code: &'a str,
    pub action: OrderSide,
    pub quantity: u64,
    pub price: Decimal,
    pub price_type: PriceType,
    pub order_type: OrderType,
    pub client_order_id: String,
}

/// The response from a successful `POST /api/v1/orders` request.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderResponse {
    pub order_id: String,
    #[serde(default)]
    pub client_order_id: Option<String>,
    pub code: String,
    pub status: String,
}

/// Represents an error response from the broker API.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub code: i32,
    pub msg: String,
}
