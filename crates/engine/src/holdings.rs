//! Broker holdings as seen by the control layer: which ones to monitor, and
//! the per-position values shown on the board.

use crate::error::EngineError;
use crate::session::{TargetSpec, TargetView, exit_price};
use api_client::ApiClient;
use core_types::Holding;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Builds session targets from the current holdings, skipping excluded symbols.
pub fn targets_from_holdings(holdings: &[Holding], excluded: &[String]) -> BTreeMap<String, TargetSpec> {
    holdings
        .iter()
        .filter(|h| h.quantity > 0 && !excluded.iter().any(|s| s == &h.code))
        .map(|h| {
            (
                h.code.clone(),
                TargetSpec {
                    quantity: h.quantity,
                    cost_basis: h.cost_price,
                },
            )
        })
        .collect()
}

/// Fetches the current holdings and builds the session targets from them.
pub async fn load_targets(
    api_client: &dyn ApiClient,
    excluded: &[String],
) -> Result<(Vec<Holding>, BTreeMap<String, TargetSpec>), EngineError> {
    let holdings = api_client.list_positions().await?;
    let targets = targets_from_holdings(&holdings, excluded);
    tracing::info!(holdings = holdings.len(), targets = targets.len(), "Holdings loaded.");
    Ok((holdings, targets))
}

/// Display name and current price of one holding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldingQuote {
    /// Contract name; empty when the code did not resolve.
    pub name: String,
    pub price: Decimal,
}

/// Names and current prices for `holdings`, with a single batch snapshot.
///
/// Symbols without a positive quote keep the holding's last price. A failed
/// snapshot call falls back to last prices for everything.
pub async fn quote_holdings(api_client: &dyn ApiClient, holdings: &[Holding]) -> HashMap<String, HoldingQuote> {
    let mut quotes: HashMap<String, HoldingQuote> = holdings
        .iter()
        .map(|h| {
            let quote = HoldingQuote {
                name: String::new(),
                price: h.last_price,
            };
            (h.code.clone(), quote)
        })
        .collect();

    let mut contracts = Vec::with_capacity(holdings.len());
    for holding in holdings {
        match api_client.resolve_contract(&holding.code).await {
            Ok(Some(contract)) => {
                if let Some(quote) = quotes.get_mut(&contract.code) {
                    quote.name = contract.name.clone();
                }
                contracts.push(contract);
            }
            Ok(None) => tracing::warn!(symbol = %holding.code, "Holding is not a known contract."),
            Err(e) => tracing::warn!(symbol = %holding.code, error = %e, "Contract lookup failed."),
        }
    }
    if contracts.is_empty() {
        return quotes;
    }

    match api_client.fetch_snapshots(&contracts).await {
        Ok(snapshots) => {
            for snapshot in snapshots.into_iter().filter(|s| s.close > Decimal::ZERO) {
                if let Some(quote) = quotes.get_mut(&snapshot.code) {
                    quote.price = snapshot.close;
                }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "Snapshot refresh failed, showing last prices.");
        }
    }
    quotes
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionStatus {
    Excluded,
    Idle,
    Monitoring,
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PositionStatus::Excluded => "excluded",
            PositionStatus::Idle => "idle",
            PositionStatus::Monitoring => "monitoring",
        };
        f.write_str(s)
    }
}

/// One line of the position board.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionRow {
    pub code: String,
    pub name: String,
    pub quantity: u64,
    pub cost_price: Decimal,
    pub current_price: Decimal,
    pub historical_high: Option<Decimal>,
    /// The high the exit is measured from.
    pub base_high: Decimal,
    /// Zero for excluded positions.
    pub exit_price: Decimal,
    pub status: PositionStatus,
}

impl PositionRow {
    pub fn new(
        holding: &Holding,
        quote: &HoldingQuote,
        historical_high: Option<Decimal>,
        trailing_stop_pct: Decimal,
        excluded: bool,
    ) -> Self {
        let current_price = quote.price;
        let mut base_high = match historical_high.filter(|h| *h > Decimal::ZERO) {
            Some(high) => high,
            None if current_price > Decimal::ZERO => current_price,
            None => holding.cost_price,
        };
        if current_price > base_high {
            base_high = current_price;
        }

        let (exit, status) = if excluded {
            (Decimal::ZERO, PositionStatus::Excluded)
        } else {
            (exit_price(base_high, trailing_stop_pct), PositionStatus::Idle)
        };

        Self {
            code: holding.code.clone(),
            name: quote.name.clone(),
            quantity: holding.quantity,
            cost_price: holding.cost_price,
            current_price,
            historical_high,
            base_high,
            exit_price: exit,
            status,
        }
    }

    /// Refreshes the row from a running session's view of the same symbol.
    pub fn apply_view(&mut self, target: &TargetView, trailing_stop_pct: Decimal) {
        if let Some(price) = target.latest_price {
            self.current_price = price;
        }
        if let Some(high) = target.running_high {
            self.base_high = high;
        }
        if self.current_price > self.base_high {
            self.base_high = self.current_price;
        }
        self.exit_price = exit_price(self.base_high, trailing_stop_pct);
        self.status = PositionStatus::Monitoring;
    }

    /// Marks a row whose target has left the session.
    pub fn mark_idle(&mut self) {
        if self.status == PositionStatus::Monitoring {
            self.status = PositionStatus::Idle;
        }
    }
}
