use crate::session::SessionState;
use api_client::{ApiClient, HistorySource};
use chrono::NaiveDate;
use core_types::{Bar, Contract};
use events::LogBook;
use rust_decimal::Decimal;
use std::sync::Arc;

/// Result of a historical-high lookup for one symbol.
#[derive(Debug, Clone, PartialEq)]
pub enum HighLookup {
    /// A positive high was found by the named source.
    Found { high: Decimal, source: String },
    /// Every source errored or had no usable bars.
    NoData,
    /// The broker could not resolve the symbol.
    Unresolved,
}

/// Looks up historical highs through an ordered list of bar sources.
///
/// Sources are tried in order; an error or an empty answer moves on to the
/// next one. Failures for one symbol never affect the others.
pub struct HistoricalHighResolver {
    api_client: Arc<dyn ApiClient>,
    sources: Vec<Arc<dyn HistorySource>>,
    log: LogBook,
}

impl HistoricalHighResolver {
    pub fn new(api_client: Arc<dyn ApiClient>, sources: Vec<Arc<dyn HistorySource>>, log: LogBook) -> Self {
        Self {
            api_client,
            sources,
            log,
        }
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Finds the highest daily high of `symbol` over `[start, end]`.
    pub async fn lookup(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> HighLookup {
        let contract = match self.api_client.resolve_contract(symbol).await {
            Ok(Some(contract)) => contract,
            Ok(None) => {
                self.log.warn(format!(
                    "WARN: {symbol} not found, historical high not available"
                ));
                return HighLookup::Unresolved;
            }
            Err(e) => {
                self.log.warn(format!(
                    "WARN: contract lookup for {symbol} failed, historical high not available: {e}"
                ));
                return HighLookup::Unresolved;
            }
        };

        for source in &self.sources {
            if let Some(high) = self.query(source.as_ref(), &contract, start, end).await {
                return HighLookup::Found {
                    high,
                    source: source.name().to_string(),
                };
            }
        }
        HighLookup::NoData
    }

    async fn query(
        &self,
        source: &dyn HistorySource,
        contract: &Contract,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Option<Decimal> {
        let ticker = source.source_symbol(contract);
        match source.daily_bars(contract, start, end).await {
            Ok(bars) => match Bar::highest_high(&bars).filter(|h| *h > Decimal::ZERO) {
                Some(high) => Some(high),
                None => {
                    tracing::debug!(source = source.name(), %ticker, "No bars returned.");
                    None
                }
            },
            Err(e) => {
                self.log.warn(format!(
                    "WARN: {} history for {ticker} unavailable: {e}",
                    source.name()
                ));
                None
            }
        }
    }

    /// Seeds the running high of every target, one symbol at a time.
    /// Returns the number of symbols seeded.
    pub async fn seed(&self, state: &mut SessionState, start: NaiveDate, end: NaiveDate) -> usize {
        self.log.info(format!("Fetching historical highs since {start}..."));

        let mut seeded = 0;
        for symbol in state.symbols() {
            match self.lookup(&symbol, start, end).await {
                HighLookup::Found { high, source } => {
                    state.seed_high(&symbol, high);
                    seeded += 1;
                    self.log.info(format!("{symbol} historical high since {start}: {high} ({source})"));
                }
                HighLookup::NoData => {
                    self.log.warn(format!(
                        "WARN: no history for {symbol}, the first quote becomes its high"
                    ));
                }
                HighLookup::Unresolved => {}
            }
        }
        seeded
    }
}
