use crate::ApiClient;
use crate::error::ApiError;
use async_trait::async_trait;
use chrono::NaiveDate;
use core_types::{Bar, Contract};
use std::sync::Arc;

/// A source of daily bars.
///
/// Several sources expose the same shape so that callers can try them in
/// order, falling back to the next one when a source errors or has no data.
/// Each source maps the broker contract to its own identifier.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// A short name used in log messages.
    fn name(&self) -> &str;

    /// The identifier this source uses for `contract`.
    fn source_symbol(&self, contract: &Contract) -> String {
        contract.code.clone()
    }

    /// Fetches daily bars for `[start, end]`, both inclusive.
    async fn daily_bars(
        &self,
        contract: &Contract,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, ApiError>;
}

/// The broker's own bar history, the primary source.
pub struct BrokerHistory {
    api_client: Arc<dyn ApiClient>,
}

impl BrokerHistory {
    pub fn new(api_client: Arc<dyn ApiClient>) -> Self {
        Self { api_client }
    }
}

#[async_trait]
impl HistorySource for BrokerHistory {
    fn name(&self) -> &str {
        "broker"
    }

    async fn daily_bars(
        &self,
        contract: &Contract,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Bar>, ApiError> {
        self.api_client.fetch_daily_bars(contract, start, end).await
    }
}
