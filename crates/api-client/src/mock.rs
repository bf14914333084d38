//! Scripted in-memory gateway for tests.
//!
//! `MockClient` answers contract lookups from a fixed table, replays a queue of
//! scripted snapshot batches (one per call) and records every order it is
//! asked to place. `StaticHistory` serves canned daily bars per code.

use crate::error::ApiError;
use crate::history::HistorySource;
use crate::responses::OrderResponse;
use crate::ApiClient;
use async_trait::async_trait;
use chrono::NaiveDate;
use core_types::{Bar, Contract, Holding, OrderRequest, Snapshot};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

/// A contract with a limit-down ten percent below `reference`.
pub fn contract(code: &str, reference: Decimal) -> Contract {
    let tenth = reference / Decimal::from(10);
    Contract {
        code: code.to_string(),
        name: format!("Stock {code}"),
        reference,
        limit_up: reference + tenth,
        limit_down: reference - tenth,
    }
}

/// A daily bar whose OHLC all equal `high`.
pub fn bar(date: NaiveDate, high: Decimal) -> Bar {
    Bar {
        date,
        open: high,
        high,
        low: high,
        close: high,
        volume: Decimal::from(1000),
    }
}

#[derive(Default)]
struct MockState {
    contracts: HashMap<String, Contract>,
    failing_lookups: HashSet<String>,
    snapshot_script: VecDeque<Result<Vec<Snapshot>, String>>,
    snapshot_calls: usize,
    bars: HashMap<String, Result<Vec<Bar>, String>>,
    positions: Vec<Holding>,
    positions_error: Option<String>,
    orders: Vec<(Contract, OrderRequest)>,
    reject_orders: Option<String>,
}

#[derive(Default)]
pub struct MockClient {
    state: Mutex<MockState>,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contract(self, contract: Contract) -> Self {
        self.lock().contracts.insert(contract.code.clone(), contract);
        self
    }

    /// Makes contract lookups for `code` fail with a transport error.
    pub fn with_failing_lookup(self, code: &str) -> Self {
        self.lock().failing_lookups.insert(code.to_string());
        self
    }

    pub fn with_bars(self, code: &str, bars: Vec<Bar>) -> Self {
        self.lock().bars.insert(code.to_string(), Ok(bars));
        self
    }

    pub fn with_bars_error(self, code: &str, message: &str) -> Self {
        self.lock().bars.insert(code.to_string(), Err(message.to_string()));
        self
    }

    pub fn with_positions(self, positions: Vec<Holding>) -> Self {
        self.lock().positions = positions;
        self
    }

    pub fn with_positions_error(self, message: &str) -> Self {
        self.lock().positions_error = Some(message.to_string());
        self
    }

    /// Makes every order placement fail with `message`.
    pub fn rejecting_orders(self, message: &str) -> Self {
        self.lock().reject_orders = Some(message.to_string());
        self
    }

    /// Queues the answer of the next unanswered snapshot call.
    pub fn push_snapshots(&self, quotes: &[(&str, Decimal)]) {
        let batch = quotes
            .iter()
            .map(|(code, close)| Snapshot {
                code: code.to_string(),
                close: *close,
            })
            .collect();
        self.lock().snapshot_script.push_back(Ok(batch));
    }

    /// Queues a failure for the next unanswered snapshot call.
    pub fn push_snapshot_error(&self, message: &str) {
        self.lock().snapshot_script.push_back(Err(message.to_string()));
    }

    pub fn snapshot_calls(&self) -> usize {
        self.lock().snapshot_calls
    }

    pub fn placed_orders(&self) -> Vec<(Contract, OrderRequest)> {
        self.lock().orders.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl ApiClient for MockClient {
    async fn resolve_contract(&self, code: &str) -> Result<Option<Contract>, ApiError> {
        let state = self.lock();
        if state.failing_lookups.contains(code) {
            return Err(ApiError::Unavailable(format!("lookup of {code} timed out")));
        }
        Ok(state.contracts.get(code).cloned())
    }

    async fn fetch_snapshots(&self, contracts: &[Contract]) -> Result<Vec<Snapshot>, ApiError> {
        let mut state = self.lock();
        state.snapshot_calls += 1;
        match state.snapshot_script.pop_front() {
            Some(Ok(batch)) => Ok(batch
                .into_iter()
                .filter(|s| contracts.iter().any(|c| c.code == s.code))
                .collect()),
            Some(Err(message)) => Err(ApiError::Unavailable(message)),
            None => Ok(Vec::new()),
        }
    }

    async fn fetch_daily_bars(
        &self,
        contract: &Contract,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<Bar>, ApiError> {
        match self.lock().bars.get(&contract.code) {
            Some(Ok(bars)) => Ok(bars.clone()),
            Some(Err(message)) => Err(ApiError::Unavailable(message.clone())),
            None => Ok(Vec::new()),
        }
    }

    async fn place_order(
        &self,
        contract: &Contract,
        order: &OrderRequest,
    ) -> Result<OrderResponse, ApiError> {
        let mut state = self.lock();
        state.orders.push((contract.clone(), order.clone()));
        if let Some(message) = &state.reject_orders {
            return Err(ApiError::Rejected {
                status: 400,
                message: message.clone(),
            });
        }
        Ok(OrderResponse {
            order_id: format!("MOCK-{}", state.orders.len()),
            client_order_id: Some(order.client_order_id.to_string()),
            code: contract.code.clone(),
            status: "Submitted".to_string(),
        })
    }

    async fn list_positions(&self) -> Result<Vec<Holding>, ApiError> {
        let state = self.lock();
        match &state.positions_error {
            Some(message) => Err(ApiError::Unavailable(message.clone())),
            None => Ok(state.positions.clone()),
        }
    }
}

/// A named history source with canned answers per code.
pub struct StaticHistory {
    name: String,
    suffix: String,
    bars: HashMap<String, Result<Vec<Bar>, String>>,
    calls: Mutex<Vec<String>>,
}

impl StaticHistory {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            suffix: String::new(),
            bars: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Appended to the contract code to form this source's identifier.
    pub fn with_suffix(mut self, suffix: &str) -> Self {
        self.suffix = suffix.to_string();
        self
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<Bar>) -> Self {
        self.bars.insert(code.to_string(), Ok(bars));
        self
    }

    pub fn with_error(mut self, code: &str, message: &str) -> Self {
        self.bars.insert(code.to_string(), Err(message.to_string()));
        self
    }

    /// The source identifiers requested so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl HistorySource for StaticHistory {
    fn name(&self) -> &str {
        &self.name
    }

    fn source_symbol(&self, contract: &Contract) -> String {
        format!("{}{}", contract.code, self.suffix)
    }

    async fn daily_bars(
        &self,
        contract: &Contract,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<Bar>, ApiError> {
        self.calls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(self.source_symbol(contract));
        match self.bars.get(&contract.code) {
            Some(Ok(bars)) => Ok(bars.clone()),
            Some(Err(message)) => Err(ApiError::Unavailable(message.clone())),
            None => Ok(Vec::new()),
        }
    }
}
