use crate::error::ExecutorError;
use api_client::ApiClient;
use async_trait::async_trait;
use chrono::Utc;
use core_types::{Contract, OrderRequest, Trade};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// A generic trait for an execution back end.
///
/// This trait allows the dispatcher to be agnostic about whether it is
/// talking to the real broker or a dry-run simulation.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Submits `order` for `contract` and returns the acknowledgement.
    ///
    /// Implementations make exactly one submission attempt.
    async fn execute(&self, contract: &Contract, order: &OrderRequest) -> Result<Trade, ExecutorError>;
}

/// The "live" executor that sends real orders to the broker via the ApiClient.
pub struct LiveExecutor {
    api_client: Arc<dyn ApiClient>,
}

impl LiveExecutor {
    pub fn new(api_client: Arc<dyn ApiClient>) -> Self {
        Self { api_client }
    }
}

#[async_trait]
impl Executor for LiveExecutor {
    async fn execute(&self, contract: &Contract, order: &OrderRequest) -> Result<Trade, ExecutorError> {
        tracing::debug!("LiveExecutor: Placing order {:?}", order);

        let response = self.api_client.place_order(contract, order).await?;

        tracing::debug!("LiveExecutor: Received order response: {:?}", response);

        // Transform the broker's OrderResponse into our internal Trade receipt.
        Ok(Trade {
            order_id: response.order_id,
            client_order_id: response
                .client_order_id
                .and_then(|id| Uuid::parse_str(&id).ok())
                .unwrap_or(order.client_order_id), // Fallback to original
            symbol: response.code,
            side: order.side,
            quantity: order.quantity,
            price_type: order.price_type,
            price: order.price,
            order_type: order.order_type,
            status: response.status,
            timestamp: Utc::now(),
        })
    }
}

/// A dry-run executor: acknowledges every order without contacting the broker.
#[derive(Default)]
pub struct SimulatedExecutor {
    trades: Mutex<Vec<Trade>>,
}

impl SimulatedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every simulated trade so far, oldest first.
    pub fn trades(&self) -> Vec<Trade> {
        self.trades.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl Executor for SimulatedExecutor {
    async fn execute(&self, contract: &Contract, order: &OrderRequest) -> Result<Trade, ExecutorError> {
        let trade = Trade {
            order_id: format!("SIM-{}", Uuid::new_v4().simple()),
            client_order_id: order.client_order_id,
            symbol: contract.code.clone(),
            side: order.side,
            quantity: order.quantity,
            price_type: order.price_type,
            price: order.price,
            order_type: order.order_type,
            status: "Simulated".to_string(),
            timestamp: Utc::now(),
        };
        tracing::info!(symbol = %trade.symbol, quantity = trade.quantity, "Simulated order recorded.");

        self.trades
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(trade.clone());
        Ok(trade)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use api_client::mock::{MockClient, contract};
    use core_types::{OrderSide, OrderType, PriceType};
    use rust_decimal_macros::dec;

    fn market_sell(symbol: &str, quantity: u64) -> OrderRequest {
        OrderRequest {
            client_order_id: Uuid::new_v4(),
            symbol: symbol.to_string(),
            side: OrderSide::Sell,
            quantity,
            price_type: PriceType::Market,
            price: dec!(0),
            order_type: OrderType::Ioc,
        }
    }

    #[tokio::test]
    async fn live_executor_forwards_to_the_broker() {
        let api = Arc::new(MockClient::new());
        let executor = LiveExecutor::new(api.clone());
        let order = market_sell("2330", 1000);

        let trade = executor.execute(&contract("2330", dec!(1000)), &order).await.unwrap();

        assert_eq!(trade.order_id, "MOCK-1");
        assert_eq!(trade.client_order_id, order.client_order_id);
        assert_eq!(trade.quantity, 1000);
        assert_eq!(trade.status, "Submitted");
        assert_eq!(api.placed_orders().len(), 1);
    }

    #[tokio::test]
    async fn live_executor_surfaces_rejections() {
        let api = Arc::new(MockClient::new().rejecting_orders("insufficient inventory"));
        let executor = LiveExecutor::new(api.clone());

        let err = executor
            .execute(&contract("2330", dec!(1000)), &market_sell("2330", 1000))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("insufficient inventory"));
        assert_eq!(api.placed_orders().len(), 1);
    }

    #[tokio::test]
    async fn simulated_executor_records_without_a_broker() {
        let executor = SimulatedExecutor::new();

        let trade = executor
            .execute(&contract("2603", dec!(200)), &market_sell("2603", 2000))
            .await
            .unwrap();

        assert!(trade.order_id.starts_with("SIM-"));
        assert_eq!(trade.status, "Simulated");
        assert_eq!(executor.trades(), vec![trade]);
    }
}
