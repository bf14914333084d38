use crate::error::ExecutorError;
use crate::exchange::Executor;
use api_client::ApiClient;
use core_types::{Contract, OrderRequest, OrderSide, OrderType, PriceType, Trade};
use events::LogBook;
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

/// Result of a single dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The order was accepted by the executor.
    Placed(Trade),
    /// The symbol could not be resolved; nothing was sent.
    ContractNotFound,
    /// The order was sent (or built) and failed; it is not retried.
    Failed(String),
}

/// Builds the exit order for `contract`.
///
/// `ROD` orders are limit orders at the contract's limit-down price, the
/// lowest price the exchange accepts, which keeps the fill likely while
/// bounding the price. `IOC` and `FOK` orders are market orders with a zero
/// price.
pub fn build_sell_order(
    contract: &Contract,
    quantity: u64,
    order_type: OrderType,
) -> Result<OrderRequest, ExecutorError> {
    if quantity == 0 {
        return Err(ExecutorError::InvalidQuantity {
            symbol: contract.code.clone(),
            quantity,
        });
    }

    let price_type = order_type.price_type();
    let price = match price_type {
        PriceType::Limit => contract.limit_down,
        PriceType::Market => Decimal::ZERO,
    };

    Ok(OrderRequest {
        client_order_id: Uuid::new_v4(),
        symbol: contract.code.clone(),
        side: OrderSide::Sell,
        quantity,
        price_type,
        price,
        order_type,
    })
}

/// Translates a fired trailing stop into a single sell order.
pub struct OrderDispatcher {
    api_client: Arc<dyn ApiClient>,
    executor: Arc<dyn Executor>,
    log: LogBook,
}

impl OrderDispatcher {
    pub fn new(api_client: Arc<dyn ApiClient>, executor: Arc<dyn Executor>, log: LogBook) -> Self {
        Self {
            api_client,
            executor,
            log,
        }
    }

    /// Sells `quantity` shares of `symbol`.
    ///
    /// Makes at most one placement call. Every outcome, including failures,
    /// is written to the operator log; nothing is retried.
    pub async fn dispatch(
        &self,
        symbol: &str,
        quantity: u64,
        order_type: OrderType,
        reason: &str,
    ) -> DispatchOutcome {
        let contract = match self.api_client.resolve_contract(symbol).await {
            Ok(Some(contract)) => contract,
            Ok(None) => {
                self.log.error(format!(
                    "ERROR: no contract found for {symbol}, exit order NOT placed ({reason})"
                ));
                return DispatchOutcome::ContractNotFound;
            }
            Err(e) => {
                self.log.error(format!(
                    "ERROR: contract lookup for {symbol} failed, exit order NOT placed: {e}"
                ));
                return DispatchOutcome::ContractNotFound;
            }
        };

        let order = match build_sell_order(&contract, quantity, order_type) {
            Ok(order) => order,
            Err(e) => {
                self.log.error(format!("Order for {symbol} not placed: {e}"));
                return DispatchOutcome::Failed(e.to_string());
            }
        };

        match order.price_type {
            PriceType::Limit => self.log.info(format!(
                "Order type {order_type}: limit at limit-down price {} to ensure a fill",
                order.price
            )),
            PriceType::Market => self.log.info(format!("Order type {order_type}: market order")),
        }

        match self.executor.execute(&contract, &order).await {
            Ok(trade) => {
                self.log.info(format!(
                    "[EXIT ORDER] {reason} | code: {symbol} | shares: {quantity} | mode: {order_type} | order id: {}",
                    trade.order_id
                ));
                DispatchOutcome::Placed(trade)
            }
            Err(e) => {
                self.log.error(format!("Order placement failed ({symbol}): {e}"));
                DispatchOutcome::Failed(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::{LiveExecutor, SimulatedExecutor};
    use api_client::mock::{MockClient, contract};
    use events::LogLevel;
    use rust_decimal_macros::dec;

    fn live_dispatcher(api: Arc<MockClient>) -> (OrderDispatcher, LogBook) {
        let log = LogBook::default();
        let executor = Arc::new(LiveExecutor::new(api.clone()));
        (OrderDispatcher::new(api, executor, log.clone()), log)
    }

    #[test]
    fn rod_sells_at_limit_down() {
        let order = build_sell_order(&contract("2330", dec!(1000)), 1000, OrderType::Rod).unwrap();
        assert_eq!(order.side, OrderSide::Sell);
        assert_eq!(order.price_type, PriceType::Limit);
        assert_eq!(order.price, dec!(900));
        assert_eq!(order.order_type, OrderType::Rod);
    }

    #[test]
    fn ioc_and_fok_sell_at_market() {
        for order_type in [OrderType::Ioc, OrderType::Fok] {
            let order = build_sell_order(&contract("2330", dec!(1000)), 500, order_type).unwrap();
            assert_eq!(order.price_type, PriceType::Market);
            assert_eq!(order.price, Decimal::ZERO);
            assert_eq!(order.order_type, order_type);
            assert_eq!(order.quantity, 500);
        }
    }

    #[test]
    fn zero_quantity_is_rejected() {
        assert!(matches!(
            build_sell_order(&contract("2330", dec!(1000)), 0, OrderType::Ioc),
            Err(ExecutorError::InvalidQuantity { .. })
        ));
    }

    #[tokio::test]
    async fn dispatch_places_exactly_one_order() {
        let api = Arc::new(MockClient::new().with_contract(contract("2603", dec!(200))));
        let (dispatcher, log) = live_dispatcher(api.clone());

        let outcome = dispatcher
            .dispatch("2603", 2000, OrderType::Rod, "trailing stop hit")
            .await;

        let DispatchOutcome::Placed(trade) = outcome else {
            panic!("expected a placed order, got {outcome:?}");
        };
        assert_eq!(trade.quantity, 2000);
        assert_eq!(trade.price, dec!(180));

        let orders = api.placed_orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].1.side, OrderSide::Sell);
        assert!(log.lines()[0].contains("[EXIT ORDER] trailing stop hit"));
    }

    #[tokio::test]
    async fn unresolved_contract_places_nothing() {
        let api = Arc::new(MockClient::new());
        let (dispatcher, log) = live_dispatcher(api.clone());

        let outcome = dispatcher.dispatch("9999", 1000, OrderType::Ioc, "reason").await;

        assert_eq!(outcome, DispatchOutcome::ContractNotFound);
        assert!(api.placed_orders().is_empty());
        assert_eq!(log.entries()[0].level, LogLevel::Error);
    }

    #[tokio::test]
    async fn placement_failure_is_logged_not_retried() {
        let api = Arc::new(
            MockClient::new()
                .with_contract(contract("2330", dec!(1000)))
                .rejecting_orders("market closed"),
        );
        let (dispatcher, log) = live_dispatcher(api.clone());

        let outcome = dispatcher.dispatch("2330", 1000, OrderType::Fok, "reason").await;

        assert!(matches!(outcome, DispatchOutcome::Failed(ref msg) if msg.contains("market closed")));
        assert_eq!(api.placed_orders().len(), 1);
        let newest = &log.entries()[0];
        assert_eq!(newest.level, LogLevel::Error);
        assert!(newest.message.contains("Order placement failed (2330)"));
    }

    #[tokio::test]
    async fn dry_run_keeps_the_price_policy() {
        let api = Arc::new(MockClient::new().with_contract(contract("2330", dec!(1000))));
        let simulated = Arc::new(SimulatedExecutor::new());
        let dispatcher = OrderDispatcher::new(api.clone(), simulated.clone(), LogBook::default());

        dispatcher.dispatch("2330", 1000, OrderType::Rod, "reason").await;

        assert!(api.placed_orders().is_empty());
        let trades = simulated.trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].price, dec!(900));
        assert_eq!(trades[0].price_type, PriceType::Limit);
    }
}
