use crate::error::EngineError;
use crate::monitor::TrailingStopEngine;
use crate::session::SessionView;
use events::LogBook;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Control surface of a spawned monitoring session.
pub struct MonitorHandle {
    cancel: CancellationToken,
    view: watch::Receiver<SessionView>,
    log: LogBook,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Spawns `engine` on the runtime and returns its handle.
    pub fn spawn(engine: TrailingStopEngine) -> Self {
        let cancel = CancellationToken::new();
        let view = engine.subscribe();
        let log = engine.log().clone();
        let task = tokio::spawn(engine.run(cancel.clone()));
        Self {
            cancel,
            view,
            log,
            task,
        }
    }

    /// Requests a stop. The engine exits at the top of its next cycle.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// The most recently published view.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    pub fn logs(&self) -> &LogBook {
        &self.log
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits for the engine task to exit.
    pub async fn join(self) -> Result<(), EngineError> {
        self.task.await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::HistoricalHighResolver;
    use crate::monitor::EngineSettings;
    use crate::session::{MonitorStatus, SessionParams, TargetSpec};
    use api_client::mock::{MockClient, contract};
    use chrono::NaiveDate;
    use core_types::OrderType;
    use executor::{OrderDispatcher, SimulatedExecutor};
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    fn spawn_session(api: Arc<MockClient>, executor: Arc<SimulatedExecutor>) -> MonitorHandle {
        spawn_with_interval(api, executor, Duration::from_millis(10))
    }

    fn spawn_with_interval(
        api: Arc<MockClient>,
        executor: Arc<SimulatedExecutor>,
        poll_interval: Duration,
    ) -> MonitorHandle {
        let targets = BTreeMap::from([(
            "2330".to_string(),
            TargetSpec {
                quantity: 1000,
                cost_basis: dec!(600),
            },
        )]);
        let start = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let params = SessionParams::new(dec!(10), OrderType::Rod, start, targets).unwrap();
        let log = LogBook::default();
        let resolver = HistoricalHighResolver::new(api.clone(), Vec::new(), log.clone());
        let dispatcher = OrderDispatcher::new(api.clone(), executor, log.clone());
        let settings = EngineSettings {
            poll_interval,
            retry_backoff: poll_interval,
        };
        MonitorHandle::spawn(TrailingStopEngine::new(params, api, resolver, dispatcher, log, settings))
    }

    #[tokio::test]
    async fn stop_ends_the_session_and_clears_the_view() {
        let api = Arc::new(MockClient::new().with_contract(contract("2330", dec!(1000))));
        api.push_snapshots(&[("2330", dec!(1000))]);
        let handle = spawn_session(api.clone(), Arc::new(SimulatedExecutor::new()));

        let mut updates = handle.subscribe();
        updates
            .wait_for(|v| v.target("2330").and_then(|t| t.running_high) == Some(dec!(1000)))
            .await
            .unwrap();
        assert_eq!(handle.view().status, MonitorStatus::Running);

        handle.stop();
        let log = handle.logs().clone();
        let mut final_view = handle.subscribe();
        tokio::time::timeout(Duration::from_secs(5), handle.join())
            .await
            .unwrap()
            .unwrap();

        let view = final_view.borrow_and_update().clone();
        assert_eq!(view.status, MonitorStatus::Stopped);
        assert!(view.targets.is_empty());
        assert!(log.lines().iter().any(|l| l.contains("Stop requested")));
    }

    #[tokio::test]
    async fn stop_mid_cycle_finishes_the_cycle_before_exiting() {
        let poll_interval = Duration::from_millis(300);
        let api = Arc::new(MockClient::new().with_contract(contract("2330", dec!(100))));
        api.push_snapshots(&[("2330", dec!(120.456))]);
        let handle = spawn_with_interval(api.clone(), Arc::new(SimulatedExecutor::new()), poll_interval);

        let mut updates = handle.subscribe();
        let applied = updates
            .wait_for(|v| v.target("2330").and_then(|t| t.running_high) == Some(dec!(120.456)))
            .await
            .unwrap()
            .clone();
        let stopped_at = tokio::time::Instant::now();
        handle.stop();
        tokio::time::timeout(Duration::from_secs(5), handle.join())
            .await
            .unwrap()
            .unwrap();
        let elapsed = stopped_at.elapsed();

        let target = applied.target("2330").unwrap();
        assert_eq!(target.latest_price, Some(dec!(120.456)));
        assert_eq!(api.snapshot_calls(), 1);
        assert!(elapsed >= Duration::from_millis(200), "exited after {elapsed:?}");
        assert!(elapsed < poll_interval + Duration::from_millis(500), "exited after {elapsed:?}");
    }

    #[tokio::test]
    async fn dry_run_session_exits_without_touching_the_broker() {
        let api = Arc::new(MockClient::new().with_contract(contract("2330", dec!(1000))));
        api.push_snapshots(&[("2330", dec!(1000))]);
        api.push_snapshots(&[("2330", dec!(900))]);
        let executor = Arc::new(SimulatedExecutor::new());
        let handle = spawn_session(api.clone(), executor.clone());

        let log = handle.logs().clone();
        tokio::time::timeout(Duration::from_secs(5), handle.join())
            .await
            .unwrap()
            .unwrap();

        assert!(api.placed_orders().is_empty());
        let trades = executor.trades();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].quantity, 1000);
        assert_eq!(trades[0].price, dec!(900));
        assert!(log.lines().iter().any(|l| l.contains("No positions left")));
    }
}
