use crate::bootstrap::HistoricalHighResolver;
use crate::session::{MonitorStatus, QuoteOutcome, SessionParams, SessionState, SessionView};
use api_client::ApiClient;
use chrono::Local;
use configuration::MonitorSettings;
use events::LogBook;
use executor::OrderDispatcher;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Timings of the poll loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineSettings {
    /// Pause after a completed cycle.
    pub poll_interval: Duration,
    /// Pause after a cycle that could not fetch quotes.
    pub retry_backoff: Duration,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            retry_backoff: Duration::from_secs(5),
        }
    }
}

impl From<&MonitorSettings> for EngineSettings {
    fn from(settings: &MonitorSettings) -> Self {
        Self {
            poll_interval: settings.poll_interval(),
            retry_backoff: settings.retry_backoff(),
        }
    }
}

/// What the loop does after a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Sleep the poll interval and go again.
    Continue,
    /// Sleep the retry backoff and go again. No state was changed.
    Backoff,
    /// No targets left; the session is over.
    Finished,
}

/// The background trailing-stop monitor.
///
/// Owns the session state exclusively. The presentation layer observes it
/// through the `watch` channel returned by [`TrailingStopEngine::subscribe`]
/// and stops it through the `CancellationToken` passed to `run`.
pub struct TrailingStopEngine {
    params: SessionParams,
    state: SessionState,
    api_client: Arc<dyn ApiClient>,
    resolver: HistoricalHighResolver,
    dispatcher: OrderDispatcher,
    log: LogBook,
    settings: EngineSettings,
    view_tx: watch::Sender<SessionView>,
}

impl TrailingStopEngine {
    pub fn new(
        params: SessionParams,
        api_client: Arc<dyn ApiClient>,
        resolver: HistoricalHighResolver,
        dispatcher: OrderDispatcher,
        log: LogBook,
        settings: EngineSettings,
    ) -> Self {
        let state = SessionState::new(&params);
        let (view_tx, _) = watch::channel(state.view(MonitorStatus::Bootstrapping, params.order_type()));
        Self {
            params,
            state,
            api_client,
            resolver,
            dispatcher,
            log,
            settings,
            view_tx,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn log(&self) -> &LogBook {
        &self.log
    }

    /// A receiver of the view published after bootstrap and every cycle.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view_tx.subscribe()
    }

    /// Seeds running highs from history, up to today.
    pub async fn bootstrap(&mut self) -> usize {
        let today = Local::now().date_naive();
        self.resolver
            .seed(&mut self.state, self.params.lookback_start(), today)
            .await
    }

    /// One poll iteration: resolve, fetch quotes, evaluate, dispatch.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        if self.state.is_empty() {
            return CycleOutcome::Finished;
        }

        let mut contracts = Vec::with_capacity(self.state.len());
        for symbol in self.state.symbols() {
            match self.api_client.resolve_contract(&symbol).await {
                Ok(Some(contract)) => contracts.push(contract),
                Ok(None) => tracing::warn!(%symbol, "Target is not a known contract, skipped this cycle."),
                Err(e) => tracing::warn!(%symbol, error = %e, "Contract lookup failed, skipped this cycle."),
            }
        }
        if contracts.is_empty() {
            self.log.warn(format!(
                "WARN: no target contracts could be resolved, retrying in {}s",
                self.settings.retry_backoff.as_secs()
            ));
            return CycleOutcome::Backoff;
        }

        let snapshots = match self.api_client.fetch_snapshots(&contracts).await {
            Ok(snapshots) => snapshots,
            Err(e) => {
                self.log.error(format!(
                    "Quote fetch failed: {e}, retrying in {}s",
                    self.settings.retry_backoff.as_secs()
                ));
                return CycleOutcome::Backoff;
            }
        };

        for snapshot in snapshots {
            match self.state.apply_quote(&snapshot.code, snapshot.close) {
                QuoteOutcome::Skipped => {}
                QuoteOutcome::Seeded { price } => {
                    self.log.info(format!(
                        "{} had no historical high, seeded with current price {price}",
                        snapshot.code
                    ));
                }
                QuoteOutcome::Tracked {
                    running_high,
                    exit_price,
                } => {
                    tracing::trace!(symbol = %snapshot.code, price = %snapshot.close, %running_high, %exit_price, "Stop held.");
                }
                QuoteOutcome::Triggered {
                    target,
                    price,
                    running_high,
                    exit_price,
                } => {
                    let reason = format!(
                        "trailing stop hit (price {price} <= exit {exit_price:.2}, high {running_high})"
                    );
                    self.log.warn(format!("{} {reason}", target.symbol));
                    self.dispatcher
                        .dispatch(&target.symbol, target.quantity, self.params.order_type(), &reason)
                        .await;
                }
            }
        }
        CycleOutcome::Continue
    }

    /// Runs bootstrap then the poll loop until cancelled or out of targets.
    ///
    /// Cancellation is observed at the top of each cycle, so a stop request
    /// lets the current batch call and sleep finish first.
    pub async fn run(mut self, cancel: CancellationToken) {
        self.log.info(format!(
            "Trailing-stop monitor started: {} targets, pullback {}%, order type {}",
            self.state.len(),
            self.params.trailing_stop_pct(),
            self.params.order_type()
        ));

        self.bootstrap().await;
        self.publish(MonitorStatus::Running);

        loop {
            if cancel.is_cancelled() {
                self.log.info("Stop requested, monitor exiting");
                break;
            }

            let pause = match self.run_cycle().await {
                CycleOutcome::Continue => self.settings.poll_interval,
                CycleOutcome::Backoff => self.settings.retry_backoff,
                CycleOutcome::Finished => {
                    self.log.info("No positions left to monitor");
                    break;
                }
            };
            self.publish(MonitorStatus::Running);
            tokio::time::sleep(pause).await;
        }

        self.state.clear();
        self.publish(MonitorStatus::Stopped);
        self.log.info("Trailing-stop monitor stopped");
    }

    fn publish(&self, status: MonitorStatus) {
        // No receivers is fine; the engine does not depend on being watched.
        self.view_tx
            .send_replace(self.state.view(status, self.params.order_type()));
    }
}
