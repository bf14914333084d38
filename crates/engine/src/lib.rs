//! # Trailguard Engine Crate
//!
//! The background trailing-stop monitor. A session is built from the current
//! holdings, seeds a running high per symbol from daily-bar history, then polls
//! batch quotes, ratchets the highs upward and sells a position the moment its
//! price falls to `high * (1 - pct / 100)`.
//!
//! ## Public API
//!
//! - `TrailingStopEngine`: bootstrap plus poll loop, run on a background task.
//! - `MonitorHandle`: stop/observe a spawned session.
//! - `HistoricalHighResolver`: ordered history-source fallback.
//! - `SessionParams` / `SessionState` / `SessionView`: the session model.
//! - `targets_from_holdings` / `PositionRow`: holdings for the control layer.

pub mod bootstrap;
pub mod error;
pub mod handle;
pub mod holdings;
pub mod monitor;
pub mod session;

pub use bootstrap::{HighLookup, HistoricalHighResolver};
pub use error::EngineError;
pub use handle::MonitorHandle;
pub use holdings::{
    HoldingQuote, PositionRow, PositionStatus, load_targets, quote_holdings, targets_from_holdings,
};
pub use monitor::{CycleOutcome, EngineSettings, TrailingStopEngine};
pub use session::{
    MonitorStatus, MonitorTarget, QuoteOutcome, SessionParams, SessionState, SessionView, TargetSpec,
    TargetView, exit_price,
};
