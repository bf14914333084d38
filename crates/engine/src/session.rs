//! In-memory state of a monitoring session.
//!
//! `SessionState` has a single writer, the engine task. Everything the
//! presentation layer sees goes through [`SessionView`] copies.

use crate::error::EngineError;
use chrono::NaiveDate;
use core_types::OrderType;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// What the caller wants monitored for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetSpec {
    pub quantity: u64,
    /// Display only.
    pub cost_basis: Decimal,
}

/// A position under monitoring. The quantity never changes while the target lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorTarget {
    pub symbol: String,
    pub quantity: u64,
    pub cost_basis: Decimal,
}

/// Validated parameters of a session.
#[derive(Debug, Clone)]
pub struct SessionParams {
    trailing_stop_pct: Decimal,
    order_type: OrderType,
    lookback_start: NaiveDate,
    targets: BTreeMap<String, TargetSpec>,
}

impl SessionParams {
    pub fn new(
        trailing_stop_pct: Decimal,
        order_type: OrderType,
        lookback_start: NaiveDate,
        targets: BTreeMap<String, TargetSpec>,
    ) -> Result<Self, EngineError> {
        if trailing_stop_pct <= Decimal::ZERO || trailing_stop_pct >= Decimal::ONE_HUNDRED {
            return Err(EngineError::InvalidParams(format!(
                "trailing stop must be between 0 and 100 percent, got {trailing_stop_pct}"
            )));
        }
        if let Some((symbol, _)) = targets.iter().find(|(_, spec)| spec.quantity == 0) {
            return Err(EngineError::InvalidParams(format!(
                "target {symbol} has a zero quantity"
            )));
        }
        Ok(Self {
            trailing_stop_pct,
            order_type,
            lookback_start,
            targets,
        })
    }

    pub fn trailing_stop_pct(&self) -> Decimal {
        self.trailing_stop_pct
    }

    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    pub fn lookback_start(&self) -> NaiveDate {
        self.lookback_start
    }

    pub fn targets(&self) -> &BTreeMap<String, TargetSpec> {
        &self.targets
    }
}

/// The price at which a position is exited: `high * (1 - pct / 100)`.
pub fn exit_price(running_high: Decimal, trailing_stop_pct: Decimal) -> Decimal {
    running_high * (Decimal::ONE - trailing_stop_pct / Decimal::ONE_HUNDRED)
}

/// The effect of a single quote on the session.
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteOutcome {
    /// Non-positive price or a symbol that is not a target. Nothing changed.
    Skipped,
    /// The symbol had no running high and was seeded with `price`.
    Seeded { price: Decimal },
    /// The stop held.
    Tracked { running_high: Decimal, exit_price: Decimal },
    /// The stop fired. The target has already been removed from the session.
    Triggered {
        target: MonitorTarget,
        price: Decimal,
        running_high: Decimal,
        exit_price: Decimal,
    },
}

/// Targets, running highs and latest prices of a live session.
#[derive(Debug, Clone)]
pub struct SessionState {
    trailing_stop_pct: Decimal,
    targets: BTreeMap<String, MonitorTarget>,
    running_highs: HashMap<String, Decimal>,
    latest_prices: HashMap<String, Decimal>,
}

impl SessionState {
    pub fn new(params: &SessionParams) -> Self {
        let targets = params
            .targets
            .iter()
            .map(|(symbol, spec)| {
                let target = MonitorTarget {
                    symbol: symbol.clone(),
                    quantity: spec.quantity,
                    cost_basis: spec.cost_basis,
                };
                (symbol.clone(), target)
            })
            .collect();
        Self {
            trailing_stop_pct: params.trailing_stop_pct,
            targets,
            running_highs: HashMap::new(),
            latest_prices: HashMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// Target symbols in sorted order.
    pub fn symbols(&self) -> Vec<String> {
        self.targets.keys().cloned().collect()
    }

    pub fn target(&self, symbol: &str) -> Option<&MonitorTarget> {
        self.targets.get(symbol)
    }

    pub fn running_high(&self, symbol: &str) -> Option<Decimal> {
        self.running_highs.get(symbol).copied()
    }

    pub fn latest_price(&self, symbol: &str) -> Option<Decimal> {
        self.latest_prices.get(symbol).copied()
    }

    /// Seeds the running high from history. Ignored for non-targets and
    /// non-positive highs; never lowers an existing high.
    pub fn seed_high(&mut self, symbol: &str, high: Decimal) -> bool {
        if high <= Decimal::ZERO || !self.targets.contains_key(symbol) {
            return false;
        }
        let entry = self.running_highs.entry(symbol.to_string()).or_insert(high);
        if high > *entry {
            *entry = high;
        }
        true
    }

    /// Applies one snapshot price: record it, ratchet the high, then compare
    /// against the exit price derived from the updated high.
    pub fn apply_quote(&mut self, symbol: &str, price: Decimal) -> QuoteOutcome {
        if price <= Decimal::ZERO || !self.targets.contains_key(symbol) {
            return QuoteOutcome::Skipped;
        }
        self.latest_prices.insert(symbol.to_string(), price);

        let running_high = match self.running_highs.get(symbol).copied() {
            None => {
                self.running_highs.insert(symbol.to_string(), price);
                return QuoteOutcome::Seeded { price };
            }
            Some(high) => {
                let high = high.max(price);
                self.running_highs.insert(symbol.to_string(), high);
                high
            }
        };

        let exit = exit_price(running_high, self.trailing_stop_pct);
        if price > exit {
            return QuoteOutcome::Tracked {
                running_high,
                exit_price: exit,
            };
        }

        match self.remove(symbol) {
            Some(target) => QuoteOutcome::Triggered {
                target,
                price,
                running_high,
                exit_price: exit,
            },
            None => QuoteOutcome::Skipped,
        }
    }

    /// Drops a symbol and every value kept for it.
    pub fn remove(&mut self, symbol: &str) -> Option<MonitorTarget> {
        self.running_highs.remove(symbol);
        self.latest_prices.remove(symbol);
        self.targets.remove(symbol)
    }

    pub fn clear(&mut self) {
        self.targets.clear();
        self.running_highs.clear();
        self.latest_prices.clear();
    }

    pub fn view(&self, status: MonitorStatus, order_type: OrderType) -> SessionView {
        let targets = self
            .targets
            .values()
            .map(|target| {
                let running_high = self.running_high(&target.symbol);
                TargetView {
                    symbol: target.symbol.clone(),
                    quantity: target.quantity,
                    cost_basis: target.cost_basis,
                    latest_price: self.latest_price(&target.symbol),
                    running_high,
                    exit_price: running_high.map(|h| exit_price(h, self.trailing_stop_pct)),
                }
            })
            .collect();
        SessionView {
            status,
            trailing_stop_pct: self.trailing_stop_pct,
            order_type,
            targets,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorStatus {
    Bootstrapping,
    Running,
    Stopped,
}

impl fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MonitorStatus::Bootstrapping => "bootstrapping",
            MonitorStatus::Running => "running",
            MonitorStatus::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// A read-only copy of one target's monitoring values.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetView {
    pub symbol: String,
    pub quantity: u64,
    pub cost_basis: Decimal,
    pub latest_price: Option<Decimal>,
    pub running_high: Option<Decimal>,
    pub exit_price: Option<Decimal>,
}

/// A read-only copy of the session, published after every cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub status: MonitorStatus,
    pub trailing_stop_pct: Decimal,
    pub order_type: OrderType,
    pub targets: Vec<TargetView>,
}

impl SessionView {
    pub fn target(&self, symbol: &str) -> Option<&TargetView> {
        self.targets.iter().find(|t| t.symbol == symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn params(pct: Decimal, targets: &[(&str, u64, Decimal)]) -> SessionParams {
        let targets = targets
            .iter()
            .map(|(symbol, quantity, cost_basis)| {
                (
                    symbol.to_string(),
                    TargetSpec {
                        quantity: *quantity,
                        cost_basis: *cost_basis,
                    },
                )
            })
            .collect();
        let start = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        SessionParams::new(pct, OrderType::Rod, start, targets).unwrap()
    }

    #[test]
    fn exit_price_is_a_pullback_from_the_high() {
        assert_eq!(exit_price(dec!(200), dec!(15)), dec!(170));
        assert_eq!(exit_price(dec!(100), dec!(15)), dec!(85));
        assert_eq!(exit_price(dec!(50), dec!(10)), dec!(45));
    }

    #[test]
    fn params_are_validated() {
        let start = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        assert!(SessionParams::new(dec!(0), OrderType::Ioc, start, BTreeMap::new()).is_err());
        assert!(SessionParams::new(dec!(100), OrderType::Ioc, start, BTreeMap::new()).is_err());

        let zero_qty = BTreeMap::from([(
            "2330".to_string(),
            TargetSpec {
                quantity: 0,
                cost_basis: dec!(500),
            },
        )]);
        assert!(matches!(
            SessionParams::new(dec!(15), OrderType::Ioc, start, zero_qty),
            Err(EngineError::InvalidParams(_))
        ));
    }

    #[test]
    fn running_high_never_decreases() {
        let mut state = SessionState::new(&params(dec!(50), &[("2330", 1000, dec!(500))]));
        state.seed_high("2330", dec!(100));

        let mut previous = dec!(100);
        for price in [dec!(95), dec!(120), dec!(110), dec!(130), dec!(70), dec!(125)] {
            state.apply_quote("2330", price);
            let high = state.running_high("2330").unwrap();
            assert!(high >= previous);
            previous = high;
        }
        assert_eq!(previous, dec!(130));
    }

    #[test]
    fn zero_price_changes_nothing() {
        let mut state = SessionState::new(&params(dec!(15), &[("2330", 1000, dec!(500))]));
        state.seed_high("2330", dec!(100));
        state.apply_quote("2330", dec!(98));

        assert_eq!(state.apply_quote("2330", dec!(0)), QuoteOutcome::Skipped);
        assert_eq!(state.latest_price("2330"), Some(dec!(98)));
        assert_eq!(state.running_high("2330"), Some(dec!(100)));
        assert_eq!(state.len(), 1);
    }

    #[test]
    fn quote_without_high_seeds_it() {
        let mut state = SessionState::new(&params(dec!(15), &[("2603", 2000, dec!(150))]));

        assert_eq!(
            state.apply_quote("2603", dec!(160)),
            QuoteOutcome::Seeded { price: dec!(160) }
        );
        assert_eq!(state.running_high("2603"), Some(dec!(160)));
    }

    #[test]
    fn stop_fires_at_the_exit_price_and_removes_the_target() {
        let mut state = SessionState::new(&params(
            dec!(15),
            &[("A", 100, dec!(80)), ("B", 200, dec!(150))],
        ));
        state.seed_high("A", dec!(100));
        state.seed_high("B", dec!(200));

        assert_eq!(
            state.apply_quote("A", dec!(90)),
            QuoteOutcome::Tracked {
                running_high: dec!(100),
                exit_price: dec!(85)
            }
        );

        let QuoteOutcome::Triggered {
            target,
            exit_price,
            ..
        } = state.apply_quote("B", dec!(170))
        else {
            panic!("B should trigger at its exit price");
        };
        assert_eq!(target.quantity, 200);
        assert_eq!(exit_price, dec!(170));
        assert!(state.target("B").is_none());
        assert!(state.running_high("B").is_none());
        assert!(state.latest_price("B").is_none());
        assert_eq!(state.symbols(), vec!["A".to_string()]);
    }

    #[test]
    fn removed_symbol_ignores_later_quotes() {
        let mut state = SessionState::new(&params(dec!(10), &[("B", 200, dec!(150))]));
        state.seed_high("B", dec!(200));
        assert!(matches!(
            state.apply_quote("B", dec!(150)),
            QuoteOutcome::Triggered { .. }
        ));

        assert_eq!(state.apply_quote("B", dec!(300)), QuoteOutcome::Skipped);
        assert!(state.is_empty());
        assert!(!state.seed_high("B", dec!(300)));
    }

    #[test]
    fn new_high_is_compared_against_its_own_exit() {
        let mut state = SessionState::new(&params(dec!(15), &[("2330", 1000, dec!(500))]));
        state.seed_high("2330", dec!(100));

        assert_eq!(
            state.apply_quote("2330", dec!(140)),
            QuoteOutcome::Tracked {
                running_high: dec!(140),
                exit_price: dec!(119)
            }
        );
    }

    #[test]
    fn seeding_never_lowers_the_high() {
        let mut state = SessionState::new(&params(dec!(15), &[("2330", 1000, dec!(500))]));
        state.seed_high("2330", dec!(120));
        state.seed_high("2330", dec!(90));
        assert_eq!(state.running_high("2330"), Some(dec!(120)));
        assert!(!state.seed_high("2330", dec!(0)));
    }

    #[test]
    fn view_derives_exit_prices() {
        let mut state = SessionState::new(&params(
            dec!(15),
            &[("A", 100, dec!(80)), ("B", 200, dec!(150))],
        ));
        state.seed_high("A", dec!(100));
        state.apply_quote("A", dec!(95));

        let view = state.view(MonitorStatus::Running, OrderType::Rod);

        assert_eq!(view.status, MonitorStatus::Running);
        assert_eq!(view.targets.len(), 2);
        let a = view.target("A").unwrap();
        assert_eq!(a.latest_price, Some(dec!(95)));
        assert_eq!(a.exit_price, Some(dec!(85)));
        let b = view.target("B").unwrap();
        assert_eq!(b.running_high, None);
        assert_eq!(b.exit_price, None);
    }
}
