//! # Trailguard Executor Crate
//!
//! This crate turns a fired trailing stop into exactly one sell order. It
//! defines a generic `Executor` trait with a `LiveExecutor` that talks to the
//! broker and a `SimulatedExecutor` for dry runs, plus the `OrderDispatcher`
//! that resolves the contract and applies the price policy of the order type.
//!
//! ## Architectural Principles
//!
//! - **Policy vs. Transport Decoupling:** `OrderDispatcher` decides *what* to
//!   send (side, quantity, price type, limit price); the `Executor` only knows
//!   *how* to send it. Dry runs swap the executor and keep the policy.
//! - **No Retries:** a dispatch makes at most one placement call. Failures are
//!   reported to the operator log and returned to the caller, never re-queued.
//!
//! ## Public API
//!
//! - `Executor`: The core trait for all execution back ends.
//! - `LiveExecutor` / `SimulatedExecutor`: Broker and dry-run back ends.
//! - `OrderDispatcher` / `DispatchOutcome`: Trigger-to-order translation.
//! - `ExecutorError`: The specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod dispatcher;
pub mod error;
pub mod exchange;

// Re-export the key components to provide a clean, public-facing API.
pub use dispatcher::{DispatchOutcome, OrderDispatcher, build_sell_order};
pub use error::ExecutorError;
pub use exchange::{Executor, LiveExecutor, SimulatedExecutor};
