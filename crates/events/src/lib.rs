//! # Trailguard Events
//!
//! This crate defines the operator-facing log stream shared between the
//! background monitoring engine and the control layer.
//!
//! As a Layer 0 crate it depends on no other workspace crate. The `LogBook`
//! is the single sink every component writes its operator messages to.

// Declare the modules that make up this crate.
pub mod error;
pub mod log_book;
pub mod messages;

// Re-export the core types to provide a clean public API.
pub use error::EventsError;
pub use log_book::{DEFAULT_LOG_CAPACITY, LogBook};
pub use messages::{LogLevel, LogMessage};
