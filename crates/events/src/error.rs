use thiserror::Error;

#[derive(Error, Debug)]
pub enum EventsError {
    #[error("Log book capacity must be positive, got {0}")]
    InvalidCapacity(usize),
}
