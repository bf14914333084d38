use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown order type '{0}' (expected ROD, IOC or FOK)")]
    UnknownOrderType(String),
}
