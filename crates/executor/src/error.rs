use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Invalid order quantity for {symbol}: {quantity}")]
    InvalidQuantity { symbol: String, quantity: u64 },

    #[error("API error: {0}")]
    Api(#[from] api_client::ApiError),
}
