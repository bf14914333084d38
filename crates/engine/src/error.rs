use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid session parameters: {0}")]
    InvalidParams(String),

    #[error("API client error: {0}")]
    ApiClient(#[from] api_client::ApiError),

    #[error("Monitor task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),
}
