use thiserror::Error;

/// Errors surfaced by the agent client.
///
/// Every variant is recoverable at the UI layer: callers turn them into a
/// notice or an apology message rather than aborting the conversation.
#[derive(Debug, Error)]
pub enum ElizaError {
    #[error("agent ID is required")]
    MissingAgent,

    #[error("failed to send message: {0}")]
    SendFailed(String),

    #[error("failed to get chat history: {0}")]
    HistoryUnavailable(String),

    #[error("agent request failed: {0}")]
    RequestFailed(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ElizaError>;
