use thiserror::Error;

pub type Result<T> = std::result::Result<T, RepoCacheError>;

#[derive(Debug, Error)]
pub enum RepoCacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("task join error: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("cache error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
}
