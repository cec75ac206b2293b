use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphStoreError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("relational store error: {0}")]
    RelationalStore(#[from] relational_store::StoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, GraphStoreError>;
