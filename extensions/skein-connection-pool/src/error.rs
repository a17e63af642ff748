use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("invalid pool configuration: {0}")]
    InvalidConfig(String),

    /// The connection factory failed.
    #[error("failed to open connection: {0}")]
    Connect(#[from] io::Error),

    #[error("acquire cancelled")]
    Cancelled,

    #[error("connection pool closed")]
    Closed,
}
