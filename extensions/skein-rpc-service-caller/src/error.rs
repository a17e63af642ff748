use skein::frame::{FrameDecodeError, FrameEncodeError};
use skein_connection_pool::PoolError;
use skein_rpc_service::{CompressorError, ContextError, SerializerError};
use std::io;
use thiserror::Error;

/// Everything that can go wrong with a call, seen from the caller.
///
/// A call ends in exactly one of: a decoded result, [`RpcCallerError::Remote`]
/// (the server ran and reported an error), or one of the local variants.
#[derive(Debug, Error)]
pub enum RpcCallerError {
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    #[error("connection pool: {0}")]
    Pool(PoolError),

    #[error("frame encode error: {0}")]
    FrameEncode(#[from] FrameEncodeError),

    #[error("frame decode error: {0}")]
    FrameDecode(#[from] FrameDecodeError),

    /// The argument could not be serialized.
    #[error("argument encode error: {0}")]
    Encode(SerializerError),

    /// The result payload could not be deserialized.
    #[error("result decode error: {0}")]
    Decode(SerializerError),

    #[error("payload compression error: {0}")]
    Compression(#[from] CompressorError),

    /// The peer answered with something that does not match the request.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The server reported an error; the text is whatever it sent.
    #[error("remote error: {0}")]
    Remote(String),

    #[error("call cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The request was sent one-way, so there is no result to return.
    #[error("one-way call has no response")]
    OneWay,
}

impl From<ContextError> for RpcCallerError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::Cancelled => RpcCallerError::Cancelled,
            ContextError::DeadlineExceeded => RpcCallerError::DeadlineExceeded,
        }
    }
}

impl From<PoolError> for RpcCallerError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Cancelled => RpcCallerError::Cancelled,
            other => RpcCallerError::Pool(other),
        }
    }
}
