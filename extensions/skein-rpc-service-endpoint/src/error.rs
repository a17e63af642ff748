use skein_rpc_service::{CompressorError, SerializerError};
use thiserror::Error;

/// Registration failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcServiceEndpointError {
    #[error("service {0:?} is already registered")]
    DuplicateService(String),

    /// The same method name (or one sharing its hash) was added twice.
    #[error("method {method:?} is registered twice on service {service:?}")]
    DuplicateMethod { service: String, method: String },
}

/// Why a request produced an error response.
///
/// The `Display` text is what travels in the response's `error_message`.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("service not found")]
    ServiceNotFound,

    #[error("method not found")]
    MethodNotFound,

    #[error("unknown serializer")]
    UnknownSerializer(u8),

    #[error("unknown compressor")]
    UnknownCompressor(u8),

    #[error("malformed frame")]
    MalformedFrame,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("call cancelled")]
    Cancelled,

    #[error("argument decode failed: {0}")]
    Decode(SerializerError),

    #[error("result encode failed: {0}")]
    Encode(SerializerError),

    #[error("{0}")]
    Compression(CompressorError),

    /// The service method itself returned an error.
    #[error("{0}")]
    Handler(Box<dyn std::error::Error + Send + Sync>),
}

impl DispatchError {
    pub(crate) fn decode(err: SerializerError) -> Self {
        match err {
            SerializerError::UnknownSerializer(code) => DispatchError::UnknownSerializer(code),
            other => DispatchError::Decode(other),
        }
    }
}

impl From<CompressorError> for DispatchError {
    fn from(err: CompressorError) -> Self {
        match err {
            CompressorError::UnknownCompressor(code) => DispatchError::UnknownCompressor(code),
            other => DispatchError::Compression(other),
        }
    }
}
