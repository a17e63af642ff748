use crate::constants::{FRAME_FIXED_HEADER_SIZE, PROTOCOL_VERSION};
use crate::frame::{FrameEncodeError, RequestFrame};

/// The result of one RPC call as it travels on the wire.
///
/// A non-empty `error_message` means the call completed but failed; in that
/// case `payload` carries no meaning even if it is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    pub header_length: u32,
    pub body_length: u32,
    pub message_id: u32,
    pub version: u8,
    pub compressor_code: u8,
    pub serializer_code: u8,

    /// UTF-8 error text, empty when the call succeeded.
    pub error_message: Vec<u8>,

    pub payload: Vec<u8>,
}

impl ResponseFrame {
    /// Creates an empty response for a request that could not be decoded.
    pub fn new(message_id: u32) -> Self {
        Self {
            header_length: FRAME_FIXED_HEADER_SIZE as u32,
            body_length: 0,
            message_id,
            version: PROTOCOL_VERSION,
            compressor_code: 0,
            serializer_code: 0,
            error_message: Vec::new(),
            payload: Vec::new(),
        }
    }

    /// Creates an empty response that echoes the request's header fields.
    pub fn for_request(request: &RequestFrame) -> Self {
        let mut response = Self {
            header_length: FRAME_FIXED_HEADER_SIZE as u32,
            body_length: 0,
            message_id: request.message_id,
            version: request.version,
            compressor_code: request.compressor_code,
            serializer_code: request.serializer_code,
            error_message: Vec::new(),
            payload: Vec::new(),
        };
        let _ = response.refresh_lengths();
        response
    }

    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        let _ = self.refresh_lengths();
        self
    }

    /// Sets the error text and clears the payload.
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = message.into().into_bytes();
        self.payload.clear();
        let _ = self.refresh_lengths();
        self
    }

    pub fn is_error(&self) -> bool {
        !self.error_message.is_empty()
    }

    /// The error text, lossily decoded.
    pub fn error_text(&self) -> Option<String> {
        self.is_error()
            .then(|| String::from_utf8_lossy(&self.error_message).into_owned())
    }

    pub fn refresh_lengths(&mut self) -> Result<(), FrameEncodeError> {
        let header_len = FRAME_FIXED_HEADER_SIZE + self.error_message.len();
        self.header_length =
            u32::try_from(header_len).map_err(|_| FrameEncodeError::LengthOverflow {
                section: "header",
                len: header_len,
            })?;
        self.body_length =
            u32::try_from(self.payload.len()).map_err(|_| FrameEncodeError::LengthOverflow {
                section: "body",
                len: self.payload.len(),
            })?;
        Ok(())
    }

    pub fn frame_len(&self) -> usize {
        self.header_length as usize + self.body_length as usize
    }
}
