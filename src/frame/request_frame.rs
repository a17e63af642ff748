use crate::constants::{FRAME_FIXED_HEADER_SIZE, PROTOCOL_VERSION};
use crate::frame::{FrameEncodeError, FrameMeta};

/// A single RPC call as it travels on the wire.
///
/// `header_length` and `body_length` describe the encoded layout and are
/// recomputed from the other fields by [`RequestFrame::refresh_lengths`],
/// which the codec calls before every encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFrame {
    /// Bytes occupied by everything before the payload.
    pub header_length: u32,

    /// Payload byte count.
    pub body_length: u32,

    /// Correlates the response with this request.
    pub message_id: u32,

    pub version: u8,

    /// Code of the compressor applied to `payload`.
    pub compressor_code: u8,

    /// Code of the serializer that produced `payload`.
    pub serializer_code: u8,

    pub service_name: String,

    pub method_name: String,

    pub meta: FrameMeta,

    /// Serialized (and possibly compressed) argument bytes.
    pub payload: Vec<u8>,
}

impl RequestFrame {
    pub fn new(
        message_id: u32,
        service_name: impl Into<String>,
        method_name: impl Into<String>,
        payload: Vec<u8>,
    ) -> Self {
        let mut request = Self {
            header_length: 0,
            body_length: 0,
            message_id,
            version: PROTOCOL_VERSION,
            compressor_code: 0,
            serializer_code: 0,
            service_name: service_name.into(),
            method_name: method_name.into(),
            meta: FrameMeta::new(),
            payload,
        };
        // Names are not validated here; `refresh_lengths` only sums sizes.
        let _ = request.refresh_lengths();
        request
    }

    /// Recomputes `header_length` and `body_length` from the current fields.
    pub fn refresh_lengths(&mut self) -> Result<(), FrameEncodeError> {
        let header_len = FRAME_FIXED_HEADER_SIZE
            + self.service_name.len()
            + 1
            + self.method_name.len()
            + 1
            + self.meta.encoded_len();

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

    /// Total encoded size of this frame.
    pub fn frame_len(&self) -> usize {
        self.header_length as usize + self.body_length as usize
    }
}
