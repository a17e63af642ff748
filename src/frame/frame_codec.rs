use crate::{
    constants::{
        FRAME_BODY_LENGTH_OFFSET, FRAME_COMPRESSOR_OFFSET, FRAME_FIELD_SEPARATOR,
        FRAME_FIXED_HEADER_SIZE, FRAME_HEADER_LENGTH_OFFSET, FRAME_LENGTH_PREFIX_SIZE,
        FRAME_MESSAGE_ID_OFFSET, FRAME_RECORD_SEPARATOR, FRAME_SERIALIZER_OFFSET,
        FRAME_VERSION_OFFSET,
    },
    frame::{FrameDecodeError, FrameEncodeError, FrameMeta, RequestFrame, ResponseFrame},
};

/// Encodes and decodes request and response frames.
///
/// Every frame starts with the same 15-byte big-endian fixed header:
///
/// ```text
/// header_length(4) body_length(4) message_id(4) version(1) compressor(1) serializer(1)
/// ```
///
/// A request then carries `service \n method \n` followed by zero or more
/// `key \r value \n` metadata records, all within `header_length`. A response
/// carries its error text in the same region. The payload fills the remaining
/// `body_length` bytes.
pub struct FrameCodec;

impl FrameCodec {
    /// Encodes a request, refreshing its length fields first.
    pub fn encode_request(request: &mut RequestFrame) -> Result<Vec<u8>, FrameEncodeError> {
        check_field("service name", &request.service_name)?;
        check_field("method name", &request.method_name)?;
        for (key, value) in request.meta.iter() {
            check_field("metadata key", key)?;
            check_field("metadata value", value)?;
        }
        request.refresh_lengths()?;

        let mut buf = Vec::with_capacity(request.frame_len());
        put_fixed_header(
            &mut buf,
            request.header_length,
            request.body_length,
            request.message_id,
            [
                request.version,
                request.compressor_code,
                request.serializer_code,
            ],
        );

        buf.extend_from_slice(request.service_name.as_bytes());
        buf.push(FRAME_RECORD_SEPARATOR);
        buf.extend_from_slice(request.method_name.as_bytes());
        buf.push(FRAME_RECORD_SEPARATOR);

        for (key, value) in request.meta.iter() {
            buf.extend_from_slice(key.as_bytes());
            buf.push(FRAME_FIELD_SEPARATOR);
            buf.extend_from_slice(value.as_bytes());
            buf.push(FRAME_RECORD_SEPARATOR);
        }

        buf.extend_from_slice(&request.payload);
        Ok(buf)
    }

    /// Decodes a complete request frame.
    ///
    /// `buf` must hold exactly one frame. Metadata is scanned only up to
    /// `header_length`, so payload bytes are never parsed as metadata.
    pub fn decode_request(buf: &[u8]) -> Result<RequestFrame, FrameDecodeError> {
        let fixed = FixedHeader::parse(buf)?;
        let header_end = fixed.header_length as usize;
        let mut cursor = FRAME_FIXED_HEADER_SIZE;

        let service_name = take_record(buf, &mut cursor, header_end, "service name")?;
        let method_name = take_record(buf, &mut cursor, header_end, "method name")?;

        let mut meta = FrameMeta::new();
        while cursor < header_end {
            let record = take_record(buf, &mut cursor, header_end, "metadata pair")?;
            let (key, value) = record
                .split_once(FRAME_FIELD_SEPARATOR as char)
                .ok_or(FrameDecodeError::CorruptMeta)?;
            meta.insert(key, value);
        }

        Ok(RequestFrame {
            header_length: fixed.header_length,
            body_length: fixed.body_length,
            message_id: fixed.message_id,
            version: fixed.version,
            compressor_code: fixed.compressor_code,
            serializer_code: fixed.serializer_code,
            service_name,
            method_name,
            meta,
            payload: buf[header_end..].to_vec(),
        })
    }

    pub fn encode_response(response: &mut ResponseFrame) -> Result<Vec<u8>, FrameEncodeError> {
        response.refresh_lengths()?;

        let mut buf = Vec::with_capacity(response.frame_len());
        put_fixed_header(
            &mut buf,
            response.header_length,
            response.body_length,
            response.message_id,
            [
                response.version,
                response.compressor_code,
                response.serializer_code,
            ],
        );
        buf.extend_from_slice(&response.error_message);
        buf.extend_from_slice(&response.payload);
        Ok(buf)
    }

    pub fn decode_response(buf: &[u8]) -> Result<ResponseFrame, FrameDecodeError> {
        let fixed = FixedHeader::parse(buf)?;
        let header_end = fixed.header_length as usize;

        Ok(ResponseFrame {
            header_length: fixed.header_length,
            body_length: fixed.body_length,
            message_id: fixed.message_id,
            version: fixed.version,
            compressor_code: fixed.compressor_code,
            serializer_code: fixed.serializer_code,
            error_message: buf[FRAME_FIXED_HEADER_SIZE..header_end].to_vec(),
            payload: buf[header_end..].to_vec(),
        })
    }

    /// Reads the total frame length from the first eight bytes of a frame.
    pub fn frame_length(prefix: &[u8]) -> Result<usize, FrameDecodeError> {
        if prefix.len() < FRAME_LENGTH_PREFIX_SIZE {
            return Err(FrameDecodeError::IncompleteHeader {
                expected: FRAME_LENGTH_PREFIX_SIZE,
                actual: prefix.len(),
            });
        }

        let header_length = read_u32(prefix, FRAME_HEADER_LENGTH_OFFSET);
        let body_length = read_u32(prefix, FRAME_BODY_LENGTH_OFFSET);
        if (header_length as usize) < FRAME_FIXED_HEADER_SIZE {
            return Err(FrameDecodeError::HeaderTooShort(header_length));
        }

        Ok(header_length as usize + body_length as usize)
    }

    /// Best-effort extraction of the message id from a frame that failed to
    /// decode, so the error response can still be correlated.
    pub fn peek_message_id(buf: &[u8]) -> Option<u32> {
        (buf.len() >= FRAME_VERSION_OFFSET).then(|| read_u32(buf, FRAME_MESSAGE_ID_OFFSET))
    }
}

struct FixedHeader {
    header_length: u32,
    body_length: u32,
    message_id: u32,
    version: u8,
    compressor_code: u8,
    serializer_code: u8,
}

impl FixedHeader {
    fn parse(buf: &[u8]) -> Result<Self, FrameDecodeError> {
        if buf.len() < FRAME_FIXED_HEADER_SIZE {
            return Err(FrameDecodeError::IncompleteHeader {
                expected: FRAME_FIXED_HEADER_SIZE,
                actual: buf.len(),
            });
        }

        let announced = FrameCodec::frame_length(buf)?;
        if announced != buf.len() {
            return Err(FrameDecodeError::LengthMismatch {
                announced,
                actual: buf.len(),
            });
        }

        Ok(Self {
            header_length: read_u32(buf, FRAME_HEADER_LENGTH_OFFSET),
            body_length: read_u32(buf, FRAME_BODY_LENGTH_OFFSET),
            message_id: read_u32(buf, FRAME_MESSAGE_ID_OFFSET),
            version: buf[FRAME_VERSION_OFFSET],
            compressor_code: buf[FRAME_COMPRESSOR_OFFSET],
            serializer_code: buf[FRAME_SERIALIZER_OFFSET],
        })
    }
}

fn put_fixed_header(
    buf: &mut Vec<u8>,
    header_length: u32,
    body_length: u32,
    message_id: u32,
    codes: [u8; 3],
) {
    buf.extend_from_slice(&header_length.to_be_bytes());
    buf.extend_from_slice(&body_length.to_be_bytes());
    buf.extend_from_slice(&message_id.to_be_bytes());
    buf.extend_from_slice(&codes);
}

/// Caller guarantees `buf.len() >= offset + 4`.
fn read_u32(buf: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&buf[offset..offset + 4]);
    u32::from_be_bytes(bytes)
}

fn check_field(field: &'static str, value: &str) -> Result<(), FrameEncodeError> {
    if value
        .bytes()
        .any(|b| b == FRAME_RECORD_SEPARATOR || b == FRAME_FIELD_SEPARATOR)
    {
        return Err(FrameEncodeError::SeparatorInField { field });
    }
    Ok(())
}

/// Reads bytes up to the next record separator, stopping at `end`.
fn take_record(
    buf: &[u8],
    cursor: &mut usize,
    end: usize,
    field: &'static str,
) -> Result<String, FrameDecodeError> {
    let region = &buf[*cursor..end];
    let len = region
        .iter()
        .position(|&b| b == FRAME_RECORD_SEPARATOR)
        .ok_or(FrameDecodeError::MissingSeparator(field))?;

    let text = std::str::from_utf8(&region[..len])
        .map_err(|_| FrameDecodeError::InvalidUtf8(field))?
        .to_owned();
    *cursor += len + 1;
    Ok(text)
}
