use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameEncodeError {
    /// A name, metadata key or metadata value contains a separator byte and
    /// would corrupt the header layout.
    #[error("{field} contains a reserved separator byte")]
    SeparatorInField { field: &'static str },

    /// The header or body does not fit in a `u32` length field.
    #[error("{section} length {len} exceeds the u32 length field")]
    LengthOverflow { section: &'static str, len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameDecodeError {
    /// Fewer bytes than the fixed header (or the length prefix) requires.
    #[error("incomplete frame header: need {expected} bytes, got {actual}")]
    IncompleteHeader { expected: usize, actual: usize },

    /// `header_length` + `body_length` disagrees with the buffer size.
    #[error("frame length mismatch: header announces {announced} bytes, buffer holds {actual}")]
    LengthMismatch { announced: usize, actual: usize },

    /// `header_length` is smaller than the fixed header it must contain.
    #[error("header length {0} is shorter than the fixed header")]
    HeaderTooShort(u32),

    /// A record separator expected before `header_length` was not found.
    #[error("missing separator after {0}")]
    MissingSeparator(&'static str),

    /// A metadata record has no field separator between key and value.
    #[error("metadata pair without a field separator")]
    CorruptMeta,

    #[error("{0} is not valid UTF-8")]
    InvalidUtf8(&'static str),
}
