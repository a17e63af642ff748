// Frame header layout (all integers big-endian)
pub const FRAME_HEADER_LENGTH_OFFSET: usize = 0;
pub const FRAME_BODY_LENGTH_OFFSET: usize = 4;
pub const FRAME_MESSAGE_ID_OFFSET: usize = 8;
pub const FRAME_VERSION_OFFSET: usize = 12;
pub const FRAME_COMPRESSOR_OFFSET: usize = 13;
pub const FRAME_SERIALIZER_OFFSET: usize = 14;

/// Total size of the fixed-length header prefix shared by requests and
/// responses. Computed as: 3 * u32 length/id fields + 3 * u8 code fields.
/// Does not include names, metadata, the error message or the payload.
pub const FRAME_FIXED_HEADER_SIZE: usize = 15; // 4 + 4 + 4 + 1 + 1 + 1

/// Number of leading bytes needed to learn the total length of a frame
/// (`header_length` + `body_length`).
pub const FRAME_LENGTH_PREFIX_SIZE: usize = 8;

/// Terminates the service name, the method name and every metadata pair.
pub const FRAME_RECORD_SEPARATOR: u8 = b'\n';

/// Splits a metadata pair into its key and value.
pub const FRAME_FIELD_SEPARATOR: u8 = b'\r';

/// Protocol version written into outgoing frames.
pub const PROTOCOL_VERSION: u8 = 1;
