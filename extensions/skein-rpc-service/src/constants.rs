/// Largest frame either side accepts before closing the connection.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Metadata key carrying the call deadline as UNIX milliseconds.
pub const META_DEADLINE: &str = "deadline";

/// Metadata key marking a call that expects no response.
pub const META_ONE_WAY: &str = "one-way";

pub const META_TRUE: &str = "true";
