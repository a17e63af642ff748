mod frame_codec;
mod frame_error;
mod frame_meta;
mod request_frame;
mod response_frame;

pub use frame_codec::FrameCodec;
pub use frame_error::{FrameDecodeError, FrameEncodeError};
pub use frame_meta::FrameMeta;
pub use request_frame::RequestFrame;
pub use response_frame::ResponseFrame;
