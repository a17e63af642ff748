pub mod constants;
pub use constants::*;

mod macros;
pub use macros::*;

mod rpc_method;
pub use rpc_method::*;

mod serializer;
pub use serializer::*;

mod compressor;
pub use compressor::*;

mod call_context;
pub use call_context::*;

pub mod framed_io;

pub mod interceptor;
pub use interceptor::{Interceptor, Next, TracingInterceptor};
