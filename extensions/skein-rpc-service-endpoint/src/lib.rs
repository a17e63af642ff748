mod endpoint;
pub use endpoint::*;

pub mod error;
pub use error::{DispatchError, RpcServiceEndpointError};

mod registration;
pub use registration::*;
