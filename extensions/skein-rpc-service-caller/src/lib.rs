mod caller_interface;
pub use caller_interface::*;

pub mod error;
pub use error::RpcCallerError;

mod proxy;
pub use proxy::*;

mod macros;

// Used by `rpc_service_proxy!` expansions.
#[doc(hidden)]
pub use skein_rpc_service;
