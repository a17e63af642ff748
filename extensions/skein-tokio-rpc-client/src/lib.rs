mod config;
pub use config::RpcClientConfig;

mod rpc_client;
pub use rpc_client::*;

pub use skein_connection_pool::{PoolConfig, PoolStatus};
pub use skein_rpc_service_caller::{RpcCallerError, RpcServiceCallerInterface};
