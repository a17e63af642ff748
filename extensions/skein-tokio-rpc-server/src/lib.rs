mod config;
pub use config::RpcServerConfig;

mod rpc_server;
pub use rpc_server::*;

pub mod utils;

pub use skein_rpc_service_endpoint::{
    HandlerError, RpcServiceEndpoint, RpcServiceEndpointError, ServiceRegistration,
};
