use serde::{Deserialize, Serialize};
use skein_rpc_service::RpcMethod;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoRequest {
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoReply {
    pub id: u64,
    pub msg: String,
}

/// Returns the request id with a message.
pub struct Get;

impl RpcMethod for Get {
    const NAME: &'static str = "Get";

    type Input = EchoRequest;
    type Output = EchoReply;
}

/// Sleeps for the given number of milliseconds, then returns it.
pub struct Delay;

impl RpcMethod for Delay {
    const NAME: &'static str = "Delay";

    type Input = u64;
    type Output = u64;
}

/// Stores a line on the server. Meant to be called one-way.
pub struct Record;

impl RpcMethod for Record {
    const NAME: &'static str = "Record";

    type Input = String;
    type Output = ();
}
