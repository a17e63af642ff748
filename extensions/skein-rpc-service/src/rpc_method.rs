use serde::{Serialize, de::DeserializeOwned};

/// Describes one remotely callable method.
///
/// Implementors are usually zero-sized marker types; the service they belong
/// to is chosen at registration (server) or by the proxy description
/// (client), so the same descriptor can be served under several names.
pub trait RpcMethod: Send + Sync + 'static {
    /// Method name as it travels in the request frame.
    const NAME: &'static str;

    /// Hash of [`RpcMethod::NAME`], computed at compile time.
    const METHOD_ID: u64 = crate::method_id_hash(Self::NAME);

    type Input: Serialize + DeserializeOwned + Send + 'static;

    type Output: Serialize + DeserializeOwned + Send + 'static;
}
