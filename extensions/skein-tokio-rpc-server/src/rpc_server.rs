//! Note: This `RpcServer` does not include authentication or authorization.
//! It is suited to trusted, internal networks. Anything that owns an
//! [`RpcServiceEndpoint`] can act as a server; this one reads frames off plain
//! TCP connections and answers them in order.

use crate::RpcServerConfig;
use skein::frame::{FrameCodec, RequestFrame, ResponseFrame};
use skein_rpc_service::framed_io::{read_frame, write_frame};
use skein_rpc_service::{DefaultSerializers, Interceptor, SerializerSet};
use skein_rpc_service_endpoint::{
    RpcServiceEndpoint, RpcServiceEndpointError, ServiceRegistration,
};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio_util::sync::CancellationToken;

/// An RPC server that accepts TCP connections and dispatches their frames.
///
/// Each connection is served by its own task: read one frame, dispatch it,
/// write the response, repeat. Calls on different connections run
/// concurrently.
pub struct RpcServer<Z = DefaultSerializers> {
    endpoint: RpcServiceEndpoint<Z>,
    config: RpcServerConfig,
    shutdown: CancellationToken,
}

impl Default for RpcServer {
    fn default() -> Self {
        Self::new()
    }
}

impl RpcServer {
    pub fn new() -> Self {
        Self::with_endpoint(RpcServiceEndpoint::new())
    }
}

impl<Z: SerializerSet> RpcServer<Z> {
    /// Serves an endpoint that was assembled elsewhere.
    pub fn with_endpoint(endpoint: RpcServiceEndpoint<Z>) -> Self {
        Self {
            endpoint,
            config: RpcServerConfig::default(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_config(mut self, config: RpcServerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_interceptor(
        mut self,
        interceptor: Arc<dyn Interceptor<RequestFrame, Option<ResponseFrame>>>,
    ) -> Self {
        self.endpoint.add_interceptor(interceptor);
        self
    }

    pub fn config(&self) -> &RpcServerConfig {
        &self.config
    }

    pub fn register<T>(
        &mut self,
        registration: ServiceRegistration<T, Z>,
    ) -> Result<(), RpcServiceEndpointError>
    where
        T: Send + Sync + 'static,
    {
        self.endpoint.register(registration)
    }

    /// Token that stops the accept loop and every connection task when
    /// cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Binds to an address and serves until shut down.
    ///
    /// The address can be any type that implements `ToSocketAddrs`, such as
    /// a string "127.0.0.1:8080" or a `SocketAddr`.
    pub async fn serve<A: ToSocketAddrs>(self, addr: A) -> io::Result<SocketAddr> {
        let listener = TcpListener::bind(addr).await?;
        self.serve_with_listener(listener).await
    }

    /// Convenience wrapper around `serve` for a host and port pair.
    pub async fn serve_on(self, host: &str, port: u16) -> io::Result<SocketAddr> {
        self.serve(format!("{host}:{port}")).await
    }

    /// Serves on a pre-bound listener, such as one bound to port 0.
    ///
    /// Returns the listener's address once the shutdown token fires.
    pub async fn serve_with_listener(self, listener: TcpListener) -> io::Result<SocketAddr> {
        let address = listener.local_addr()?;
        let endpoint = Arc::new(self.endpoint);
        let config = self.config;
        let shutdown = self.shutdown;

        tracing::info!("Server running on {:?}", address);

        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, peer)) => {
                    tracing::info!("Client connected: {}", peer);
                    if let Err(err) = stream.set_nodelay(config.tcp_nodelay) {
                        tracing::debug!(%peer, error = %err, "could not set TCP_NODELAY");
                    }
                    tokio::spawn(serve_connection(
                        endpoint.clone(),
                        stream,
                        peer,
                        config.max_frame_size,
                        shutdown.child_token(),
                    ));
                }
                Err(err) => {
                    tracing::warn!(error = %err, "accept failed");
                }
            }
        }

        tracing::info!("Server on {:?} shut down", address);
        Ok(address)
    }
}

/// Answers frames on one connection until the peer leaves, the transport
/// fails, or the server shuts down.
async fn serve_connection<Z: SerializerSet>(
    endpoint: Arc<RpcServiceEndpoint<Z>>,
    mut stream: TcpStream,
    peer: SocketAddr,
    max_frame_size: usize,
    shutdown: CancellationToken,
) {
    loop {
        let read = tokio::select! {
            _ = shutdown.cancelled() => break,
            read = read_frame(&mut stream, max_frame_size) => read,
        };

        let bytes = match read {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                tracing::info!("Client disconnected: {}", peer);
                break;
            }
            Err(err) => {
                tracing::warn!(%peer, error = %err, "dropping connection");
                break;
            }
        };

        let response = match FrameCodec::decode_request(&bytes) {
            Ok(request) => {
                tracing::trace!(
                    %peer,
                    message_id = request.message_id,
                    service = %request.service_name,
                    method = %request.method_name,
                    "request"
                );
                endpoint.dispatch(request).await
            }
            Err(err) => {
                tracing::warn!(%peer, error = %err, "malformed frame");
                let message_id = FrameCodec::peek_message_id(&bytes).unwrap_or(0);
                Some(RpcServiceEndpoint::<Z>::malformed_response(message_id))
            }
        };

        // One-way requests are never answered.
        let Some(mut response) = response else {
            continue;
        };

        let encoded = match FrameCodec::encode_response(&mut response) {
            Ok(encoded) => encoded,
            Err(err) => {
                tracing::error!(
                    %peer,
                    message_id = response.message_id,
                    error = %err,
                    "response encode failed"
                );
                break;
            }
        };

        if let Err(err) = write_frame(&mut stream, &encoded).await {
            tracing::warn!(%peer, error = %err, "write failed");
            break;
        }
    }

    tracing::debug!("Connection to {} closed", peer);
}
