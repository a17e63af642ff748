use crate::RpcClientConfig;
use futures::future::BoxFuture;
use skein::frame::{FrameCodec, RequestFrame};
use skein_connection_pool::{ConnectionPool, PoolStatus};
use skein_rpc_service::framed_io::{read_frame, write_frame};
use skein_rpc_service::interceptor::InterceptorChain;
use skein_rpc_service::{
    BitcodeSerializer, CallContext, Compressor, Interceptor, Next, NoopCompressor, Serializer,
};
use skein_rpc_service_caller::{InvokeOutcome, RpcCallerError, RpcServiceCallerInterface};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::oneshot;

/// Interceptor type accepted by [`RpcClient`].
pub type ClientInterceptor = dyn Interceptor<RequestFrame, Result<InvokeOutcome, RpcCallerError>>;

struct ClientInner<S> {
    address: String,
    pool: ConnectionPool<TcpStream>,
    serializer: S,
    compressor: Arc<dyn Compressor>,
    interceptors: InterceptorChain<RequestFrame, Result<InvokeOutcome, RpcCallerError>>,
    max_frame_size: usize,
    deadline_grace: Duration,
}

/// An RPC client that sends each call over a pooled TCP connection.
///
/// A connection carries one call at a time; concurrent calls lease distinct
/// connections. The client is cheap to clone and every clone shares the pool.
pub struct RpcClient<S = BitcodeSerializer> {
    inner: Arc<ClientInner<S>>,
}

impl<S> Clone for RpcClient<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl RpcClient {
    /// Connects to `address` ("host:port") with default settings.
    pub async fn connect(address: &str) -> Result<Self, RpcCallerError> {
        Self::builder(address).build().await
    }

    pub fn builder(address: &str) -> RpcClientBuilder {
        RpcClientBuilder {
            address: address.to_string(),
            config: RpcClientConfig::default(),
            serializer: BitcodeSerializer,
            compressor: Arc::new(NoopCompressor),
            interceptors: Vec::new(),
        }
    }
}

impl<S: Serializer> RpcClient<S> {
    pub fn address(&self) -> &str {
        &self.inner.address
    }

    pub fn pool_status(&self) -> PoolStatus {
        self.inner.pool.status()
    }

    /// Closes idle connections and fails pending and future calls.
    ///
    /// Calls already holding a connection finish normally.
    pub fn close(&self) {
        tracing::info!(address = %self.inner.address, "closing client");
        self.inner.pool.close();
    }
}

pub struct RpcClientBuilder<S = BitcodeSerializer> {
    address: String,
    config: RpcClientConfig,
    serializer: S,
    compressor: Arc<dyn Compressor>,
    interceptors: InterceptorChain<RequestFrame, Result<InvokeOutcome, RpcCallerError>>,
}

impl<S: Serializer> RpcClientBuilder<S> {
    pub fn with_config(mut self, config: RpcClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_serializer<T: Serializer>(self, serializer: T) -> RpcClientBuilder<T> {
        RpcClientBuilder {
            address: self.address,
            config: self.config,
            serializer,
            compressor: self.compressor,
            interceptors: self.interceptors,
        }
    }

    pub fn with_compressor(mut self, compressor: Arc<dyn Compressor>) -> Self {
        self.compressor = compressor;
        self
    }

    /// Appends a client interceptor; the first one added runs outermost.
    pub fn with_interceptor(mut self, interceptor: Arc<ClientInterceptor>) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    /// Builds the pool, opening its initial connections.
    pub async fn build(self) -> Result<RpcClient<S>, RpcCallerError> {
        let RpcClientBuilder {
            address,
            config,
            serializer,
            compressor,
            interceptors,
        } = self;

        let target = address.clone();
        let connect_timeout = config.connect_timeout;
        let tcp_nodelay = config.tcp_nodelay;

        let pool = ConnectionPool::new(
            config.pool.clone(),
            move || open_connection(target.clone(), connect_timeout, tcp_nodelay),
            |stream: TcpStream| {
                tracing::debug!(peer = ?stream.peer_addr().ok(), "closing connection");
                drop(stream);
            },
        )
        .await?;

        tracing::info!(%address, "client ready");

        Ok(RpcClient {
            inner: Arc::new(ClientInner {
                address,
                pool,
                serializer,
                compressor,
                interceptors,
                max_frame_size: config.max_frame_size,
                deadline_grace: config.deadline_grace,
            }),
        })
    }
}

async fn open_connection(
    address: String,
    connect_timeout: Duration,
    tcp_nodelay: bool,
) -> io::Result<TcpStream> {
    let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(&address))
        .await
        .map_err(|_| {
            io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connecting to {address} timed out"),
            )
        })??;
    stream.set_nodelay(tcp_nodelay)?;
    tracing::debug!(%address, "opened connection");
    Ok(stream)
}

impl<S: Serializer> ClientInner<S> {
    /// Sends one request on a leased connection.
    ///
    /// The socket work runs on its own task so that abandoning the call
    /// never leaves a connection half-read: the task finishes the exchange
    /// and returns the connection to the pool, or discards it if the
    /// exchange failed.
    async fn send(
        self: Arc<Self>,
        ctx: CallContext,
        mut request: RequestFrame,
    ) -> Result<InvokeOutcome, RpcCallerError> {
        ctx.check()?;

        let bytes = FrameCodec::encode_request(&mut request)?;
        let message_id = request.message_id;
        let one_way = ctx.is_one_way();

        let stream = tokio::select! {
            acquired = self.pool.acquire(ctx.cancellation_token()) => acquired?,
            err = ctx.done() => return Err(err.into()),
        };

        let (tx, rx) = oneshot::channel();
        let pool = self.pool.clone();
        let max_frame_size = self.max_frame_size;
        // The caller gives up at the deadline; the connection waits a little
        // longer so a late response can still return it to the pool.
        let limit = ctx.remaining().map(|left| left + self.deadline_grace);
        tokio::spawn(async move {
            let outcome = exchange(stream, &pool, &bytes, one_way, max_frame_size, limit).await;
            let _ = tx.send(outcome);
        });

        let frame = tokio::select! {
            received = rx => received.map_err(|_| {
                RpcCallerError::Protocol("connection task ended without a result".into())
            })??,
            err = ctx.done() => return Err(err.into()),
        };

        let Some(frame) = frame else {
            return Ok(InvokeOutcome::OneWay);
        };

        let response = FrameCodec::decode_response(&frame)?;
        if response.message_id != message_id {
            return Err(RpcCallerError::Protocol(format!(
                "response id {} does not match request id {}",
                response.message_id, message_id
            )));
        }
        Ok(InvokeOutcome::Response(response))
    }
}

/// Writes the request and, unless one-way, reads the response frame.
///
/// The connection goes back to the pool after a clean exchange. It is
/// discarded after an I/O error, or when `limit` passes with the response
/// still outstanding, since the stream can no longer be trusted.
async fn exchange(
    mut stream: TcpStream,
    pool: &ConnectionPool<TcpStream>,
    request: &[u8],
    one_way: bool,
    max_frame_size: usize,
    limit: Option<Duration>,
) -> Result<Option<Vec<u8>>, RpcCallerError> {
    let outcome = match limit {
        Some(limit) => tokio::time::timeout(
            limit,
            round_trip(&mut stream, request, one_way, max_frame_size),
        )
        .await
        .unwrap_or(Err(RpcCallerError::DeadlineExceeded)),
        None => round_trip(&mut stream, request, one_way, max_frame_size).await,
    };

    match &outcome {
        Ok(_) => pool.release(stream),
        Err(err) => {
            tracing::debug!(error = %err, "discarding connection");
            pool.discard(stream);
        }
    }
    outcome
}

async fn round_trip(
    stream: &mut TcpStream,
    request: &[u8],
    one_way: bool,
    max_frame_size: usize,
) -> Result<Option<Vec<u8>>, RpcCallerError> {
    write_frame(stream, request).await?;
    if one_way {
        return Ok(None);
    }

    match read_frame(stream, max_frame_size).await? {
        Some(frame) => Ok(Some(frame)),
        None => Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "connection closed before the response arrived",
        )
        .into()),
    }
}

#[async_trait::async_trait]
impl<S: Serializer> RpcServiceCallerInterface for RpcClient<S> {
    type Serializer = S;

    fn get_serializer(&self) -> &S {
        &self.inner.serializer
    }

    fn get_compressor(&self) -> Arc<dyn Compressor> {
        self.inner.compressor.clone()
    }

    async fn invoke(
        &self,
        ctx: CallContext,
        request: RequestFrame,
    ) -> Result<InvokeOutcome, RpcCallerError> {
        if self.inner.interceptors.is_empty() {
            return self.inner.clone().send(ctx, request).await;
        }

        let inner = self.inner.clone();
        let terminal = move |ctx: CallContext,
                             request: RequestFrame|
              -> BoxFuture<'static, Result<InvokeOutcome, RpcCallerError>> {
            Box::pin(inner.clone().send(ctx, request))
        };
        Next::new(&self.inner.interceptors, &terminal)
            .run(ctx, request)
            .await
    }
}
