use skein_connection_pool::PoolConfig;
use skein_rpc_service::DEFAULT_MAX_FRAME_SIZE;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcClientConfig {
    pub pool: PoolConfig,

    /// Bound on establishing each new TCP connection.
    pub connect_timeout: Duration,

    /// Responses announcing more bytes than this fail the call.
    pub max_frame_size: usize,

    pub tcp_nodelay: bool,

    /// How long a connection keeps waiting for its response after the call's
    /// deadline passed. A response within this window returns the connection
    /// to the pool; without one the connection is closed.
    pub deadline_grace: Duration,
}

impl Default for RpcClientConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            connect_timeout: Duration::from_secs(3),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            tcp_nodelay: true,
            deadline_grace: Duration::from_secs(2),
        }
    }
}

impl RpcClientConfig {
    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    pub fn with_tcp_nodelay(mut self, tcp_nodelay: bool) -> Self {
        self.tcp_nodelay = tcp_nodelay;
        self
    }

    pub fn with_deadline_grace(mut self, deadline_grace: Duration) -> Self {
        self.deadline_grace = deadline_grace;
        self
    }
}
