use skein_rpc_service::DEFAULT_MAX_FRAME_SIZE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcServerConfig {
    /// Frames announcing more bytes than this close the connection.
    pub max_frame_size: usize,

    pub tcp_nodelay: bool,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            tcp_nodelay: true,
        }
    }
}

impl RpcServerConfig {
    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    pub fn with_tcp_nodelay(mut self, tcp_nodelay: bool) -> Self {
        self.tcp_nodelay = tcp_nodelay;
        self
    }
}
