use crate::PoolError;
use std::time::Duration;

/// Sizing and expiry parameters of a [`ConnectionPool`](crate::ConnectionPool).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Connections opened when the pool is built.
    pub initial_size: usize,

    /// Idle connections kept for reuse; extra released connections are closed.
    pub max_idle_size: usize,

    /// Upper bound on connections alive at once, leased or idle.
    pub max_total_size: usize,

    /// Idle connections older than this are closed instead of handed out.
    pub max_idle_duration: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_size: 1,
            max_idle_size: 10,
            max_total_size: 30,
            max_idle_duration: Duration::from_secs(5),
        }
    }
}

impl PoolConfig {
    pub fn with_initial_size(mut self, initial_size: usize) -> Self {
        self.initial_size = initial_size;
        self
    }

    pub fn with_max_idle_size(mut self, max_idle_size: usize) -> Self {
        self.max_idle_size = max_idle_size;
        self
    }

    pub fn with_max_total_size(mut self, max_total_size: usize) -> Self {
        self.max_total_size = max_total_size;
        self
    }

    pub fn with_max_idle_duration(mut self, max_idle_duration: Duration) -> Self {
        self.max_idle_duration = max_idle_duration;
        self
    }

    pub fn validate(&self) -> Result<(), PoolError> {
        if self.max_total_size == 0 {
            return Err(PoolError::InvalidConfig(
                "max_total_size must be at least 1".into(),
            ));
        }
        if self.initial_size > self.max_idle_size {
            return Err(PoolError::InvalidConfig(format!(
                "initial_size {} exceeds max_idle_size {}",
                self.initial_size, self.max_idle_size
            )));
        }
        if self.initial_size > self.max_total_size {
            return Err(PoolError::InvalidConfig(format!(
                "initial_size {} exceeds max_total_size {}",
                self.initial_size, self.max_total_size
            )));
        }
        Ok(())
    }
}
