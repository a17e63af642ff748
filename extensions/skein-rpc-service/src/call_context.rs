use crate::{META_DEADLINE, META_ONE_WAY, META_TRUE};
use chrono::{DateTime, Utc};
use skein::frame::FrameMeta;
use skein::utils::deadline_from_millis;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    #[error("call cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,
}

/// Per-call cancellation, deadline and delivery mode.
///
/// Cloning shares the cancellation token, so cancelling any clone cancels
/// the call. On the wire the deadline travels as UNIX milliseconds under the
/// `deadline` metadata key and one-way delivery as `one-way: true`.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancel: CancellationToken,
    deadline: Option<DateTime<Utc>>,
    one_way: bool,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context cancelled together with `token`.
    pub fn with_cancellation(token: CancellationToken) -> Self {
        Self {
            cancel: token,
            ..Self::default()
        }
    }

    pub fn with_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets the deadline to `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let delta = chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::MAX);
        let deadline = Utc::now()
            .checked_add_signed(delta)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.with_deadline(deadline)
    }

    /// Marks the call as fire-and-forget.
    pub fn as_one_way(mut self) -> Self {
        self.one_way = true;
        self
    }

    pub fn is_one_way(&self) -> bool {
        self.one_way
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Time left before the deadline; zero once it has passed.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| (deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO))
    }

    /// Fails if the context is already cancelled or past its deadline.
    pub fn check(&self) -> Result<(), ContextError> {
        if self.cancel.is_cancelled() {
            return Err(ContextError::Cancelled);
        }
        match self.remaining() {
            Some(left) if left.is_zero() => Err(ContextError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> ContextError {
        match self.remaining() {
            Some(left) => tokio::select! {
                _ = self.cancel.cancelled() => ContextError::Cancelled,
                _ = tokio::time::sleep(left) => ContextError::DeadlineExceeded,
            },
            None => {
                self.cancel.cancelled().await;
                ContextError::Cancelled
            }
        }
    }

    /// Drives `future` unless the context ends first.
    pub async fn run<F: Future>(&self, future: F) -> Result<F::Output, ContextError> {
        self.check()?;
        tokio::select! {
            biased;
            output = future => Ok(output),
            err = self.done() => Err(err),
        }
    }

    pub fn write_meta(&self, meta: &mut FrameMeta) {
        if let Some(deadline) = self.deadline {
            meta.insert(META_DEADLINE, deadline.timestamp_millis().to_string());
        }
        if self.one_way {
            meta.insert(META_ONE_WAY, META_TRUE);
        }
    }

    /// Builds a server-side context from request metadata.
    ///
    /// A missing or unparsable deadline means no deadline.
    pub fn from_meta(meta: &FrameMeta) -> Self {
        Self {
            cancel: CancellationToken::new(),
            deadline: meta.get(META_DEADLINE).and_then(deadline_from_millis),
            one_way: meta.get(META_ONE_WAY) == Some(META_TRUE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_round_trip() {
        let ctx = CallContext::new()
            .with_timeout(Duration::from_secs(30))
            .as_one_way();
        let mut meta = FrameMeta::new();
        ctx.write_meta(&mut meta);

        let decoded = CallContext::from_meta(&meta);
        assert!(decoded.is_one_way());
        assert_eq!(
            decoded.deadline().map(|d| d.timestamp_millis()),
            ctx.deadline().map(|d| d.timestamp_millis())
        );
    }

    #[test]
    fn garbage_deadline_means_none() {
        let meta: FrameMeta = [(META_DEADLINE, "tomorrow")].into_iter().collect();
        let ctx = CallContext::from_meta(&meta);
        assert!(ctx.deadline().is_none());
        assert!(!ctx.is_one_way());
    }

    #[test]
    fn check_reports_cancel_before_deadline() {
        let ctx = CallContext::new().with_deadline(Utc::now() - chrono::Duration::seconds(1));
        assert_eq!(ctx.check(), Err(ContextError::DeadlineExceeded));
        ctx.cancel();
        assert_eq!(ctx.check(), Err(ContextError::Cancelled));
    }

    #[tokio::test]
    async fn run_stops_at_deadline() {
        let ctx = CallContext::new().with_timeout(Duration::from_millis(20));
        let result = ctx
            .run(tokio::time::sleep(Duration::from_secs(5)))
            .await;
        assert_eq!(result, Err(ContextError::DeadlineExceeded));
    }

    #[tokio::test]
    async fn run_stops_on_cancel() {
        let ctx = CallContext::new();
        let trigger = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });
        let result = ctx.run(std::future::pending::<()>()).await;
        assert_eq!(result, Err(ContextError::Cancelled));
    }
}
