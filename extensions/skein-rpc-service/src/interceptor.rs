//! Ordered middleware around a call.
//!
//! The first interceptor in a chain runs outermost. Each one receives the
//! call and a [`Next`] continuation; it may inspect or rewrite the request,
//! short-circuit with its own result, or forward to `next.run(..)`.

use crate::CallContext;
use futures::future::BoxFuture;
use skein::frame::RequestFrame;
use std::sync::Arc;
use std::time::Instant;

#[async_trait::async_trait]
pub trait Interceptor<Req, Res>: Send + Sync + 'static
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    async fn intercept(&self, ctx: CallContext, request: Req, next: Next<'_, Req, Res>) -> Res;
}

pub type InterceptorChain<Req, Res> = Vec<Arc<dyn Interceptor<Req, Res>>>;

/// The innermost step of a chain: the call itself.
pub type Terminal<'a, Req, Res> =
    dyn Fn(CallContext, Req) -> BoxFuture<'static, Res> + Send + Sync + 'a;

/// The remainder of a chain.
pub struct Next<'a, Req, Res> {
    chain: &'a [Arc<dyn Interceptor<Req, Res>>],
    terminal: &'a Terminal<'a, Req, Res>,
}

impl<'a, Req, Res> Next<'a, Req, Res>
where
    Req: Send + 'static,
    Res: Send + 'static,
{
    pub fn new(
        chain: &'a [Arc<dyn Interceptor<Req, Res>>],
        terminal: &'a Terminal<'a, Req, Res>,
    ) -> Self {
        Self { chain, terminal }
    }

    pub async fn run(self, ctx: CallContext, request: Req) -> Res {
        match self.chain.split_first() {
            Some((head, rest)) => {
                head.intercept(ctx, request, Next::new(rest, self.terminal))
                    .await
            }
            None => (self.terminal)(ctx, request).await,
        }
    }
}

/// Logs the boundaries of every call passing through it.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingInterceptor;

#[async_trait::async_trait]
impl<Res> Interceptor<RequestFrame, Res> for TracingInterceptor
where
    Res: Send + 'static,
{
    async fn intercept(
        &self,
        ctx: CallContext,
        request: RequestFrame,
        next: Next<'_, RequestFrame, Res>,
    ) -> Res {
        let service = request.service_name.clone();
        let method = request.method_name.clone();
        let message_id = request.message_id;
        let started = Instant::now();

        tracing::debug!(%service, %method, message_id, one_way = ctx.is_one_way(), "call started");
        let result = next.run(ctx, request).await;
        tracing::debug!(
            %service,
            %method,
            message_id,
            elapsed_us = started.elapsed().as_micros() as u64,
            "call finished"
        );

        result
    }
}
