use crate::{RpcCallerError, RpcServiceCallerInterface};
use futures::future::BoxFuture;
use skein_rpc_service::{CallContext, RpcMethod};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

type StubFn<M> = dyn Fn(
        CallContext,
        <M as RpcMethod>::Input,
    ) -> BoxFuture<'static, Result<<M as RpcMethod>::Output, RpcCallerError>>
    + Send
    + Sync;

/// A pre-bound call site for one remote method.
///
/// Built once by a [`ProxyBuilder`]; calling it serializes the argument,
/// sends the request to the bound service and decodes the result.
pub struct MethodStub<M: RpcMethod> {
    service: Arc<str>,
    call: Arc<StubFn<M>>,
    _method: PhantomData<fn() -> M>,
}

impl<M: RpcMethod> Clone for MethodStub<M> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            call: self.call.clone(),
            _method: PhantomData,
        }
    }
}

impl<M: RpcMethod> fmt::Debug for MethodStub<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodStub")
            .field("service", &self.service)
            .field("method", &M::NAME)
            .finish()
    }
}

impl<M: RpcMethod> MethodStub<M> {
    pub async fn call(
        &self,
        ctx: CallContext,
        input: M::Input,
    ) -> Result<M::Output, RpcCallerError> {
        (self.call)(ctx, input).await
    }

    /// Sends the call one-way; succeeds once the request is written.
    pub async fn call_one_way(
        &self,
        ctx: CallContext,
        input: M::Input,
    ) -> Result<(), RpcCallerError> {
        match self.call(ctx.as_one_way(), input).await {
            Ok(_) | Err(RpcCallerError::OneWay) => Ok(()),
            Err(err) => Err(err),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service
    }

    pub fn method_name(&self) -> &'static str {
        M::NAME
    }
}

/// Binds method stubs to one invoker and service name.
pub struct ProxyBuilder<I> {
    invoker: Arc<I>,
    service: Arc<str>,
}

impl<I> ProxyBuilder<I>
where
    I: RpcServiceCallerInterface + 'static,
{
    pub fn new(invoker: Arc<I>, service: impl Into<Arc<str>>) -> Self {
        Self {
            invoker,
            service: service.into(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service
    }

    pub fn stub<M: RpcMethod>(&self) -> MethodStub<M> {
        let invoker = self.invoker.clone();
        let service = self.service.clone();

        let call: Arc<StubFn<M>> = Arc::new({
            let service = service.clone();
            move |ctx: CallContext,
                  input: M::Input|
                  -> BoxFuture<'static, Result<M::Output, RpcCallerError>> {
                let invoker = invoker.clone();
                let service = service.clone();
                Box::pin(async move { invoker.call_method::<M>(&service, ctx, input).await })
            }
        });

        MethodStub {
            service,
            call,
            _method: PhantomData,
        }
    }
}

/// A service description whose fields are method stubs.
///
/// Usually implemented by [`rpc_service_proxy!`](crate::rpc_service_proxy).
pub trait ServiceProxy: Sized {
    /// Name the service is registered under on the server.
    const SERVICE_NAME: &'static str;

    const METHOD_NAMES: &'static [&'static str];

    fn build<I>(builder: &ProxyBuilder<I>) -> Self
    where
        I: RpcServiceCallerInterface + 'static;
}

/// Builds every stub of `P` against `invoker`.
pub fn init_service<P, I>(invoker: Arc<I>) -> P
where
    P: ServiceProxy,
    I: RpcServiceCallerInterface + 'static,
{
    init_service_named(invoker, P::SERVICE_NAME)
}

/// Like [`init_service`], targeting a service registered under another name.
pub fn init_service_named<P, I>(invoker: Arc<I>, service: &str) -> P
where
    P: ServiceProxy,
    I: RpcServiceCallerInterface + 'static,
{
    P::build(&ProxyBuilder::new(invoker, service))
}
