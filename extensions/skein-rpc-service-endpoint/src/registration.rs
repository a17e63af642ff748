use crate::DispatchError;
use futures::future::BoxFuture;
use skein_rpc_service::{CallContext, DefaultSerializers, RpcMethod, SerializerSet};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Error type service methods return; its text becomes the response error.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// A registered method with its decode and encode steps bound in.
///
/// Takes the endpoint's serializers, the call context, the serializer code
/// from the request and the uncompressed argument bytes; yields the
/// serialized result.
pub type MethodHandler<Z> = Arc<
    dyn Fn(Z, CallContext, u8, Vec<u8>) -> BoxFuture<'static, Result<Vec<u8>, DispatchError>>
        + Send
        + Sync,
>;

pub(crate) struct MethodEntry<Z> {
    pub(crate) name: &'static str,
    pub(crate) handler: MethodHandler<Z>,
}

/// A service value and its method table, built once before serving.
///
/// ```rust,ignore
/// let registration = ServiceRegistration::new("echo", Arc::new(EchoService))
///     .method::<Get, _, _>(|svc, _ctx, req| async move { svc.get(req).await });
/// endpoint.register(registration)?;
/// ```
pub struct ServiceRegistration<T, Z = DefaultSerializers> {
    pub(crate) name: String,
    pub(crate) type_name: &'static str,
    holder: Arc<T>,
    pub(crate) methods: HashMap<u64, MethodEntry<Z>>,
    pub(crate) duplicate: Option<&'static str>,
}

impl<T, Z> ServiceRegistration<T, Z>
where
    T: Send + Sync + 'static,
    Z: SerializerSet,
{
    pub fn new(name: impl Into<String>, holder: Arc<T>) -> Self {
        Self {
            name: name.into(),
            type_name: std::any::type_name::<T>(),
            holder,
            methods: HashMap::new(),
            duplicate: None,
        }
    }

    /// Adds method `M`, served by `handler` on the held service value.
    ///
    /// Adding the same method twice is reported when the registration is
    /// handed to the endpoint.
    pub fn method<M, F, Fut>(mut self, handler: F) -> Self
    where
        M: RpcMethod,
        F: Fn(Arc<T>, CallContext, M::Input) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<M::Output, HandlerError>> + Send + 'static,
    {
        if self.methods.contains_key(&M::METHOD_ID) {
            self.duplicate.get_or_insert(M::NAME);
            return self;
        }

        let holder = self.holder.clone();
        let handler = Arc::new(handler);
        let wrapped: MethodHandler<Z> = Arc::new(
            move |serializers: Z,
                  ctx: CallContext,
                  serializer_code: u8,
                  body: Vec<u8>|
                  -> BoxFuture<'static, Result<Vec<u8>, DispatchError>> {
                let holder = holder.clone();
                let handler = handler.clone();
                Box::pin(async move {
                    let input: M::Input = serializers
                        .decode_with(serializer_code, &body)
                        .map_err(DispatchError::decode)?;
                    let output = handler(holder, ctx, input)
                        .await
                        .map_err(DispatchError::Handler)?;
                    serializers
                        .encode_with(serializer_code, &output)
                        .map_err(DispatchError::Encode)
                })
            },
        );

        self.methods.insert(
            M::METHOD_ID,
            MethodEntry {
                name: M::NAME,
                handler: wrapped,
            },
        );
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn holder(&self) -> &Arc<T> {
        &self.holder
    }
}
