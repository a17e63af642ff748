use crate::registration::MethodEntry;
use crate::{DispatchError, RpcServiceEndpointError, ServiceRegistration};
use futures::future::BoxFuture;
use skein::frame::{RequestFrame, ResponseFrame};
use skein_rpc_service::interceptor::InterceptorChain;
use skein_rpc_service::{
    CallContext, CompressorRegistry, ContextError, DefaultSerializers, Interceptor, Next,
    SerializerSet, method_id_hash,
};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

struct ServiceRecord<Z> {
    type_name: &'static str,
    methods: HashMap<u64, MethodEntry<Z>>,
}

/// Routes decoded requests to registered service methods by name.
///
/// Services are registered while the endpoint is exclusively owned; once it
/// is shared (`Arc`) the registry is read-only and dispatch is a pair of hash
/// lookups followed by the typed call.
pub struct RpcServiceEndpoint<Z = DefaultSerializers> {
    services: HashMap<String, ServiceRecord<Z>>,
    serializers: Z,
    compressors: CompressorRegistry,
    interceptors: InterceptorChain<RequestFrame, Option<ResponseFrame>>,
}

impl<Z: SerializerSet> Default for RpcServiceEndpoint<Z> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Z: SerializerSet> RpcServiceEndpoint<Z> {
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
            serializers: Z::default(),
            compressors: CompressorRegistry::default(),
            interceptors: Vec::new(),
        }
    }

    pub fn with_compressors(mut self, compressors: CompressorRegistry) -> Self {
        self.compressors = compressors;
        self
    }

    /// Appends a server interceptor; the first one added runs outermost.
    pub fn with_interceptor(
        mut self,
        interceptor: Arc<dyn Interceptor<RequestFrame, Option<ResponseFrame>>>,
    ) -> Self {
        self.interceptors.push(interceptor);
        self
    }

    pub fn add_interceptor(
        &mut self,
        interceptor: Arc<dyn Interceptor<RequestFrame, Option<ResponseFrame>>>,
    ) {
        self.interceptors.push(interceptor);
    }

    pub fn register<T>(
        &mut self,
        registration: ServiceRegistration<T, Z>,
    ) -> Result<(), RpcServiceEndpointError>
    where
        T: Send + Sync + 'static,
    {
        if let Some(method) = registration.duplicate {
            return Err(RpcServiceEndpointError::DuplicateMethod {
                service: registration.name,
                method: method.to_string(),
            });
        }

        match self.services.entry(registration.name) {
            Entry::Occupied(entry) => Err(RpcServiceEndpointError::DuplicateService(
                entry.key().clone(),
            )),
            Entry::Vacant(entry) => {
                tracing::info!(
                    service = %entry.key(),
                    holder = registration.type_name,
                    methods = registration.methods.len(),
                    "registered service"
                );
                entry.insert(ServiceRecord {
                    type_name: registration.type_name,
                    methods: registration.methods,
                });
                Ok(())
            }
        }
    }

    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    pub fn has_method(&self, service: &str, method: &str) -> bool {
        self.lookup(service, method).is_ok()
    }

    /// Type name of the value serving `service`, for diagnostics.
    pub fn holder_type(&self, service: &str) -> Option<&'static str> {
        self.services.get(service).map(|record| record.type_name)
    }

    /// Handles one request and returns its response.
    ///
    /// Returns `None` for one-way requests, which are spawned onto the
    /// runtime and never answered. Every failure short of the transport
    /// becomes an error response.
    pub async fn dispatch(self: &Arc<Self>, request: RequestFrame) -> Option<ResponseFrame> {
        let ctx = CallContext::from_meta(&request.meta);

        if self.interceptors.is_empty() {
            return self.clone().handle(ctx, request).await;
        }

        let endpoint = self.clone();
        let terminal = move |ctx: CallContext,
                             request: RequestFrame|
              -> BoxFuture<'static, Option<ResponseFrame>> {
            let endpoint = endpoint.clone();
            Box::pin(async move { endpoint.handle(ctx, request).await })
        };
        Next::new(&self.interceptors, &terminal)
            .run(ctx, request)
            .await
    }

    /// Response sent back when a frame's bytes could not be decoded.
    pub fn malformed_response(message_id: u32) -> ResponseFrame {
        ResponseFrame::new(message_id).with_error(DispatchError::MalformedFrame.to_string())
    }

    async fn handle(self: Arc<Self>, ctx: CallContext, request: RequestFrame) -> Option<ResponseFrame> {
        if ctx.is_one_way() {
            tokio::spawn(async move {
                if let Err(err) = self.call(ctx, &request).await {
                    tracing::warn!(
                        service = %request.service_name,
                        method = %request.method_name,
                        error = %err,
                        "one-way call failed"
                    );
                }
            });
            return None;
        }

        let response = ResponseFrame::for_request(&request);
        Some(match self.call(ctx, &request).await {
            Ok(payload) => response.with_payload(payload),
            Err(err) => {
                tracing::debug!(
                    service = %request.service_name,
                    method = %request.method_name,
                    message_id = request.message_id,
                    error = %err,
                    "call failed"
                );
                response.with_error(err.to_string())
            }
        })
    }

    fn lookup(&self, service: &str, method: &str) -> Result<&MethodEntry<Z>, DispatchError> {
        let record = self
            .services
            .get(service)
            .ok_or(DispatchError::ServiceNotFound)?;
        record
            .methods
            .get(&method_id_hash(method))
            .filter(|entry| entry.name == method)
            .ok_or(DispatchError::MethodNotFound)
    }

    async fn call(&self, ctx: CallContext, request: &RequestFrame) -> Result<Vec<u8>, DispatchError> {
        let entry = self.lookup(&request.service_name, &request.method_name)?;

        let compressor = self.compressors.get(request.compressor_code)?;
        if !self.serializers.supports(request.serializer_code) {
            return Err(DispatchError::UnknownSerializer(request.serializer_code));
        }

        let body = compressor.uncompress(&request.payload)?;
        let call = (entry.handler)(
            self.serializers.clone(),
            ctx.clone(),
            request.serializer_code,
            body,
        );

        let output = match ctx.run(call).await {
            Ok(result) => result?,
            Err(ContextError::DeadlineExceeded) => return Err(DispatchError::DeadlineExceeded),
            Err(ContextError::Cancelled) => return Err(DispatchError::Cancelled),
        };

        Ok(compressor.compress(&output)?)
    }
}
