use crate::RpcCallerError;
use skein::frame::{RequestFrame, ResponseFrame};
use skein::utils::increment_u32_id;
use skein_rpc_service::{CallContext, Compressor, RpcMethod, Serializer};
use std::sync::Arc;

/// What came back from sending a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvokeOutcome {
    Response(ResponseFrame),

    /// The request was written and no response is expected.
    OneWay,
}

/// A generic capability for making RPC calls.
///
/// A transport implements the required methods; typed calls come from the
/// provided ones, which turn a method descriptor and an argument into a
/// request frame and decode the response frame back.
#[async_trait::async_trait]
pub trait RpcServiceCallerInterface: Send + Sync {
    type Serializer: Serializer;

    // --- METHODS TO BE IMPLEMENTED BY THE TRANSPORT ---

    fn get_serializer(&self) -> &Self::Serializer;

    fn get_compressor(&self) -> Arc<dyn Compressor>;

    /// Sends a fully built request and waits for its response, honoring the
    /// context's cancellation and deadline.
    async fn invoke(
        &self,
        ctx: CallContext,
        request: RequestFrame,
    ) -> Result<InvokeOutcome, RpcCallerError>;

    // --- METHODS PROVIDED AUTOMATICALLY BY THE TRAIT ---

    /// Calls `M` on `service` and decodes its result.
    async fn call_method<M>(
        &self,
        service: &str,
        ctx: CallContext,
        input: M::Input,
    ) -> Result<M::Output, RpcCallerError>
    where
        M: RpcMethod,
    {
        ctx.check()?;

        let serializer = self.get_serializer();
        let compressor = self.get_compressor();

        let body = serializer.encode(&input).map_err(RpcCallerError::Encode)?;
        let payload = compressor.compress(&body)?;

        let mut request = RequestFrame::new(increment_u32_id(), service, M::NAME, payload);
        request.serializer_code = serializer.code();
        request.compressor_code = compressor.code();
        ctx.write_meta(&mut request.meta);

        match self.invoke(ctx, request).await? {
            InvokeOutcome::OneWay => Err(RpcCallerError::OneWay),
            InvokeOutcome::Response(response) => {
                decode_response::<M, _>(serializer, compressor.as_ref(), response)
            }
        }
    }

    /// Sends `M` to `service` without waiting for a result.
    async fn call_one_way<M>(
        &self,
        service: &str,
        ctx: CallContext,
        input: M::Input,
    ) -> Result<(), RpcCallerError>
    where
        M: RpcMethod,
    {
        match self
            .call_method::<M>(service, ctx.as_one_way(), input)
            .await
        {
            Ok(_) | Err(RpcCallerError::OneWay) => Ok(()),
            Err(err) => Err(err),
        }
    }
}

/// Turns a response frame into the method's typed result.
pub fn decode_response<M, S>(
    serializer: &S,
    compressor: &dyn Compressor,
    response: ResponseFrame,
) -> Result<M::Output, RpcCallerError>
where
    M: RpcMethod,
    S: Serializer,
{
    if let Some(text) = response.error_text() {
        return Err(RpcCallerError::Remote(text));
    }

    if response.compressor_code != compressor.code() {
        return Err(RpcCallerError::Protocol(format!(
            "response compressed with code {}, expected {}",
            response.compressor_code,
            compressor.code()
        )));
    }
    if response.serializer_code != serializer.code() {
        return Err(RpcCallerError::Protocol(format!(
            "response serialized with code {}, expected {}",
            response.serializer_code,
            serializer.code()
        )));
    }

    let body = compressor.uncompress(&response.payload)?;
    serializer.decode(&body).map_err(RpcCallerError::Decode)
}
