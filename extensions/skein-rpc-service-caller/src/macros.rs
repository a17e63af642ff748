/// Declares a service description: a struct of [`MethodStub`](crate::MethodStub)
/// fields plus its [`ServiceProxy`](crate::ServiceProxy) implementation.
///
/// ```rust,ignore
/// rpc_service_proxy! {
///     pub struct EchoServiceProxy("echo") {
///         pub get: Get,
///     }
/// }
///
/// let echo: EchoServiceProxy = init_service(client);
/// let reply = echo.get.call(CallContext::new(), EchoRequest { id: 1 }).await?;
/// ```
#[macro_export]
macro_rules! rpc_service_proxy {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident ($service:literal) {
            $(
                $(#[$field_meta:meta])*
                $field_vis:vis $field:ident : $method:ty
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Debug)]
        $vis struct $name {
            $(
                $(#[$field_meta])*
                $field_vis $field: $crate::MethodStub<$method>,
            )*
        }

        impl $crate::ServiceProxy for $name {
            const SERVICE_NAME: &'static str = $service;

            const METHOD_NAMES: &'static [&'static str] = &[
                $( <$method as $crate::skein_rpc_service::RpcMethod>::NAME, )*
            ];

            fn build<I>(builder: &$crate::ProxyBuilder<I>) -> Self
            where
                I: $crate::RpcServiceCallerInterface + 'static,
            {
                Self {
                    $( $field: builder.stub::<$method>(), )*
                }
            }
        }
    };
}
