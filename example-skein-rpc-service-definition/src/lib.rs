pub mod echo;
pub mod user;

use skein_rpc_service_caller::rpc_service_proxy;

rpc_service_proxy! {
    /// Client view of the `echo` service.
    pub struct EchoServiceProxy("echo") {
        pub get: echo::Get,
        pub delay: echo::Delay,
        pub record: echo::Record,
    }
}

rpc_service_proxy! {
    pub struct UserServiceProxy("user-service") {
        pub get_by_id: user::GetById,
    }
}
