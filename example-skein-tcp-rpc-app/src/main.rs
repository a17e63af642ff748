use example_skein_rpc_service_definition::echo::EchoRequest;
use example_skein_rpc_service_definition::user::{User, UserQuery};
use example_skein_rpc_service_definition::{EchoServiceProxy, UserServiceProxy};
use example_skein_tcp_rpc_app::{EchoService, UserService, register_services};
use skein_rpc_service::{CallContext, TracingInterceptor};
use skein_rpc_service_caller::init_service;
use skein_tokio_rpc_client::RpcClient;
use skein_tokio_rpc_server::RpcServer;
use skein_tokio_rpc_server::utils::bind_tcp_listener_on_random_port;
use std::sync::Arc;
use std::time::Duration;
use tokio::join;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Bind to a random available port
    let (listener, port) = bind_tcp_listener_on_random_port().await?;

    let echo_service = Arc::new(EchoService::default());
    let mut server = RpcServer::new().with_interceptor(Arc::new(TracingInterceptor));
    register_services(
        &mut server,
        echo_service.clone(),
        Arc::new(UserService::with_users([User {
            id: 1,
            name: "Ada".into(),
            email: "ada@example.com".into(),
        }])),
    )?;
    let shutdown = server.shutdown_token();
    let server_task = tokio::spawn(server.serve_with_listener(listener));

    let client = RpcClient::builder(&format!("127.0.0.1:{port}"))
        .with_interceptor(Arc::new(TracingInterceptor))
        .build()
        .await?;
    let client = Arc::new(client);
    let echo: EchoServiceProxy = init_service(client.clone());
    let users: UserServiceProxy = init_service(client.clone());

    // `join!` runs the calls concurrently, each on its own pooled connection
    let (res1, res2, res3) = join!(
        echo.get.call(CallContext::new(), EchoRequest { id: 123 }),
        echo.get.call(CallContext::new(), EchoRequest { id: 0 }),
        users.get_by_id.call(CallContext::new(), UserQuery { id: 1 }),
    );

    println!("Result from first get(): {:?}", res1);
    println!("Result from second get(): {:?}", res2);
    println!("Result from get_by_id(): {:?}", res3);

    let slow = echo
        .delay
        .call(CallContext::new().with_timeout(Duration::from_millis(50)), 500)
        .await;
    println!("Result from delay() with a 50ms deadline: {:?}", slow);

    echo.record
        .call_one_way(CallContext::new(), "hello from main".into())
        .await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    println!("Recorded lines: {:?}", echo_service.records());

    client.close();
    shutdown.cancel();
    server_task.await??;
    Ok(())
}
