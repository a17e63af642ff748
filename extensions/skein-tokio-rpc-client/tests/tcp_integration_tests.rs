use example_skein_rpc_service_definition::echo::{Delay, EchoReply, EchoRequest, Get, Record};
use example_skein_rpc_service_definition::user::{GetById, User, UserQuery};
use example_skein_rpc_service_definition::{EchoServiceProxy, UserServiceProxy};
use skein::frame::RequestFrame;
use skein_rpc_service::{CallContext, GzipCompressor, Interceptor, JsonSerializer, Next};
use skein_rpc_service_caller::{InvokeOutcome, init_service, init_service_named};
use skein_tokio_rpc_client::{
    PoolConfig, RpcCallerError, RpcClient, RpcClientConfig, RpcServiceCallerInterface,
};
use skein_tokio_rpc_server::utils::bind_tcp_listener_on_random_port;
use skein_tokio_rpc_server::{HandlerError, RpcServer, ServiceRegistration};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

struct EchoService {
    records: mpsc::UnboundedSender<String>,
}

struct UserService;

struct TestServer {
    address: String,
    records: mpsc::UnboundedReceiver<String>,
    shutdown: CancellationToken,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn start_server() -> TestServer {
    let (tx, records) = mpsc::unbounded_channel();

    let echo = ServiceRegistration::new("echo", Arc::new(EchoService { records: tx }))
        .method::<Get, _, _>(|_svc, _ctx, request: EchoRequest| async move {
            if request.id == 0 {
                return Err::<EchoReply, HandlerError>("id must be positive".into());
            }
            Ok(EchoReply {
                id: request.id,
                msg: "ok".into(),
            })
        })
        .method::<Delay, _, _>(|_svc, _ctx, millis| async move {
            tokio::time::sleep(Duration::from_millis(millis)).await;
            Ok::<_, HandlerError>(millis)
        })
        .method::<Record, _, _>(|svc, _ctx, line| async move {
            svc.records
                .send(line)
                .map_err(|e| Box::new(e) as HandlerError)?;
            Ok::<_, HandlerError>(())
        });

    let users = ServiceRegistration::new("user-service", Arc::new(UserService)).method::<GetById, _, _>(
        |_svc, _ctx, query: UserQuery| async move {
            Ok::<_, HandlerError>((query.id == 1).then(|| User {
                id: 1,
                name: "Ada".into(),
                email: "ada@example.com".into(),
            }))
        },
    );

    let mut server = RpcServer::new();
    server.register(echo).expect("register echo");
    server.register(users).expect("register users");
    let shutdown = server.shutdown_token();

    let (listener, port) = bind_tcp_listener_on_random_port()
        .await
        .expect("bind");
    tokio::spawn(server.serve_with_listener(listener));

    TestServer {
        address: format!("127.0.0.1:{port}"),
        records,
        shutdown,
    }
}

#[tokio::test]
async fn test_proxy_call_over_tcp() {
    let server = start_server().await;
    let client = Arc::new(RpcClient::connect(&server.address).await.expect("connect"));
    let echo: EchoServiceProxy = init_service(client.clone());

    let reply = echo
        .get
        .call(CallContext::new(), EchoRequest { id: 123 })
        .await
        .expect("call failed");

    assert_eq!(
        reply,
        EchoReply {
            id: 123,
            msg: "ok".into()
        }
    );
    assert_eq!(client.pool_status().idle, 1);
}

#[tokio::test]
async fn test_multiple_services_share_one_client() {
    let server = start_server().await;
    let client = Arc::new(RpcClient::connect(&server.address).await.expect("connect"));
    let echo: EchoServiceProxy = init_service(client.clone());
    let users: UserServiceProxy = init_service(client.clone());

    let (reply, user, missing) = tokio::join!(
        echo.get.call(CallContext::new(), EchoRequest { id: 7 }),
        users.get_by_id.call(CallContext::new(), UserQuery { id: 1 }),
        users.get_by_id.call(CallContext::new(), UserQuery { id: 2 }),
    );

    assert_eq!(reply.expect("echo").id, 7);
    assert_eq!(user.expect("user").map(|u| u.email), Some("ada@example.com".into()));
    assert_eq!(missing.expect("missing user"), None);
}

#[tokio::test]
async fn test_unknown_service_is_a_remote_error() {
    let server = start_server().await;
    let client = Arc::new(RpcClient::connect(&server.address).await.expect("connect"));
    let ghost: EchoServiceProxy = init_service_named(client.clone(), "ghost");

    let err = ghost
        .get
        .call(CallContext::new(), EchoRequest { id: 1 })
        .await
        .expect_err("unknown service");
    assert!(
        matches!(err, RpcCallerError::Remote(ref text) if text.contains("service not found")),
        "unexpected error: {err}"
    );

    // The connection survives an error response.
    let echo: EchoServiceProxy = init_service(client.clone());
    echo.get
        .call(CallContext::new(), EchoRequest { id: 1 })
        .await
        .expect("call after error");
}

#[tokio::test]
async fn test_business_error_text_reaches_caller() {
    let server = start_server().await;
    let client = Arc::new(RpcClient::connect(&server.address).await.expect("connect"));
    let echo: EchoServiceProxy = init_service(client);

    let err = echo
        .get
        .call(CallContext::new(), EchoRequest { id: 0 })
        .await
        .expect_err("business error");
    assert!(matches!(err, RpcCallerError::Remote(ref text) if text == "id must be positive"));
}

#[tokio::test]
async fn test_cancelled_context_leaves_pool_untouched() {
    let server = start_server().await;
    let client = Arc::new(RpcClient::connect(&server.address).await.expect("connect"));
    let echo: EchoServiceProxy = init_service(client.clone());
    let before = client.pool_status();

    let ctx = CallContext::new();
    ctx.cancel();
    let err = echo
        .get
        .call(ctx, EchoRequest { id: 1 })
        .await
        .expect_err("cancelled");

    assert!(matches!(err, RpcCallerError::Cancelled));
    assert_eq!(client.pool_status(), before);
}

#[tokio::test]
async fn test_deadline_bounds_a_slow_call() {
    let server = start_server().await;
    let client = Arc::new(RpcClient::connect(&server.address).await.expect("connect"));
    let echo: EchoServiceProxy = init_service(client.clone());

    let started = std::time::Instant::now();
    let err = echo
        .delay
        .call(
            CallContext::new().with_timeout(Duration::from_millis(100)),
            2_000,
        )
        .await
        .expect_err("deadline");

    // The server enforces the same deadline, so its answer may win the race.
    let expired = match &err {
        RpcCallerError::DeadlineExceeded => true,
        RpcCallerError::Remote(text) => text == "deadline exceeded",
        _ => false,
    };
    assert!(expired, "unexpected error: {err}");
    assert!(started.elapsed() < Duration::from_secs(1));

    // The next call is not confused by the abandoned one.
    let reply = echo
        .get
        .call(CallContext::new(), EchoRequest { id: 3 })
        .await
        .expect("call after deadline");
    assert_eq!(reply.id, 3);
}

async fn wait_for_idle(client: &RpcClient, idle: usize) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while client.pool_status().idle != idle {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("connection settled");
}

#[tokio::test]
async fn test_deadline_call_returns_connection_to_pool() {
    let server = start_server().await;
    let config = RpcClientConfig::default().with_pool(
        PoolConfig::default()
            .with_initial_size(1)
            .with_max_idle_size(1)
            .with_max_total_size(1),
    );
    let client = Arc::new(
        RpcClient::builder(&server.address)
            .with_config(config)
            .build()
            .await
            .expect("connect"),
    );
    let echo: EchoServiceProxy = init_service(client.clone());

    for _ in 0..5 {
        echo.delay
            .call(
                CallContext::new().with_timeout(Duration::from_millis(100)),
                2_000,
            )
            .await
            .expect_err("deadline");

        wait_for_idle(&client, 1).await;
        let status = client.pool_status();
        assert_eq!(status.live, 1);
        assert_eq!(status.idle, 1);
    }

    // The same connection still carries ordinary calls.
    let reply = echo
        .get
        .call(CallContext::new(), EchoRequest { id: 4 })
        .await
        .expect("call after deadlines");
    assert_eq!(reply.id, 4);
}

#[tokio::test]
async fn test_silent_peer_connection_is_closed_after_grace() {
    // Accepts and reads, but never answers.
    let (listener, port) = bind_tcp_listener_on_random_port().await.expect("bind");
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut sink = tokio::io::sink();
                let _ = tokio::io::copy(&mut stream, &mut sink).await;
            });
        }
    });

    let config = RpcClientConfig::default()
        .with_deadline_grace(Duration::from_millis(50))
        .with_pool(
            PoolConfig::default()
                .with_initial_size(1)
                .with_max_idle_size(1)
                .with_max_total_size(1),
        );
    let address = format!("127.0.0.1:{port}");
    let client = Arc::new(
        RpcClient::builder(&address)
            .with_config(config)
            .build()
            .await
            .expect("connect"),
    );
    assert_eq!(client.address(), address);
    let echo: EchoServiceProxy = init_service(client.clone());

    let err = echo
        .get
        .call(
            CallContext::new().with_timeout(Duration::from_millis(50)),
            EchoRequest { id: 1 },
        )
        .await
        .expect_err("no answer");
    assert!(matches!(err, RpcCallerError::DeadlineExceeded));

    tokio::time::timeout(Duration::from_secs(2), async {
        while client.pool_status().live != 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("connection closed after grace");
}

#[tokio::test]
async fn test_cancelled_in_flight_call_returns_connection() {
    let server = start_server().await;
    let client = Arc::new(RpcClient::connect(&server.address).await.expect("connect"));
    let echo: EchoServiceProxy = init_service(client.clone());

    let ctx = CallContext::new();
    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        canceller.cancel();
    });

    let err = echo
        .delay
        .call(ctx, 200)
        .await
        .expect_err("cancelled in flight");
    assert!(matches!(err, RpcCallerError::Cancelled));

    // The exchange finishes in the background and the connection is reused.
    tokio::time::sleep(Duration::from_millis(500)).await;
    let status = client.pool_status();
    assert_eq!(status.live, 1);
    assert_eq!(status.idle, 1);
}

#[tokio::test]
async fn test_concurrent_calls_respect_pool_bound() {
    let server = start_server().await;
    let config = RpcClientConfig::default().with_pool(
        PoolConfig::default()
            .with_initial_size(0)
            .with_max_idle_size(4)
            .with_max_total_size(4),
    );
    let client = Arc::new(
        RpcClient::builder(&server.address)
            .with_config(config)
            .build()
            .await
            .expect("connect"),
    );
    let echo: EchoServiceProxy = init_service(client.clone());

    let calls = (1..=20u64).map(|id| {
        let echo = echo.clone();
        async move { echo.delay.call(CallContext::new(), id).await }
    });
    let results = futures::future::join_all(calls).await;

    for (expected, result) in (1..=20u64).zip(results) {
        assert_eq!(result.expect("call"), expected);
    }
    let status = client.pool_status();
    assert!(status.live <= 4);
    assert_eq!(status.waiting, 0);
}

#[tokio::test]
async fn test_one_way_call_is_delivered() {
    let mut server = start_server().await;
    let client = Arc::new(RpcClient::connect(&server.address).await.expect("connect"));
    let echo: EchoServiceProxy = init_service(client.clone());

    echo.record
        .call_one_way(CallContext::new(), "hello".to_string())
        .await
        .expect("one-way");

    let line = tokio::time::timeout(Duration::from_secs(2), server.records.recv())
        .await
        .expect("delivered")
        .expect("line");
    assert_eq!(line, "hello");

    // No stray response is left on the connection.
    let reply = echo
        .get
        .call(CallContext::new(), EchoRequest { id: 8 })
        .await
        .expect("call after one-way");
    assert_eq!(reply.id, 8);
}

#[tokio::test]
async fn test_json_and_gzip_client() {
    let server = start_server().await;
    let client = RpcClient::builder(&server.address)
        .with_serializer(JsonSerializer)
        .with_compressor(Arc::new(GzipCompressor::default()))
        .build()
        .await
        .expect("connect");
    let echo: EchoServiceProxy = init_service(Arc::new(client));

    let reply = echo
        .get
        .call(CallContext::new(), EchoRequest { id: 11 })
        .await
        .expect("call");
    assert_eq!(reply.id, 11);
}

#[tokio::test]
async fn test_unreachable_server_fails_to_connect() {
    let (listener, port) = bind_tcp_listener_on_random_port().await.expect("bind");
    drop(listener);

    let result = RpcClient::builder(&format!("127.0.0.1:{port}"))
        .with_config(RpcClientConfig::default().with_connect_timeout(Duration::from_millis(500)))
        .build()
        .await;
    assert!(matches!(result, Err(RpcCallerError::Pool(_))));
}

#[tokio::test]
async fn test_closed_client_rejects_calls() {
    let server = start_server().await;
    let client = Arc::new(RpcClient::connect(&server.address).await.expect("connect"));
    let echo: EchoServiceProxy = init_service(client.clone());

    client.close();
    let err = echo
        .get
        .call(CallContext::new(), EchoRequest { id: 1 })
        .await
        .expect_err("closed");
    assert!(matches!(err, RpcCallerError::Pool(_)));
}

struct CountingInterceptor {
    calls: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl Interceptor<RequestFrame, Result<InvokeOutcome, RpcCallerError>> for CountingInterceptor {
    async fn intercept(
        &self,
        ctx: CallContext,
        mut request: RequestFrame,
        next: Next<'_, RequestFrame, Result<InvokeOutcome, RpcCallerError>>,
    ) -> Result<InvokeOutcome, RpcCallerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        request.meta.insert("trace-id", "abc");
        next.run(ctx, request).await
    }
}

#[tokio::test]
async fn test_client_interceptor_wraps_every_call() {
    let server = start_server().await;
    let calls = Arc::new(AtomicUsize::new(0));
    let client = RpcClient::builder(&server.address)
        .with_interceptor(Arc::new(CountingInterceptor {
            calls: calls.clone(),
        }))
        .build()
        .await
        .expect("connect");
    let client = Arc::new(client);

    let reply = client
        .call_method::<Get>("echo", CallContext::new(), EchoRequest { id: 2 })
        .await
        .expect("call");
    assert_eq!(reply.id, 2);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
