use example_skein_rpc_service_definition::echo::{self, EchoReply, EchoRequest};
use example_skein_rpc_service_definition::user::{self, User, UserQuery};
use skein_tokio_rpc_server::{HandlerError, RpcServer, RpcServiceEndpointError, ServiceRegistration};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// Answers echo requests and keeps the lines sent to it one-way.
#[derive(Debug, Default)]
pub struct EchoService {
    records: Mutex<Vec<String>>,
}

impl EchoService {
    pub async fn get(&self, request: EchoRequest) -> Result<EchoReply, HandlerError> {
        if request.id == 0 {
            return Err("id must be positive".into());
        }
        Ok(EchoReply {
            id: request.id,
            msg: format!("echo #{}", request.id),
        })
    }

    pub async fn delay(&self, millis: u64) -> Result<u64, HandlerError> {
        tokio::time::sleep(Duration::from_millis(millis)).await;
        Ok(millis)
    }

    pub fn record(&self, line: String) {
        tracing::info!(%line, "recorded");
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
    }

    pub fn records(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// An in-memory user directory.
#[derive(Debug, Default)]
pub struct UserService {
    users: HashMap<u64, User>,
}

impl UserService {
    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        Self {
            users: users.into_iter().map(|user| (user.id, user)).collect(),
        }
    }

    pub fn get_by_id(&self, query: UserQuery) -> Option<User> {
        self.users.get(&query.id).cloned()
    }
}

/// Registers both demo services on `server`.
pub fn register_services(
    server: &mut RpcServer,
    echo_service: Arc<EchoService>,
    user_service: Arc<UserService>,
) -> Result<(), RpcServiceEndpointError> {
    server.register(
        ServiceRegistration::new("echo", echo_service)
            .method::<echo::Get, _, _>(|svc, _ctx, request| async move { svc.get(request).await })
            .method::<echo::Delay, _, _>(|svc, _ctx, millis| async move { svc.delay(millis).await })
            .method::<echo::Record, _, _>(|svc, _ctx, line| async move {
                svc.record(line);
                Ok::<_, HandlerError>(())
            }),
    )?;

    server.register(
        ServiceRegistration::new("user-service", user_service).method::<user::GetById, _, _>(
            |svc, _ctx, query| async move { Ok::<_, HandlerError>(svc.get_by_id(query)) },
        ),
    )
}
