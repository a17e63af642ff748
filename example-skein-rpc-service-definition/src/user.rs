use serde::{Deserialize, Serialize};
use skein_rpc_service::RpcMethod;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserQuery {
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub email: String,
}

pub struct GetById;

impl RpcMethod for GetById {
    const NAME: &'static str = "GetById";

    type Input = UserQuery;
    type Output = Option<User>;
}
