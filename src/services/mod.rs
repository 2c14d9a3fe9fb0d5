//! Backend services
//!
//! One module per domain. Each exposes a typed action enum, the repository
//! trait it needs from storage, and a service struct implementing
//! [`Dispatcher`](crate::rpc::Dispatcher):
//! - `auth`: admin identity, verification and login sessions
//! - `menu`: menu items and categories
//! - `promo`: promotions
//! - `info`: café information
//! - `media`: media attached to menu items and promos

pub mod auth;
pub mod info;
pub mod media;
pub mod menu;
pub mod promo;

use serde::Deserialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::errors::ServiceError;
use crate::rpc::{Action, Request, Response};

pub use auth::AuthService;
pub use info::InfoService;
pub use media::MediaService;
pub use menu::MenuService;
pub use promo::PromoService;

/// Payload of actions that take no arguments
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, Deserialize)]
pub struct NoPayload {}

/// Payload of actions addressing one entity by id
#[derive(Debug, Clone, PartialEq, serde::Serialize, Deserialize)]
pub struct ById {
    pub id: i64,
}

/// Decode, run and encode one request; shared by every service
pub(crate) async fn run<A, F, Fut>(service: &'static str, request: Request, handler: F) -> Response
where
    A: Action,
    F: FnOnce(A) -> Fut,
    Fut: std::future::Future<Output = Result<Value, ServiceError>>,
{
    let action_name = request.action.clone();
    let result = match request.decode::<A>() {
        Ok(action) => handler(action).await,
        Err(e) => Err(e),
    };

    match &result {
        Err(
            e @ (ServiceError::Database(_) | ServiceError::Internal(_) | ServiceError::Service(_)),
        ) => {
            error!(service, action = %action_name, error = %e, "Request failed");
        }
        Err(e) => {
            warn!(service, action = %action_name, error = %e, "Request rejected");
        }
        Ok(_) => {}
    }

    Response::from(result)
}

/// Serialize a handler result into the `data` object
pub(crate) fn to_data<T: serde::Serialize>(key: &str, value: &T) -> Result<Value, ServiceError> {
    let value = serde_json::to_value(value)
        .map_err(|e| ServiceError::Internal(format!("failed to encode {key}: {e}")))?;
    let mut data = serde_json::Map::new();
    data.insert(key.to_string(), value);
    Ok(Value::Object(data))
}

pub(crate) fn message(text: &str) -> Value {
    serde_json::json!({ "message": text })
}
