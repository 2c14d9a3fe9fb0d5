//! # RPC Envelope Module
//!
//! The wire contract shared by the bot and every backend service:
//!
//! ```text
//! Request  { action: string, payload: object }
//! Response { success: bool, data?: object, error?: { code, message } }
//! ```
//!
//! Services describe their actions as an adjacently tagged enum implementing
//! [`Action`]; [`Request::decode`] turns an envelope into that enum once, at the
//! dispatch boundary, so handlers only ever see strongly typed payloads.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::errors::{ErrorCode, RpcError, ServiceError};

/// A request envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub action: String,
    #[serde(default)]
    pub payload: Value,
}

/// Error details of a failed response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
}

/// A response envelope
///
/// Exactly one of `data` / `error` is populated, matching `success`. The
/// constructors are the only way this crate builds one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

/// Closed set of actions understood by one service
///
/// Implementors are enums tagged with
/// `#[serde(tag = "action", content = "payload", rename_all = "snake_case")]`
/// whose variants each carry a payload struct.
pub trait Action: Serialize + DeserializeOwned {
    /// Wire names of every variant
    const ACTIONS: &'static [&'static str];
}

impl Request {
    pub fn new(action: impl Into<String>, payload: Value) -> Self {
        Self {
            action: action.into(),
            payload,
        }
    }

    /// Build an envelope from a typed action
    pub fn from_action<A: Action>(action: &A) -> Result<Self, ServiceError> {
        let value = serde_json::to_value(action)
            .map_err(|e| ServiceError::Internal(format!("failed to encode action: {e}")))?;
        serde_json::from_value(value)
            .map_err(|e| ServiceError::Internal(format!("failed to encode envelope: {e}")))
    }

    /// Decode the envelope into a typed action
    ///
    /// Unknown actions and structurally invalid payloads both come back as
    /// `InvalidInput`; nothing downstream ever sees an untyped payload.
    pub fn decode<A: Action>(&self) -> Result<A, ServiceError> {
        if !A::ACTIONS.contains(&self.action.as_str()) {
            return Err(ServiceError::invalid("Unknown action"));
        }

        let payload = match &self.payload {
            Value::Null => Value::Object(Map::new()),
            other => other.clone(),
        };

        serde_json::from_value(json!({ "action": self.action, "payload": payload }))
            .map_err(|e| ServiceError::invalid(format!("Invalid payload: {e}")))
    }
}

impl Response {
    pub fn success(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(err: &ServiceError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ErrorInfo {
                code: err.code(),
                message: err.public_message(),
            }),
        }
    }

    /// Collapse the envelope into the data payload or an [`RpcError`]
    pub fn into_result(self) -> Result<Value, RpcError> {
        if self.success {
            return Ok(self.data.unwrap_or(Value::Null));
        }
        match self.error {
            Some(info) => Err(RpcError::Service {
                code: info.code,
                message: info.message,
            }),
            None => Err(RpcError::Service {
                code: ErrorCode::Internal,
                message: "Service returned an error without details".to_string(),
            }),
        }
    }
}

impl From<Result<Value, ServiceError>> for Response {
    fn from(result: Result<Value, ServiceError>) -> Self {
        match result {
            Ok(data) => Response::success(data),
            Err(err) => Response::failure(&err),
        }
    }
}

/// The backend services reachable through the envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Auth,
    Menu,
    Promo,
    Info,
    Media,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 5] = [
        ServiceKind::Auth,
        ServiceKind::Menu,
        ServiceKind::Promo,
        ServiceKind::Info,
        ServiceKind::Media,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Auth => "auth",
            ServiceKind::Menu => "menu",
            ServiceKind::Promo => "promo",
            ServiceKind::Info => "info",
            ServiceKind::Media => "media",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auth" => Ok(ServiceKind::Auth),
            "menu" => Ok(ServiceKind::Menu),
            "promo" => Ok(ServiceKind::Promo),
            "info" => Ok(ServiceKind::Info),
            "media" => Ok(ServiceKind::Media),
            other => Err(format!("unknown service: {other}")),
        }
    }
}

/// A backend service: maps an action to a handler and answers with an envelope
///
/// Implementations hold no per-request state and may be called concurrently.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, request: Request) -> Response;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Named {
        name: String,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Nothing {}

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    #[serde(tag = "action", content = "payload", rename_all = "snake_case")]
    enum TestAction {
        Create(Named),
        List(Nothing),
    }

    impl Action for TestAction {
        const ACTIONS: &'static [&'static str] = &["create", "list"];
    }

    #[test]
    fn test_decode_known_action() {
        let req = Request::new("create", json!({ "name": "Latte" }));
        let action: TestAction = req.decode().unwrap();
        assert_eq!(
            action,
            TestAction::Create(Named {
                name: "Latte".to_string()
            })
        );
    }

    #[test]
    fn test_decode_null_payload_as_empty_object() {
        let req = Request::new("list", Value::Null);
        let action: TestAction = req.decode().unwrap();
        assert_eq!(action, TestAction::List(Nothing {}));
    }

    #[test]
    fn test_decode_unknown_action() {
        let req = Request::new("explode", json!({}));
        let err = req.decode::<TestAction>().unwrap_err();
        assert_eq!(err, ServiceError::invalid("Unknown action"));
    }

    #[test]
    fn test_decode_missing_field_is_invalid_input() {
        let req = Request::new("create", json!({}));
        let err = req.decode::<TestAction>().unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
        assert!(err.public_message().contains("name"));
    }

    #[test]
    fn test_from_action_round_trip() {
        let req = Request::from_action(&TestAction::Create(Named {
            name: "Mocha".to_string(),
        }))
        .unwrap();
        assert_eq!(req.action, "create");
        assert_eq!(req.payload, json!({ "name": "Mocha" }));
    }

    #[test]
    fn test_response_shape() {
        let ok = serde_json::to_value(Response::success(json!({ "id": 1 }))).unwrap();
        assert_eq!(ok, json!({ "success": true, "data": { "id": 1 } }));

        let failed =
            serde_json::to_value(Response::failure(&ServiceError::not_found("Menu"))).unwrap();
        assert_eq!(
            failed,
            json!({
                "success": false,
                "error": { "code": "ERR_NOT_FOUND", "message": "Menu not found" }
            })
        );
    }

    #[test]
    fn test_into_result() {
        let data = Response::success(json!({ "x": 1 })).into_result().unwrap();
        assert_eq!(data, json!({ "x": 1 }));

        let err = Response::failure(&ServiceError::Unauthorized)
            .into_result()
            .unwrap_err();
        assert!(matches!(
            err,
            RpcError::Service {
                code: ErrorCode::Unauthorized,
                ..
            }
        ));
    }
}
