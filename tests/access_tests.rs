//! # Access Gate Tests
//!
//! Allow-list hits must never reach the auth service; everyone else costs
//! exactly one `verify` call, and any failure of that call denies access.

use async_trait::async_trait;
use serde_json::json;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::NamedTempFile;

use cafebot::access::{AccessGate, AdminVars};
use cafebot::client::{LocalTransport, RpcTransport, ServiceClient};
use cafebot::errors::RpcError;
use cafebot::rpc::{Request, Response, ServiceKind};

/// Counts calls, then forwards them or fails them
struct CountingTransport {
    inner: LocalTransport,
    calls: AtomicUsize,
    offline: bool,
}

impl CountingTransport {
    fn new(offline: bool) -> Arc<Self> {
        Arc::new(Self {
            inner: LocalTransport::in_memory(),
            calls: AtomicUsize::new(0),
            offline,
        })
    }

    fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RpcTransport for CountingTransport {
    async fn call(&self, service: ServiceKind, request: Request) -> Result<Response, RpcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.offline {
            return Err(RpcError::Unavailable("timed out".to_string()));
        }
        self.inner.call(service, request).await
    }
}

fn vars() -> AdminVars {
    AdminVars {
        admin_telegram_ids: vec!["1001".to_string()],
        admin_usernames: vec!["@owner".to_string()],
    }
}

fn gate(transport: &Arc<CountingTransport>) -> AccessGate {
    AccessGate::new(vars(), ServiceClient::new(transport.clone()))
}

#[tokio::test]
async fn test_allow_listed_id_needs_no_call() {
    let transport = CountingTransport::new(false);
    assert!(gate(&transport).is_privileged(1001, None).await);
    assert_eq!(transport.count(), 0);
}

#[tokio::test]
async fn test_allow_listed_username_needs_no_call() {
    let transport = CountingTransport::new(false);
    // configured with a leading '@', Telegram reports it without
    assert!(gate(&transport).is_privileged(5005, Some("owner")).await);
    assert_eq!(transport.count(), 0);
}

#[tokio::test]
async fn test_unknown_user_costs_one_verify_and_is_denied() {
    let transport = CountingTransport::new(false);
    assert!(!gate(&transport).is_privileged(5005, Some("guest")).await);
    assert_eq!(transport.count(), 1);
}

#[tokio::test]
async fn test_registered_admin_is_verified_remotely() {
    let transport = CountingTransport::new(false);
    let client = ServiceClient::new(transport.clone());
    client
        .submit(
            ServiceKind::Auth,
            Request::new("register", json!({"telegram_id": "4004", "username": "barista"})),
        )
        .await
        .unwrap();
    let before = transport.count();

    assert!(gate(&transport).is_privileged(4004, None).await);
    assert_eq!(transport.count(), before + 1);
}

#[tokio::test]
async fn test_deactivated_admin_is_denied() {
    let transport = CountingTransport::new(false);
    let client = ServiceClient::new(transport.clone());
    client
        .submit(
            ServiceKind::Auth,
            Request::new("register", json!({"telegram_id": "4004", "username": "barista"})),
        )
        .await
        .unwrap();
    client
        .submit(
            ServiceKind::Auth,
            Request::new("update_status", json!({"telegram_id": "4004", "is_active": false})),
        )
        .await
        .unwrap();

    assert!(!gate(&transport).is_privileged(4004, None).await);
}

#[tokio::test]
async fn test_outage_fails_closed() {
    let transport = CountingTransport::new(true);
    assert!(!gate(&transport).is_privileged(5005, None).await);
    assert_eq!(transport.count(), 1);

    // allow-lists still work while the auth service is down
    assert!(gate(&transport).is_privileged(1001, None).await);
    assert_eq!(transport.count(), 1);
}

#[test]
fn test_load_admin_vars_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"admin_telegram_ids": ["1001", 2002], "admin_usernames": ["owner"]}}"#
    )
    .unwrap();

    let vars = AdminVars::load(file.path()).unwrap();
    assert_eq!(vars.admin_telegram_ids, vec!["1001", "2002"]);
    assert_eq!(vars.admin_usernames, vec!["owner"]);
}

#[test]
fn test_admin_vars_without_admins_is_rejected() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{"admin_telegram_ids": [], "admin_usernames": []}}"#).unwrap();
    assert!(AdminVars::load(file.path()).is_err());
}

#[test]
fn test_admin_vars_missing_or_invalid() {
    assert!(AdminVars::load("/nonexistent/.vars.json").is_err());

    let mut file = NamedTempFile::new().unwrap();
    write!(file, "not json").unwrap();
    assert!(AdminVars::load(file.path()).is_err());
}
