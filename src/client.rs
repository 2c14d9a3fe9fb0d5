//! # RPC Client Module
//!
//! How the bot reaches the backend services. An [`RpcTransport`] moves one
//! envelope to one service and back; [`ServiceClient`] wraps a transport with
//! typed calls so callers never assemble payloads by hand.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::errors::RpcError;
use crate::memory::{
    InMemoryAuthRepository, InMemoryInfoRepository, InMemoryMediaRepository,
    InMemoryMenuRepository, InMemoryPromoRepository,
};
use crate::models::{CafeInfo, Category, MenuItem, Promo};
use crate::rpc::{Action, Dispatcher, Request, Response, ServiceKind};
use crate::services::auth::{AuthAction, ByTelegramId};
use crate::services::info::InfoAction;
use crate::services::menu::{CategoryName, CreateMenu, ListMenus, MenuAction};
use crate::services::promo::{CreatePromo, ListPromos, PromoAction};
use crate::services::{
    AuthService, ById, InfoService, MediaService, MenuService, NoPayload, PromoService,
};

/// Moves one envelope to a service and returns its answer
///
/// `Err` means the service never produced an envelope; a failed envelope is
/// still `Ok`.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn call(&self, service: ServiceKind, request: Request) -> Result<Response, RpcError>;
}

/// JSON over HTTP, one POST per call
pub struct HttpTransport {
    client: reqwest::Client,
    urls: HashMap<ServiceKind, String>,
}

impl HttpTransport {
    pub fn new(urls: HashMap<ServiceKind, String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, urls })
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn call(&self, service: ServiceKind, request: Request) -> Result<Response, RpcError> {
        let url = self
            .urls
            .get(&service)
            .ok_or_else(|| RpcError::Unavailable(format!("no URL configured for {service}")))?;

        debug!(%service, action = %request.action, "Calling service");

        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(%service, error = %e, "Service call failed");
                RpcError::Unavailable(e.to_string())
            })?;

        response.json::<Response>().await.map_err(|e| {
            warn!(%service, error = %e, "Service answered with an undecodable body");
            RpcError::Unavailable(e.to_string())
        })
    }
}

/// Calls dispatchers living in the same process
#[derive(Default, Clone)]
pub struct LocalTransport {
    dispatchers: HashMap<ServiceKind, Arc<dyn Dispatcher>>,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, service: ServiceKind, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatchers.insert(service, dispatcher);
        self
    }

    /// Every service, each on a fresh in-memory store
    pub fn in_memory() -> Self {
        Self::new()
            .with(
                ServiceKind::Auth,
                Arc::new(AuthService::new(Arc::new(InMemoryAuthRepository::default()))),
            )
            .with(
                ServiceKind::Menu,
                Arc::new(MenuService::new(Arc::new(
                    InMemoryMenuRepository::with_default_categories(),
                ))),
            )
            .with(
                ServiceKind::Promo,
                Arc::new(PromoService::new(Arc::new(InMemoryPromoRepository::default()))),
            )
            .with(
                ServiceKind::Info,
                Arc::new(InfoService::new(Arc::new(InMemoryInfoRepository::default()))),
            )
            .with(
                ServiceKind::Media,
                Arc::new(MediaService::new(Arc::new(InMemoryMediaRepository::default()))),
            )
    }
}

#[async_trait]
impl RpcTransport for LocalTransport {
    async fn call(&self, service: ServiceKind, request: Request) -> Result<Response, RpcError> {
        let dispatcher = self
            .dispatchers
            .get(&service)
            .ok_or_else(|| RpcError::Unavailable(format!("{service} service is not registered")))?;
        Ok(dispatcher.dispatch(request).await)
    }
}

/// Pull `data[key]` out as `T`
fn extract<T: DeserializeOwned>(mut data: Value, key: &str) -> Result<T, RpcError> {
    let value = data
        .get_mut(key)
        .map(Value::take)
        .ok_or_else(|| RpcError::Malformed(format!("missing `{key}`")))?;
    serde_json::from_value(value).map_err(|e| RpcError::Malformed(format!("`{key}`: {e}")))
}

/// Typed access to every backend service
#[derive(Clone)]
pub struct ServiceClient {
    transport: Arc<dyn RpcTransport>,
}

impl ServiceClient {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    /// Send a raw envelope, returning `data` on success
    pub async fn submit(&self, service: ServiceKind, request: Request) -> Result<Value, RpcError> {
        self.transport.call(service, request).await?.into_result()
    }

    async fn call<A: Action + Sync>(
        &self,
        service: ServiceKind,
        action: &A,
    ) -> Result<Value, RpcError> {
        let request =
            Request::from_action(action).map_err(|e| RpcError::Malformed(e.to_string()))?;
        self.submit(service, request).await
    }

    /// Ask the auth service whether `telegram_id` is an active admin
    pub async fn verify_admin(&self, telegram_id: &str) -> Result<bool, RpcError> {
        let action = AuthAction::Verify(ByTelegramId {
            telegram_id: telegram_id.to_string(),
        });
        let data = self.call(ServiceKind::Auth, &action).await?;
        Ok(data.get("is_admin").and_then(Value::as_bool).unwrap_or(false))
    }

    pub async fn list_menus(&self, category: Option<&str>) -> Result<Vec<MenuItem>, RpcError> {
        let action = MenuAction::List(ListMenus {
            category: category.map(str::to_string),
            available_only: false,
        });
        extract(self.call(ServiceKind::Menu, &action).await?, "menus")
    }

    pub async fn get_menu(&self, id: i64) -> Result<MenuItem, RpcError> {
        let action = MenuAction::Read(ById { id });
        extract(self.call(ServiceKind::Menu, &action).await?, "menu")
    }

    pub async fn create_menu(&self, payload: CreateMenu) -> Result<MenuItem, RpcError> {
        let action = MenuAction::Create(payload);
        extract(self.call(ServiceKind::Menu, &action).await?, "menu")
    }

    pub async fn delete_menu(&self, id: i64) -> Result<(), RpcError> {
        self.call(ServiceKind::Menu, &MenuAction::Delete(ById { id }))
            .await
            .map(|_| ())
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, RpcError> {
        let action = MenuAction::ListCategories(NoPayload {});
        extract(self.call(ServiceKind::Menu, &action).await?, "categories")
    }

    pub async fn create_category(&self, name: &str) -> Result<Category, RpcError> {
        let action = MenuAction::CreateCategory(CategoryName {
            name: name.to_string(),
        });
        extract(self.call(ServiceKind::Menu, &action).await?, "category")
    }

    pub async fn delete_category(&self, name: &str) -> Result<(), RpcError> {
        let action = MenuAction::DeleteCategory(CategoryName {
            name: name.to_string(),
        });
        self.call(ServiceKind::Menu, &action).await.map(|_| ())
    }

    pub async fn list_promos(&self, active_only: bool) -> Result<Vec<Promo>, RpcError> {
        let action = PromoAction::List(ListPromos { active_only });
        extract(self.call(ServiceKind::Promo, &action).await?, "promos")
    }

    pub async fn create_promo(&self, payload: CreatePromo) -> Result<Promo, RpcError> {
        let action = PromoAction::Create(payload);
        extract(self.call(ServiceKind::Promo, &action).await?, "promo")
    }

    pub async fn delete_promo(&self, id: i64) -> Result<(), RpcError> {
        self.call(ServiceKind::Promo, &PromoAction::Delete(ById { id }))
            .await
            .map(|_| ())
    }

    pub async fn cafe_info(&self) -> Result<CafeInfo, RpcError> {
        let action = InfoAction::Read(NoPayload {});
        extract(self.call(ServiceKind::Info, &action).await?, "info")
    }
}
