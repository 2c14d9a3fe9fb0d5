//! Auth service: admin identities and login sessions

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

use super::{message, run, to_data, NoPayload};
use crate::errors::ServiceError;
use crate::models::{Admin, AdminSession};
use crate::rpc::{Action, Dispatcher, Request, Response};
use crate::validation::{sanitize_input, validate_not_empty};

/// Lifetime of a login session
pub const SESSION_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ByTelegramId {
    #[serde(default)]
    pub telegram_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ByToken {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterAdmin {
    #[serde(default)]
    pub telegram_id: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateStatus {
    #[serde(default)]
    pub telegram_id: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "snake_case")]
pub enum AuthAction {
    Verify(ByTelegramId),
    Login(ByTelegramId),
    Logout(ByToken),
    List(NoPayload),
    Register(RegisterAdmin),
    UpdateStatus(UpdateStatus),
    VerifySession(ByToken),
}

impl Action for AuthAction {
    const ACTIONS: &'static [&'static str] = &[
        "verify",
        "login",
        "logout",
        "list",
        "register",
        "update_status",
        "verify_session",
    ];
}

#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn find_admin(&self, telegram_id: &str) -> Result<Option<Admin>, ServiceError>;
    async fn find_admin_by_id(&self, id: i64) -> Result<Option<Admin>, ServiceError>;
    async fn list_admins(&self) -> Result<Vec<Admin>, ServiceError>;
    async fn create_admin(&self, telegram_id: &str, username: &str) -> Result<Admin, ServiceError>;
    async fn set_admin_active(
        &self,
        telegram_id: &str,
        is_active: bool,
    ) -> Result<bool, ServiceError>;
    async fn create_session(
        &self,
        admin_id: i64,
        token: &str,
        expires_at: chrono::DateTime<Utc>,
    ) -> Result<AdminSession, ServiceError>;
    async fn find_session(&self, token: &str) -> Result<Option<AdminSession>, ServiceError>;
    async fn delete_session(&self, token: &str) -> Result<bool, ServiceError>;
}

pub struct AuthService {
    repo: Arc<dyn AuthRepository>,
}

/// 32 random bytes, hex encoded
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

impl AuthService {
    pub fn new(repo: Arc<dyn AuthRepository>) -> Self {
        Self { repo }
    }

    /// An admin that exists and is active
    async fn active_admin(&self, telegram_id: &str) -> Result<Admin, ServiceError> {
        let telegram_id = validate_not_empty(telegram_id, "Telegram ID")?;
        let admin = self
            .repo
            .find_admin(&telegram_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Admin"))?;
        if !admin.is_active {
            return Err(ServiceError::Unauthorized);
        }
        Ok(admin)
    }

    async fn handle(&self, action: AuthAction) -> Result<Value, ServiceError> {
        match action {
            AuthAction::Verify(ByTelegramId { telegram_id }) => {
                let admin = self.active_admin(&telegram_id).await?;
                Ok(json!({ "is_admin": true, "admin": admin }))
            }
            AuthAction::Login(ByTelegramId { telegram_id }) => {
                let admin = self.active_admin(&telegram_id).await?;
                let expires_at = Utc::now() + Duration::hours(SESSION_TTL_HOURS);
                let session = self
                    .repo
                    .create_session(admin.id, &generate_token(), expires_at)
                    .await?;
                info!(admin_id = admin.id, "Admin logged in");
                Ok(json!({ "admin": admin, "session": session }))
            }
            AuthAction::Logout(ByToken { token }) => {
                let token = validate_not_empty(&token, "Token")?;
                if !self.repo.delete_session(&token).await? {
                    return Err(ServiceError::not_found("Session"));
                }
                Ok(message("Logged out"))
            }
            AuthAction::List(_) => {
                let admins = self.repo.list_admins().await?;
                to_data("admins", &admins)
            }
            AuthAction::Register(RegisterAdmin {
                telegram_id,
                username,
            }) => {
                let telegram_id = validate_not_empty(&telegram_id, "Telegram ID")?;
                if self.repo.find_admin(&telegram_id).await?.is_some() {
                    return Err(ServiceError::Duplicate(
                        "Admin with this Telegram ID already exists".to_string(),
                    ));
                }
                let admin = self
                    .repo
                    .create_admin(&telegram_id, &sanitize_input(&username))
                    .await?;
                info!(telegram_id = %admin.telegram_id, "Admin registered");
                to_data("admin", &admin)
            }
            AuthAction::UpdateStatus(UpdateStatus {
                telegram_id,
                is_active,
            }) => {
                let telegram_id = validate_not_empty(&telegram_id, "Telegram ID")?;
                if !self.repo.set_admin_active(&telegram_id, is_active).await? {
                    return Err(ServiceError::not_found("Admin"));
                }
                Ok(message("Admin status updated"))
            }
            AuthAction::VerifySession(ByToken { token }) => {
                let token = validate_not_empty(&token, "Token")?;
                let session = self
                    .repo
                    .find_session(&token)
                    .await?
                    .filter(|s| s.expires_at > Utc::now())
                    .ok_or(ServiceError::Unauthorized)?;
                let admin = self
                    .repo
                    .find_admin_by_id(session.admin_id)
                    .await?
                    .filter(|a| a.is_active)
                    .ok_or(ServiceError::Unauthorized)?;
                Ok(json!({ "valid": true, "admin": admin, "session": session }))
            }
        }
    }
}

#[async_trait]
impl Dispatcher for AuthService {
    async fn dispatch(&self, request: Request) -> Response {
        run::<AuthAction, _, _>("auth", request, |action| self.handle(action)).await
    }
}
