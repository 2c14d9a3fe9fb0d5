//! Info service: the café's single information record

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::{run, to_data, NoPayload};
use crate::errors::ServiceError;
use crate::models::CafeInfo;
use crate::rpc::{Action, Dispatcher, Request, Response};
use crate::validation::sanitize_input;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening_hour: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_hour: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "snake_case")]
pub enum InfoAction {
    Read(NoPayload),
    Update(UpdateInfo),
}

impl Action for InfoAction {
    const ACTIONS: &'static [&'static str] = &["read", "update"];
}

#[async_trait]
pub trait InfoRepository: Send + Sync {
    async fn get_info(&self) -> Result<Option<CafeInfo>, ServiceError>;
    async fn update_info(&self, info: &CafeInfo) -> Result<(), ServiceError>;
}

pub struct InfoService {
    repo: Arc<dyn InfoRepository>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl InfoService {
    pub fn new(repo: Arc<dyn InfoRepository>) -> Self {
        Self { repo }
    }

    async fn current(&self) -> Result<CafeInfo, ServiceError> {
        self.repo
            .get_info()
            .await?
            .ok_or_else(|| ServiceError::not_found("Cafe information"))
    }

    async fn handle(&self, action: InfoAction) -> Result<Value, ServiceError> {
        match action {
            InfoAction::Read(_) => to_data("info", &self.current().await?),
            InfoAction::Update(update) => {
                let mut info = self.current().await?;

                // required columns ignore blank values, optional ones accept them
                if let Some(name) = non_blank(update.name) {
                    info.name = sanitize_input(&name);
                }
                if let Some(address) = non_blank(update.address) {
                    info.address = sanitize_input(&address);
                }
                if let Some(phone) = non_blank(update.phone) {
                    info.phone = sanitize_input(&phone);
                }
                if let Some(email) = update.email {
                    info.email = sanitize_input(&email);
                }
                if let Some(opening) = non_blank(update.opening_hour) {
                    info.opening_hour = opening.trim().to_string();
                }
                if let Some(closing) = non_blank(update.closing_hour) {
                    info.closing_hour = closing.trim().to_string();
                }
                if let Some(description) = update.description {
                    info.description = sanitize_input(&description);
                }

                self.repo.update_info(&info).await?;
                to_data("info", &self.current().await?)
            }
        }
    }
}

#[async_trait]
impl Dispatcher for InfoService {
    async fn dispatch(&self, request: Request) -> Response {
        run::<InfoAction, _, _>("info", request, |action| self.handle(action)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryInfoRepository;
    use serde_json::json;

    #[tokio::test]
    async fn test_read_and_partial_update() {
        let svc = InfoService::new(Arc::new(InMemoryInfoRepository::default()));

        let resp = svc.dispatch(Request::new("read", Value::Null)).await;
        assert!(resp.success);
        let original = resp.data.unwrap()["info"].clone();

        let resp = svc
            .dispatch(Request::new(
                "update",
                json!({ "phone": "0800111222", "name": "  " }),
            ))
            .await;
        assert!(resp.success);
        let info = &resp.data.unwrap()["info"];
        assert_eq!(info["phone"], "0800111222");
        assert_eq!(info["name"], original["name"]);
    }
}
