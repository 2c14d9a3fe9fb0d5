//! Media service: files attached to menu items and promos

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::{message, run, to_data, ById};
use crate::errors::ServiceError;
use crate::models::{Media, NewMedia};
use crate::rpc::{Action, Dispatcher, Request, Response};
use crate::validation::{sanitize_input, validate_not_empty};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateMedia {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub file_url: String,
    #[serde(default)]
    pub file_type: String,
    #[serde(default)]
    pub entity_id: i64,
    #[serde(default)]
    pub entity_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListMedia {
    #[serde(default)]
    pub entity_id: i64,
    #[serde(default)]
    pub entity_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "snake_case")]
pub enum MediaAction {
    Create(CreateMedia),
    Read(ById),
    List(ListMedia),
    Delete(ById),
}

impl Action for MediaAction {
    const ACTIONS: &'static [&'static str] = &["create", "read", "list", "delete"];
}

#[async_trait]
pub trait MediaRepository: Send + Sync {
    async fn create_media(&self, media: NewMedia) -> Result<Media, ServiceError>;
    async fn get_media(&self, id: i64) -> Result<Option<Media>, ServiceError>;
    async fn list_media(
        &self,
        entity_id: i64,
        entity_type: &str,
    ) -> Result<Vec<Media>, ServiceError>;
    async fn delete_media(&self, id: i64) -> Result<bool, ServiceError>;
}

pub struct MediaService {
    repo: Arc<dyn MediaRepository>,
}

impl MediaService {
    pub fn new(repo: Arc<dyn MediaRepository>) -> Self {
        Self { repo }
    }

    async fn handle(&self, action: MediaAction) -> Result<Value, ServiceError> {
        match action {
            MediaAction::Create(payload) => {
                let file_name = validate_not_empty(&payload.file_name, "File name")?;
                let file_url = validate_not_empty(&payload.file_url, "File URL")?;
                let media = self
                    .repo
                    .create_media(NewMedia {
                        file_name: sanitize_input(&file_name),
                        file_url,
                        file_type: payload.file_type.trim().to_string(),
                        entity_id: payload.entity_id,
                        entity_type: payload.entity_type.trim().to_string(),
                    })
                    .await?;
                to_data("media", &media)
            }
            MediaAction::Read(ById { id }) => {
                let media = self
                    .repo
                    .get_media(id)
                    .await?
                    .ok_or_else(|| ServiceError::not_found("Media"))?;
                to_data("media", &media)
            }
            MediaAction::List(ListMedia {
                entity_id,
                entity_type,
            }) => {
                let medias = self.repo.list_media(entity_id, entity_type.trim()).await?;
                to_data("medias", &medias)
            }
            MediaAction::Delete(ById { id }) => {
                if !self.repo.delete_media(id).await? {
                    return Err(ServiceError::not_found("Media"));
                }
                Ok(message("Media deleted"))
            }
        }
    }
}

#[async_trait]
impl Dispatcher for MediaService {
    async fn dispatch(&self, request: Request) -> Response {
        run::<MediaAction, _, _>("media", request, |action| self.handle(action)).await
    }
}
