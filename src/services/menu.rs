//! Menu service: menu items and their categories

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::{message, run, to_data, ById, NoPayload};
use crate::errors::ServiceError;
use crate::models::{Category, MenuFilter, MenuItem, NewMenuItem};
use crate::rpc::{Action, Dispatcher, Request, Response};
use crate::validation::{
    sanitize_input, validate_name, validate_not_empty, validate_photo_url, validate_price,
    NumericInput,
};

/// Categories every fresh catalog starts with
pub const DEFAULT_CATEGORIES: &[&str] = &["Coffee", "Food", "Drinks", "Snack"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateMenu {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: NumericInput,
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdateMenu {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<NumericInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_available: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListMenus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub available_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryName {
    #[serde(default)]
    pub name: String,
}

/// Actions understood by the menu service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "snake_case")]
pub enum MenuAction {
    Create(CreateMenu),
    Read(ById),
    Update(UpdateMenu),
    Delete(ById),
    List(ListMenus),
    ListCategories(NoPayload),
    CreateCategory(CategoryName),
    DeleteCategory(CategoryName),
}

impl Action for MenuAction {
    const ACTIONS: &'static [&'static str] = &[
        "create",
        "read",
        "update",
        "delete",
        "list",
        "list_categories",
        "create_category",
        "delete_category",
    ];
}

/// Outcome of removing a category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryRemoval {
    Deleted,
    NotFound,
    /// Menu items still reference it; nothing was removed
    InUse,
}

/// Storage needed by the menu service
#[async_trait]
pub trait MenuRepository: Send + Sync {
    async fn create_menu(&self, item: NewMenuItem) -> Result<MenuItem, ServiceError>;
    async fn get_menu(&self, id: i64) -> Result<Option<MenuItem>, ServiceError>;
    /// Returns false when no row with that id exists
    async fn update_menu(&self, item: &MenuItem) -> Result<bool, ServiceError>;
    async fn delete_menu(&self, id: i64) -> Result<bool, ServiceError>;
    async fn list_menus(&self, filter: &MenuFilter) -> Result<Vec<MenuItem>, ServiceError>;
    async fn list_categories(&self) -> Result<Vec<Category>, ServiceError>;
    async fn category_exists(&self, name: &str) -> Result<bool, ServiceError>;
    async fn create_category(&self, name: &str) -> Result<Category, ServiceError>;
    /// Checks for referencing menu items and deletes in one atomic step
    async fn delete_category_if_unused(&self, name: &str) -> Result<CategoryRemoval, ServiceError>;
}

pub struct MenuService {
    repo: Arc<dyn MenuRepository>,
}

impl MenuService {
    pub fn new(repo: Arc<dyn MenuRepository>) -> Self {
        Self { repo }
    }

    async fn handle(&self, action: MenuAction) -> Result<Value, ServiceError> {
        match action {
            MenuAction::Create(payload) => self.create_menu(payload).await,
            MenuAction::Read(ById { id }) => {
                let item = self.find_menu(id).await?;
                to_data("menu", &item)
            }
            MenuAction::Update(payload) => self.update_menu(payload).await,
            MenuAction::Delete(ById { id }) => {
                if !self.repo.delete_menu(id).await? {
                    return Err(ServiceError::not_found("Menu"));
                }
                Ok(message("Menu deleted"))
            }
            MenuAction::List(filter) => {
                let filter = MenuFilter {
                    category: filter.category.filter(|c| !c.trim().is_empty()),
                    available_only: filter.available_only,
                };
                let menus = self.repo.list_menus(&filter).await?;
                to_data("menus", &menus)
            }
            MenuAction::ListCategories(_) => {
                let categories = self.repo.list_categories().await?;
                to_data("categories", &categories)
            }
            MenuAction::CreateCategory(CategoryName { name }) => {
                let name = sanitize_input(&validate_name(&name, "Category name")?);
                let name = validate_not_empty(&name, "Category name")?;
                if self.repo.category_exists(&name).await? {
                    return Err(ServiceError::Duplicate(format!(
                        "Category '{name}' already exists"
                    )));
                }
                let category = self.repo.create_category(&name).await?;
                to_data("category", &category)
            }
            MenuAction::DeleteCategory(CategoryName { name }) => {
                let name = validate_not_empty(&name, "Category name")?;
                match self.repo.delete_category_if_unused(&name).await? {
                    CategoryRemoval::Deleted => Ok(message("Category deleted")),
                    CategoryRemoval::NotFound => Err(ServiceError::not_found("Category")),
                    CategoryRemoval::InUse => Err(ServiceError::invalid(
                        "Category still has menu items and cannot be deleted",
                    )),
                }
            }
        }
    }

    async fn find_menu(&self, id: i64) -> Result<MenuItem, ServiceError> {
        self.repo
            .get_menu(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Menu"))
    }

    async fn require_category(&self, name: &str) -> Result<(), ServiceError> {
        if !self.repo.category_exists(name).await? {
            return Err(ServiceError::invalid(format!(
                "Category '{name}' does not exist"
            )));
        }
        Ok(())
    }

    async fn create_menu(&self, payload: CreateMenu) -> Result<Value, ServiceError> {
        let name = validate_name(&payload.name, "Menu name")?;
        let category = validate_not_empty(&payload.category, "Category")?;
        let price = validate_price(&payload.price)?;
        let photo_url = validate_photo_url(payload.photo_url.as_deref().unwrap_or(""))?;
        self.require_category(&category).await?;

        let item = self
            .repo
            .create_menu(NewMenuItem {
                name: sanitize_input(&name),
                description: sanitize_input(&payload.description),
                price,
                category,
                photo_url,
                is_available: payload.is_available.unwrap_or(true),
            })
            .await?;

        to_data("menu", &item)
    }

    async fn update_menu(&self, payload: UpdateMenu) -> Result<Value, ServiceError> {
        let mut item = self.find_menu(payload.id).await?;

        if let Some(name) = payload.name.filter(|n| !n.trim().is_empty()) {
            item.name = sanitize_input(&validate_name(&name, "Menu name")?);
        }
        if let Some(description) = payload.description {
            item.description = sanitize_input(&description);
        }
        if let Some(price) = payload.price {
            item.price = validate_price(&price)?;
        }
        if let Some(category) = payload.category.filter(|c| !c.trim().is_empty()) {
            let category = category.trim().to_string();
            self.require_category(&category).await?;
            item.category = category;
        }
        if let Some(photo_url) = payload.photo_url {
            item.photo_url = validate_photo_url(&photo_url)?;
        }
        if let Some(is_available) = payload.is_available {
            item.is_available = is_available;
        }

        if !self.repo.update_menu(&item).await? {
            return Err(ServiceError::not_found("Menu"));
        }
        let item = self.find_menu(item.id).await?;
        to_data("menu", &item)
    }
}

#[async_trait]
impl Dispatcher for MenuService {
    async fn dispatch(&self, request: Request) -> Response {
        run::<MenuAction, _, _>("menu", request, |action| self.handle(action)).await
    }
}
