//! # In-Memory Storage Module
//!
//! Repository implementations that keep everything in process memory. Used by
//! tests and by `cafe-service` when no `DATABASE_URL` is configured. Data is
//! lost on restart.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::errors::ServiceError;
use crate::models::{
    Admin, AdminSession, CafeInfo, Category, Media, MenuFilter, MenuItem, NewMedia, NewMenuItem,
    NewPromo, Promo,
};
use crate::services::auth::AuthRepository;
use crate::services::info::InfoRepository;
use crate::services::media::MediaRepository;
use crate::services::menu::{CategoryRemoval, MenuRepository, DEFAULT_CATEGORIES};
use crate::services::promo::PromoRepository;

/// Rows keyed by id plus the next id to hand out
struct Table<T> {
    rows: BTreeMap<i64, T>,
    next_id: i64,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl<T> Table<T> {
    fn insert_with(&mut self, build: impl FnOnce(i64) -> T) -> &T {
        let id = self.next_id;
        self.next_id += 1;
        self.rows.entry(id).or_insert_with(|| build(id))
    }
}

#[derive(Default)]
pub struct InMemoryMenuRepository {
    menus: RwLock<Table<MenuItem>>,
    categories: RwLock<Table<Category>>,
}

fn has_category(categories: &Table<Category>, name: &str) -> bool {
    categories.rows.values().any(|c| c.name == name)
}

fn missing_category(name: &str) -> ServiceError {
    ServiceError::invalid(format!("Category '{name}' does not exist"))
}

// Lock order: categories before menus. Writes to menus hold the categories
// read lock so a category cannot vanish under a new row.
impl InMemoryMenuRepository {
    /// A catalog seeded with the default categories
    pub fn with_default_categories() -> Self {
        let mut categories = Table::default();
        let now = Utc::now();
        for name in DEFAULT_CATEGORIES {
            categories.insert_with(|id| Category {
                id,
                name: name.to_string(),
                created_at: now,
            });
        }
        Self {
            menus: RwLock::new(Table::default()),
            categories: RwLock::new(categories),
        }
    }
}

#[async_trait]
impl MenuRepository for InMemoryMenuRepository {
    async fn create_menu(&self, item: NewMenuItem) -> Result<MenuItem, ServiceError> {
        let now = Utc::now();
        let categories = self.categories.read().await;
        if !has_category(&categories, &item.category) {
            return Err(missing_category(&item.category));
        }
        let mut menus = self.menus.write().await;
        let created = menus.insert_with(|id| MenuItem {
            id,
            name: item.name,
            description: item.description,
            price: item.price,
            category: item.category,
            photo_url: item.photo_url,
            is_available: item.is_available,
            created_at: now,
            updated_at: now,
        });
        Ok(created.clone())
    }

    async fn get_menu(&self, id: i64) -> Result<Option<MenuItem>, ServiceError> {
        Ok(self.menus.read().await.rows.get(&id).cloned())
    }

    async fn update_menu(&self, item: &MenuItem) -> Result<bool, ServiceError> {
        let categories = self.categories.read().await;
        if !has_category(&categories, &item.category) {
            return Err(missing_category(&item.category));
        }
        let mut menus = self.menus.write().await;
        match menus.rows.get_mut(&item.id) {
            Some(row) => {
                *row = MenuItem {
                    updated_at: Utc::now(),
                    ..item.clone()
                };
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_menu(&self, id: i64) -> Result<bool, ServiceError> {
        Ok(self.menus.write().await.rows.remove(&id).is_some())
    }

    async fn list_menus(&self, filter: &MenuFilter) -> Result<Vec<MenuItem>, ServiceError> {
        let menus = self.menus.read().await;
        let mut items: Vec<MenuItem> = menus
            .rows
            .values()
            .filter(|m| filter.category.as_deref().map_or(true, |c| m.category == c))
            .filter(|m| !filter.available_only || m.is_available)
            .cloned()
            .collect();
        items.sort_by(|a, b| a.category.cmp(&b.category).then_with(|| a.name.cmp(&b.name)));
        Ok(items)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, ServiceError> {
        let mut categories: Vec<Category> =
            self.categories.read().await.rows.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn category_exists(&self, name: &str) -> Result<bool, ServiceError> {
        Ok(has_category(&*self.categories.read().await, name))
    }

    async fn create_category(&self, name: &str) -> Result<Category, ServiceError> {
        let mut categories = self.categories.write().await;
        if has_category(&categories, name) {
            return Err(ServiceError::Duplicate(format!(
                "Category '{name}' already exists"
            )));
        }
        let created = categories.insert_with(|id| Category {
            id,
            name: name.to_string(),
            created_at: Utc::now(),
        });
        Ok(created.clone())
    }

    async fn delete_category_if_unused(
        &self,
        name: &str,
    ) -> Result<CategoryRemoval, ServiceError> {
        let mut categories = self.categories.write().await;
        let Some(id) = categories
            .rows
            .values()
            .find(|c| c.name == name)
            .map(|c| c.id)
        else {
            return Ok(CategoryRemoval::NotFound);
        };
        if self.menus.read().await.rows.values().any(|m| m.category == name) {
            return Ok(CategoryRemoval::InUse);
        }
        categories.rows.remove(&id);
        Ok(CategoryRemoval::Deleted)
    }
}

#[derive(Default)]
pub struct InMemoryPromoRepository {
    promos: RwLock<Table<Promo>>,
}

#[async_trait]
impl PromoRepository for InMemoryPromoRepository {
    async fn create_promo(&self, promo: NewPromo) -> Result<Promo, ServiceError> {
        let now = Utc::now();
        let mut promos = self.promos.write().await;
        let created = promos.insert_with(|id| Promo {
            id,
            title: promo.title,
            description: promo.description,
            discount: promo.discount,
            discount_type: promo.discount_type,
            start_date: promo.start_date,
            end_date: promo.end_date,
            is_active: promo.is_active,
            created_at: now,
            updated_at: now,
        });
        Ok(created.clone())
    }

    async fn get_promo(&self, id: i64) -> Result<Option<Promo>, ServiceError> {
        Ok(self.promos.read().await.rows.get(&id).cloned())
    }

    async fn update_promo(&self, promo: &Promo) -> Result<bool, ServiceError> {
        let mut promos = self.promos.write().await;
        match promos.rows.get_mut(&promo.id) {
            Some(row) => {
                *row = Promo {
                    updated_at: Utc::now(),
                    ..promo.clone()
                };
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_promo(&self, id: i64) -> Result<bool, ServiceError> {
        Ok(self.promos.write().await.rows.remove(&id).is_some())
    }

    async fn list_promos(&self, active_only: bool) -> Result<Vec<Promo>, ServiceError> {
        let promos = self.promos.read().await;
        // newest first
        Ok(promos
            .rows
            .values()
            .rev()
            .filter(|p| !active_only || p.is_active)
            .cloned()
            .collect())
    }
}

pub struct InMemoryInfoRepository {
    info: RwLock<CafeInfo>,
}

/// The row a fresh installation starts with
pub fn default_cafe_info() -> CafeInfo {
    CafeInfo {
        id: 1,
        name: "Cafe".to_string(),
        address: "-".to_string(),
        phone: "-".to_string(),
        email: String::new(),
        opening_hour: "08:00".to_string(),
        closing_hour: "22:00".to_string(),
        description: String::new(),
        updated_at: Utc::now(),
    }
}

impl Default for InMemoryInfoRepository {
    fn default() -> Self {
        Self {
            info: RwLock::new(default_cafe_info()),
        }
    }
}

#[async_trait]
impl InfoRepository for InMemoryInfoRepository {
    async fn get_info(&self) -> Result<Option<CafeInfo>, ServiceError> {
        Ok(Some(self.info.read().await.clone()))
    }

    async fn update_info(&self, info: &CafeInfo) -> Result<(), ServiceError> {
        *self.info.write().await = CafeInfo {
            updated_at: Utc::now(),
            ..info.clone()
        };
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryMediaRepository {
    media: RwLock<Table<Media>>,
}

#[async_trait]
impl MediaRepository for InMemoryMediaRepository {
    async fn create_media(&self, media: NewMedia) -> Result<Media, ServiceError> {
        let mut table = self.media.write().await;
        let created = table.insert_with(|id| Media {
            id,
            file_name: media.file_name,
            file_url: media.file_url,
            file_type: media.file_type,
            entity_id: media.entity_id,
            entity_type: media.entity_type,
            created_at: Utc::now(),
        });
        Ok(created.clone())
    }

    async fn get_media(&self, id: i64) -> Result<Option<Media>, ServiceError> {
        Ok(self.media.read().await.rows.get(&id).cloned())
    }

    async fn list_media(
        &self,
        entity_id: i64,
        entity_type: &str,
    ) -> Result<Vec<Media>, ServiceError> {
        let table = self.media.read().await;
        Ok(table
            .rows
            .values()
            .filter(|m| m.entity_id == entity_id && m.entity_type == entity_type)
            .cloned()
            .collect())
    }

    async fn delete_media(&self, id: i64) -> Result<bool, ServiceError> {
        Ok(self.media.write().await.rows.remove(&id).is_some())
    }
}

#[derive(Default)]
pub struct InMemoryAuthRepository {
    admins: RwLock<Table<Admin>>,
    sessions: RwLock<Table<AdminSession>>,
}

#[async_trait]
impl AuthRepository for InMemoryAuthRepository {
    async fn find_admin(&self, telegram_id: &str) -> Result<Option<Admin>, ServiceError> {
        let admins = self.admins.read().await;
        Ok(admins
            .rows
            .values()
            .find(|a| a.telegram_id == telegram_id)
            .cloned())
    }

    async fn find_admin_by_id(&self, id: i64) -> Result<Option<Admin>, ServiceError> {
        Ok(self.admins.read().await.rows.get(&id).cloned())
    }

    async fn list_admins(&self) -> Result<Vec<Admin>, ServiceError> {
        Ok(self.admins.read().await.rows.values().cloned().collect())
    }

    async fn create_admin(&self, telegram_id: &str, username: &str) -> Result<Admin, ServiceError> {
        let mut admins = self.admins.write().await;
        if admins.rows.values().any(|a| a.telegram_id == telegram_id) {
            return Err(ServiceError::Duplicate(
                "Admin with this Telegram ID already exists".to_string(),
            ));
        }
        let created = admins.insert_with(|id| Admin {
            id,
            telegram_id: telegram_id.to_string(),
            username: username.to_string(),
            is_active: true,
            created_at: Utc::now(),
        });
        Ok(created.clone())
    }

    async fn set_admin_active(
        &self,
        telegram_id: &str,
        is_active: bool,
    ) -> Result<bool, ServiceError> {
        let mut admins = self.admins.write().await;
        match admins.rows.values_mut().find(|a| a.telegram_id == telegram_id) {
            Some(admin) => {
                admin.is_active = is_active;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_session(
        &self,
        admin_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<AdminSession, ServiceError> {
        let mut sessions = self.sessions.write().await;
        let created = sessions.insert_with(|id| AdminSession {
            id,
            admin_id,
            token: token.to_string(),
            expires_at,
            created_at: Utc::now(),
        });
        Ok(created.clone())
    }

    async fn find_session(&self, token: &str) -> Result<Option<AdminSession>, ServiceError> {
        let sessions = self.sessions.read().await;
        Ok(sessions.rows.values().find(|s| s.token == token).cloned())
    }

    async fn delete_session(&self, token: &str) -> Result<bool, ServiceError> {
        let mut sessions = self.sessions.write().await;
        let id = sessions
            .rows
            .values()
            .find(|s| s.token == token)
            .map(|s| s.id);
        Ok(id.and_then(|id| sessions.rows.remove(&id)).is_some())
    }
}
