//! # Database Module
//!
//! PostgreSQL storage for the backend services, built on `sqlx`. Every
//! repository trait from [`crate::services`] has a `Pg*` implementation here
//! sharing one [`PgPool`].

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use tracing::{debug, info};

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
use crate::validation::validate_discount_type;

/// Connect to PostgreSQL
pub async fn connect(database_url: &str) -> Result<PgPool> {
    PgPool::connect(database_url)
        .await
        .context("Failed to connect to database")
}

/// Create every table the services use and seed the default rows
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS categories (
            id BIGSERIAL PRIMARY KEY,
            name VARCHAR(100) NOT NULL UNIQUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create categories table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS menus (
            id BIGSERIAL PRIMARY KEY,
            name VARCHAR(100) NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            price BIGINT NOT NULL CHECK (price >= 0),
            category VARCHAR(100) NOT NULL REFERENCES categories(name) ON UPDATE CASCADE,
            photo_url TEXT,
            is_available BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create menus table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS promos (
            id BIGSERIAL PRIMARY KEY,
            title VARCHAR(100) NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            discount BIGINT NOT NULL CHECK (discount >= 0),
            discount_type VARCHAR(20) NOT NULL CHECK (discount_type IN ('percentage', 'amount')),
            start_date DATE NOT NULL,
            end_date DATE NOT NULL,
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create promos table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS cafe_info (
            id BIGINT PRIMARY KEY,
            name VARCHAR(100) NOT NULL,
            address TEXT NOT NULL,
            phone VARCHAR(30) NOT NULL,
            email VARCHAR(100) NOT NULL DEFAULT '',
            opening_hour VARCHAR(10) NOT NULL,
            closing_hour VARCHAR(10) NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            updated_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create cafe_info table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS admins (
            id BIGSERIAL PRIMARY KEY,
            telegram_id VARCHAR(50) NOT NULL UNIQUE,
            username VARCHAR(100) NOT NULL DEFAULT '',
            is_active BOOLEAN NOT NULL DEFAULT TRUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create admins table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS admin_sessions (
            id BIGSERIAL PRIMARY KEY,
            admin_id BIGINT NOT NULL REFERENCES admins(id) ON DELETE CASCADE,
            token VARCHAR(64) NOT NULL UNIQUE,
            expires_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create admin_sessions table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS media (
            id BIGSERIAL PRIMARY KEY,
            file_name VARCHAR(255) NOT NULL,
            file_url TEXT NOT NULL,
            file_type VARCHAR(50) NOT NULL DEFAULT '',
            entity_id BIGINT NOT NULL,
            entity_type VARCHAR(20) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create media table")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS media_entity_idx ON media(entity_type, entity_id)")
        .execute(pool)
        .await
        .context("Failed to create media index")?;

    for name in DEFAULT_CATEGORIES {
        sqlx::query("INSERT INTO categories (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(*name)
            .execute(pool)
            .await
            .with_context(|| format!("Failed to seed category {name}"))?;
    }

    sqlx::query(
        "INSERT INTO cafe_info (id, name, address, phone, opening_hour, closing_hour)
         VALUES (1, 'Cafe', '-', '-', '08:00', '22:00')
         ON CONFLICT (id) DO NOTHING",
    )
    .execute(pool)
    .await
    .context("Failed to seed cafe_info")?;

    info!("Database schema initialized successfully");
    Ok(())
}

fn menu_from_row(row: &PgRow) -> Result<MenuItem, sqlx::Error> {
    Ok(MenuItem {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: row.try_get("price")?,
        category: row.try_get("category")?,
        photo_url: row.try_get("photo_url")?,
        is_available: row.try_get("is_available")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn category_from_row(row: &PgRow) -> Result<Category, sqlx::Error> {
    Ok(Category {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
    })
}

fn promo_from_row(row: &PgRow) -> Result<Promo, ServiceError> {
    let discount_type: String = row.try_get("discount_type")?;
    Ok(Promo {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        discount: row.try_get("discount")?,
        discount_type: validate_discount_type(&discount_type)
            .map_err(|_| ServiceError::Internal(format!("bad discount_type {discount_type}")))?,
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn info_from_row(row: &PgRow) -> Result<CafeInfo, sqlx::Error> {
    Ok(CafeInfo {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        address: row.try_get("address")?,
        phone: row.try_get("phone")?,
        email: row.try_get("email")?,
        opening_hour: row.try_get("opening_hour")?,
        closing_hour: row.try_get("closing_hour")?,
        description: row.try_get("description")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn admin_from_row(row: &PgRow) -> Result<Admin, sqlx::Error> {
    Ok(Admin {
        id: row.try_get("id")?,
        telegram_id: row.try_get("telegram_id")?,
        username: row.try_get("username")?,
        is_active: row.try_get("is_active")?,
        created_at: row.try_get("created_at")?,
    })
}

fn session_from_row(row: &PgRow) -> Result<AdminSession, sqlx::Error> {
    Ok(AdminSession {
        id: row.try_get("id")?,
        admin_id: row.try_get("admin_id")?,
        token: row.try_get("token")?,
        expires_at: row.try_get("expires_at")?,
        created_at: row.try_get("created_at")?,
    })
}

fn media_from_row(row: &PgRow) -> Result<Media, sqlx::Error> {
    Ok(Media {
        id: row.try_get("id")?,
        file_name: row.try_get("file_name")?,
        file_url: row.try_get("file_url")?,
        file_type: row.try_get("file_type")?,
        entity_id: row.try_get("entity_id")?,
        entity_type: row.try_get("entity_type")?,
        created_at: row.try_get("created_at")?,
    })
}

const MENU_COLUMNS: &str =
    "id, name, description, price, category, photo_url, is_available, created_at, updated_at";
const PROMO_COLUMNS: &str = "id, title, description, discount, discount_type, start_date, \
     end_date, is_active, created_at, updated_at";

pub struct PgMenuRepository {
    pool: PgPool,
}

impl PgMenuRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MenuRepository for PgMenuRepository {
    async fn create_menu(&self, item: NewMenuItem) -> Result<MenuItem, ServiceError> {
        let row = sqlx::query(&format!(
            "INSERT INTO menus (name, description, price, category, photo_url, is_available)
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {MENU_COLUMNS}"
        ))
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price)
        .bind(&item.category)
        .bind(&item.photo_url)
        .bind(item.is_available)
        .fetch_one(&self.pool)
        .await?;

        let menu = menu_from_row(&row)?;
        debug!(menu_id = menu.id, "Menu item inserted");
        Ok(menu)
    }

    async fn get_menu(&self, id: i64) -> Result<Option<MenuItem>, ServiceError> {
        let row = sqlx::query(&format!("SELECT {MENU_COLUMNS} FROM menus WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(menu_from_row).transpose()?)
    }

    async fn update_menu(&self, item: &MenuItem) -> Result<bool, ServiceError> {
        let result = sqlx::query(
            "UPDATE menus SET name = $1, description = $2, price = $3, category = $4,
             photo_url = $5, is_available = $6, updated_at = CURRENT_TIMESTAMP
             WHERE id = $7",
        )
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.price)
        .bind(&item.category)
        .bind(&item.photo_url)
        .bind(item.is_available)
        .bind(item.id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_menu(&self, id: i64) -> Result<bool, ServiceError> {
        let result = sqlx::query("DELETE FROM menus WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_menus(&self, filter: &MenuFilter) -> Result<Vec<MenuItem>, ServiceError> {
        let rows = sqlx::query(&format!(
            "SELECT {MENU_COLUMNS} FROM menus
             WHERE ($1::TEXT IS NULL OR category = $1) AND (NOT $2 OR is_available)
             ORDER BY category, name"
        ))
        .bind(&filter.category)
        .bind(filter.available_only)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(menu_from_row).collect::<Result<_, _>>()?)
    }

    async fn list_categories(&self) -> Result<Vec<Category>, ServiceError> {
        let rows = sqlx::query("SELECT id, name, created_at FROM categories ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(category_from_row).collect::<Result<_, _>>()?)
    }

    async fn category_exists(&self, name: &str) -> Result<bool, ServiceError> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM categories WHERE name = $1) AS found")
            .bind(name)
            .fetch_one(&self.pool)
            .await?;
        Ok(row.try_get("found")?)
    }

    async fn create_category(&self, name: &str) -> Result<Category, ServiceError> {
        let row = sqlx::query(
            "INSERT INTO categories (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(category_from_row(&row)?)
    }

    async fn delete_category_if_unused(
        &self,
        name: &str,
    ) -> Result<CategoryRemoval, ServiceError> {
        // the foreign key still rejects a row inserted concurrently
        let result = sqlx::query(
            "DELETE FROM categories
             WHERE name = $1 AND NOT EXISTS (SELECT 1 FROM menus WHERE category = $1)",
        )
        .bind(name)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() > 0 {
            return Ok(CategoryRemoval::Deleted);
        }
        if self.category_exists(name).await? {
            Ok(CategoryRemoval::InUse)
        } else {
            Ok(CategoryRemoval::NotFound)
        }
    }
}

pub struct PgPromoRepository {
    pool: PgPool,
}

impl PgPromoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PromoRepository for PgPromoRepository {
    async fn create_promo(&self, promo: NewPromo) -> Result<Promo, ServiceError> {
        let row = sqlx::query(&format!(
            "INSERT INTO promos
             (title, description, discount, discount_type, start_date, end_date, is_active)
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {PROMO_COLUMNS}"
        ))
        .bind(&promo.title)
        .bind(&promo.description)
        .bind(promo.discount)
        .bind(promo.discount_type.as_str())
        .bind(promo.start_date)
        .bind(promo.end_date)
        .bind(promo.is_active)
        .fetch_one(&self.pool)
        .await?;
        promo_from_row(&row)
    }

    async fn get_promo(&self, id: i64) -> Result<Option<Promo>, ServiceError> {
        let row = sqlx::query(&format!("SELECT {PROMO_COLUMNS} FROM promos WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(promo_from_row).transpose()
    }

    async fn update_promo(&self, promo: &Promo) -> Result<bool, ServiceError> {
        let result = sqlx::query(
            "UPDATE promos SET title = $1, description = $2, discount = $3, discount_type = $4,
             start_date = $5, end_date = $6, is_active = $7, updated_at = CURRENT_TIMESTAMP
             WHERE id = $8",
        )
        .bind(&promo.title)
        .bind(&promo.description)
        .bind(promo.discount)
        .bind(promo.discount_type.as_str())
        .bind(promo.start_date)
        .bind(promo.end_date)
        .bind(promo.is_active)
        .bind(promo.id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_promo(&self, id: i64) -> Result<bool, ServiceError> {
        let result = sqlx::query("DELETE FROM promos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_promos(&self, active_only: bool) -> Result<Vec<Promo>, ServiceError> {
        let rows = sqlx::query(&format!(
            "SELECT {PROMO_COLUMNS} FROM promos WHERE (NOT $1 OR is_active)
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(active_only)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(promo_from_row).collect()
    }
}

pub struct PgInfoRepository {
    pool: PgPool,
}

impl PgInfoRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InfoRepository for PgInfoRepository {
    async fn get_info(&self) -> Result<Option<CafeInfo>, ServiceError> {
        let row = sqlx::query(
            "SELECT id, name, address, phone, email, opening_hour, closing_hour, description,
             updated_at FROM cafe_info ORDER BY id LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(info_from_row).transpose()?)
    }

    async fn update_info(&self, info: &CafeInfo) -> Result<(), ServiceError> {
        sqlx::query(
            "UPDATE cafe_info SET name = $1, address = $2, phone = $3, email = $4,
             opening_hour = $5, closing_hour = $6, description = $7, updated_at = CURRENT_TIMESTAMP
             WHERE id = $8",
        )
        .bind(&info.name)
        .bind(&info.address)
        .bind(&info.phone)
        .bind(&info.email)
        .bind(&info.opening_hour)
        .bind(&info.closing_hour)
        .bind(&info.description)
        .bind(info.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

pub struct PgMediaRepository {
    pool: PgPool,
}

impl PgMediaRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MediaRepository for PgMediaRepository {
    async fn create_media(&self, media: NewMedia) -> Result<Media, ServiceError> {
        let row = sqlx::query(
            "INSERT INTO media (file_name, file_url, file_type, entity_id, entity_type)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING id, file_name, file_url, file_type, entity_id, entity_type, created_at",
        )
        .bind(&media.file_name)
        .bind(&media.file_url)
        .bind(&media.file_type)
        .bind(media.entity_id)
        .bind(&media.entity_type)
        .fetch_one(&self.pool)
        .await?;
        Ok(media_from_row(&row)?)
    }

    async fn get_media(&self, id: i64) -> Result<Option<Media>, ServiceError> {
        let row = sqlx::query(
            "SELECT id, file_name, file_url, file_type, entity_id, entity_type, created_at
             FROM media WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(media_from_row).transpose()?)
    }

    async fn list_media(
        &self,
        entity_id: i64,
        entity_type: &str,
    ) -> Result<Vec<Media>, ServiceError> {
        let rows = sqlx::query(
            "SELECT id, file_name, file_url, file_type, entity_id, entity_type, created_at
             FROM media WHERE entity_id = $1 AND entity_type = $2 ORDER BY id",
        )
        .bind(entity_id)
        .bind(entity_type)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(media_from_row).collect::<Result<_, _>>()?)
    }

    async fn delete_media(&self, id: i64) -> Result<bool, ServiceError> {
        let result = sqlx::query("DELETE FROM media WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

pub struct PgAuthRepository {
    pool: PgPool,
}

impl PgAuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthRepository for PgAuthRepository {
    async fn find_admin(&self, telegram_id: &str) -> Result<Option<Admin>, ServiceError> {
        let row = sqlx::query(
            "SELECT id, telegram_id, username, is_active, created_at
             FROM admins WHERE telegram_id = $1",
        )
        .bind(telegram_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(admin_from_row).transpose()?)
    }

    async fn find_admin_by_id(&self, id: i64) -> Result<Option<Admin>, ServiceError> {
        let row = sqlx::query(
            "SELECT id, telegram_id, username, is_active, created_at FROM admins WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(admin_from_row).transpose()?)
    }

    async fn list_admins(&self) -> Result<Vec<Admin>, ServiceError> {
        let rows = sqlx::query(
            "SELECT id, telegram_id, username, is_active, created_at FROM admins ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.iter().map(admin_from_row).collect::<Result<_, _>>()?)
    }

    async fn create_admin(&self, telegram_id: &str, username: &str) -> Result<Admin, ServiceError> {
        let row = sqlx::query(
            "INSERT INTO admins (telegram_id, username) VALUES ($1, $2)
             RETURNING id, telegram_id, username, is_active, created_at",
        )
        .bind(telegram_id)
        .bind(username)
        .fetch_one(&self.pool)
        .await?;
        Ok(admin_from_row(&row)?)
    }

    async fn set_admin_active(
        &self,
        telegram_id: &str,
        is_active: bool,
    ) -> Result<bool, ServiceError> {
        let result = sqlx::query("UPDATE admins SET is_active = $1 WHERE telegram_id = $2")
            .bind(is_active)
            .bind(telegram_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_session(
        &self,
        admin_id: i64,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<AdminSession, ServiceError> {
        let row = sqlx::query(
            "INSERT INTO admin_sessions (admin_id, token, expires_at) VALUES ($1, $2, $3)
             RETURNING id, admin_id, token, expires_at, created_at",
        )
        .bind(admin_id)
        .bind(token)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(session_from_row(&row)?)
    }

    async fn find_session(&self, token: &str) -> Result<Option<AdminSession>, ServiceError> {
        let row = sqlx::query(
            "SELECT id, admin_id, token, expires_at, created_at
             FROM admin_sessions WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(session_from_row).transpose()?)
    }

    async fn delete_session(&self, token: &str) -> Result<bool, ServiceError> {
        let result = sqlx::query("DELETE FROM admin_sessions WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
