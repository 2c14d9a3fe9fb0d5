//! # Domain Models
//!
//! Entities owned by the backend services. The bot only ever sees them as
//! `data` inside a response envelope.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::validation::DiscountType;

/// A menu item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: i64,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A menu category; names are unique
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A promotional offer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Promo {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub discount: i64,
    pub discount_type: DiscountType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Café information, a single row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CafeInfo {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub phone: String,
    #[serde(default)]
    pub email: String,
    pub opening_hour: String,
    pub closing_hour: String,
    #[serde(default)]
    pub description: String,
    pub updated_at: DateTime<Utc>,
}

/// A registered administrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Admin {
    pub id: i64,
    pub telegram_id: String,
    pub username: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// An admin login session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminSession {
    pub id: i64,
    pub admin_id: i64,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A media file attached to a menu item or promo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub id: i64,
    pub file_name: String,
    pub file_url: String,
    #[serde(default)]
    pub file_type: String,
    pub entity_id: i64,
    pub entity_type: String,
    pub created_at: DateTime<Utc>,
}

/// Fields of a menu item before it has an id
#[derive(Debug, Clone, PartialEq)]
pub struct NewMenuItem {
    pub name: String,
    pub description: String,
    pub price: i64,
    pub category: String,
    pub photo_url: Option<String>,
    pub is_available: bool,
}

/// Fields of a promo before it has an id
#[derive(Debug, Clone, PartialEq)]
pub struct NewPromo {
    pub title: String,
    pub description: String,
    pub discount: i64,
    pub discount_type: DiscountType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
}

/// Fields of a media record before it has an id
#[derive(Debug, Clone, PartialEq)]
pub struct NewMedia {
    pub file_name: String,
    pub file_url: String,
    pub file_type: String,
    pub entity_id: i64,
    pub entity_type: String,
}

/// Filter for listing menu items
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MenuFilter {
    pub category: Option<String>,
    pub available_only: bool,
}
