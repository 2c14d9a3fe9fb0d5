//! Promo service

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

use super::{message, run, to_data, ById};
use crate::errors::ServiceError;
use crate::models::{NewPromo, Promo};
use crate::rpc::{Action, Dispatcher, Request, Response};
use crate::validation::{
    parse_date, sanitize_input, validate_amount, validate_date_range, validate_discount_type,
    validate_name, NumericInput,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatePromo {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub discount: NumericInput,
    #[serde(default)]
    pub discount_type: String,
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UpdatePromo {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<NumericInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListPromos {
    #[serde(default)]
    pub active_only: bool,
}

/// Actions understood by the promo service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "payload", rename_all = "snake_case")]
pub enum PromoAction {
    Create(CreatePromo),
    Read(ById),
    Update(UpdatePromo),
    Delete(ById),
    List(ListPromos),
}

impl Action for PromoAction {
    const ACTIONS: &'static [&'static str] = &["create", "read", "update", "delete", "list"];
}

#[async_trait]
pub trait PromoRepository: Send + Sync {
    async fn create_promo(&self, promo: NewPromo) -> Result<Promo, ServiceError>;
    async fn get_promo(&self, id: i64) -> Result<Option<Promo>, ServiceError>;
    async fn update_promo(&self, promo: &Promo) -> Result<bool, ServiceError>;
    async fn delete_promo(&self, id: i64) -> Result<bool, ServiceError>;
    async fn list_promos(&self, active_only: bool) -> Result<Vec<Promo>, ServiceError>;
}

pub struct PromoService {
    repo: Arc<dyn PromoRepository>,
}

impl PromoService {
    pub fn new(repo: Arc<dyn PromoRepository>) -> Self {
        Self { repo }
    }

    async fn handle(&self, action: PromoAction) -> Result<Value, ServiceError> {
        match action {
            PromoAction::Create(payload) => {
                let promo = self.repo.create_promo(validate_new_promo(&payload)?).await?;
                to_data("promo", &promo)
            }
            PromoAction::Read(ById { id }) => {
                let promo = self.find_promo(id).await?;
                to_data("promo", &promo)
            }
            PromoAction::Update(payload) => self.update_promo(payload).await,
            PromoAction::Delete(ById { id }) => {
                if !self.repo.delete_promo(id).await? {
                    return Err(ServiceError::not_found("Promo"));
                }
                Ok(message("Promo deleted"))
            }
            PromoAction::List(ListPromos { active_only }) => {
                let promos = self.repo.list_promos(active_only).await?;
                to_data("promos", &promos)
            }
        }
    }

    async fn find_promo(&self, id: i64) -> Result<Promo, ServiceError> {
        self.repo
            .get_promo(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Promo"))
    }

    async fn update_promo(&self, payload: UpdatePromo) -> Result<Value, ServiceError> {
        let mut promo = self.find_promo(payload.id).await?;

        if let Some(title) = payload.title.filter(|t| !t.trim().is_empty()) {
            promo.title = sanitize_input(&validate_name(&title, "Promo title")?);
        }
        if let Some(description) = payload.description {
            promo.description = sanitize_input(&description);
        }
        if let Some(discount) = payload.discount {
            promo.discount = validate_amount(&discount, "Discount")?;
        }
        if let Some(discount_type) = payload.discount_type.filter(|t| !t.is_empty()) {
            promo.discount_type = validate_discount_type(&discount_type)?;
        }
        if let Some(start) = payload.start_date.filter(|d| !d.is_empty()) {
            promo.start_date = parse_date(&start, "Start date")?;
        }
        if let Some(end) = payload.end_date.filter(|d| !d.is_empty()) {
            promo.end_date = parse_date(&end, "End date")?;
        }
        validate_date_range(promo.start_date, promo.end_date)?;
        if let Some(is_active) = payload.is_active {
            promo.is_active = is_active;
        }

        if !self.repo.update_promo(&promo).await? {
            return Err(ServiceError::not_found("Promo"));
        }
        let promo = self.find_promo(promo.id).await?;
        to_data("promo", &promo)
    }
}

/// Run every create-time validator, in payload order
pub fn validate_new_promo(payload: &CreatePromo) -> Result<NewPromo, ServiceError> {
    let title = validate_name(&payload.title, "Promo title")?;
    let discount = validate_amount(&payload.discount, "Discount")?;
    let discount_type = validate_discount_type(&payload.discount_type)?;
    let start_date = parse_date(&payload.start_date, "Start date")?;
    let end_date = parse_date(&payload.end_date, "End date")?;
    validate_date_range(start_date, end_date)?;

    Ok(NewPromo {
        title: sanitize_input(&title),
        description: sanitize_input(&payload.description),
        discount,
        discount_type,
        start_date,
        end_date,
        is_active: payload.is_active.unwrap_or(true),
    })
}

#[async_trait]
impl Dispatcher for PromoService {
    async fn dispatch(&self, request: Request) -> Response {
        run::<PromoAction, _, _>("promo", request, |action| self.handle(action)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::DiscountType;

    fn payload() -> CreatePromo {
        CreatePromo {
            title: "Happy Hour".to_string(),
            description: String::new(),
            discount: NumericInput::Integer(20),
            discount_type: "percentage".to_string(),
            start_date: "2025-03-01".to_string(),
            end_date: "2025-03-10".to_string(),
            is_active: None,
        }
    }

    #[test]
    fn test_validate_new_promo() {
        let promo = validate_new_promo(&payload()).unwrap();
        assert_eq!(promo.discount_type, DiscountType::Percentage);
        assert!(promo.is_active);
    }

    #[test]
    fn test_validate_new_promo_rejects_reversed_range() {
        let mut p = payload();
        p.start_date = "2025-03-10".to_string();
        p.end_date = "2025-03-01".to_string();
        let err = validate_new_promo(&p).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[test]
    fn test_validate_new_promo_rejects_unknown_type() {
        let mut p = payload();
        p.discount_type = "bogo".to_string();
        assert!(validate_new_promo(&p).is_err());
    }

    #[test]
    fn test_validate_new_promo_rejects_long_title() {
        let mut p = payload();
        p.title = "h".repeat(101);
        let err = validate_new_promo(&p).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }
}
