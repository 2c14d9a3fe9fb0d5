//! Data-entry dialogue module: the add-menu, add-promo and add-category flows.
//!
//! Every flow is a fixed chain of steps. Each step variant carries exactly the
//! fields collected so far, so a flow can only reach [`Submission`] once every
//! field it needs has been validated.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::services::menu::{CategoryName, CreateMenu};
use crate::services::promo::CreatePromo;
use crate::validation::{DiscountType, NumericInput, DATE_FORMAT, MAX_NAME_LEN};

/// Token accepted by optional free-text steps to leave the field empty
pub const SKIP_TOKEN: &str = "-";

/// Conversation state of one user
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum DialogueState {
    #[default]
    Idle,
    AddMenu(AddMenuStep),
    AddPromo(AddPromoStep),
    AddCategory(AddCategoryStep),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AddMenuStep {
    Name,
    Price {
        name: String,
    },
    Category {
        name: String,
        price: i64,
    },
    Description {
        name: String,
        price: i64,
        category: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AddPromoStep {
    Title,
    Description {
        title: String,
    },
    DiscountType {
        title: String,
        description: String,
    },
    Discount {
        title: String,
        description: String,
        discount_type: DiscountType,
    },
    StartDate {
        title: String,
        description: String,
        discount_type: DiscountType,
        discount: i64,
    },
    EndDate {
        title: String,
        description: String,
        discount_type: DiscountType,
        discount: i64,
        start_date: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum AddCategoryStep {
    Name,
}

/// A completed flow, ready for its single create call
#[derive(Clone, Debug, PartialEq)]
pub enum Submission {
    Menu(CreateMenu),
    Promo(CreatePromo),
    Category(CategoryName),
}

/// Outcome of feeding one message to a flow
#[derive(Clone, Debug, PartialEq)]
pub enum Transition {
    /// Input accepted, flow moves to this state
    Advance(DialogueState),
    /// Input rejected; state and fields stay as they were
    Reject(&'static str),
    /// Last step accepted, flow is complete
    Submit(Submission),
    /// No flow is running
    Unrecognized,
}

/// Validates a required name-like field
pub fn validate_name(input: &str) -> Result<String, &'static str> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err("empty");
    }

    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err("too_long");
    }

    Ok(trimmed.to_string())
}

/// Whole non-negative number, as typed in chat
pub fn parse_amount(input: &str) -> Result<i64, &'static str> {
    match input.trim().parse::<i64>() {
        Ok(value) if value >= 0 => Ok(value),
        _ => Err("invalid"),
    }
}

/// Optional free text; the skip token means empty
pub fn parse_optional_text(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed == SKIP_TOKEN {
        String::new()
    } else {
        trimmed.to_string()
    }
}

pub fn parse_discount_type(input: &str) -> Result<DiscountType, &'static str> {
    match input.trim().to_lowercase().as_str() {
        "percentage" => Ok(DiscountType::Percentage),
        "amount" => Ok(DiscountType::Amount),
        _ => Err("invalid"),
    }
}

/// Checks the `YYYY-MM-DD` shape; ordering is checked by the promo service
pub fn parse_date_text(input: &str) -> Result<String, &'static str> {
    let trimmed = input.trim();
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map(|_| trimmed.to_string())
        .map_err(|_| "invalid")
}

/// Message key for a rejected input at `state`
fn reject_key(state: &DialogueState, reason: &'static str) -> &'static str {
    match (state, reason) {
        (DialogueState::AddMenu(AddMenuStep::Name), "too_long") => "menu-name-too-long",
        (DialogueState::AddMenu(AddMenuStep::Name), _) => "menu-name-empty",
        (DialogueState::AddMenu(AddMenuStep::Price { .. }), _) => "menu-price-invalid",
        (DialogueState::AddMenu(AddMenuStep::Category { .. }), _) => "menu-category-empty",
        (DialogueState::AddPromo(AddPromoStep::Title), "too_long") => "promo-title-too-long",
        (DialogueState::AddPromo(AddPromoStep::Title), _) => "promo-title-empty",
        (DialogueState::AddPromo(AddPromoStep::DiscountType { .. }), _) => {
            "promo-discount-type-invalid"
        }
        (DialogueState::AddPromo(AddPromoStep::Discount { .. }), _) => "promo-discount-invalid",
        (DialogueState::AddPromo(AddPromoStep::StartDate { .. }), _)
        | (DialogueState::AddPromo(AddPromoStep::EndDate { .. }), _) => "promo-date-invalid",
        (DialogueState::AddCategory(_), "too_long") => "category-name-too-long",
        _ => "category-name-empty",
    }
}

/// Feed one text message to the flow in `state`
///
/// Pure: the caller decides what to do with the returned [`Transition`].
pub fn advance(state: &DialogueState, input: &str) -> Transition {
    let next = match state {
        DialogueState::Idle => return Transition::Unrecognized,
        DialogueState::AddMenu(step) => advance_menu(step, input),
        DialogueState::AddPromo(step) => advance_promo(step, input),
        DialogueState::AddCategory(AddCategoryStep::Name) => validate_name(input)
            .map(|name| Transition::Submit(Submission::Category(CategoryName { name }))),
    };

    next.unwrap_or_else(|reason| Transition::Reject(reject_key(state, reason)))
}

fn advance_menu(step: &AddMenuStep, input: &str) -> Result<Transition, &'static str> {
    let next = match step {
        AddMenuStep::Name => AddMenuStep::Price {
            name: validate_name(input)?,
        },
        AddMenuStep::Price { name } => AddMenuStep::Category {
            name: name.clone(),
            price: parse_amount(input)?,
        },
        AddMenuStep::Category { name, price } => AddMenuStep::Description {
            name: name.clone(),
            price: *price,
            category: validate_name(input)?,
        },
        AddMenuStep::Description {
            name,
            price,
            category,
        } => {
            return Ok(Transition::Submit(Submission::Menu(CreateMenu {
                name: name.clone(),
                description: parse_optional_text(input),
                price: NumericInput::Integer(*price),
                category: category.clone(),
                photo_url: None,
                is_available: None,
            })))
        }
    };
    Ok(Transition::Advance(DialogueState::AddMenu(next)))
}

fn advance_promo(step: &AddPromoStep, input: &str) -> Result<Transition, &'static str> {
    let next = match step {
        AddPromoStep::Title => AddPromoStep::Description {
            title: validate_name(input)?,
        },
        AddPromoStep::Description { title } => AddPromoStep::DiscountType {
            title: title.clone(),
            description: parse_optional_text(input),
        },
        AddPromoStep::DiscountType { title, description } => AddPromoStep::Discount {
            title: title.clone(),
            description: description.clone(),
            discount_type: parse_discount_type(input)?,
        },
        AddPromoStep::Discount {
            title,
            description,
            discount_type,
        } => AddPromoStep::StartDate {
            title: title.clone(),
            description: description.clone(),
            discount_type: *discount_type,
            discount: parse_amount(input)?,
        },
        AddPromoStep::StartDate {
            title,
            description,
            discount_type,
            discount,
        } => AddPromoStep::EndDate {
            title: title.clone(),
            description: description.clone(),
            discount_type: *discount_type,
            discount: *discount,
            start_date: parse_date_text(input)?,
        },
        AddPromoStep::EndDate {
            title,
            description,
            discount_type,
            discount,
            start_date,
        } => {
            return Ok(Transition::Submit(Submission::Promo(CreatePromo {
                title: title.clone(),
                description: description.clone(),
                discount: NumericInput::Integer(*discount),
                discount_type: discount_type.to_string(),
                start_date: start_date.clone(),
                end_date: parse_date_text(input)?,
                is_active: None,
            })))
        }
    };
    Ok(Transition::Advance(DialogueState::AddPromo(next)))
}

/// Message key asking for the input `state` waits for
pub fn prompt_key(state: &DialogueState) -> &'static str {
    match state {
        DialogueState::Idle => "help-message",
        DialogueState::AddMenu(step) => match step {
            AddMenuStep::Name => "menu-name-prompt",
            AddMenuStep::Price { .. } => "menu-price-prompt",
            AddMenuStep::Category { .. } => "menu-category-prompt",
            AddMenuStep::Description { .. } => "menu-description-prompt",
        },
        DialogueState::AddPromo(step) => match step {
            AddPromoStep::Title => "promo-title-prompt",
            AddPromoStep::Description { .. } => "promo-description-prompt",
            AddPromoStep::DiscountType { .. } => "promo-discount-type-prompt",
            AddPromoStep::Discount {
                discount_type: DiscountType::Percentage,
                ..
            } => "promo-discount-percentage-prompt",
            AddPromoStep::Discount { .. } => "promo-discount-amount-prompt",
            AddPromoStep::StartDate { .. } => "promo-start-date-prompt",
            AddPromoStep::EndDate { .. } => "promo-end-date-prompt",
        },
        DialogueState::AddCategory(_) => "category-name-prompt",
    }
}
