//! # Domain Validators
//!
//! Pure checks applied to a payload before any mutation. Each returns the
//! coerced value or an `InvalidInput` error; callers stop at the first failure.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ServiceError;

/// Date format accepted for promo ranges
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Longest name, title or category accepted, in characters
pub const MAX_NAME_LEN: usize = 100;

/// Substrings stripped from free text before persistence
pub const SANITIZE_DENYLIST: &[&str] = &[
    "--", ";", "/*", "*/", "xp_", "sp_", "DROP", "DELETE", "INSERT", "UPDATE", "EXEC",
];

lazy_static! {
    static ref PHOTO_URL_PATTERN: Regex =
        Regex::new(r"(?i)^https?://.*\.(jpg|jpeg|png|gif|webp)$").expect("valid photo URL regex");
}

/// A number as it may arrive in a payload: integer, float or numeric string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Integer(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for NumericInput {
    fn from(value: i64) -> Self {
        NumericInput::Integer(value)
    }
}

/// Kind of discount a promo grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Amount,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Amount => "amount",
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiscountType {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_discount_type(s)
    }
}

/// Require a non-blank value, returning it trimmed
pub fn validate_not_empty(value: &str, field: &str) -> Result<String, ServiceError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::invalid(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

/// Require a non-blank value of at most [`MAX_NAME_LEN`] characters
pub fn validate_name(value: &str, field: &str) -> Result<String, ServiceError> {
    let trimmed = validate_not_empty(value, field)?;
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(ServiceError::invalid(format!(
            "{field} must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(trimmed)
}

/// Coerce a price or discount into a non-negative integer
///
/// Floats are truncated toward zero; numeric strings must hold an integer.
pub fn validate_amount(value: &NumericInput, field: &str) -> Result<i64, ServiceError> {
    let negative = || ServiceError::invalid(format!("{field} must be a positive number"));

    match value {
        NumericInput::Integer(v) if *v < 0 => Err(negative()),
        NumericInput::Integer(v) => Ok(*v),
        NumericInput::Float(v) if !v.is_finite() => {
            Err(ServiceError::invalid(format!("{field} has an invalid format")))
        }
        NumericInput::Float(v) if *v < 0.0 => Err(negative()),
        // `as` saturates; 2^63 and above do not fit
        NumericInput::Float(v) if v.trunc() >= i64::MAX as f64 => {
            Err(ServiceError::invalid(format!("{field} has an invalid format")))
        }
        NumericInput::Float(v) => Ok(v.trunc() as i64),
        NumericInput::Text(s) => {
            let parsed: i64 = s
                .trim()
                .parse()
                .map_err(|_| ServiceError::invalid(format!("{field} must be a number")))?;
            if parsed < 0 {
                return Err(negative());
            }
            Ok(parsed)
        }
    }
}

/// Price of a menu item
pub fn validate_price(value: &NumericInput) -> Result<i64, ServiceError> {
    validate_amount(value, "Price")
}

/// Optional photo URL; empty means "no photo"
pub fn validate_photo_url(url: &str) -> Result<Option<String>, ServiceError> {
    let url = url.trim();
    if url.is_empty() {
        return Ok(None);
    }
    if !PHOTO_URL_PATTERN.is_match(url) {
        return Err(ServiceError::invalid("Photo URL is not valid"));
    }
    Ok(Some(url.to_string()))
}

pub fn validate_discount_type(value: &str) -> Result<DiscountType, ServiceError> {
    match value {
        "percentage" => Ok(DiscountType::Percentage),
        "amount" => Ok(DiscountType::Amount),
        _ => Err(ServiceError::invalid(
            "Discount type must be 'percentage' or 'amount'",
        )),
    }
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(value: &str, field: &str) -> Result<NaiveDate, ServiceError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| ServiceError::invalid(format!("{field} has an invalid format (YYYY-MM-DD)")))
}

/// End date may equal but never precede the start date
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), ServiceError> {
    if end < start {
        return Err(ServiceError::invalid("End date must not be before start date"));
    }
    Ok(())
}

/// Strip denylisted substrings, then trim
///
/// Storage access is parameterized regardless; this only keeps obviously
/// hostile fragments out of stored text.
pub fn sanitize_input(input: &str) -> String {
    let mut result = input.to_string();
    for fragment in SANITIZE_DENYLIST {
        result = result.replace(fragment, "");
    }
    result.trim().to_string()
}

/// Format a price the way the café displays it
pub fn format_price(price: i64) -> String {
    format!("Rp {price}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_empty() {
        assert_eq!(validate_not_empty("  Latte ", "Name").unwrap(), "Latte");
        let err = validate_not_empty("   ", "Name").unwrap_err();
        assert_eq!(err, ServiceError::invalid("Name must not be empty"));
    }

    #[test]
    fn test_price_coercion() {
        assert_eq!(validate_price(&NumericInput::Integer(15000)).unwrap(), 15000);
        assert_eq!(validate_price(&NumericInput::Float(12.9)).unwrap(), 12);
        assert_eq!(
            validate_price(&NumericInput::Text(" 20000 ".to_string())).unwrap(),
            20000
        );
        assert_eq!(validate_price(&NumericInput::Integer(0)).unwrap(), 0);
    }

    #[test]
    fn test_price_rejections() {
        assert!(validate_price(&NumericInput::Integer(-1)).is_err());
        assert!(validate_price(&NumericInput::Float(-0.5)).is_err());
        assert!(validate_price(&NumericInput::Text("-3".to_string())).is_err());
        assert!(validate_price(&NumericInput::Text("abc".to_string())).is_err());
        assert!(validate_price(&NumericInput::Text("12.5".to_string())).is_err());
        assert!(validate_price(&NumericInput::Float(1e300)).is_err());
        assert!(validate_price(&NumericInput::Float(9.3e18)).is_err());
        assert_eq!(validate_price(&NumericInput::Float(1e15)).unwrap(), 1_000_000_000_000_000);
    }

    #[test]
    fn test_name_length() {
        assert_eq!(validate_name(" Latte ", "Name").unwrap(), "Latte");
        assert!(validate_name(&"é".repeat(100), "Name").is_ok());
        let err = validate_name(&"a".repeat(101), "Name").unwrap_err();
        assert_eq!(err.code(), crate::errors::ErrorCode::InvalidInput);
        assert!(validate_name("  ", "Name").is_err());
    }

    #[test]
    fn test_numeric_input_deserialization() {
        let v: NumericInput = serde_json::from_str("15000").unwrap();
        assert_eq!(v, NumericInput::Integer(15000));
        let v: NumericInput = serde_json::from_str("15000.0").unwrap();
        assert_eq!(v, NumericInput::Float(15000.0));
        let v: NumericInput = serde_json::from_str("\"15000\"").unwrap();
        assert_eq!(v, NumericInput::Text("15000".to_string()));
        assert!(serde_json::from_str::<NumericInput>("true").is_err());
    }

    #[test]
    fn test_photo_url() {
        assert_eq!(validate_photo_url("").unwrap(), None);
        assert!(validate_photo_url("https://cdn.example.com/latte.jpg")
            .unwrap()
            .is_some());
        assert!(validate_photo_url("http://cdn.example.com/LATTE.PNG").is_ok());
        assert!(validate_photo_url("https://cdn.example.com/a.webp").is_ok());
        assert!(validate_photo_url("ftp://cdn.example.com/latte.jpg").is_err());
        assert!(validate_photo_url("https://cdn.example.com/latte.bmp").is_err());
        assert!(validate_photo_url("latte.jpg").is_err());
    }

    #[test]
    fn test_discount_type() {
        assert_eq!(
            validate_discount_type("percentage").unwrap(),
            DiscountType::Percentage
        );
        assert_eq!(validate_discount_type("amount").unwrap(), DiscountType::Amount);
        assert!(validate_discount_type("Percentage").is_err());
        assert!(validate_discount_type("free").is_err());
        assert_eq!(DiscountType::Amount.to_string(), "amount");
    }

    #[test]
    fn test_dates() {
        let start = parse_date("2025-03-01", "Start date").unwrap();
        let end = parse_date("2025-03-10", "End date").unwrap();
        assert!(validate_date_range(start, end).is_ok());
        assert!(validate_date_range(start, start).is_ok());
        assert!(validate_date_range(end, start).is_err());

        assert!(parse_date("01-03-2025", "Start date").is_err());
        assert!(parse_date("2025-02-30", "Start date").is_err());
        assert!(parse_date("tomorrow", "Start date").is_err());
    }

    #[test]
    fn test_sanitize_input() {
        assert_eq!(sanitize_input("Latte; DROP TABLE menus --"), "Latte  TABLE menus");
        assert_eq!(sanitize_input("  Iced /* tea */ "), "Iced  tea");
        assert_eq!(sanitize_input("Cappuccino"), "Cappuccino");
        // Denylist is case-sensitive
        assert_eq!(sanitize_input("drop shot"), "drop shot");
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(25000), "Rp 25000");
    }
}
