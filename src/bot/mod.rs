//! Bot module for handling Telegram interactions
//!
//! A thin adapter around [`crate::controller::FrontController`]:
//! - `message_handler`: turns text messages into controller events
//! - `callback_handler`: turns inline keyboard presses into controller events
//! - `ui_builder`: renders controller replies as Telegram messages

pub mod callback_handler;
pub mod message_handler;
pub mod ui_builder;

pub use callback_handler::callback_handler;
pub use message_handler::message_handler;

use teloxide::types::User;

use crate::controller::UserRef;

/// Identity of a Telegram user as the controller sees it
pub fn user_ref(user: &User) -> UserRef {
    UserRef {
        id: user.id.0 as i64,
        username: user.username.clone(),
        language_code: user.language_code.clone(),
    }
}
