//! UI Builder module for rendering controller replies

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use tracing::{debug, warn};

use crate::controller::{Button, Reply};

/// Telegram rejects callback data longer than this
pub const MAX_CALLBACK_DATA_BYTES: usize = 64;

/// Inline keyboard for a reply, `None` when it has no buttons
///
/// Buttons whose action does not fit in callback data are left out.
pub fn build_keyboard(rows: &[Vec<Button>]) -> Option<InlineKeyboardMarkup> {
    let keyboard: Vec<Vec<InlineKeyboardButton>> = rows
        .iter()
        .map(|row| {
            row.iter()
                .filter(|button| {
                    let fits = button.action.len() <= MAX_CALLBACK_DATA_BYTES;
                    if !fits {
                        warn!(
                            action = %button.action,
                            "Dropping button with oversized callback data"
                        );
                    }
                    fits
                })
                .map(|button| {
                    InlineKeyboardButton::callback(button.label.clone(), button.action.clone())
                })
                .collect::<Vec<_>>()
        })
        .filter(|row| !row.is_empty())
        .collect();

    if keyboard.is_empty() {
        None
    } else {
        Some(InlineKeyboardMarkup::new(keyboard))
    }
}

/// Send every reply, in order, to `chat_id`
pub async fn send_replies(bot: &Bot, chat_id: ChatId, replies: Vec<Reply>) -> Result<()> {
    debug!(chat_id = %chat_id, count = replies.len(), "Sending replies");

    for reply in replies {
        let request = bot.send_message(chat_id, reply.text);
        match build_keyboard(&reply.buttons) {
            Some(keyboard) => request.reply_markup(keyboard).await?,
            None => request.await?,
        };
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn button(action: &str) -> Button {
        Button {
            label: "label".to_string(),
            action: action.to_string(),
        }
    }

    #[test]
    fn test_no_buttons_no_keyboard() {
        assert!(build_keyboard(&[]).is_none());
    }

    #[test]
    fn test_oversized_callback_data_is_dropped() {
        let long = format!("delete_category:{}", "x".repeat(60));
        let keyboard = build_keyboard(&[vec![button(&long)], vec![button("back:admin")]]).unwrap();
        assert_eq!(keyboard.inline_keyboard.len(), 1);
    }
}
