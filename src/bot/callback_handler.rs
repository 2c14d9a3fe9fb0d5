//! Callback Handler module for inline keyboard presses

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::{debug, error};

use crate::controller::{EventKind, FrontController, InboundEvent};

use super::ui_builder::send_replies;
use super::user_ref;

pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    controller: Arc<FrontController>,
) -> Result<()> {
    debug!(user_id = %q.from.id, data = ?q.data, "Received callback query from user");

    // Answer first to stop the loading spinner
    if let Err(e) = bot.answer_callback_query(q.id.clone()).await {
        error!(user_id = %q.from.id, error = %e, "Failed to answer callback query");
    }

    let Some(data) = q.data.as_deref() else {
        return Ok(());
    };

    let chat_id = q
        .message
        .as_ref()
        .map(|msg| msg.chat().id)
        .unwrap_or_else(|| ChatId::from(q.from.id));

    let event = InboundEvent {
        user: user_ref(&q.from),
        kind: EventKind::from_button(data),
    };
    let replies = controller.handle(event).await;
    send_replies(&bot, chat_id, replies).await
}
