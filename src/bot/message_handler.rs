//! Message Handler module for incoming Telegram messages

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::debug;

use crate::controller::{EventKind, FrontController, InboundEvent};
use crate::localization::t_lang;

use super::ui_builder::send_replies;
use super::user_ref;

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    controller: Arc<FrontController>,
) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        // channel posts and the like
        return Ok(());
    };

    let Some(text) = msg.text() else {
        debug!(user_id = %user.id, "Ignoring non-text message");
        let language_code = user.language_code.as_deref();
        bot.send_message(msg.chat.id, t_lang("default-reply", language_code))
            .await?;
        return Ok(());
    };

    debug!(user_id = %user.id, message_length = text.len(), "Received text message from user");

    let event = InboundEvent {
        user: user_ref(user),
        kind: EventKind::from_text(text),
    };
    let replies = controller.handle(event).await;
    send_replies(&bot, msg.chat.id, replies).await
}
