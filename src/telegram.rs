//! Telegram chat transport
//!
//! One chat is one conversation. Every text message is fed to the runtime
//! as a single action and the resulting messages are sent back in order.

use crate::runtime::{AvailabilityClient, ConversationRuntime, OutboundMessage, PincodeValidator};
use crate::state_machine::{ReplyOptions, QUERY_METHOD_DISTRICT, QUERY_METHOD_PINCODE};
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{ForceReply, KeyboardButton, KeyboardMarkup, KeyboardRemove, ReplyMarkup};

/// Keyboard to attach to a message, if any
pub fn reply_markup(options: &ReplyOptions) -> Option<ReplyMarkup> {
    match options {
        ReplyOptions::None => None,
        ReplyOptions::QueryMethods => {
            let row = vec![
                KeyboardButton::new(QUERY_METHOD_DISTRICT),
                KeyboardButton::new(QUERY_METHOD_PINCODE),
            ];
            Some(ReplyMarkup::Keyboard(
                KeyboardMarkup::new(vec![row]).one_time_keyboard(),
            ))
        }
        ReplyOptions::Choices(choices) => {
            let rows = choices
                .iter()
                .map(|choice| vec![KeyboardButton::new(choice.clone())])
                .collect::<Vec<_>>();
            Some(ReplyMarkup::Keyboard(
                KeyboardMarkup::new(rows).one_time_keyboard(),
            ))
        }
        ReplyOptions::ForceReply => Some(ReplyMarkup::ForceReply(ForceReply::new())),
        ReplyOptions::Remove => Some(ReplyMarkup::KeyboardRemove(KeyboardRemove::new())),
    }
}

async fn deliver(bot: &Bot, chat_id: ChatId, message: OutboundMessage) {
    let request = bot.send_message(chat_id, message.text);
    let result = match reply_markup(&message.options) {
        Some(markup) => request.reply_markup(markup).await,
        None => request.await,
    };
    if let Err(e) = result {
        tracing::error!(chat_id = chat_id.0, error = %e, "Failed to send telegram message");
    }
}

/// Long-poll Telegram until interrupted
pub async fn run<V, Q>(token: String, runtime: Arc<ConversationRuntime<V, Q>>)
where
    V: PincodeValidator + 'static,
    Q: AvailabilityClient + 'static,
{
    let bot = Bot::new(token);

    let handler = Update::filter_message().endpoint(move |bot: Bot, msg: Message| {
        let runtime = runtime.clone();

        async move {
            let Some(text) = msg.text() else {
                return Ok::<(), teloxide::RequestError>(());
            };
            let chat_id = msg.chat.id;
            let user_name = msg.from.as_ref().map(|user| user.first_name.clone());

            let outcome = runtime
                .handle_input(&chat_id.0.to_string(), user_name, text)
                .await;
            tracing::debug!(
                chat_id = chat_id.0,
                state = outcome.state.name(),
                replies = outcome.messages.len(),
                "Telegram action handled"
            );

            for message in outcome.messages {
                deliver(&bot, chat_id, message).await;
            }
            Ok(())
        }
    });

    tracing::info!("Telegram transport started");
    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
    tracing::info!("Telegram transport stopped");
}
