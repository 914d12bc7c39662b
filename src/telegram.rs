//! Telegram delivery to the configured chat.

use std::future::Future;

use log::{error, info};
use teloxide::prelude::*;
use teloxide::types::{InputFile, ParseMode};
use url::Url;

/// Delivers HTML-formatted messages to one chat.
///
/// Failures are logged by the implementation; callers only learn whether the
/// message went out.
pub trait ChatSender: Send + Sync {
    fn send_message(&self, text: &str) -> impl Future<Output = bool> + Send;

    fn send_photo(&self, photo_url: &str, caption: &str) -> impl Future<Output = bool> + Send;
}

#[derive(Debug, Clone)]
pub struct TelegramSender {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramSender {
    pub fn new(bot: Bot, chat_id: i64) -> Self {
        Self {
            bot,
            chat_id: ChatId(chat_id),
        }
    }
}

impl ChatSender for TelegramSender {
    async fn send_message(&self, text: &str) -> bool {
        match self
            .bot
            .send_message(self.chat_id, text)
            .parse_mode(ParseMode::Html)
            .await
        {
            Ok(_) => {
                info!("Message sent to Telegram chat {}", self.chat_id.0);
                true
            }
            Err(e) => {
                error!("Telegram API error (sendMessage): {e}");
                false
            }
        }
    }

    async fn send_photo(&self, photo_url: &str, caption: &str) -> bool {
        let url = match Url::parse(photo_url) {
            Ok(url) => url,
            Err(e) => {
                error!("Refusing to send photo with invalid URL '{photo_url}': {e}");
                return false;
            }
        };

        match self
            .bot
            .send_photo(self.chat_id, InputFile::url(url))
            .caption(caption)
            .parse_mode(ParseMode::Html)
            .await
        {
            Ok(_) => {
                info!("Photo sent to Telegram chat {}", self.chat_id.0);
                true
            }
            Err(e) => {
                error!("Telegram API error (sendPhoto): {e}");
                false
            }
        }
    }
}
