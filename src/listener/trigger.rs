//! Decides whether an incoming chat message addresses the bot.

/// The parts of a Telegram message needed for trigger detection.
#[derive(Debug, Clone, Copy)]
pub struct IncomingMessage<'a> {
    pub chat_id: i64,
    pub text: &'a str,
    /// Sender of the message this one replies to, if any
    pub reply_to_sender: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct TriggerRules {
    chat_id: i64,
    /// Lower-cased tokens
    tokens: Vec<String>,
}

impl TriggerRules {
    pub fn new(chat_id: i64, tokens: Vec<String>) -> Self {
        let tokens = tokens.into_iter().map(|t| t.to_lowercase()).collect();
        Self { chat_id, tokens }
    }

    /// True when the message is in the configured chat and either contains a
    /// trigger token, mentions `@bot_username`, or replies to the bot.
    pub fn is_triggered(
        &self,
        message: &IncomingMessage<'_>,
        bot_id: u64,
        bot_username: &str,
    ) -> bool {
        if message.chat_id != self.chat_id {
            return false;
        }

        let text = message.text.to_lowercase();
        let by_word = self.tokens.iter().any(|token| text.contains(token.as_str()));
        let by_mention = !bot_username.is_empty()
            && text.contains(&format!("@{}", bot_username.to_lowercase()));
        let by_reply = message.reply_to_sender == Some(bot_id);

        by_word || by_mention || by_reply
    }
}
