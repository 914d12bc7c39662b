//! The daily fact payload and its retrieval.

use log::{error, info};
use serde_json::{Map, Value};

use crate::assistant::{Assistant, Reply};
use crate::openai::AssistantApi;

/// A fact as returned by the assistant: a JSON object with `title`, `fact`
/// and optionally `title_en`.
#[derive(Debug, Clone, PartialEq)]
pub struct Fact(Map<String, Value>);

impl Fact {
    /// Parse the assistant's raw reply. Anything but a JSON object is rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid JSON or not an object.
    pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw).map(Self)
    }

    fn string_field(&self, key: &str) -> &str {
        self.0.get(key).and_then(Value::as_str).unwrap_or_default()
    }

    pub fn title(&self) -> &str {
        self.string_field("title").trim()
    }

    pub fn text(&self) -> &str {
        self.string_field("fact").trim()
    }

    /// English title used as the photo query, only when it is a string.
    pub fn title_en(&self) -> Option<&str> {
        self.0.get("title_en").and_then(Value::as_str)
    }

    /// HTML message for Telegram: bold title, blank line, fact text.
    #[must_use]
    pub fn format_message(&self) -> String {
        format!("<b>{}</b>\n\n{}", self.title(), self.text())
    }
}

/// Ask the fact assistant for today's fact in a fresh thread.
///
/// Returns `None` when the exchange fails or the reply is not a JSON object;
/// the cause is logged. There is no retry.
pub async fn fetch_fact<A: AssistantApi>(
    assistant: &Assistant<A>,
    assistant_id: &str,
    prompt: &str,
) -> Option<Fact> {
    let exchange = match assistant.exchange(assistant_id, prompt, None).await {
        Ok(exchange) => exchange,
        Err(e) => {
            error!("Assistant exchange for daily fact failed: {e}");
            return None;
        }
    };

    let Reply::Text(text) = exchange.reply else {
        error!("No daily fact reply in thread {}", exchange.thread_id);
        return None;
    };

    match Fact::parse(&text) {
        Ok(fact) => {
            info!("Received fact '{}'", fact.title());
            Some(fact)
        }
        Err(e) => {
            error!("Failed to parse assistant daily fact JSON ({e}): {text}");
            None
        }
    }
}
