use std::{collections::HashMap, env, str::FromStr, time::Duration};

use log::{debug, info, warn};
use url::Url;

use crate::assistant::PollPolicy;
use crate::error::{BotError, Result};

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_REDIS_URL: &str = "redis://redis:6379/0";
const DEFAULT_SEND_TIME_HOUR: u32 = 13;
const DEFAULT_SEND_TIME_MINUTE: u32 = 0;
const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_RUN_TIMEOUT_SECS: u64 = 300;

/// Settings shared by every process that talks to the assistant service.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: Url,
    pub poll: PollPolicy,
}

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: i64,
}

/// Configuration of the daily fact process.
#[derive(Debug, Clone)]
pub struct FactConfig {
    pub openai: OpenAiConfig,
    pub telegram: TelegramConfig,
    pub assistant_id: String,
    pub prompt: String,
    pub unsplash_api_key: Option<String>,
    pub send_hour: u32,
    pub send_minute: u32,
}

/// Configuration of the mention listener process.
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    pub openai: OpenAiConfig,
    pub telegram: TelegramConfig,
    pub assistant_id: String,
    pub redis_url: String,
    pub triggers: Vec<String>,
    pub id_to_name: HashMap<u64, String>,
}

/// Reads variables through a lookup function, collecting every missing
/// required name instead of stopping at the first one.
struct EnvReader<F> {
    lookup: F,
    missing: Vec<&'static str>,
}

impl<F> EnvReader<F>
where
    F: Fn(&str) -> Option<String>,
{
    fn new(lookup: F) -> Self {
        Self {
            lookup,
            missing: Vec::new(),
        }
    }

    /// Empty and whitespace-only values count as absent.
    fn optional(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|value| !value.trim().is_empty())
    }

    fn required(&mut self, name: &'static str) -> String {
        self.optional(name).unwrap_or_else(|| {
            self.missing.push(name);
            String::new()
        })
    }

    fn parsed<T>(&self, name: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.optional(name) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e| BotError::Config(format!("{name} has invalid value '{raw}': {e}"))),
            None => Ok(default),
        }
    }

    fn openai(&mut self) -> Result<OpenAiConfig> {
        let api_key = self.required("OPENAI_API_KEY");
        let base_url = self
            .optional("OPENAI_BASE_URL")
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string());
        let interval_ms = self.parsed("RUN_POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?;
        let timeout_secs = self.parsed("RUN_TIMEOUT_SECS", DEFAULT_RUN_TIMEOUT_SECS)?;
        if interval_ms == 0 || timeout_secs == 0 {
            return Err(BotError::Config(
                "RUN_POLL_INTERVAL_MS and RUN_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }
        let poll = PollPolicy {
            interval: Duration::from_millis(interval_ms),
            timeout: Duration::from_secs(timeout_secs),
        };
        Ok(OpenAiConfig {
            api_key,
            base_url: Url::parse(&base_url)?,
            poll,
        })
    }

    fn telegram(&mut self) -> Result<TelegramConfig> {
        let bot_token = self.required("TELEGRAM_BOT_TOKEN");
        let chat_id = match self.optional("TELEGRAM_CHAT_ID") {
            Some(_) => self.parsed("TELEGRAM_CHAT_ID", 0)?,
            None => {
                self.missing.push("TELEGRAM_CHAT_ID");
                0
            }
        };
        Ok(TelegramConfig { bot_token, chat_id })
    }

    fn finish(self) -> Result<()> {
        if self.missing.is_empty() {
            Ok(())
        } else {
            Err(BotError::MissingConfig(self.missing))
        }
    }
}

impl FactConfig {
    pub fn from_env() -> Result<Self> {
        debug!("Loading daily fact configuration from environment");
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|name| env::var(name).ok())?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut env = EnvReader::new(lookup);
        let openai = env.openai()?;
        let telegram = env.telegram()?;
        let assistant_id = env.required("ASSISTANT_ID");
        let prompt = env.required("AGENT_PROMPT");
        let unsplash_api_key = env.optional("UNSPLASH_API_KEY");
        let send_hour = env.parsed("SEND_TIME_HOUR", DEFAULT_SEND_TIME_HOUR)?;
        let send_minute = env.parsed("SEND_TIME_MINUTE", DEFAULT_SEND_TIME_MINUTE)?;
        env.finish()?;

        if send_hour > 23 || send_minute > 59 {
            return Err(BotError::Config(format!(
                "send time {send_hour:02}:{send_minute:02} is not a valid time of day"
            )));
        }
        if unsplash_api_key.is_none() {
            warn!("UNSPLASH_API_KEY is not set, facts will be sent without photos");
        }

        debug!("Fact assistant: {assistant_id}");
        debug!("Daily prompt length: {} characters", prompt.len());

        Ok(Self {
            openai,
            telegram,
            assistant_id,
            prompt,
            unsplash_api_key,
            send_hour,
            send_minute,
        })
    }
}

impl ListenerConfig {
    pub fn from_env() -> Result<Self> {
        debug!("Loading listener configuration from environment");
        dotenvy::dotenv().ok();
        let config = Self::from_lookup(|name| env::var(name).ok())?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut env = EnvReader::new(lookup);
        let openai = env.openai()?;
        let telegram = env.telegram()?;
        let assistant_id = env.required("LISTENER_ASSISTANT_ID");
        let redis_url = env
            .optional("REDIS_URL")
            .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());
        let triggers = parse_triggers(env.optional("LISTENER_TRIGGERS").as_deref());
        let id_to_name = parse_id_to_name(env.optional("ID_TO_NAME").as_deref());
        env.finish()?;

        debug!("Listener assistant: {assistant_id}");
        debug!("{} trigger tokens, {} named users", triggers.len(), id_to_name.len());

        Ok(Self {
            openai,
            telegram,
            assistant_id,
            redis_url,
            triggers,
            id_to_name,
        })
    }
}

/// Parses comma-separated trigger tokens, lower-cased for case-insensitive matching.
pub fn parse_triggers(raw: Option<&str>) -> Vec<String> {
    let mut triggers: Vec<String> = raw
        .unwrap_or_default()
        .split(',')
        .map(|token| token.trim().to_lowercase())
        .filter(|token| !token.is_empty())
        .collect();
    triggers.sort();
    triggers.dedup();
    triggers
}

/// Parses `id:Name,id:Name`. Malformed pairs are skipped.
pub fn parse_id_to_name(raw: Option<&str>) -> HashMap<u64, String> {
    let mut mapping = HashMap::new();
    for pair in raw.unwrap_or_default().split(',') {
        let pair = pair.trim();
        let Some((id, name)) = pair.split_once(':') else {
            if !pair.is_empty() {
                warn!("Skipping malformed ID_TO_NAME entry '{pair}'");
            }
            continue;
        };
        match id.trim().parse::<u64>() {
            Ok(id) => {
                mapping.insert(id, name.to_string());
            }
            Err(_) => warn!("Skipping ID_TO_NAME entry with invalid user id '{pair}'"),
        }
    }
    mapping
}
