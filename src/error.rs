use std::time::Duration;

use thiserror::Error;

use crate::types::RunStatus;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("Telegram error: {0}")]
    Telegram(Box<teloxide::RequestError>),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingConfig(Vec<&'static str>),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("OpenAI API error ({status}): {message}")]
    OpenAiApi {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("Unsplash API error ({status}): {message}")]
    UnsplashApi {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("Run {run_id} ended with status {status}")]
    RunFailed { run_id: String, status: RunStatus },

    #[error("Run {run_id} did not complete within {waited:?}")]
    RunTimeout { run_id: String, waited: Duration },

    #[error("HTTP request error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<teloxide::RequestError> for BotError {
    fn from(err: teloxide::RequestError) -> Self {
        BotError::Telegram(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
