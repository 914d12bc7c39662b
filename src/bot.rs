//! Process entry points: wire configuration into the components and run them.

use std::sync::Arc;

use log::{debug, info};
use teloxide::Bot;
use tokio::runtime::Handle;

use crate::assistant::Assistant;
use crate::config::{FactConfig, ListenerConfig, OpenAiConfig};
use crate::error::Result;
use crate::job::DailyFactJob;
use crate::listener::{self, Listener, TriggerRules};
use crate::openai::OpenAiClient;
use crate::scheduler::run_daily;
use crate::store::RedisThreadStore;
use crate::telegram::TelegramSender;
use crate::unsplash::UnsplashClient;

fn assistant(config: &OpenAiConfig) -> Assistant<OpenAiClient> {
    debug!("Initializing OpenAI client for {}", config.base_url);
    Assistant::new(
        OpenAiClient::new(config.api_key.clone(), config.base_url.clone()),
        config.poll,
    )
}

/// Run the daily fact scheduler until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if required configuration is missing or invalid.
pub async fn run_daily_facts() -> Result<()> {
    info!("Initializing daily fact bot");
    let config = FactConfig::from_env()?;

    let job = DailyFactJob::new(
        assistant(&config.openai),
        config.assistant_id.clone(),
        config.prompt.clone(),
        TelegramSender::new(Bot::new(&config.telegram.bot_token), config.telegram.chat_id),
        config.unsplash_api_key.clone().map(UnsplashClient::new),
    );

    info!(
        "Bot started. Facts will be sent daily at {:02}:{:02}.",
        config.send_hour, config.send_minute
    );

    let job = &job;
    tokio::select! {
        () = run_daily(config.send_hour, config.send_minute, move || async move {
            job.run().await;
        }) => {}
        () = shutdown_signal() => info!("Shutdown signal received, stopping scheduler"),
    }
    Ok(())
}

/// Run the mention listener, spawning message handlers on `runtime`.
///
/// # Errors
///
/// Returns an error if required configuration is missing or invalid, Redis
/// is unreachable, or the bot account cannot be fetched.
pub async fn run_listener(runtime: Handle) -> Result<()> {
    info!("Initializing mention listener");
    let config = ListenerConfig::from_env()?;

    let store = RedisThreadStore::connect(&config.redis_url).await?;
    let listener = Listener::new(
        assistant(&config.openai),
        store,
        config.assistant_id.clone(),
        TriggerRules::new(config.telegram.chat_id, config.triggers.clone()),
        config.id_to_name.clone(),
    );

    info!("Starting mention listener (assistant {})", config.assistant_id);
    listener::run(
        Bot::new(&config.telegram.bot_token),
        Arc::new(listener),
        runtime,
        shutdown_signal(),
    )
    .await
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
