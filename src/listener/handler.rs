//! Per-user thread memory and replies for the mention listener.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::Mutex;

use crate::assistant::{Assistant, Reply};
use crate::error::Result;
use crate::openai::AssistantApi;
use crate::store::ThreadStore;

use super::trigger::{IncomingMessage, TriggerRules};

/// The author of an incoming message.
#[derive(Debug, Clone, Copy)]
pub struct ChatUser<'a> {
    pub id: u64,
    pub first_name: &'a str,
    pub username: Option<&'a str>,
}

pub struct Listener<A, S> {
    assistant: Assistant<A>,
    store: S,
    assistant_id: String,
    rules: TriggerRules,
    id_to_name: HashMap<u64, String>,
    /// One lock per user; held across thread resolution and the exchange so a
    /// user's thread never has two runs at once.
    user_locks: Mutex<HashMap<u64, Arc<Mutex<()>>>>,
}

impl<A: AssistantApi, S: ThreadStore> Listener<A, S> {
    pub fn new(
        assistant: Assistant<A>,
        store: S,
        assistant_id: String,
        rules: TriggerRules,
        id_to_name: HashMap<u64, String>,
    ) -> Self {
        Self {
            assistant,
            store,
            assistant_id,
            rules,
            id_to_name,
            user_locks: Mutex::default(),
        }
    }

    pub fn is_triggered(
        &self,
        message: &IncomingMessage<'_>,
        bot_id: u64,
        bot_username: &str,
    ) -> bool {
        self.rules.is_triggered(message, bot_id, bot_username)
    }

    /// Name the assistant should use for `user`: the configured name, else the
    /// first name, else the username.
    pub fn display_name(&self, user: &ChatUser<'_>) -> String {
        if let Some(name) = self.id_to_name.get(&user.id) {
            return name.clone();
        }
        [Some(user.first_name), user.username]
            .into_iter()
            .flatten()
            .find(|name| !name.trim().is_empty())
            .unwrap_or("user")
            .to_string()
    }

    async fn user_lock(&self, user_id: u64) -> Arc<Mutex<()>> {
        let mut locks = self.user_locks.lock().await;
        Arc::clone(locks.entry(user_id).or_default())
    }

    /// Return the user's thread, creating and introducing it on first contact.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread store or the assistant service fails.
    pub async fn ensure_thread(&self, user: &ChatUser<'_>) -> Result<String> {
        let lock = self.user_lock(user.id).await;
        let _turn = lock.lock().await;
        self.resolve_thread(user).await
    }

    /// Caller must hold the user's lock.
    async fn resolve_thread(&self, user: &ChatUser<'_>) -> Result<String> {
        if let Some(thread_id) = self.store.get(user.id).await? {
            debug!("Reusing thread {thread_id} for user {}", user.id);
            return Ok(thread_id);
        }

        let thread_id = self.assistant.create_thread().await?;
        let name = self.display_name(user);
        let intro = format!(
            "All messages in this thread are written by {name}. Always address them as {name}."
        );
        // A thread is only stored once introduced; a failed introduction leaves
        // it unreferenced and the next message starts over.
        if let Err(e) = self.assistant.post_introduction(&thread_id, &intro).await {
            warn!("Abandoning thread {thread_id} for user {}: {e}", user.id);
            return Err(e);
        }
        self.store.set(user.id, &thread_id).await?;
        info!("New thread {thread_id} initialised for {name}");
        Ok(thread_id)
    }

    /// Relay `prompt` to the listener assistant in the user's thread.
    ///
    /// # Errors
    ///
    /// Returns an error if resolving the thread or the exchange fails.
    pub async fn ask(&self, user: &ChatUser<'_>, prompt: &str) -> Result<Reply> {
        let lock = self.user_lock(user.id).await;
        let _turn = lock.lock().await;
        let thread_id = self.resolve_thread(user).await?;
        let exchange = self
            .assistant
            .exchange(&self.assistant_id, prompt, Some(&thread_id))
            .await?;
        Ok(exchange.reply)
    }
}
