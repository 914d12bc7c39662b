//! Persistent mapping from Telegram user id to assistant thread id.

use std::future::Future;

use log::{debug, info};
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::error::Result;

const KEY_PREFIX: &str = "thread";

/// Key under which a user's thread id is stored.
#[must_use]
pub fn thread_key(user_id: u64) -> String {
    format!("{KEY_PREFIX}:{user_id}")
}

/// User → thread persistence.
///
/// Keys are disjoint per user, so concurrent handlers need no coordination
/// beyond what the backing store provides for single operations.
pub trait ThreadStore: Send + Sync {
    fn get(&self, user_id: u64) -> impl Future<Output = Result<Option<String>>> + Send;

    /// Upsert without expiry. Last write wins.
    fn set(&self, user_id: u64, thread_id: &str) -> impl Future<Output = Result<()>> + Send;
}

/// Redis-backed thread store.
#[derive(Clone)]
pub struct RedisThreadStore {
    connection: ConnectionManager,
}

impl RedisThreadStore {
    /// Connect to Redis.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the server is unreachable.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        info!("Connected to Redis thread store");
        Ok(Self { connection })
    }
}

impl ThreadStore for RedisThreadStore {
    async fn get(&self, user_id: u64) -> Result<Option<String>> {
        let mut connection = self.connection.clone();
        let thread_id: Option<String> = connection.get(thread_key(user_id)).await?;
        debug!("Thread lookup for user {user_id}: {thread_id:?}");
        Ok(thread_id)
    }

    async fn set(&self, user_id: u64, thread_id: &str) -> Result<()> {
        let mut connection = self.connection.clone();
        let () = connection.set(thread_key(user_id), thread_id).await?;
        debug!("Stored thread {thread_id} for user {user_id}");
        Ok(())
    }
}
