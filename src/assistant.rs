//! Request/response exchange with an assistant, including run polling.

use std::time::{Duration, Instant};

use log::{debug, error, warn};

use crate::error::{BotError, Result};
use crate::openai::{AssistantApi, ThreadMessage};
use crate::types::{MessageRole, RunStatus};

/// How often a run is polled and how long to wait before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(300),
        }
    }
}

/// What the assistant answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    /// The run completed without producing an assistant message
    NoReply,
}

impl Reply {
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Reply::Text(text) => Some(text),
            Reply::NoReply => None,
        }
    }
}

/// Result of one exchange: the reply and the thread it happened in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub reply: Reply,
    pub thread_id: String,
}

/// Client for single-prompt, single-reply exchanges with an assistant.
///
/// A thread must not be used by two exchanges at the same time; nothing here
/// guards against it.
#[derive(Debug)]
pub struct Assistant<A> {
    api: A,
    poll: PollPolicy,
}

impl<A: AssistantApi> Assistant<A> {
    pub fn new(api: A, poll: PollPolicy) -> Self {
        Self { api, poll }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Create an empty thread and return its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the assistant service request fails.
    pub async fn create_thread(&self) -> Result<String> {
        Ok(self.api.create_thread().await?.id)
    }

    /// Append an assistant-role message that sets context for later exchanges.
    ///
    /// # Errors
    ///
    /// Returns an error if the assistant service request fails.
    pub async fn post_introduction(&self, thread_id: &str, text: &str) -> Result<()> {
        self.api
            .create_message(thread_id, MessageRole::Assistant, text)
            .await?;
        Ok(())
    }

    /// Send `prompt` to `assistant_id` and wait for its answer.
    ///
    /// A new thread is created when `thread_id` is `None`; otherwise the given
    /// thread is reused and returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if any request fails, if the run stops without
    /// completing, or if it is still running after the poll timeout.
    pub async fn exchange(
        &self,
        assistant_id: &str,
        prompt: &str,
        thread_id: Option<&str>,
    ) -> Result<Exchange> {
        let thread_id = match thread_id {
            Some(id) => id.to_string(),
            None => {
                let id = self.create_thread().await?;
                debug!("Created new thread {id} for assistant {assistant_id}");
                id
            }
        };

        self.api
            .create_message(&thread_id, MessageRole::User, prompt)
            .await?;
        let run = self.api.create_run(&thread_id, assistant_id).await?;
        self.wait_for_completion(&thread_id, &run.id).await?;

        let messages = self.api.list_messages(&thread_id).await?;
        let reply = match select_reply(&messages, &run.id) {
            Some(text) => Reply::Text(text.to_string()),
            None => {
                error!("Assistant produced no reply in thread {thread_id}");
                Reply::NoReply
            }
        };

        Ok(Exchange { reply, thread_id })
    }

    async fn wait_for_completion(&self, thread_id: &str, run_id: &str) -> Result<()> {
        let started = Instant::now();
        loop {
            let run = self.api.retrieve_run(thread_id, run_id).await?;
            match run.status {
                RunStatus::Completed => {
                    debug!("Run {run_id} completed after {:?}", started.elapsed());
                    return Ok(());
                }
                status if status.is_terminal_failure() => {
                    warn!("Run {run_id} in thread {thread_id} stopped with status {status}");
                    return Err(BotError::RunFailed {
                        run_id: run_id.to_string(),
                        status,
                    });
                }
                status => debug!("Run {run_id} is {status}"),
            }

            let waited = started.elapsed();
            if waited >= self.poll.timeout {
                return Err(BotError::RunTimeout {
                    run_id: run_id.to_string(),
                    waited,
                });
            }
            tokio::time::sleep(self.poll.interval).await;
        }
    }
}

/// Pick the reply written by `run_id` from a newest-first message listing.
///
/// Only messages attributed to the run are considered, so an older assistant
/// message (or an introduction posted without a run) is never returned.
fn select_reply<'a>(messages: &'a [ThreadMessage], run_id: &str) -> Option<&'a str> {
    messages
        .iter()
        .filter(|m| m.role == MessageRole::Assistant && m.run_id.as_deref() == Some(run_id))
        .filter_map(ThreadMessage::text)
        .find(|text| !text.is_empty())
}
