//! OpenAI Assistants API protocol: threads, messages and runs.

use std::future::Future;

use log::debug;
use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use url::Url;

use crate::error::{BotError, Result};
use crate::types::{MessageRole, RunStatus};

/// Number of messages requested when looking for a reply.
const MESSAGE_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct Thread {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub id: String,
    pub thread_id: String,
    pub status: RunStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: MessageRole,
    /// Set when the message was produced by a run
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

impl ThreadMessage {
    /// Returns the first text part of the message, trimmed.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.content.iter().find_map(|part| match part {
            MessageContent::Text { text } => Some(text.value.trim()),
            MessageContent::Other => None,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextContent },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextContent {
    pub value: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

#[derive(Debug, Serialize)]
struct CreateMessageRequest<'a> {
    role: MessageRole,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateRunRequest<'a> {
    assistant_id: &'a str,
}

/// Primitive operations of the assistant service.
///
/// Each call is a single network round-trip. Implementations must be usable
/// from concurrently running tasks.
pub trait AssistantApi: Send + Sync {
    fn create_thread(&self) -> impl Future<Output = Result<Thread>> + Send;

    fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> impl Future<Output = Result<ThreadMessage>> + Send;

    fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> impl Future<Output = Result<Run>> + Send;

    fn retrieve_run(
        &self,
        thread_id: &str,
        run_id: &str,
    ) -> impl Future<Output = Result<Run>> + Send;

    /// Lists the most recent messages of a thread, newest first.
    fn list_messages(
        &self,
        thread_id: &str,
    ) -> impl Future<Output = Result<Vec<ThreadMessage>>> + Send;
}

/// HTTP client for the OpenAI Assistants API (v2).
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    api_key: String,
    base_url: Url,
    client: Client,
}

impl OpenAiClient {
    pub fn new(api_key: String, base_url: Url) -> Self {
        Self {
            api_key,
            base_url,
            client: Client::new(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.authorized(request).send().await?;
        Ok(check_status(response).await?.json().await?)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let message = response
        .text()
        .await
        .unwrap_or_else(|e| format!("Failed to read error response: {e}"));
    Err(BotError::OpenAiApi { status, message })
}

impl AssistantApi for OpenAiClient {
    async fn create_thread(&self) -> Result<Thread> {
        let thread: Thread = self
            .send(
                self.client
                    .post(self.endpoint("threads"))
                    .json(&serde_json::json!({})),
            )
            .await?;
        debug!("Created thread {}", thread.id);
        Ok(thread)
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ThreadMessage> {
        debug!("Appending {role} message to thread {thread_id}");
        self.send(
            self.client
                .post(self.endpoint(&format!("threads/{thread_id}/messages")))
                .json(&CreateMessageRequest { role, content }),
        )
        .await
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run> {
        let run: Run = self
            .send(
                self.client
                    .post(self.endpoint(&format!("threads/{thread_id}/runs")))
                    .json(&CreateRunRequest { assistant_id }),
            )
            .await?;
        debug!(
            "Started run {} of assistant {assistant_id} on thread {thread_id}",
            run.id
        );
        Ok(run)
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        self.send(
            self.client
                .get(self.endpoint(&format!("threads/{thread_id}/runs/{run_id}"))),
        )
        .await
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>> {
        let limit = MESSAGE_PAGE_SIZE.to_string();
        let list: MessageList = self
            .send(
                self.client
                    .get(self.endpoint(&format!("threads/{thread_id}/messages")))
                    .query(&[("order", "desc"), ("limit", limit.as_str())]),
            )
            .await?;
        debug!("Listed {} messages in thread {thread_id}", list.data.len());
        Ok(list.data)
    }
}
