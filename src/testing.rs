//! In-memory collaborators for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use reqwest::StatusCode;

use crate::error::{BotError, Result};
use crate::openai::{AssistantApi, MessageContent, Run, TextContent, Thread, ThreadMessage};
use crate::store::ThreadStore;
use crate::telegram::ChatSender;
use crate::types::{MessageRole, RunStatus};
use crate::unsplash::ImageSearch;

#[derive(Debug)]
struct PendingRun {
    thread_id: String,
    polls_left: usize,
    reply: Option<String>,
}

#[derive(Debug, Default)]
struct FakeState {
    next_id: usize,
    threads_created: usize,
    run_polls: usize,
    /// Messages per thread in chronological order
    messages: HashMap<String, Vec<ThreadMessage>>,
    runs: HashMap<String, PendingRun>,
    replies: VecDeque<Option<String>>,
    failures_left: usize,
}

impl FakeState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}_{}", self.next_id)
    }

    fn append(
        &mut self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
        run_id: Option<String>,
    ) -> ThreadMessage {
        let message = ThreadMessage {
            id: self.next_id("msg"),
            role,
            run_id,
            content: vec![MessageContent::Text {
                text: TextContent {
                    value: content.to_string(),
                },
            }],
        };
        self.messages
            .entry(thread_id.to_string())
            .or_default()
            .push(message.clone());
        message
    }
}

/// Assistant service double that answers runs from a queue of replies.
#[derive(Debug)]
pub struct FakeAssistantApi {
    state: Mutex<FakeState>,
    polls_before_done: usize,
    final_status: RunStatus,
    failing: bool,
    failing_messages: bool,
}

impl FakeAssistantApi {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState::default()),
            polls_before_done: 0,
            final_status: RunStatus::Completed,
            failing: false,
            failing_messages: false,
        }
    }

    /// Runs report `in_progress` this many times before finishing.
    pub fn with_polls_before_done(mut self, polls: usize) -> Self {
        self.polls_before_done = polls;
        self
    }

    pub fn with_final_status(mut self, status: RunStatus) -> Self {
        self.final_status = status;
        self
    }

    /// Every request fails as if the service returned a 500.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Appending messages fails; every other request succeeds.
    pub fn with_failing_messages(mut self) -> Self {
        self.failing_messages = true;
        self
    }

    /// The next request fails, later ones behave normally.
    pub fn fail_next(&self) {
        self.lock().failures_left += 1;
    }

    /// Queue the text the next run will answer with.
    pub fn push_reply(&self, reply: &str) {
        self.lock().replies.push_back(Some(reply.to_string()));
    }

    /// Queue a run that completes without writing a message.
    pub fn push_silence(&self) {
        self.lock().replies.push_back(None);
    }

    pub fn created_threads(&self) -> usize {
        self.lock().threads_created
    }

    pub fn run_polls(&self) -> usize {
        self.lock().run_polls
    }

    /// Role and text of every message in a thread, oldest first.
    pub fn messages(&self, thread_id: &str) -> Vec<(MessageRole, String)> {
        self.lock()
            .messages
            .get(thread_id)
            .map(|messages| {
                messages
                    .iter()
                    .map(|m| (m.role, m.text().unwrap_or_default().to_string()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().expect("fake state poisoned")
    }

    fn check_available(&self) -> Result<()> {
        let injected = {
            let mut state = self.lock();
            let injected = state.failures_left > 0;
            state.failures_left = state.failures_left.saturating_sub(1);
            injected
        };
        if self.failing || injected {
            return Err(unavailable());
        }
        Ok(())
    }
}

fn unavailable() -> BotError {
    BotError::OpenAiApi {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: "unavailable".to_string(),
    }
}

impl AssistantApi for FakeAssistantApi {
    async fn create_thread(&self) -> Result<Thread> {
        self.check_available()?;
        let mut state = self.lock();
        state.threads_created += 1;
        let id = state.next_id("thread");
        state.messages.insert(id.clone(), Vec::new());
        Ok(Thread { id })
    }

    async fn create_message(
        &self,
        thread_id: &str,
        role: MessageRole,
        content: &str,
    ) -> Result<ThreadMessage> {
        self.check_available()?;
        if self.failing_messages {
            return Err(unavailable());
        }
        Ok(self.lock().append(thread_id, role, content, None))
    }

    async fn create_run(&self, thread_id: &str, _assistant_id: &str) -> Result<Run> {
        self.check_available()?;
        let mut state = self.lock();
        let id = state.next_id("run");
        let reply = state.replies.pop_front().flatten();
        state.runs.insert(
            id.clone(),
            PendingRun {
                thread_id: thread_id.to_string(),
                polls_left: self.polls_before_done,
                reply,
            },
        );
        Ok(Run {
            id,
            thread_id: thread_id.to_string(),
            status: RunStatus::Queued,
        })
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        self.check_available()?;
        let mut state = self.lock();
        state.run_polls += 1;
        let run = state.runs.get_mut(run_id).expect("unknown run");
        let status = if run.polls_left > 0 {
            run.polls_left -= 1;
            RunStatus::InProgress
        } else {
            self.final_status
        };

        if status == RunStatus::Completed
            && let Some(reply) = run.reply.take()
        {
            let run_thread = run.thread_id.clone();
            state.append(&run_thread, MessageRole::Assistant, &reply, Some(run_id.to_string()));
        }

        Ok(Run {
            id: run_id.to_string(),
            thread_id: thread_id.to_string(),
            status,
        })
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>> {
        self.check_available()?;
        let state = self.lock();
        let mut messages = state.messages.get(thread_id).cloned().unwrap_or_default();
        messages.reverse();
        Ok(messages)
    }
}

/// Thread store kept in a map.
#[derive(Debug, Default)]
pub struct MemoryThreadStore {
    entries: Mutex<HashMap<u64, String>>,
    writes: Mutex<usize>,
}

impl MemoryThreadStore {
    pub fn writes(&self) -> usize {
        *self.writes.lock().expect("store poisoned")
    }
}

impl ThreadStore for MemoryThreadStore {
    async fn get(&self, user_id: u64) -> Result<Option<String>> {
        Ok(self.entries.lock().expect("store poisoned").get(&user_id).cloned())
    }

    async fn set(&self, user_id: u64, thread_id: &str) -> Result<()> {
        *self.writes.lock().expect("store poisoned") += 1;
        self.entries
            .lock()
            .expect("store poisoned")
            .insert(user_id, thread_id.to_string());
        Ok(())
    }
}

/// Memory store that yields to the scheduler around every operation, like a
/// network round-trip would.
#[derive(Debug, Default)]
pub struct SlowThreadStore {
    inner: MemoryThreadStore,
}

impl SlowThreadStore {
    const LATENCY: Duration = Duration::from_millis(5);

    pub fn writes(&self) -> usize {
        self.inner.writes()
    }
}

impl ThreadStore for SlowThreadStore {
    async fn get(&self, user_id: u64) -> Result<Option<String>> {
        tokio::time::sleep(Self::LATENCY).await;
        self.inner.get(user_id).await
    }

    async fn set(&self, user_id: u64, thread_id: &str) -> Result<()> {
        tokio::time::sleep(Self::LATENCY).await;
        self.inner.set(user_id, thread_id).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sent {
    Message(String),
    Photo { url: String, caption: String },
}

/// Chat sender that records what would have been delivered.
#[derive(Debug, Default)]
pub struct RecordingSender {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingSender {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().expect("sender poisoned").clone()
    }
}

impl ChatSender for RecordingSender {
    async fn send_message(&self, text: &str) -> bool {
        self.sent
            .lock()
            .expect("sender poisoned")
            .push(Sent::Message(text.to_string()));
        true
    }

    async fn send_photo(&self, photo_url: &str, caption: &str) -> bool {
        self.sent.lock().expect("sender poisoned").push(Sent::Photo {
            url: photo_url.to_string(),
            caption: caption.to_string(),
        });
        true
    }
}

/// Image search that always returns the same answer.
#[derive(Debug, Default)]
pub struct FixedImageSearch {
    url: Option<String>,
    queries: Mutex<Vec<String>>,
}

impl FixedImageSearch {
    pub fn returning(url: Option<&str>) -> Self {
        Self {
            url: url.map(str::to_string),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().expect("search poisoned").clone()
    }
}

impl ImageSearch for FixedImageSearch {
    async fn find_photo(&self, query: &str) -> Option<String> {
        self.queries
            .lock()
            .expect("search poisoned")
            .push(query.to_string());
        self.url.clone()
    }
}
