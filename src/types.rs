//! Common types used throughout the factbot crate.

use serde::{Deserialize, Serialize};
use strum::Display;

/// Role of a message in an assistant thread.
///
/// Maps to OpenAI Assistants API message roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MessageRole {
    /// Message written by the human user
    User,
    /// Message written by (or on behalf of) the assistant
    Assistant,
}

/// Lifecycle status of an assistant run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    /// Any status this crate does not know about yet
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Returns true when the run has stopped without completing.
    ///
    /// `requires_action` is included: tool outputs are never submitted, so such
    /// a run cannot make further progress.
    #[must_use]
    pub fn is_terminal_failure(self) -> bool {
        matches!(
            self,
            RunStatus::RequiresAction
                | RunStatus::Cancelled
                | RunStatus::Failed
                | RunStatus::Incomplete
                | RunStatus::Expired
        )
    }
}
