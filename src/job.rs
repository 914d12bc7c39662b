//! The daily fact job: fetch, illustrate, deliver.

use log::{error, info, warn};

use crate::assistant::Assistant;
use crate::fact::fetch_fact;
use crate::openai::AssistantApi;
use crate::telegram::ChatSender;
use crate::unsplash::ImageSearch;

/// How a job run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    SentPhoto,
    SentMessage,
    DeliveryFailed,
    /// No usable fact; nothing was sent
    Aborted,
}

pub struct DailyFactJob<A, C, I> {
    assistant: Assistant<A>,
    assistant_id: String,
    prompt: String,
    chat: C,
    images: Option<I>,
}

impl<A, C, I> DailyFactJob<A, C, I>
where
    A: AssistantApi,
    C: ChatSender,
    I: ImageSearch,
{
    pub fn new(
        assistant: Assistant<A>,
        assistant_id: String,
        prompt: String,
        chat: C,
        images: Option<I>,
    ) -> Self {
        Self {
            assistant,
            assistant_id,
            prompt,
            chat,
            images,
        }
    }

    /// Fetch a fact and deliver it to the chat, with a photo when one is found.
    pub async fn run(&self) -> JobOutcome {
        info!("Requesting fact from assistant {}", self.assistant_id);
        let Some(fact) = fetch_fact(&self.assistant, &self.assistant_id, &self.prompt).await else {
            error!("Failed to retrieve fact. Aborting dispatch.");
            return JobOutcome::Aborted;
        };

        let image_url = match (fact.title_en(), &self.images) {
            (Some(title_en), Some(images)) => images.find_photo(title_en).await,
            (None, _) => {
                warn!("Fact has no English title, sending without photo");
                None
            }
            (Some(_), None) => None,
        };

        let message = fact.format_message();
        let outcome = match image_url {
            Some(url) => {
                if self.chat.send_photo(&url, &message).await {
                    JobOutcome::SentPhoto
                } else {
                    JobOutcome::DeliveryFailed
                }
            }
            None => {
                if self.chat.send_message(&message).await {
                    JobOutcome::SentMessage
                } else {
                    JobOutcome::DeliveryFailed
                }
            }
        };
        if outcome == JobOutcome::DeliveryFailed {
            error!("Daily fact was not delivered");
        }
        outcome
    }
}
