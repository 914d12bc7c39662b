//! Telegram dispatcher wiring for the mention listener.

use std::future::Future;
use std::sync::Arc;

use log::{debug, error, info, warn};
use teloxide::prelude::*;
use teloxide::types::{Me, ParseMode, ReplyParameters, User};
use tokio::runtime::Handle;

use crate::assistant::Reply;
use crate::error::Result;
use crate::openai::AssistantApi;
use crate::store::ThreadStore;

use super::handler::{ChatUser, Listener};
use super::trigger::IncomingMessage;

/// Receive updates until `shutdown` resolves.
///
/// Every triggering message is handled as its own task on `runtime`, so a slow
/// or failing exchange never holds up other users. Messages from the same user
/// are serialised by the [`Listener`].
///
/// # Errors
///
/// Returns an error if the bot's own account cannot be fetched.
pub async fn run<A, S>(
    bot: Bot,
    listener: Arc<Listener<A, S>>,
    runtime: Handle,
    shutdown: impl Future<Output = ()>,
) -> Result<()>
where
    A: AssistantApi + 'static,
    S: ThreadStore + 'static,
{
    let me = bot.get_me().await?;
    info!("Listening as @{} ({})", me.username(), me.id.0);

    let handler = Update::filter_message().endpoint(on_message::<A, S>);
    let mut dispatcher = Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![listener, runtime, me])
        .build();

    tokio::select! {
        () = dispatcher.dispatch() => {}
        () = shutdown => info!("Shutdown signal received, stopping listener"),
    }
    Ok(())
}

/// Trigger view and author of a plain text message.
///
/// `None` for commands, non-text messages and messages without a sender.
fn incoming(msg: &Message) -> Option<(IncomingMessage<'_>, &User)> {
    let text = msg.text()?;
    let user = msg.from.as_ref()?;
    if text.starts_with('/') {
        return None;
    }

    let message = IncomingMessage {
        chat_id: msg.chat.id.0,
        text,
        reply_to_sender: msg
            .reply_to_message()
            .and_then(|replied| replied.from.as_ref())
            .map(|sender| sender.id.0),
    };
    Some((message, user))
}

fn chat_user(user: &User) -> ChatUser<'_> {
    ChatUser {
        id: user.id.0,
        first_name: &user.first_name,
        username: user.username.as_deref(),
    }
}

async fn on_message<A, S>(
    bot: Bot,
    msg: Message,
    me: Me,
    listener: Arc<Listener<A, S>>,
    runtime: Handle,
) -> ResponseResult<()>
where
    A: AssistantApi + 'static,
    S: ThreadStore + 'static,
{
    let Some((message, user)) = incoming(&msg) else {
        return Ok(());
    };
    if !listener.is_triggered(&message, me.id.0, me.username()) {
        return Ok(());
    }

    debug!("Triggered by user {} in chat {}", user.id.0, message.chat_id);
    let prompt = message.text.to_string();
    let user = user.clone();
    runtime.spawn(async move {
        reply(&bot, &msg, &user, &prompt, &listener).await;
    });
    Ok(())
}

/// Text to send back for `prompt`, or `None` when nothing should be sent.
async fn answer<A, S>(
    listener: &Listener<A, S>,
    user: &ChatUser<'_>,
    chat_id: i64,
    prompt: &str,
) -> Option<String>
where
    A: AssistantApi,
    S: ThreadStore,
{
    match listener.ask(user, prompt).await {
        Ok(Reply::Text(text)) => Some(text),
        Ok(Reply::NoReply) => {
            warn!("No reply for user {} in chat {chat_id}", user.id);
            None
        }
        Err(e) => {
            error!("Error processing message from user {}: {e}", user.id);
            None
        }
    }
}

async fn reply<A, S>(bot: &Bot, msg: &Message, user: &User, prompt: &str, listener: &Listener<A, S>)
where
    A: AssistantApi,
    S: ThreadStore,
{
    let author = chat_user(user);
    let Some(text) = answer(listener, &author, msg.chat.id.0, prompt).await else {
        return;
    };

    match bot
        .send_message(msg.chat.id, text)
        .reply_parameters(ReplyParameters::new(msg.id))
        .parse_mode(ParseMode::Html)
        .await
    {
        Ok(_) => info!("Replied to user {} in chat {}", user.id.0, msg.chat.id.0),
        Err(e) => error!("Failed to reply to user {}: {e}", user.id.0),
    }
}
