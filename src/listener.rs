//! Mention listener - replies in the chat when the bot is addressed.

mod handler;
mod service;
mod trigger;

pub use handler::{ChatUser, Listener};
pub use service::run;
pub use trigger::{IncomingMessage, TriggerRules};
