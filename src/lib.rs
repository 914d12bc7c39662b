pub mod assistant;
pub mod bot;
pub mod config;
pub mod error;
pub mod fact;
pub mod job;
pub mod listener;
pub mod openai;
pub mod scheduler;
pub mod store;
pub mod telegram;
pub mod types;
pub mod unsplash;

#[cfg(test)]
mod testing;

pub use bot::{run_daily_facts, run_listener};
