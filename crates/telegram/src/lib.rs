//! Telegram transport for grabbot.
//!
//! Receives messages via the teloxide library, maps them into pipeline
//! requests, and delivers fetched media back into the chat (uploads,
//! forwards of cached artifacts, failure notes).

pub mod bot;
pub mod config;
pub mod handlers;
pub mod outbound;

pub use {bot::start_polling, config::BotConfig, outbound::TelegramSink};
