//! LINE side of the bot: command grammar, reply texts and event handling.
pub mod commands;
mod handler;
pub mod messages;
pub mod notifier;

pub use commands::Command;
pub use handler::BotHandler;
pub use notifier::{MessageGateway, Notifier};
