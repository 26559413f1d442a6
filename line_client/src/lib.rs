//! LINE Messaging API client
//!
//! A small wrapper over the reply/push endpoints plus the webhook payload
//! models. It has no knowledge of the bot built on top of it.

mod client;
mod error;
mod models;

pub use client::{LineClient, LineClientConfig, MAX_TEXT_CHARS};
pub use error::{Error, Result};
pub use models::{
    Event, MessageContent, OutgoingMessage, PushRequest, ReplyRequest, Source, WebhookBody,
};
