//! LINE webhook and message payloads
//!
//! Only the fields this bot reads are modelled; everything else in the
//! provider payload is ignored during decoding.

use serde::{Deserialize, Serialize};

/// Top-level webhook request body
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<Event>,
}

/// Event origin
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    /// "user", "group" or "room"
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// A webhook event
///
/// Event types the bot does not act on (postback, join, beacon, ...) decode
/// into `Unsupported` instead of failing the whole request.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "lowercase",
    rename_all_fields = "camelCase"
)]
pub enum Event {
    Follow {
        #[serde(default)]
        source: Source,
        #[serde(default)]
        reply_token: Option<String>,
    },
    Unfollow {
        #[serde(default)]
        source: Source,
    },
    Message {
        #[serde(default)]
        source: Source,
        #[serde(default)]
        reply_token: Option<String>,
        message: MessageContent,
    },
    #[serde(other)]
    Unsupported,
}

impl Event {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Event::Follow { source, .. }
            | Event::Unfollow { source }
            | Event::Message { source, .. } => source.user_id.as_deref(),
            Event::Unsupported => None,
        }
    }

    pub fn reply_token(&self) -> Option<&str> {
        match self {
            Event::Follow { reply_token, .. } | Event::Message { reply_token, .. } => {
                reply_token.as_deref()
            }
            Event::Unfollow { .. } | Event::Unsupported => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Event::Follow { .. } => "follow",
            Event::Unfollow { .. } => "unfollow",
            Event::Message { .. } => "message",
            Event::Unsupported => "unsupported",
        }
    }
}

/// Inbound message body
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    Text {
        #[serde(default)]
        id: String,
        text: String,
    },
    #[serde(other)]
    Other,
}

/// Outbound message object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutgoingMessage {
    Text { text: String },
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        OutgoingMessage::Text { text: text.into() }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRequest {
    pub reply_token: String,
    pub messages: Vec<OutgoingMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PushRequest {
    pub to: String,
    pub messages: Vec<OutgoingMessage>,
}
