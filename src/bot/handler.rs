use crate::bot::notifier::{MessageGateway, Notifier};
use crate::bot::{messages, Command};
use crate::db::repo::Repo;
use crate::error::SubscriptionError;
use anyhow::{Context, Result};
use line_client::{Event, MessageContent};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub struct BotHandler<G> {
    repo: Arc<Repo>,
    notifier: Notifier<G>,
}

impl<G: MessageGateway> BotHandler<G> {
    pub fn new(repo: Arc<Repo>, notifier: Notifier<G>) -> Self {
        Self { repo, notifier }
    }

    #[cfg(test)]
    pub fn notifier(&self) -> &Notifier<G> {
        &self.notifier
    }

    /// Handle one webhook event.
    ///
    /// Only follow/unfollow bookkeeping failures are returned; failures while
    /// answering a message are turned into an error reply.
    pub async fn handle_event(&self, event: &Event) -> Result<()> {
        let Some(user_id) = event.user_id() else {
            debug!("Ignoring {} event without a user source", event.kind());
            return Ok(());
        };

        match event {
            Event::Follow { reply_token, .. } => {
                self.handle_follow(user_id, reply_token.as_deref()).await
            }
            Event::Unfollow { .. } => self.handle_unfollow(user_id).await,
            Event::Message {
                reply_token,
                message,
                ..
            } => {
                match message {
                    MessageContent::Text { text, .. } => {
                        self.handle_text(user_id, reply_token.as_deref(), text)
                            .await;
                    }
                    MessageContent::Other => {
                        debug!("Ignoring non-text message from user {}", user_id);
                    }
                }
                Ok(())
            }
            Event::Unsupported => Ok(()),
        }
    }

    // ------------------------------------------------------------------------
    // Follow / Unfollow
    // ------------------------------------------------------------------------

    async fn handle_follow(&self, user_id: &str, reply_token: Option<&str>) -> Result<()> {
        info!("User {} followed the bot", user_id);

        self.repo
            .register_user(user_id)
            .await
            .with_context(|| format!("Failed to register user {}", user_id))?;

        if let Some(token) = reply_token {
            self.remember_reply_token(user_id, token).await;
            self.notifier.reply(token, &messages::welcome()).await;
        }
        Ok(())
    }

    async fn handle_unfollow(&self, user_id: &str) -> Result<()> {
        let retired = self
            .repo
            .deactivate_user(user_id)
            .await
            .with_context(|| format!("Failed to deactivate user {}", user_id))?;
        info!(
            "User {} unfollowed the bot, {} subscription(s) retired",
            user_id, retired
        );
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Text commands
    // ------------------------------------------------------------------------

    async fn handle_text(&self, user_id: &str, reply_token: Option<&str>, text: &str) {
        let command = Command::parse(text);
        info!("Received command from user {}: {:?}", user_id, command);

        let reply = match self.repo.register_user(user_id).await {
            Ok(_) => {
                if let Some(token) = reply_token {
                    self.remember_reply_token(user_id, token).await;
                }
                self.execute(user_id, command).await
            }
            Err(e) => {
                error!("Failed to ensure user {}: {:#}", user_id, e);
                messages::database_error()
            }
        };

        match reply_token {
            Some(token) => {
                self.notifier.reply(token, &reply).await;
            }
            None => warn!("No reply token for message from user {}", user_id),
        }
    }

    async fn execute(&self, user_id: &str, command: Command) -> String {
        match command {
            Command::Subscribe {
                unit_name,
                room_types,
            } => match self.repo.subscribe(user_id, &unit_name, room_types).await {
                Ok((unit, sub)) => {
                    info!(
                        "User {} subscribed to unit {} ({})",
                        user_id, unit.unit_name, sub.room_types
                    );
                    messages::subscribe_success(&unit.unit_name, &sub.room_types)
                }
                Err(e) => error_reply(user_id, e),
            },
            Command::Unsubscribe { unit_name } => {
                match self.repo.unsubscribe(user_id, &unit_name).await {
                    Ok(unit) => {
                        info!("User {} unsubscribed from unit {}", user_id, unit.unit_name);
                        messages::unsubscribe_success(&unit.unit_name)
                    }
                    Err(e) => error_reply(user_id, e),
                }
            }
            Command::List => match self.repo.list_active(user_id).await {
                Ok(subs) => {
                    let entries: Vec<_> = subs
                        .into_iter()
                        .map(|(sub, unit)| (unit.unit_name, sub.room_types))
                        .collect();
                    messages::subscription_list(&entries)
                }
                Err(e) => {
                    error!("Failed to list subscriptions for user {}: {:#}", user_id, e);
                    messages::database_error()
                }
            },
            Command::Help => messages::help(),
            Command::Unrecognized => messages::unknown_command(),
        }
    }

    async fn remember_reply_token(&self, user_id: &str, token: &str) {
        if let Err(e) = self.repo.update_reply_token(user_id, token).await {
            warn!("Failed to store reply token for user {}: {:#}", user_id, e);
        }
    }
}

fn error_reply(user_id: &str, err: SubscriptionError) -> String {
    match err {
        SubscriptionError::UnitNotFound(name) => {
            info!("User {} sent unknown unit name {:?}", user_id, name);
            messages::invalid_unit_name()
        }
        SubscriptionError::SubscriptionLimitReached => messages::limit_reached(),
        SubscriptionError::NotSubscribed(name) => messages::not_subscribed(&name),
        SubscriptionError::Database(e) => {
            error!("Database error for user {}: {:#}", user_id, e);
            messages::database_error()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::notifier::tests::FakeGateway;
    use crate::db::repo::tests::setup_test_db;
    use line_client::WebhookBody;

    async fn setup() -> BotHandler<FakeGateway> {
        let repo = setup_test_db().await.unwrap();
        repo.upsert_unit("代々木ビュー", "20_1310", None)
            .await
            .unwrap();
        repo.upsert_unit("Shinjuku Heights", "20_4470", None)
            .await
            .unwrap();
        BotHandler::new(Arc::new(repo), Notifier::new(FakeGateway::default()))
    }

    fn text_event(user: &str, token: &str, text: &str) -> Event {
        let body = serde_json::json!({
            "events": [{
                "type": "message",
                "replyToken": token,
                "source": { "type": "user", "userId": user },
                "message": { "type": "text", "id": "1", "text": text }
            }]
        });
        let body: WebhookBody = serde_json::from_value(body).unwrap();
        body.events.into_iter().next().unwrap()
    }

    fn follow_event(user: &str, token: &str) -> Event {
        let body: WebhookBody = serde_json::from_value(serde_json::json!({
            "events": [{
                "type": "follow",
                "replyToken": token,
                "source": { "type": "user", "userId": user }
            }]
        }))
        .unwrap();
        body.events.into_iter().next().unwrap()
    }

    fn last_reply(handler: &BotHandler<FakeGateway>) -> String {
        handler
            .notifier()
            .gateway()
            .replies()
            .last()
            .map(|(_, text)| text.clone())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_follow_registers_and_welcomes() {
        let handler = setup().await;
        handler.handle_event(&follow_event("U1", "t1")).await.unwrap();

        let user = handler.repo.get_user("U1").await.unwrap().unwrap();
        assert!(user.active);
        assert_eq!(user.reply_token.as_deref(), Some("t1"));
        assert_eq!(last_reply(&handler), messages::welcome());
    }

    #[tokio::test]
    async fn test_duplicate_follow_keeps_premium() {
        let handler = setup().await;
        handler.handle_event(&follow_event("U1", "t1")).await.unwrap();
        handler.repo.set_premium("U1", true).await.unwrap();
        handler.handle_event(&follow_event("U1", "t1")).await.unwrap();

        let user = handler.repo.get_user("U1").await.unwrap().unwrap();
        assert!(user.is_premium);
    }

    #[tokio::test]
    async fn test_subscribe_with_room_types_replies_both() {
        let handler = setup().await;
        handler
            .handle_event(&text_event("U1", "t1", "代々木ビュー:2LDK&3LDK"))
            .await
            .unwrap();

        let subs = handler.repo.list_active("U1").await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].0.room_types.0, vec!["2LDK", "3LDK"]);

        let reply = last_reply(&handler);
        assert!(reply.contains("2LDK"));
        assert!(reply.contains("3LDK"));
    }

    #[tokio::test]
    async fn test_second_unit_hits_limit() {
        let handler = setup().await;
        handler
            .handle_event(&text_event("U1", "t1", "代々木ビュー"))
            .await
            .unwrap();
        handler
            .handle_event(&text_event("U1", "t2", "Shinjuku Heights"))
            .await
            .unwrap();

        assert_eq!(last_reply(&handler), messages::limit_reached());
        let subs = handler.repo.list_active("U1").await.unwrap();
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].1.unit_name, "代々木ビュー");
    }

    #[tokio::test]
    async fn test_unsubscribe_flow() {
        let handler = setup().await;
        handler
            .handle_event(&text_event("U1", "t1", "代々木ビュー"))
            .await
            .unwrap();
        handler
            .handle_event(&text_event("U1", "t2", "-代々木ビュー"))
            .await
            .unwrap();

        assert_eq!(
            last_reply(&handler),
            messages::unsubscribe_success("代々木ビュー")
        );
        assert!(handler.repo.list_active("U1").await.unwrap().is_empty());

        handler
            .handle_event(&text_event("U1", "t3", "-代々木ビュー"))
            .await
            .unwrap();
        assert_eq!(last_reply(&handler), messages::not_subscribed("代々木ビュー"));
    }

    #[tokio::test]
    async fn test_unknown_unit_reply() {
        let handler = setup().await;
        handler
            .handle_event(&text_event("U1", "t1", "Nowhere Danchi"))
            .await
            .unwrap();
        assert_eq!(last_reply(&handler), messages::invalid_unit_name());
    }

    #[tokio::test]
    async fn test_list_and_help() {
        let handler = setup().await;
        handler
            .handle_event(&text_event("U1", "t1", "代々木ビュー:1K"))
            .await
            .unwrap();
        handler
            .handle_event(&text_event("U1", "t2", "確認"))
            .await
            .unwrap();
        assert!(last_reply(&handler).contains("• 代々木ビュー (1K)"));

        handler
            .handle_event(&text_event("U1", "t3", "ヘルプ"))
            .await
            .unwrap();
        assert_eq!(last_reply(&handler), messages::help());
        assert_eq!(handler.notifier().gateway().replies().len(), 3);
    }

    #[tokio::test]
    async fn test_unfollow_retires_subscriptions() {
        let handler = setup().await;
        handler
            .handle_event(&text_event("U1", "t1", "代々木ビュー"))
            .await
            .unwrap();

        let unfollow: WebhookBody = serde_json::from_value(serde_json::json!({
            "events": [{ "type": "unfollow", "source": { "type": "user", "userId": "U1" } }]
        }))
        .unwrap();
        handler.handle_event(&unfollow.events[0]).await.unwrap();

        let user = handler.repo.get_user("U1").await.unwrap().unwrap();
        assert!(!user.active);
        assert!(handler.repo.list_active("U1").await.unwrap().is_empty());
        assert!(handler.repo.list_subscribed_units().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_text_message_is_ignored() {
        let handler = setup().await;
        let body: WebhookBody = serde_json::from_value(serde_json::json!({
            "events": [{
                "type": "message",
                "replyToken": "t1",
                "source": { "type": "user", "userId": "U1" },
                "message": { "type": "sticker", "id": "1", "packageId": "1", "stickerId": "1" }
            }]
        }))
        .unwrap();

        handler.handle_event(&body.events[0]).await.unwrap();
        assert!(handler.notifier().gateway().replies().is_empty());
        assert!(handler.repo.get_user("U1").await.unwrap().is_none());
    }
}
