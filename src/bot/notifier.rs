use line_client::LineClient;
use std::future::Future;
use tracing::{info, warn};

/// Outbound side of the LINE Messaging API, so handlers and the poller can
/// be exercised without a network.
pub trait MessageGateway: Send + Sync {
    fn send_reply(
        &self,
        reply_token: &str,
        text: &str,
    ) -> impl Future<Output = line_client::Result<()>> + Send;

    fn send_push(&self, to: &str, text: &str)
        -> impl Future<Output = line_client::Result<()>> + Send;
}

impl MessageGateway for LineClient {
    async fn send_reply(&self, reply_token: &str, text: &str) -> line_client::Result<()> {
        LineClient::send_reply(self, reply_token, text).await
    }

    async fn send_push(&self, to: &str, text: &str) -> line_client::Result<()> {
        LineClient::send_push(self, to, text).await
    }
}

#[derive(Clone)]
pub struct Notifier<G> {
    gateway: G,
}

impl<G: MessageGateway> Notifier<G> {
    pub fn new(gateway: G) -> Self {
        Self { gateway }
    }

    #[cfg(test)]
    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Reply to an inbound event. A rejected reply is logged and dropped:
    /// the state change behind it has already been committed.
    pub async fn reply(&self, reply_token: &str, text: &str) -> bool {
        match self.gateway.send_reply(reply_token, text).await {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Failed to send reply (status {:?}): {:#}",
                    e.status(),
                    e
                );
                false
            }
        }
    }

    /// Push a message to a user outside the reply window
    pub async fn push(&self, line_user_id: &str, text: &str) -> line_client::Result<()> {
        info!("Pushing message to user {}", line_user_id);
        self.gateway.send_push(line_user_id, text).await
    }
}
