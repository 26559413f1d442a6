//! HTTP surface: LINE webhook, poll trigger and health check.
mod routes;

use crate::bot::{BotHandler, MessageGateway};
use crate::scheduler::{VacancyPoller, VacancySource};
use anyhow::{Context, Result};
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

pub struct AppState<G, V> {
    pub handler: Arc<BotHandler<G>>,
    pub poller: Arc<VacancyPoller<G, V>>,
    /// Shared secret expected as `Authorization: Bearer <token>` on the poll trigger
    pub check_token: Option<String>,
}

impl<G, V> Clone for AppState<G, V> {
    fn clone(&self) -> Self {
        Self {
            handler: self.handler.clone(),
            poller: self.poller.clone(),
            check_token: self.check_token.clone(),
        }
    }
}

pub fn router<G, V>(state: AppState<G, V>) -> Router
where
    G: MessageGateway + 'static,
    V: VacancySource + 'static,
{
    Router::new()
        .route("/line/webhook", post(routes::line_webhook::<G, V>))
        .route("/check-rooms", get(routes::check_rooms::<G, V>))
        .route("/health", get(routes::health))
        .with_state(state)
}

pub async fn serve<G, V>(
    addr: &str,
    state: AppState<G, V>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()>
where
    G: MessageGateway + 'static,
    V: VacancySource + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("🌐 Listening on {}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server error")
}
