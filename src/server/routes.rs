use super::AppState;
use crate::bot::MessageGateway;
use crate::error::AppError;
use crate::scheduler::VacancySource;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use chrono::Local;
use line_client::WebhookBody;
use serde_json::json;
use subtle::ConstantTimeEq;
use tracing::{error, info};

/// `POST /line/webhook`
///
/// Events are handled in order. A failed follow/unfollow does not stop the
/// remaining events but turns the response into a 500.
pub(crate) async fn line_webhook<G, V>(
    State(state): State<AppState<G, V>>,
    body: Bytes,
) -> Result<StatusCode, AppError>
where
    G: MessageGateway + 'static,
    V: VacancySource + 'static,
{
    if body.is_empty() {
        return Err(AppError::Validation("empty request body".to_string()));
    }

    let webhook: WebhookBody = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("malformed webhook body: {}", e)))?;

    info!("Received webhook with {} event(s)", webhook.events.len());

    let mut first_error = None;
    for event in &webhook.events {
        if let Err(e) = state.handler.handle_event(event).await {
            error!("Failed to handle {} event: {:#}", event.kind(), e);
            first_error.get_or_insert(e);
        }
    }

    match first_error {
        Some(e) => Err(AppError::Dependency(e)),
        None => Ok(StatusCode::OK),
    }
}

/// `GET /check-rooms`: run the vacancy poller once
pub(crate) async fn check_rooms<G, V>(
    State(state): State<AppState<G, V>>,
    headers: HeaderMap,
) -> Result<String, AppError>
where
    G: MessageGateway + 'static,
    V: VacancySource + 'static,
{
    if let Some(expected) = state.check_token.as_deref() {
        let provided = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        if !provided.is_some_and(|token| token_matches(token, expected)) {
            return Err(AppError::Unauthorized);
        }
    }

    let summary = state.poller.run_once().await?;
    info!("Room check finished: {}", summary);
    Ok(summary.to_string())
}

/// Compare a shared secret without leaking where the first mismatch is.
fn token_matches(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// `GET /health`
pub(crate) async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Local::now().to_rfc3339(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
