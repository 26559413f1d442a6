use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Outcomes of a store mutation the dispatcher answers differently.
#[derive(Error, Debug)]
pub enum SubscriptionError {
    #[error("Unit not found: {0}")]
    UnitNotFound(String),

    #[error("Subscription limit reached")]
    SubscriptionLimitReached,

    #[error("Not subscribed to unit: {0}")]
    NotSubscribed(String),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl From<sea_orm::DbErr> for SubscriptionError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.into())
    }
}

/// Errors surfaced at the HTTP boundary.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Dependency error: {0}")]
    Dependency(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Dependency(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, self.to_string()).into_response()
    }
}
