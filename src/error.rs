use thiserror::Error;

/// Failure fetching a quote from the external price provider.
#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("token not found on provider")]
    NotFound,

    #[error("provider rate limit exceeded")]
    RateLimited,

    #[error("network error: {0}")]
    Network(String),

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

/// Failure sending a notification email.
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("transient mail failure: {0}")]
    Transient(String),

    #[error("permanent mail failure: {0}")]
    Permanent(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Quote provider error: {0}")]
    Quote(#[from] QuoteError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Alert not found")]
    AlertNotFound,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(serde::Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(serde::Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl AppError {
    pub fn to_error_response(&self) -> ErrorResponse {
        let (code, message, field) = match self {
            AppError::Database(e) => ("DATABASE_ERROR", e.to_string(), None),
            AppError::Quote(e) => ("QUOTE_ERROR", e.to_string(), None),
            AppError::Notify(e) => ("NOTIFY_ERROR", e.to_string(), None),
            AppError::InvalidInput(msg) => ("INVALID_INPUT", msg.clone(), None),
            AppError::AlertNotFound => ("ALERT_NOT_FOUND", "Alert not found".to_string(), None),
            AppError::Config(msg) => ("CONFIG_ERROR", msg.clone(), None),
            AppError::Internal(msg) => ("INTERNAL_ERROR", msg.clone(), None),
        };

        ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                field,
            },
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::AlertNotFound => axum::http::StatusCode::NOT_FOUND,
            AppError::InvalidInput(_) => axum::http::StatusCode::BAD_REQUEST,
            _ => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        };

        let response = self.to_error_response();
        (status, axum::Json(response)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
