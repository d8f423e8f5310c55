use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{debug, error};

use crate::{auth::repo::StoreError, mail::MailError};

pub const NO_ACCOUNT: &str = "No account found with this email address";

/// Failures of the account operations, each mapped to one HTTP status.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("{0}")]
    Validation(String),
    #[error("User already exists")]
    DuplicateAccount,
    #[error("{0}")]
    NotFound(String),
    #[error("Incorrect password")]
    Unauthorized,
    #[error("Invalid OTP. Please check and try again")]
    InvalidOtp,
    #[error("OTP has expired. Please request a new one")]
    Expired,
    #[error("OTP verification required before resetting password")]
    OtpNotVerified,
    #[error("Not signed in")]
    SessionRequired,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn no_account() -> Self {
        Self::NotFound(NO_ACCOUNT.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::DuplicateAccount
            | Self::InvalidOtp
            | Self::Expired
            | Self::OtpNotVerified => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::SessionRequired => StatusCode::UNAUTHORIZED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::AlreadyExists => Self::DuplicateAccount,
            StoreError::NotFound => Self::no_account(),
            StoreError::Database(e) => Self::Internal(e.into()),
        }
    }
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        debug!(error = %rejection.body_text(), "request body rejected");
        Self::validation("Invalid request body")
    }
}

impl From<MailError> for AuthError {
    fn from(e: MailError) -> Self {
        Self::Internal(e.into())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Internal(e) => {
                error!(error = %e, "auth request failed");
                "Something went wrong. Please try again later".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}
