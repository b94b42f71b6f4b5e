use axum::response::{IntoResponse, Redirect, Response};

use crate::spotify::SpotifyError;

/// Application error type.
///
/// Every variant answers with a redirect home; the `error` query code tells the
/// home page what went wrong.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("authorization state mismatch")]
    AuthState,
    #[error("authorization denied by provider: {0}")]
    AuthorizationDenied(String),
    #[error("callback is missing the authorization code")]
    MissingCode,
    #[error("no access token cookie")]
    MissingAccessToken,
    #[error(transparent)]
    Upstream(#[from] SpotifyError),
    #[error("failed to write report: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn code(&self) -> Option<&'static str> {
        match self {
            AppError::AuthState => Some("state_mismatch"),
            AppError::AuthorizationDenied(_) => Some("access_denied"),
            AppError::MissingCode => Some("invalid_callback"),
            AppError::MissingAccessToken => None,
            AppError::Upstream(_) => Some("upstream_error"),
            AppError::Io(_) => Some("export_failed"),
        }
    }

    pub fn redirect_target(&self) -> String {
        match self.code() {
            Some(code) => format!("/?error={}", code),
            None => "/".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::MissingAccessToken => tracing::info!("{}", self),
            AppError::AuthState | AppError::AuthorizationDenied(_) | AppError::MissingCode => {
                tracing::warn!("{}", self)
            }
            AppError::Upstream(_) | AppError::Io(_) => tracing::error!("{}", self),
        }
        Redirect::to(&self.redirect_target()).into_response()
    }
}
