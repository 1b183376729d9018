//! Error taxonomy for user actions and its user-facing presentation.
//!
//! Every error is terminal for the action that raised it: nothing is retried,
//! and the rendered error block replaces the result area.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

pub type Result<T> = std::result::Result<T, UiError>;

/// Backend-declared error categories (`error_type` in the error envelope).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendErrorKind {
    ApiKey,
    Validation,
    ModelNotSupported,
    RateLimit,
    Server,
    Network,
    Request,
    Timeout,
    Configuration,
    Other(String),
}

impl BackendErrorKind {
    pub fn from_error_type(error_type: Option<&str>) -> Self {
        match error_type.map(str::trim).unwrap_or("") {
            "api_key" | "authentication_error" => Self::ApiKey,
            "validation_error" => Self::Validation,
            "model_not_supported" => Self::ModelNotSupported,
            "rate_limit_error" => Self::RateLimit,
            "server_error" => Self::Server,
            "network_error" | "connection_error" => Self::Network,
            "request_error" => Self::Request,
            "timeout_error" => Self::Timeout,
            "configuration_error" => Self::Configuration,
            other => Self::Other(other.to_string()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UiError {
    /// Missing provider/model selection or an incomplete form.
    #[error("Setup error: {0}")]
    Setup(String),

    /// Transport failure: backend unreachable or connection dropped.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The backend answered, but not with the JSON shape we expect.
    #[error("Unexpected response: {0}")]
    ResponseFormat(String),

    #[error("Backend error ({kind:?}): {message}")]
    Backend {
        kind: BackendErrorKind,
        message: String,
        details: Option<String>,
    },
}

impl From<reqwest::Error> for UiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            UiError::Timeout(err.to_string())
        } else if err.is_decode() {
            UiError::ResponseFormat(err.to_string())
        } else {
            UiError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for UiError {
    fn from(err: serde_json::Error) -> Self {
        UiError::ResponseFormat(err.to_string())
    }
}

/// Title, short explanation and optional raw details shown to the user.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorView {
    pub title: &'static str,
    pub explanation: &'static str,
    pub details: Option<String>,
}

impl UiError {
    pub fn view(&self) -> ErrorView {
        match self {
            UiError::Setup(msg) => ErrorView {
                title: "Setup Required",
                explanation: "Select a provider and model, then fill in a topic and platform or a question.",
                details: Some(msg.clone()),
            },
            UiError::Network(msg) => ErrorView {
                title: "Network Error",
                explanation: "Could not reach the question service. Check that it is running and try again.",
                details: Some(msg.clone()),
            },
            UiError::Timeout(msg) => ErrorView {
                title: "Request Timed Out",
                explanation: "The question service took too long to answer.",
                details: Some(msg.clone()),
            },
            UiError::ResponseFormat(msg) => ErrorView {
                title: "Unexpected Response",
                explanation: "The question service answered in a format this page does not understand.",
                details: Some(msg.clone()),
            },
            UiError::Backend { kind, message, details } => {
                let (title, explanation) = backend_copy(kind);
                let mut raw = match details {
                    Some(d) if !d.is_empty() => format!("{message}\n{d}"),
                    _ => message.clone(),
                };
                if let BackendErrorKind::Other(error_type) = kind {
                    if !error_type.is_empty() {
                        raw.push_str(&format!(" [{error_type}]"));
                    }
                }
                ErrorView {
                    title,
                    explanation,
                    details: if raw.trim().is_empty() { None } else { Some(raw) },
                }
            }
        }
    }
}

fn backend_copy(kind: &BackendErrorKind) -> (&'static str, &'static str) {
    match kind {
        BackendErrorKind::ApiKey => (
            "API Key Error",
            "The API key was rejected. Enter a valid key or configure one on the server.",
        ),
        BackendErrorKind::Validation => (
            "Validation Error",
            "The request was rejected. Check the form fields and try again.",
        ),
        BackendErrorKind::ModelNotSupported => (
            "Model Not Supported",
            "The selected model cannot handle this request. Pick another model.",
        ),
        BackendErrorKind::RateLimit => (
            "Rate Limit Exceeded",
            "The provider is throttling requests. Wait a moment before trying again.",
        ),
        BackendErrorKind::Server => (
            "Server Error",
            "The question service failed while handling the request.",
        ),
        BackendErrorKind::Network => (
            "Network Error",
            "The question service could not reach the AI provider.",
        ),
        BackendErrorKind::Request => (
            "Request Error",
            "The request could not be processed.",
        ),
        BackendErrorKind::Timeout => (
            "Request Timed Out",
            "The AI provider took too long to answer.",
        ),
        BackendErrorKind::Configuration => (
            "Configuration Error",
            "The provider and model combination is not configured on the server.",
        ),
        BackendErrorKind::Other(_) => ("Error", "Something went wrong."),
    }
}

impl IntoResponse for UiError {
    fn into_response(self) -> Response {
        // htmx only swaps 2xx responses, so errors travel as regular fragments.
        let markup = crate::render::error_block(&self.view());
        (StatusCode::OK, markup).into_response()
    }
}
