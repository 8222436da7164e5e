// Error taxonomy for the video generation pipeline.
// Every handler failure serializes to the uniform `{"detail": ...}` envelope.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Caller-supplied data failed a precondition. Surfaces as HTTP 400.
    #[error("{0}")]
    InvalidInput(String),

    /// A third-party provider returned a non-success response or an
    /// unparseable payload. The upstream message is carried verbatim.
    #[error("{provider}: {message}")]
    Upstream {
        provider: &'static str,
        status: Option<u16>,
        message: String,
    },

    /// Animation polling exceeded its configured bound.
    #[error("animation render timed out after {waited:?}")]
    Timeout { waited: Duration },
}

impl PipelineError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn upstream(provider: &'static str, status: Option<u16>, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = match status {
            Some(code) => format!("({}) {}", code, message),
            None => message,
        };
        Self::Upstream {
            provider,
            status,
            message,
        }
    }

    /// Wrap a transport-level reqwest failure for a named provider.
    pub fn transport(provider: &'static str, err: reqwest::Error) -> Self {
        Self::Upstream {
            provider,
            status: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
        }
    }
}

/// Axum-facing wrapper so handlers can use `?` on `PipelineError`.
#[derive(Debug)]
pub struct ApiError(pub PipelineError);

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            PipelineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            PipelineError::Upstream { .. } | PipelineError::Timeout { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::warn!(error = %self.0, "rejected request");
        }

        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_maps_to_400() {
        let resp = ApiError(PipelineError::invalid("missing 'text'")).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn upstream_and_timeout_map_to_500() {
        let resp = ApiError(PipelineError::upstream("d-id", Some(502), "bad gateway")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let resp = ApiError(PipelineError::Timeout {
            waited: Duration::from_secs(120),
        })
        .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn upstream_message_carries_status_code() {
        let err = PipelineError::upstream("fish-audio", Some(401), "invalid api key");
        assert_eq!(err.to_string(), "fish-audio: (401) invalid api key");
    }
}
