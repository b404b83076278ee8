use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlogClientError {
    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("not authenticated: {0}")]
    NotAuthenticated(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("token file error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl BlogClientError {
    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => BlogClientError::NotAuthenticated(message),
            StatusCode::FORBIDDEN => BlogClientError::PermissionDenied(message),
            StatusCode::NOT_FOUND => BlogClientError::NotFound(message),
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT => {
                BlogClientError::InvalidRequest(message)
            }
            _ => BlogClientError::Server {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Maps a non-success response, using the server's `{"error": ...}` body
    /// as the message when there is one.
    pub async fn from_http_response(resp: reqwest::Response) -> Self {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.error)
            .unwrap_or(text);
        Self::from_status(status, message)
    }
}
