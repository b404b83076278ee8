use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("authentication required")]
    NotAuthenticated,
    #[error("permission denied")]
    PermissionDenied,
    #[error("unauthorized")]
    Unauthorized,
    #[error("user not found: {0}")]
    UserNotFound(i64),
    #[error("user already exists: {0}")]
    UserAlreadyExists(String),
    #[error("post not found: {0}")]
    PostNotFound(i64),
    #[error("comment not found: {0}")]
    CommentNotFound(i64),
    #[error("category not found: {0}")]
    CategoryNotFound(String),
    #[error("tag not found: {0}")]
    TagNotFound(String),
    #[error("page not found: {0}")]
    PageNotFound(u32),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DomainError::UserNotFound(_)
                | DomainError::PostNotFound(_)
                | DomainError::CommentNotFound(_)
                | DomainError::CategoryNotFound(_)
                | DomainError::TagNotFound(_)
                | DomainError::PageNotFound(_)
        )
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl ResponseError for DomainError {
    fn status_code(&self) -> StatusCode {
        match self {
            e if e.is_not_found() => StatusCode::NOT_FOUND,
            DomainError::NotAuthenticated | DomainError::Unauthorized => StatusCode::UNAUTHORIZED,
            DomainError::PermissionDenied => StatusCode::FORBIDDEN,
            DomainError::UserAlreadyExists(_) => StatusCode::CONFLICT,
            DomainError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = self.to_string();
        let details = match self {
            DomainError::PostNotFound(id)
            | DomainError::CommentNotFound(id)
            | DomainError::UserNotFound(id) => Some(json!({ "resource": id })),
            DomainError::CategoryNotFound(slug) | DomainError::TagNotFound(slug) => {
                Some(json!({ "resource": slug }))
            }
            DomainError::PermissionDenied => {
                Some(json!({ "message": "only the author may change this resource" }))
            }
            DomainError::NotAuthenticated => Some(json!({ "login_url": "/auth/login" })),
            _ => None,
        };
        let body = ErrorBody {
            error: message.as_str(),
            details,
        };
        HttpResponse::build(self.status_code()).json(body)
    }
}
