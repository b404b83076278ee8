use actix_web::{HttpResponse, Scope, post, web};
use tracing::info;

use crate::application::AppState;
use crate::domain::error::DomainError;
use crate::infrastructure::security::TOKEN_TTL_SECONDS;
use crate::presentation::dto::{AuthResponse, LoginRequest, RegisterRequest};

pub fn scope() -> Scope {
    web::scope("/auth").service(register).service(login)
}

fn bearer(access_token: String) -> AuthResponse {
    AuthResponse {
        access_token,
        expires_in: TOKEN_TTL_SECONDS,
        token_type: "Bearer".to_string(),
    }
}

#[post("/register")]
async fn register(
    state: web::Data<AppState>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, DomainError> {
    let user = state
        .auth
        .register(&payload.username, &payload.password)
        .await?;
    let token = state.auth.issue_token(user.id)?;

    info!(user_id = user.id, username = %user.username, "user registered");

    Ok(HttpResponse::Created().json(bearer(token)))
}

#[post("/login")]
async fn login(
    state: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, DomainError> {
    let token = state
        .auth
        .login(&payload.username, &payload.password)
        .await?;

    Ok(HttpResponse::Ok().json(bearer(token)))
}
