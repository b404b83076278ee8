pub mod auth;
pub mod comment;
pub mod post;

use actix_web::{HttpResponse, Responder, web};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::application::AppState;
use crate::presentation::middleware::IdentityMiddleware;

/// Registers every route. The `/blog` scope resolves the bearer token, if
/// any, into the request identity.
pub fn configure(state: AppState) -> impl FnOnce(&mut web::ServiceConfig) {
    move |cfg| {
        let identity = IdentityMiddleware::new(state.auth.clone());
        cfg.app_data(web::Data::new(state))
            .route("/health", web::get().to(health))
            .service(auth::scope())
            .service(
                web::scope("/blog")
                    .wrap(identity)
                    .service(post::list_posts)
                    .service(post::post_detail)
                    .service(post::category_posts)
                    .service(post::tag_posts)
                    .service(post::search_posts)
                    .service(post::create_form)
                    .service(post::create_post)
                    .service(post::update_form)
                    .service(post::update_post)
                    .service(post::delete_post)
                    .service(comment::new_comment)
                    .service(comment::edit_comment_form)
                    .service(comment::edit_comment)
                    .service(comment::delete_comment),
            );
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
}

async fn health() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        timestamp: Utc::now(),
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::application::AppState;
    use crate::data::Repositories;
    use crate::domain::user::UserId;
    use crate::infrastructure::security::JwtKeys;

    pub fn state() -> AppState {
        AppState::new(Repositories::in_memory(), JwtKeys::new("test-secret".into()))
    }

    /// Registers `username` and returns its id and an `Authorization` value.
    pub async fn sign_up(state: &AppState, username: &str) -> (UserId, String) {
        let user = state.auth.register(username, "nopassword").await.unwrap();
        let token = state.auth.issue_token(user.id).unwrap();
        (user.id, format!("Bearer {token}"))
    }
}
