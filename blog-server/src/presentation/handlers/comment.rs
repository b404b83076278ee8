use actix_web::{HttpRequest, HttpResponse, get, post, web};
use tracing::info;

use crate::application::AppState;
use crate::domain::error::DomainError;
use crate::presentation::dto::{CommentForm, CommentFormContext};
use crate::presentation::handlers::post::detail_context;
use crate::presentation::utils::{AuthenticatedUser, request_id};

#[post("/{id:\\d+}/new_comment/")]
async fn new_comment(
    req: HttpRequest,
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
    payload: web::Json<CommentForm>,
) -> Result<HttpResponse, DomainError> {
    let post_id = path.into_inner();
    let comment = state
        .comments
        .create_comment(user.id, post_id, &payload.text)
        .await?;

    info!(
        request_id = %request_id(&req),
        username = %user.username,
        post_id,
        comment_id = comment.id,
        "comment created"
    );

    let context = detail_context(&state, post_id, Some(user.id)).await?;
    Ok(HttpResponse::Created().json(context))
}

#[get("/edit_comment/{id:\\d+}/")]
async fn edit_comment_form(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, DomainError> {
    let comment = state
        .comments
        .comment_for_edit(user.id, path.into_inner())
        .await?;
    let post = state.posts.get_post(comment.post_id).await?;

    Ok(HttpResponse::Ok().json(CommentFormContext {
        heading: format!("Edit comment: {}", post.title),
        action: format!("/blog/edit_comment/{}/", comment.id),
        post_id: comment.post_id,
        form: CommentForm { text: comment.text },
    }))
}

#[post("/edit_comment/{id:\\d+}/")]
async fn edit_comment(
    req: HttpRequest,
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
    payload: web::Json<CommentForm>,
) -> Result<HttpResponse, DomainError> {
    let comment = state
        .comments
        .edit_comment(user.id, path.into_inner(), &payload.text)
        .await?;

    info!(
        request_id = %request_id(&req),
        username = %user.username,
        comment_id = comment.id,
        "comment updated"
    );

    let context = detail_context(&state, comment.post_id, Some(user.id)).await?;
    Ok(HttpResponse::Ok().json(context))
}

#[get("/delete_comment/{id:\\d+}/")]
async fn delete_comment(
    req: HttpRequest,
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, DomainError> {
    let comment = state
        .comments
        .delete_comment(user.id, path.into_inner())
        .await?;

    info!(
        request_id = %request_id(&req),
        username = %user.username,
        comment_id = comment.id,
        "comment deleted"
    );

    let context = detail_context(&state, comment.post_id, Some(user.id)).await?;
    Ok(HttpResponse::Ok().json(context))
}
