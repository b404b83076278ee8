use actix_web::http::header::LOCATION;
use actix_web::{HttpRequest, HttpResponse, get, post, web};
use chrono::Utc;
use tracing::info;

use crate::application::AppState;
use crate::domain::category::CategoryCount;
use crate::domain::error::DomainError;
use crate::domain::post::PostFilter;
use crate::domain::user::UserId;
use crate::presentation::dto::{
    ListingSelection, PageQuery, PostDetailContext, PostForm, PostFormContext, PostListContext,
    Sidebar,
};
use crate::presentation::utils::{AuthenticatedUser, Viewer, request_id};

pub(crate) async fn sidebar(state: &AppState) -> Result<Sidebar, DomainError> {
    Ok(Sidebar::new(state.posts.category_counts().await?))
}

pub(crate) async fn detail_context(
    state: &AppState,
    post_id: i64,
    viewer: Option<UserId>,
) -> Result<PostDetailContext, DomainError> {
    let post = state.posts.get_post(post_id).await?;
    let comments = state.comments.comments_for_post(post_id).await?;
    Ok(PostDetailContext::new(
        post,
        comments,
        viewer,
        sidebar(state).await?,
    ))
}

async fn list_context(
    state: &AppState,
    heading: String,
    selection: ListingSelection,
    filter: &PostFilter,
    page: u32,
) -> Result<PostListContext, DomainError> {
    let page = state.posts.page(filter, page).await?;
    Ok(PostListContext {
        heading,
        selection,
        posts: page.items.into_iter().map(Into::into).collect(),
        page: page.info,
        sidebar: sidebar(state).await?,
    })
}

#[get("/")]
async fn list_posts(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, DomainError> {
    let context = list_context(
        &state,
        "Blog".into(),
        ListingSelection::default(),
        &PostFilter::All,
        query.page,
    )
    .await?;
    Ok(HttpResponse::Ok().json(context))
}

#[get("/{id:\\d+}/")]
async fn post_detail(
    state: web::Data<AppState>,
    viewer: Viewer,
    path: web::Path<i64>,
) -> Result<HttpResponse, DomainError> {
    let context = detail_context(&state, path.into_inner(), viewer.id()).await?;
    Ok(HttpResponse::Ok().json(context))
}

#[get("/category/{slug}/")]
async fn category_posts(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, DomainError> {
    let slug = path.into_inner();
    let category = state.taxonomy.category_for_slug(&slug).await?;
    let filter = PostFilter::Category(category.as_ref().map(|c| c.id));
    let count = state.posts.count_posts(&filter).await?;
    let entry = match category {
        Some(category) => CategoryCount::new(category.name, category.slug, count),
        None => CategoryCount::uncategorized(count),
    };

    let context = list_context(
        &state,
        format!("Blog - {}", entry.name),
        ListingSelection {
            category: Some(entry),
            ..ListingSelection::default()
        },
        &filter,
        query.page,
    )
    .await?;
    Ok(HttpResponse::Ok().json(context))
}

#[get("/tag/{slug}/")]
async fn tag_posts(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, DomainError> {
    let tag = state.taxonomy.tag_for_slug(&path.into_inner()).await?;
    let filter = PostFilter::Tag(tag.id);

    let context = list_context(
        &state,
        format!("Blog - #{}", tag.name),
        ListingSelection {
            tag: Some(tag),
            ..ListingSelection::default()
        },
        &filter,
        query.page,
    )
    .await?;
    Ok(HttpResponse::Ok().json(context))
}

#[get("/search/{term}/")]
async fn search_posts(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, DomainError> {
    let term = path.into_inner();
    let filter = state.posts.search_filter(&term)?;
    let found = state.posts.count_posts(&filter).await?;

    let context = list_context(
        &state,
        "Blog".into(),
        ListingSelection {
            search_info: Some(format!("Search: {term} ({found})")),
            ..ListingSelection::default()
        },
        &filter,
        query.page,
    )
    .await?;
    Ok(HttpResponse::Ok().json(context))
}

#[get("/create/")]
async fn create_form(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
) -> Result<HttpResponse, DomainError> {
    Ok(HttpResponse::Ok().json(PostFormContext {
        heading: "Create New Post".into(),
        action: "/blog/create/".into(),
        form: PostForm::default(),
        categories: state.taxonomy.list_categories().await?,
    }))
}

#[post("/create/")]
async fn create_post(
    req: HttpRequest,
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    payload: web::Json<PostForm>,
) -> Result<HttpResponse, DomainError> {
    let form = payload.into_inner();
    let created_at = form.created_at.unwrap_or_else(Utc::now);
    let post = state.posts.create_post(user.id, form, created_at).await?;

    info!(
        request_id = %request_id(&req),
        username = %user.username,
        post_id = post.id,
        "post created"
    );

    let context = detail_context(&state, post.id, Some(user.id)).await?;
    Ok(HttpResponse::Created()
        .insert_header((LOCATION, post.url()))
        .json(context))
}

#[get("/{id:\\d+}/update/")]
async fn update_form(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, DomainError> {
    let post = state.posts.post_for_edit(user.id, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(PostFormContext {
        heading: format!("Edit Post: {}", post.title),
        action: post.update_url(),
        form: PostForm::from_post(&post),
        categories: state.taxonomy.list_categories().await?,
    }))
}

#[post("/{id:\\d+}/update/")]
async fn update_post(
    req: HttpRequest,
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
    payload: web::Json<PostForm>,
) -> Result<HttpResponse, DomainError> {
    let post_id = path.into_inner();
    state
        .posts
        .update_post(user.id, post_id, payload.into_inner())
        .await?;

    info!(
        request_id = %request_id(&req),
        username = %user.username,
        post_id,
        "post updated"
    );

    let context = detail_context(&state, post_id, Some(user.id)).await?;
    Ok(HttpResponse::Ok().json(context))
}

#[post("/{id:\\d+}/delete/")]
async fn delete_post(
    req: HttpRequest,
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, DomainError> {
    let post_id = path.into_inner();
    state.posts.delete_post(user.id, post_id).await?;

    info!(
        request_id = %request_id(&req),
        username = %user.username,
        post_id,
        "post deleted"
    );

    Ok(HttpResponse::NoContent().finish())
}
