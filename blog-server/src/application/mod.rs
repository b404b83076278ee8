pub mod auth_service;
pub mod comment_service;
pub mod pagination;
pub mod post_service;
pub mod taxonomy_service;

use crate::data::Repositories;
use crate::infrastructure::security::JwtKeys;
use auth_service::AuthService;
use comment_service::CommentService;
use post_service::PostService;
use taxonomy_service::TaxonomyService;

/// Services shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub posts: PostService,
    pub comments: CommentService,
    pub taxonomy: TaxonomyService,
}

impl AppState {
    pub fn new(repos: Repositories, keys: JwtKeys) -> Self {
        let taxonomy = TaxonomyService::new(repos.taxonomy.clone());
        Self {
            auth: AuthService::new(repos.users.clone(), keys),
            posts: PostService::new(repos.posts.clone(), taxonomy.clone()),
            comments: CommentService::new(repos.comments.clone(), repos.posts.clone()),
            taxonomy,
        }
    }
}
