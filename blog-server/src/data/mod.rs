pub mod comment_repository;
pub mod memory;
pub mod post_repository;
pub mod taxonomy_repository;
pub mod user_repository;

use std::sync::Arc;

use sqlx::PgPool;
use tracing::error;

use crate::domain::error::DomainError;
use comment_repository::{CommentRepository, PostgresCommentRepository};
use memory::MemoryStore;
use post_repository::{PostRepository, PostgresPostRepository};
use taxonomy_repository::{PostgresTaxonomyRepository, TaxonomyRepository};
use user_repository::{PostgresUserRepository, UserRepository};

/// The store as seen by the services: one handle per aggregate.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub taxonomy: Arc<dyn TaxonomyRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PostgresUserRepository::new(pool.clone())),
            posts: Arc::new(PostgresPostRepository::new(pool.clone())),
            comments: Arc::new(PostgresCommentRepository::new(pool.clone())),
            taxonomy: Arc::new(PostgresTaxonomyRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        let store = Arc::new(MemoryStore::new());
        Self {
            users: store.clone(),
            posts: store.clone(),
            comments: store.clone(),
            taxonomy: store,
        }
    }
}

pub(crate) fn db_error(operation: &'static str) -> impl Fn(sqlx::Error) -> DomainError {
    move |e| {
        error!(operation, "database error: {}", e);
        DomainError::Internal(format!("database error: {}", e))
    }
}

pub(crate) fn is_unique_violation(e: &sqlx::Error, constraint: &str) -> bool {
    e.as_database_error()
        .and_then(|db| db.constraint())
        .map(|c| c.contains(constraint))
        == Some(true)
}
