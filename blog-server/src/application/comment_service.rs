use std::sync::Arc;

use tracing::{info, instrument};

use crate::data::comment_repository::CommentRepository;
use crate::data::post_repository::PostRepository;
use crate::domain::comment::{Comment, validate_comment_text};
use crate::domain::error::DomainError;
use crate::domain::permissions::ensure_owner;
use crate::domain::user::UserId;

#[derive(Clone)]
pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    posts: Arc<dyn PostRepository>,
}

impl CommentService {
    pub fn new(comments: Arc<dyn CommentRepository>, posts: Arc<dyn PostRepository>) -> Self {
        Self { comments, posts }
    }

    pub async fn get_comment(&self, id: i64) -> Result<Comment, DomainError> {
        self.comments
            .find_by_id(id)
            .await?
            .ok_or(DomainError::CommentNotFound(id))
    }

    pub async fn comments_for_post(&self, post_id: i64) -> Result<Vec<Comment>, DomainError> {
        self.comments.list_for_post(post_id).await
    }

    pub async fn count_for_post(&self, post_id: i64) -> Result<u64, DomainError> {
        self.comments.count_for_post(post_id).await
    }

    #[instrument(skip(self, text))]
    pub async fn create_comment(
        &self,
        author_id: UserId,
        post_id: i64,
        text: &str,
    ) -> Result<Comment, DomainError> {
        validate_comment_text(text)?;
        if self.posts.find_by_id(post_id).await?.is_none() {
            return Err(DomainError::PostNotFound(post_id));
        }
        self.comments.create(post_id, author_id, text).await
    }

    /// The comment as shown in its edit form; only its author may open it.
    pub async fn comment_for_edit(
        &self,
        user_id: UserId,
        comment_id: i64,
    ) -> Result<Comment, DomainError> {
        let comment = self.get_comment(comment_id).await?;
        ensure_owner(Some(user_id), comment.author.id)?;
        Ok(comment)
    }

    #[instrument(skip(self, text))]
    pub async fn edit_comment(
        &self,
        user_id: UserId,
        comment_id: i64,
        text: &str,
    ) -> Result<Comment, DomainError> {
        self.comment_for_edit(user_id, comment_id).await?;
        validate_comment_text(text)?;
        self.comments
            .update_text(comment_id, text)
            .await?
            .ok_or(DomainError::CommentNotFound(comment_id))
    }

    /// Deletes the comment if `user_id` wrote it and returns what was removed.
    #[instrument(skip(self))]
    pub async fn delete_comment(
        &self,
        user_id: UserId,
        comment_id: i64,
    ) -> Result<Comment, DomainError> {
        let comment = self.get_comment(comment_id).await?;
        if let Err(err) = ensure_owner(Some(user_id), comment.author.id) {
            info!(comment_id, user_id, "refused to delete another user's comment");
            return Err(err);
        }
        if !self.comments.delete(comment_id).await? {
            return Err(DomainError::CommentNotFound(comment_id));
        }
        Ok(comment)
    }
}
