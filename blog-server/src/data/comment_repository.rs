use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::info;

use crate::data::db_error;
use crate::domain::comment::Comment;
use crate::domain::error::DomainError;
use crate::domain::user::{UserId, UserRef};

#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create(
        &self,
        post_id: i64,
        author_id: UserId,
        text: &str,
    ) -> Result<Comment, DomainError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Comment>, DomainError>;
    async fn update_text(&self, id: i64, text: &str) -> Result<Option<Comment>, DomainError>;
    async fn delete(&self, id: i64) -> Result<bool, DomainError>;
    /// Comments of one post in creation order.
    async fn list_for_post(&self, post_id: i64) -> Result<Vec<Comment>, DomainError>;
    async fn count_for_post(&self, post_id: i64) -> Result<u64, DomainError>;
}

#[derive(Clone)]
pub struct PostgresCommentRepository {
    pool: PgPool,
}

impl PostgresCommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const COMMENT_SELECT: &str = r#"
    SELECT c.id, c.post_id, c.text, c.created_at, c.modified_at,
           c.author_id, u.username AS author_username
    FROM comments c
    JOIN users u ON u.id = c.author_id
"#;

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    post_id: i64,
    text: String,
    created_at: DateTime<Utc>,
    modified_at: Option<DateTime<Utc>>,
    author_id: i64,
    author_username: String,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            post_id: row.post_id,
            text: row.text,
            author: UserRef {
                id: row.author_id,
                username: row.author_username,
            },
            created_at: row.created_at,
            modified_at: row.modified_at,
        }
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    async fn create(
        &self,
        post_id: i64,
        author_id: UserId,
        text: &str,
    ) -> Result<Comment, DomainError> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO comments (post_id, author_id, text, created_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id
            "#,
        )
        .bind(post_id)
        .bind(author_id)
        .bind(text)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(db_error("create comment"))?;

        info!(comment_id = id, post_id, author_id, "comment created");
        self.find_by_id(id)
            .await?
            .ok_or(DomainError::CommentNotFound(id))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Comment>, DomainError> {
        let row = sqlx::query_as::<_, CommentRow>(&format!("{COMMENT_SELECT} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("find comment by id"))?;
        Ok(row.map(Comment::from))
    }

    async fn update_text(&self, id: i64, text: &str) -> Result<Option<Comment>, DomainError> {
        let updated = sqlx::query("UPDATE comments SET text = $1, modified_at = $2 WHERE id = $3")
            .bind(text)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("update comment"))?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }
        info!(comment_id = id, "comment updated");
        self.find_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool, DomainError> {
        let deleted = sqlx::query("DELETE FROM comments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete comment"))?;

        let removed = deleted.rows_affected() > 0;
        if removed {
            info!(comment_id = id, "comment deleted");
        }
        Ok(removed)
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<Comment>, DomainError> {
        let rows = sqlx::query_as::<_, CommentRow>(&format!(
            "{COMMENT_SELECT} WHERE c.post_id = $1 ORDER BY c.created_at, c.id"
        ))
        .bind(post_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list comments"))?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn count_for_post(&self, post_id: i64) -> Result<u64, DomainError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("count comments"))?;
        Ok(count as u64)
    }
}
