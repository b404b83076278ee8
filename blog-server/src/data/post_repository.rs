use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::info;

use crate::data::db_error;
use crate::domain::category::Category;
use crate::domain::error::DomainError;
use crate::domain::post::{Post, PostDraft, PostFilter};
use crate::domain::tag::Tag;
use crate::domain::user::{UserId, UserRef};

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(
        &self,
        author_id: UserId,
        created_at: DateTime<Utc>,
        draft: PostDraft,
    ) -> Result<Post, DomainError>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, DomainError>;
    /// Replaces every editable field, tag set included.
    async fn update(&self, id: i64, draft: PostDraft) -> Result<Option<Post>, DomainError>;
    /// Removes the post and its comments. Returns `false` if it did not exist.
    async fn delete(&self, id: i64) -> Result<bool, DomainError>;
    /// Newest first; `limit = None` returns every match from `offset` on.
    async fn list(
        &self,
        filter: &PostFilter,
        limit: Option<u32>,
        offset: u32,
    ) -> Result<Vec<Post>, DomainError>;
    async fn count(&self, filter: &PostFilter) -> Result<u64, DomainError>;
    /// Every category ordered by name, with the number of posts in it.
    async fn count_by_category(&self) -> Result<Vec<(Category, u64)>, DomainError>;
}

#[derive(Clone)]
pub struct PostgresPostRepository {
    pool: PgPool,
}

impl PostgresPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn hydrate(&self, rows: Vec<PostRow>) -> Result<Vec<Post>, DomainError> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let links = sqlx::query_as::<_, TagLinkRow>(
            r#"
            SELECT pt.post_id, t.id, t.name, t.slug
            FROM post_tags pt
            JOIN tags t ON t.id = pt.tag_id
            WHERE pt.post_id = ANY($1)
            ORDER BY pt.id
            "#,
        )
        .bind(&ids[..])
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("load post tags"))?;

        let mut tags: HashMap<i64, Vec<Tag>> = HashMap::new();
        for link in links {
            tags.entry(link.post_id).or_default().push(Tag {
                id: link.id,
                name: link.name,
                slug: link.slug,
            });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let post_tags = tags.remove(&row.id).unwrap_or_default();
                row.into_post(post_tags)
            })
            .collect())
    }

    async fn replace_tags(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        post_id: i64,
        tag_ids: &[i64],
    ) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
            .bind(post_id)
            .execute(&mut **tx)
            .await
            .map_err(db_error("clear post tags"))?;

        for tag_id in tag_ids {
            sqlx::query(
                "INSERT INTO post_tags (post_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(post_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await
            .map_err(db_error("link post tag"))?;
        }
        Ok(())
    }
}

const POST_SELECT: &str = r#"
    SELECT p.id, p.title, p.content, p.head_image, p.created_at, p.updated_at,
           p.author_id, u.username AS author_username,
           c.id AS category_id, c.name AS category_name,
           c.slug AS category_slug, c.description AS category_description
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN categories c ON c.id = p.category_id
"#;

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &PostFilter) {
    match filter {
        PostFilter::All => {}
        PostFilter::Category(Some(id)) => {
            qb.push(" WHERE p.category_id = ").push_bind(*id);
        }
        PostFilter::Category(None) => {
            qb.push(" WHERE p.category_id IS NULL");
        }
        PostFilter::Tag(id) => {
            qb.push(" WHERE EXISTS (SELECT 1 FROM post_tags pt")
                .push(" WHERE pt.post_id = p.id AND pt.tag_id = ")
                .push_bind(*id)
                .push(")");
        }
        // strpos keeps the match literal: no LIKE wildcards, case preserved
        PostFilter::Search(term) => {
            qb.push(" WHERE (strpos(p.title, ")
                .push_bind(term.clone())
                .push(") > 0 OR strpos(p.content, ")
                .push_bind(term.clone())
                .push(") > 0)");
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostRow {
    id: i64,
    title: String,
    content: String,
    head_image: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    author_id: i64,
    author_username: String,
    category_id: Option<i64>,
    category_name: Option<String>,
    category_slug: Option<String>,
    category_description: Option<String>,
}

impl PostRow {
    fn into_post(self, tags: Vec<Tag>) -> Post {
        let category = match (self.category_id, self.category_name, self.category_slug) {
            (Some(id), Some(name), Some(slug)) => Some(Category {
                id,
                name,
                slug,
                description: self.category_description.unwrap_or_default(),
            }),
            _ => None,
        };
        Post {
            id: self.id,
            title: self.title,
            content: self.content,
            head_image: self.head_image,
            created_at: self.created_at,
            updated_at: self.updated_at,
            author: UserRef {
                id: self.author_id,
                username: self.author_username,
            },
            category,
            tags,
        }
    }
}

#[derive(sqlx::FromRow)]
struct TagLinkRow {
    post_id: i64,
    id: i64,
    name: String,
    slug: String,
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn create(
        &self,
        author_id: UserId,
        created_at: DateTime<Utc>,
        draft: PostDraft,
    ) -> Result<Post, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error("begin"))?;

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO posts
                (title, content, head_image, created_at, updated_at, author_id, category_id)
            VALUES ($1, $2, $3, $4, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(&draft.head_image)
        .bind(created_at)
        .bind(author_id)
        .bind(draft.category_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(db_error("create post"))?;

        Self::replace_tags(&mut tx, id, &draft.tag_ids).await?;
        tx.commit().await.map_err(db_error("commit"))?;

        info!(post_id = id, author_id, "post created");
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::Internal("created post vanished".into()))
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, DomainError> {
        let row = sqlx::query_as::<_, PostRow>(&format!("{POST_SELECT} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("find post by id"))?;

        match row {
            Some(row) => Ok(self.hydrate(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn update(&self, id: i64, draft: PostDraft) -> Result<Option<Post>, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error("begin"))?;

        let updated = sqlx::query(
            r#"
            UPDATE posts
            SET title = $1, content = $2, head_image = $3, category_id = $4, updated_at = $5
            WHERE id = $6
            "#,
        )
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(&draft.head_image)
        .bind(draft.category_id)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(db_error("update post"))?;

        if updated.rows_affected() == 0 {
            return Ok(None);
        }

        Self::replace_tags(&mut tx, id, &draft.tag_ids).await?;
        tx.commit().await.map_err(db_error("commit"))?;

        info!(post_id = id, "post updated");
        self.find_by_id(id).await
    }

    async fn delete(&self, id: i64) -> Result<bool, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error("begin"))?;

        let comments = sqlx::query("DELETE FROM comments WHERE post_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("delete post comments"))?;

        sqlx::query("DELETE FROM post_tags WHERE post_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("delete post tag links"))?;

        let deleted = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("delete post"))?;

        tx.commit().await.map_err(db_error("commit"))?;

        if deleted.rows_affected() == 0 {
            return Ok(false);
        }
        info!(post_id = id, comments = comments.rows_affected(), "post deleted");
        Ok(true)
    }

    async fn list(
        &self,
        filter: &PostFilter,
        limit: Option<u32>,
        offset: u32,
    ) -> Result<Vec<Post>, DomainError> {
        let mut qb = QueryBuilder::<Postgres>::new(POST_SELECT);
        push_filter(&mut qb, filter);
        qb.push(" ORDER BY p.created_at DESC, p.id DESC");
        if let Some(limit) = limit {
            qb.push(" LIMIT ").push_bind(i64::from(limit));
        }
        qb.push(" OFFSET ").push_bind(i64::from(offset));

        let rows = qb
            .build_query_as::<PostRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list posts"))?;

        self.hydrate(rows).await
    }

    async fn count(&self, filter: &PostFilter) -> Result<u64, DomainError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts p");
        push_filter(&mut qb, filter);

        let (count,) = qb
            .build_query_as::<(i64,)>()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("count posts"))?;

        Ok(count as u64)
    }

    async fn count_by_category(&self) -> Result<Vec<(Category, u64)>, DomainError> {
        let rows = sqlx::query_as::<_, (i64, String, String, String, i64)>(
            r#"
            SELECT c.id, c.name, c.slug, c.description, COUNT(p.id)
            FROM categories c
            LEFT JOIN posts p ON p.category_id = c.id
            GROUP BY c.id, c.name, c.slug, c.description
            ORDER BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("count posts by category"))?;

        Ok(rows
            .into_iter()
            .map(|(id, name, slug, description, count)| {
                (
                    Category {
                        id,
                        name,
                        slug,
                        description,
                    },
                    count as u64,
                )
            })
            .collect())
    }
}
