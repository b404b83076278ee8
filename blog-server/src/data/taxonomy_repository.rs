use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{error, info};

use crate::data::{db_error, is_unique_violation};
use crate::domain::category::Category;
use crate::domain::error::DomainError;
use crate::domain::slug::slugify;
use crate::domain::tag::Tag;

/// Categories and tags. Both are created on demand through idempotent
/// upserts keyed by name; the slug is always derived from the name.
#[async_trait]
pub trait TaxonomyRepository: Send + Sync {
    /// Returns the existing category named `name` untouched, or creates it.
    async fn upsert_category(&self, name: &str, description: &str)
    -> Result<Category, DomainError>;
    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, DomainError>;
    async fn list_categories(&self) -> Result<Vec<Category>, DomainError>;
    /// Detaches the category from its posts, then removes it.
    async fn delete_category(&self, id: i64) -> Result<bool, DomainError>;
    async fn upsert_tag(&self, name: &str) -> Result<Tag, DomainError>;
    async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<Tag>, DomainError>;
    async fn list_tags(&self) -> Result<Vec<Tag>, DomainError>;
}

#[derive(Clone)]
pub struct PostgresTaxonomyRepository {
    pool: PgPool,
}

impl PostgresTaxonomyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn slug_conflict(kind: &'static str, name: &str) -> impl Fn(sqlx::Error) -> DomainError {
    let name = name.to_string();
    move |e| {
        if is_unique_violation(&e, "_slug") {
            DomainError::Validation(format!("{kind} slug for {name:?} is already taken"))
        } else {
            error!("failed to upsert {}: {}", kind, e);
            DomainError::Internal(format!("database error: {}", e))
        }
    }
}

#[async_trait]
impl TaxonomyRepository for PostgresTaxonomyRepository {
    async fn upsert_category(
        &self,
        name: &str,
        description: &str,
    ) -> Result<Category, DomainError> {
        // the no-op update makes RETURNING yield the existing row
        let category = sqlx::query_as::<_, Category>(
            r#"
            INSERT INTO categories (name, slug, description)
            VALUES ($1, $2, $3)
            ON CONFLICT (name) DO UPDATE SET name = categories.name
            RETURNING id, name, slug, description
            "#,
        )
        .bind(name)
        .bind(slugify(name))
        .bind(description)
        .fetch_one(&self.pool)
        .await
        .map_err(slug_conflict("category", name))?;

        info!(category_id = category.id, slug = %category.slug, "category upserted");
        Ok(category)
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, DomainError> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, description FROM categories WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("find category by slug"))
    }

    async fn list_categories(&self) -> Result<Vec<Category>, DomainError> {
        sqlx::query_as::<_, Category>(
            "SELECT id, name, slug, description FROM categories ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_error("list categories"))
    }

    async fn delete_category(&self, id: i64) -> Result<bool, DomainError> {
        let mut tx = self.pool.begin().await.map_err(db_error("begin"))?;

        let detached = sqlx::query("UPDATE posts SET category_id = NULL WHERE category_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("detach category posts"))?;

        let deleted = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_error("delete category"))?;

        tx.commit().await.map_err(db_error("commit"))?;

        let removed = deleted.rows_affected() > 0;
        if removed {
            info!(
                category_id = id,
                detached_posts = detached.rows_affected(),
                "category deleted"
            );
        }
        Ok(removed)
    }

    async fn upsert_tag(&self, name: &str) -> Result<Tag, DomainError> {
        let tag = sqlx::query_as::<_, Tag>(
            r#"
            INSERT INTO tags (name, slug)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET name = tags.name
            RETURNING id, name, slug
            "#,
        )
        .bind(name)
        .bind(slugify(name))
        .fetch_one(&self.pool)
        .await
        .map_err(slug_conflict("tag", name))?;

        info!(tag_id = tag.id, slug = %tag.slug, "tag upserted");
        Ok(tag)
    }

    async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<Tag>, DomainError> {
        sqlx::query_as::<_, Tag>("SELECT id, name, slug FROM tags WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("find tag by slug"))
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, DomainError> {
        sqlx::query_as::<_, Tag>("SELECT id, name, slug FROM tags ORDER BY name")
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list tags"))
    }
}
