use std::sync::Arc;

use tracing::instrument;

use crate::data::taxonomy_repository::TaxonomyRepository;
use crate::domain::category::{Category, validate_category_name};
use crate::domain::error::DomainError;
use crate::domain::slug::{UNCATEGORIZED_SLUG, slugify};
use crate::domain::tag::{Tag, parse_tag_names, validate_tag_name};

#[derive(Clone)]
pub struct TaxonomyService {
    repo: Arc<dyn TaxonomyRepository>,
}

impl TaxonomyService {
    pub fn new(repo: Arc<dyn TaxonomyRepository>) -> Self {
        Self { repo }
    }

    #[instrument(skip(self))]
    pub async fn upsert_category(
        &self,
        name: &str,
        description: &str,
    ) -> Result<Category, DomainError> {
        let name = name.trim();
        validate_category_name(name)?;
        self.repo.upsert_category(name, description).await
    }

    pub async fn upsert_tag(&self, name: &str) -> Result<Tag, DomainError> {
        let name = name.trim();
        validate_tag_name(name)?;
        self.repo.upsert_tag(name).await
    }

    /// Upserts every tag named in a form's tag string, in order.
    pub async fn upsert_tags(&self, tags_str: &str) -> Result<Vec<Tag>, DomainError> {
        let mut tags = Vec::new();
        for name in parse_tag_names(tags_str) {
            tags.push(self.upsert_tag(&name).await?);
        }
        Ok(tags)
    }

    /// Checks that `name` would upsert cleanly: valid, and its slug is free
    /// or already belongs to the same name. Writes nothing.
    pub async fn check_category(&self, name: &str) -> Result<(), DomainError> {
        let name = name.trim();
        validate_category_name(name)?;
        match self.repo.find_category_by_slug(&slugify(name)).await? {
            Some(existing) if existing.name != name => Err(slug_taken("category", name)),
            _ => Ok(()),
        }
    }

    /// Same as [`Self::check_category`] for every tag in a form's tag string,
    /// including slug clashes between the tags themselves.
    pub async fn check_tags(&self, tags_str: &str) -> Result<(), DomainError> {
        let mut slugs: Vec<String> = Vec::new();
        for name in parse_tag_names(tags_str) {
            validate_tag_name(&name)?;
            let slug = slugify(&name);
            if slugs.contains(&slug) {
                return Err(slug_taken("tag", &name));
            }
            match self.repo.find_tag_by_slug(&slug).await? {
                Some(existing) if existing.name != name => return Err(slug_taken("tag", &name)),
                _ => slugs.push(slug),
            }
        }
        Ok(())
    }

    /// Resolves a category route slug. `_none` resolves to `None`, the
    /// Uncategorized pseudo-category.
    pub async fn category_for_slug(&self, slug: &str) -> Result<Option<Category>, DomainError> {
        if slug == UNCATEGORIZED_SLUG {
            return Ok(None);
        }
        self.repo
            .find_category_by_slug(slug)
            .await?
            .map(Some)
            .ok_or_else(|| DomainError::CategoryNotFound(slug.to_string()))
    }

    pub async fn tag_for_slug(&self, slug: &str) -> Result<Tag, DomainError> {
        self.repo
            .find_tag_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::TagNotFound(slug.to_string()))
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>, DomainError> {
        self.repo.list_categories().await
    }

    pub async fn list_tags(&self) -> Result<Vec<Tag>, DomainError> {
        self.repo.list_tags().await
    }

    /// Posts in the category become uncategorized; none are deleted.
    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: i64) -> Result<(), DomainError> {
        if self.repo.delete_category(id).await? {
            Ok(())
        } else {
            Err(DomainError::CategoryNotFound(id.to_string()))
        }
    }
}

fn slug_taken(kind: &str, name: &str) -> DomainError {
    DomainError::Validation(format!("{kind} slug for {name:?} is already taken"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Repositories;

    fn service() -> TaxonomyService {
        TaxonomyService::new(Repositories::in_memory().taxonomy)
    }

    #[tokio::test]
    async fn none_slug_resolves_to_uncategorized() {
        let taxonomy = service();
        assert_eq!(taxonomy.category_for_slug("_none").await.unwrap(), None);
        assert!(matches!(
            taxonomy.category_for_slug("missing").await,
            Err(DomainError::CategoryNotFound(_))
        ));
    }

    #[tokio::test]
    async fn category_is_found_by_derived_slug() {
        let taxonomy = service();
        let created = taxonomy.upsert_category(" 정치/사회 ", "").await.unwrap();
        assert_eq!(created.name, "정치/사회");
        let found = taxonomy.category_for_slug("정치사회").await.unwrap();
        assert_eq!(found, Some(created));
    }

    #[tokio::test]
    async fn long_category_names_are_rejected() {
        let taxonomy = service();
        assert!(matches!(
            taxonomy.upsert_category(&"x".repeat(26), "").await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn tag_string_upserts_each_tag_once() {
        let taxonomy = service();
        let tags = taxonomy.upsert_tags("america; badguy, america").await.unwrap();
        assert_eq!(tags.len(), 2);
        let again = taxonomy.upsert_tags("badguy").await.unwrap();
        assert_eq!(again[0].id, tags[1].id);
        assert_eq!(taxonomy.list_tags().await.unwrap().len(), 2);
        assert_eq!(
            taxonomy.tag_for_slug("america").await.unwrap().name,
            "america"
        );
    }

    #[tokio::test]
    async fn reserved_and_empty_slugs_are_rejected() {
        let taxonomy = service();
        for name in ["_none", "/"] {
            assert!(matches!(
                taxonomy.upsert_category(name, "").await,
                Err(DomainError::Validation(_))
            ));
        }
        assert!(matches!(
            taxonomy.upsert_tag("//").await,
            Err(DomainError::Validation(_))
        ));
        assert!(taxonomy.list_categories().await.unwrap().is_empty());
        assert!(taxonomy.list_tags().await.unwrap().is_empty());
        assert_eq!(taxonomy.category_for_slug("_none").await.unwrap(), None);
    }

    #[tokio::test]
    async fn checks_catch_slug_clashes_without_writing() {
        let taxonomy = service();
        taxonomy.upsert_category("hello world", "").await.unwrap();
        taxonomy.upsert_tag("a b").await.unwrap();

        assert!(taxonomy.check_category("hello world").await.is_ok());
        assert!(matches!(
            taxonomy.check_category("hello-world").await,
            Err(DomainError::Validation(_))
        ));
        assert!(taxonomy.check_tags("a b; new").await.is_ok());
        assert!(taxonomy.check_tags("a-b").await.is_err());
        assert!(taxonomy.check_tags("x y, x-y").await.is_err());

        assert_eq!(taxonomy.list_categories().await.unwrap().len(), 1);
        assert_eq!(taxonomy.list_tags().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn deleting_unknown_category_is_not_found() {
        assert!(matches!(
            service().delete_category(7).await,
            Err(DomainError::CategoryNotFound(_))
        ));
    }
}
