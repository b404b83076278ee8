use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::instrument;

use crate::application::pagination::{PAGE_SIZE, Page, PageInfo};
use crate::application::taxonomy_service::TaxonomyService;
use crate::data::post_repository::PostRepository;
use crate::domain::category::CategoryCount;
use crate::domain::error::DomainError;
use crate::domain::permissions::ensure_owner;
use crate::domain::post::{Post, PostDraft, PostFilter, validate_post_fields};
use crate::domain::user::UserId;
use crate::presentation::dto::PostForm;

#[derive(Clone)]
pub struct PostService {
    repo: Arc<dyn PostRepository>,
    taxonomy: TaxonomyService,
}

impl PostService {
    pub fn new(repo: Arc<dyn PostRepository>, taxonomy: TaxonomyService) -> Self {
        Self { repo, taxonomy }
    }

    pub async fn get_post(&self, id: i64) -> Result<Post, DomainError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or(DomainError::PostNotFound(id))
    }

    /// Every post, newest first.
    pub async fn list_posts(&self) -> Result<Vec<Post>, DomainError> {
        self.repo.list(&PostFilter::All, None, 0).await
    }

    /// `None` lists the uncategorized posts.
    pub async fn list_posts_by_category(
        &self,
        category_id: Option<i64>,
    ) -> Result<Vec<Post>, DomainError> {
        self.repo
            .list(&PostFilter::Category(category_id), None, 0)
            .await
    }

    pub async fn list_posts_by_tag(&self, tag_id: i64) -> Result<Vec<Post>, DomainError> {
        self.repo.list(&PostFilter::Tag(tag_id), None, 0).await
    }

    pub async fn search_posts(&self, term: &str) -> Result<Vec<Post>, DomainError> {
        self.repo.list(&search_filter(term)?, None, 0).await
    }

    pub fn search_filter(&self, term: &str) -> Result<PostFilter, DomainError> {
        search_filter(term)
    }

    /// One page of a listing at the fixed page size.
    pub async fn page(&self, filter: &PostFilter, number: u32) -> Result<Page<Post>, DomainError> {
        let total = self.repo.count(filter).await?;
        let info = PageInfo::new(number, PAGE_SIZE, total)?;
        let items = self
            .repo
            .list(filter, Some(info.per_page), info.offset())
            .await?;
        Ok(Page { items, info })
    }

    pub async fn count_posts(&self, filter: &PostFilter) -> Result<u64, DomainError> {
        self.repo.count(filter).await
    }

    pub async fn count_posts_without_category(&self) -> Result<u64, DomainError> {
        self.count_posts(&PostFilter::Category(None)).await
    }

    /// Per-category post counts by name, with the Uncategorized entry last.
    pub async fn category_counts(&self) -> Result<Vec<CategoryCount>, DomainError> {
        let mut counts: Vec<CategoryCount> = self
            .repo
            .count_by_category()
            .await?
            .into_iter()
            .map(|(category, n)| CategoryCount::new(category.name, category.slug, n))
            .collect();
        counts.push(CategoryCount::uncategorized(
            self.count_posts_without_category().await?,
        ));
        Ok(counts)
    }

    #[instrument(skip(self, form), fields(title = %form.title))]
    pub async fn create_post(
        &self,
        author_id: UserId,
        form: PostForm,
        created_at: DateTime<Utc>,
    ) -> Result<Post, DomainError> {
        let draft = self.resolve_draft(form).await?;
        self.repo.create(author_id, created_at, draft).await
    }

    #[instrument(skip(self, form))]
    pub async fn update_post(
        &self,
        user_id: UserId,
        post_id: i64,
        form: PostForm,
    ) -> Result<Post, DomainError> {
        self.post_for_edit(user_id, post_id).await?;
        let draft = self.resolve_draft(form).await?;
        self.repo
            .update(post_id, draft)
            .await?
            .ok_or(DomainError::PostNotFound(post_id))
    }

    /// The post as shown in its update form; only its author may open it.
    pub async fn post_for_edit(&self, user_id: UserId, post_id: i64) -> Result<Post, DomainError> {
        let post = self.get_post(post_id).await?;
        ensure_owner(Some(user_id), post.author.id)?;
        Ok(post)
    }

    #[instrument(skip(self))]
    pub async fn delete_post(&self, user_id: UserId, post_id: i64) -> Result<(), DomainError> {
        self.post_for_edit(user_id, post_id).await?;
        if self.repo.delete(post_id).await? {
            Ok(())
        } else {
            Err(DomainError::PostNotFound(post_id))
        }
    }

    async fn resolve_draft(&self, form: PostForm) -> Result<PostDraft, DomainError> {
        validate_post_fields(&form.title, &form.content)?;
        let category = form.category.as_deref().map(str::trim).filter(|n| !n.is_empty());
        if let Some(name) = category {
            self.taxonomy.check_category(name).await?;
        }
        if let Some(tags_str) = form.tags_str.as_deref() {
            self.taxonomy.check_tags(tags_str).await?;
        }

        let category_id = match category {
            Some(name) => Some(self.taxonomy.upsert_category(name, "").await?.id),
            None => None,
        };
        let tag_ids = match form.tags_str.as_deref() {
            Some(tags_str) => self
                .taxonomy
                .upsert_tags(tags_str)
                .await?
                .into_iter()
                .map(|t| t.id)
                .collect(),
            None => Vec::new(),
        };

        Ok(PostDraft {
            title: form.title.trim().to_string(),
            content: form.content,
            head_image: form.head_image.filter(|s| !s.trim().is_empty()),
            category_id,
            tag_ids,
        })
    }
}

fn search_filter(term: &str) -> Result<PostFilter, DomainError> {
    if term.is_empty() {
        return Err(DomainError::Validation("search term is empty".into()));
    }
    Ok(PostFilter::Search(term.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Repositories;
    use chrono::Duration;

    struct Fixture {
        posts: PostService,
        taxonomy: TaxonomyService,
        smith: UserId,
        obama: UserId,
    }

    async fn fixture() -> Fixture {
        let repos = Repositories::in_memory();
        let smith = repos.users.create("smith", "hash").await.unwrap().id;
        let obama = repos.users.create("obama", "hash").await.unwrap().id;
        let taxonomy = TaxonomyService::new(repos.taxonomy.clone());
        Fixture {
            posts: PostService::new(repos.posts.clone(), taxonomy.clone()),
            taxonomy,
            smith,
            obama,
        }
    }

    fn form(title: &str, content: &str) -> PostForm {
        PostForm {
            title: title.into(),
            content: content.into(),
            ..PostForm::default()
        }
    }

    impl Fixture {
        async fn post(&self, form: PostForm) -> Post {
            self.posts
                .create_post(self.smith, form, Utc::now())
                .await
                .unwrap()
        }
    }

    fn titles(posts: &[Post]) -> Vec<&str> {
        posts.iter().map(|p| p.title.as_str()).collect()
    }

    #[tokio::test]
    async fn uncategorized_posts_are_listed_apart() {
        let f = fixture().await;
        let plain = f.post(form("The first post", "Hello World")).await;
        let politics = f
            .post(PostForm {
                category: Some("정치/사회".into()),
                ..form("The second post", "2 world.")
            })
            .await;
        let category = politics.category.clone().unwrap();

        let none = f.posts.list_posts_by_category(None).await.unwrap();
        assert_eq!(titles(&none), vec![plain.title.as_str()]);

        let in_category = f
            .posts
            .list_posts_by_category(Some(category.id))
            .await
            .unwrap();
        assert_eq!(titles(&in_category), vec![politics.title.as_str()]);
        assert!(in_category.iter().all(|p| p.id != plain.id));
        assert_eq!(f.posts.count_posts_without_category().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn tag_listing_contains_exactly_the_tagged_posts() {
        let f = fixture().await;
        let first = f
            .post(PostForm {
                tags_str: Some("badguy, america".into()),
                ..form("The first post", "Hello World")
            })
            .await;
        let second = f
            .post(PostForm {
                tags_str: Some("america".into()),
                ..form("Post2", "test 2")
            })
            .await;
        f.taxonomy.upsert_tag("unused").await.unwrap();

        let badguy = f.taxonomy.tag_for_slug("badguy").await.unwrap();
        let america = f.taxonomy.tag_for_slug("america").await.unwrap();
        let unused = f.taxonomy.tag_for_slug("unused").await.unwrap();

        let tagged = f.posts.list_posts_by_tag(badguy.id).await.unwrap();
        assert_eq!(titles(&tagged), vec!["The first post"]);

        let tagged = f.posts.list_posts_by_tag(america.id).await.unwrap();
        assert_eq!(titles(&tagged), vec![second.title.as_str(), first.title.as_str()]);
        assert!(tagged.iter().all(|p| p.has_tag(america.id)));

        assert!(f.posts.list_posts_by_tag(unused.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_matches_title_or_content_substrings() {
        let f = fixture().await;
        f.post(form("stay fool, stay hungry", "Amazing Apple story"))
            .await;
        f.post(form("Trump said", "Make America Great again")).await;

        let found = f.posts.search_posts("stay fool").await.unwrap();
        assert_eq!(titles(&found), vec!["stay fool, stay hungry"]);

        let found = f.posts.search_posts("Make America").await.unwrap();
        assert_eq!(titles(&found), vec!["Trump said"]);

        assert!(f.posts.search_posts("make america").await.unwrap().is_empty());
        assert!(matches!(
            f.posts.search_posts("").await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn listing_is_newest_first_and_paged() {
        let f = fixture().await;
        let start = Utc::now();
        for i in 0..10 {
            f.posts
                .create_post(
                    f.smith,
                    form(&format!("The post No. {i}"), &format!("Content{i}")),
                    start + Duration::minutes(i),
                )
                .await
                .unwrap();
        }

        let all = f.posts.list_posts().await.unwrap();
        assert_eq!(all.first().unwrap().title, "The post No. 9");
        assert_eq!(all.last().unwrap().title, "The post No. 0");

        let first = f.posts.page(&PostFilter::All, 1).await.unwrap();
        assert_eq!(first.items.len(), 5);
        assert!(first.info.is_paginated);
        assert_eq!(first.items[0].title, "The post No. 9");

        let second = f.posts.page(&PostFilter::All, 2).await.unwrap();
        assert_eq!(second.items[0].title, "The post No. 4");
        assert!(second.info.has_newer);

        assert!(matches!(
            f.posts.page(&PostFilter::All, 3).await,
            Err(DomainError::PageNotFound(3))
        ));
    }

    #[tokio::test]
    async fn category_counts_always_include_uncategorized() {
        let f = fixture().await;
        let counts = f.posts.category_counts().await.unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].label, "Uncategorized (0)");

        f.post(form("The first post", "Hello World")).await;
        f.post(PostForm {
            category: Some("정치/사회".into()),
            ..form("The second post", "2 world.")
        })
        .await;
        f.taxonomy.upsert_category("Life", "").await.unwrap();

        let labels: Vec<String> = f
            .posts
            .category_counts()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.label)
            .collect();
        assert_eq!(
            labels,
            vec!["Life (0)", "정치/사회 (1)", "Uncategorized (1)"]
        );
    }

    #[tokio::test]
    async fn only_the_author_updates_or_deletes() {
        let f = fixture().await;
        let post = f.post(form("The first post", "Hello World")).await;

        assert!(matches!(
            f.posts
                .update_post(f.obama, post.id, form("stolen", "stolen"))
                .await,
            Err(DomainError::PermissionDenied)
        ));
        assert!(matches!(
            f.posts.delete_post(f.obama, post.id).await,
            Err(DomainError::PermissionDenied)
        ));

        let updated = f
            .posts
            .update_post(
                f.smith,
                post.id,
                PostForm {
                    category: Some("Life".into()),
                    tags_str: Some("a; b".into()),
                    ..form("Edited", "New content")
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Edited");
        assert_eq!(updated.category.unwrap().name, "Life");
        assert_eq!(updated.tags.len(), 2);
        assert_eq!(updated.created_at, post.created_at);

        f.posts.delete_post(f.smith, post.id).await.unwrap();
        assert!(matches!(
            f.posts.get_post(post.id).await,
            Err(DomainError::PostNotFound(_))
        ));
    }

    #[tokio::test]
    async fn deleting_a_category_keeps_its_posts() {
        let f = fixture().await;
        let post = f
            .post(PostForm {
                category: Some("Life".into()),
                ..form("The first post", "Hello World")
            })
            .await;
        let category = post.category.clone().unwrap();

        f.taxonomy.delete_category(category.id).await.unwrap();
        let post = f.posts.get_post(post.id).await.unwrap();
        assert!(post.category.is_none());
        assert_eq!(f.posts.count_posts_without_category().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn invalid_forms_are_rejected() {
        let f = fixture().await;
        assert!(matches!(
            f.posts
                .create_post(f.smith, form(&"t".repeat(31), "c"), Utc::now())
                .await,
            Err(DomainError::Validation(_))
        ));
        assert!(matches!(
            f.posts
                .create_post(
                    f.smith,
                    PostForm {
                        category: Some("c".repeat(26)),
                        ..form("ok", "ok")
                    },
                    Utc::now()
                )
                .await,
            Err(DomainError::Validation(_))
        ));
        assert!(f.posts.list_posts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rejected_post_leaves_categories_and_tags_untouched() {
        let f = fixture().await;
        let bad_tags = PostForm {
            category: Some("Life".into()),
            tags_str: Some(format!("ok; {}", "x".repeat(51))),
            ..form("ok", "ok")
        };
        assert!(matches!(
            f.posts.create_post(f.smith, bad_tags, Utc::now()).await,
            Err(DomainError::Validation(_))
        ));

        f.taxonomy.upsert_tag("a b").await.unwrap();
        let clashing = PostForm {
            category: Some("Life".into()),
            tags_str: Some("fresh, a-b".into()),
            ..form("ok", "ok")
        };
        assert!(matches!(
            f.posts.create_post(f.smith, clashing, Utc::now()).await,
            Err(DomainError::Validation(_))
        ));

        let reserved = PostForm {
            category: Some("_none".into()),
            tags_str: Some("fresh".into()),
            ..form("ok", "ok")
        };
        assert!(matches!(
            f.posts.create_post(f.smith, reserved, Utc::now()).await,
            Err(DomainError::Validation(_))
        ));

        assert!(f.posts.list_posts().await.unwrap().is_empty());
        assert!(f.taxonomy.list_categories().await.unwrap().is_empty());
        let tags: Vec<String> = f
            .taxonomy
            .list_tags()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(tags, vec!["a b"]);
        let counts = f.posts.category_counts().await.unwrap();
        assert_eq!(counts.len(), 1);
        assert_eq!(counts[0].label, "Uncategorized (0)");
    }
}
