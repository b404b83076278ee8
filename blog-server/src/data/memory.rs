//! In-process store behind one lock. Backs the `memory` storage mode and the
//! test suites; cascades run in the same order as the Postgres store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::info;

use crate::data::comment_repository::CommentRepository;
use crate::data::post_repository::PostRepository;
use crate::data::taxonomy_repository::TaxonomyRepository;
use crate::data::user_repository::UserRepository;
use crate::domain::category::Category;
use crate::domain::comment::Comment;
use crate::domain::error::DomainError;
use crate::domain::post::{Post, PostDraft, PostFilter};
use crate::domain::slug::slugify;
use crate::domain::tag::Tag;
use crate::domain::user::{User, UserId, UserRef};

#[derive(Debug, Clone)]
struct PostRecord {
    id: i64,
    title: String,
    content: String,
    head_image: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    author_id: UserId,
    category_id: Option<i64>,
    tag_ids: Vec<i64>,
}

#[derive(Debug, Clone)]
struct CommentRecord {
    id: i64,
    post_id: i64,
    author_id: UserId,
    text: String,
    created_at: DateTime<Utc>,
    modified_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct Sequence(i64);

impl Sequence {
    fn next(&mut self) -> i64 {
        self.0 += 1;
        self.0
    }
}

#[derive(Debug, Default)]
struct State {
    users: BTreeMap<i64, User>,
    categories: BTreeMap<i64, Category>,
    tags: BTreeMap<i64, Tag>,
    posts: BTreeMap<i64, PostRecord>,
    comments: BTreeMap<i64, CommentRecord>,
    user_seq: Sequence,
    category_seq: Sequence,
    tag_seq: Sequence,
    post_seq: Sequence,
    comment_seq: Sequence,
}

impl State {
    fn user_ref(&self, id: UserId) -> Result<UserRef, DomainError> {
        self.users
            .get(&id)
            .map(User::to_ref)
            .ok_or(DomainError::UserNotFound(id))
    }

    fn hydrate_post(&self, record: &PostRecord) -> Result<Post, DomainError> {
        Ok(Post {
            id: record.id,
            title: record.title.clone(),
            content: record.content.clone(),
            head_image: record.head_image.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            author: self.user_ref(record.author_id)?,
            category: record
                .category_id
                .and_then(|id| self.categories.get(&id).cloned()),
            tags: record
                .tag_ids
                .iter()
                .filter_map(|id| self.tags.get(id).cloned())
                .collect(),
        })
    }

    fn hydrate_comment(&self, record: &CommentRecord) -> Result<Comment, DomainError> {
        Ok(Comment {
            id: record.id,
            post_id: record.post_id,
            text: record.text.clone(),
            author: self.user_ref(record.author_id)?,
            created_at: record.created_at,
            modified_at: record.modified_at,
        })
    }

    fn record_matches(&self, record: &PostRecord, filter: &PostFilter) -> bool {
        match filter {
            PostFilter::All => true,
            PostFilter::Category(id) => record.category_id == *id,
            PostFilter::Tag(tag_id) => record.tag_ids.contains(tag_id),
            PostFilter::Search(term) => {
                record.title.contains(term.as_str()) || record.content.contains(term.as_str())
            }
        }
    }

    /// Matching records, newest first.
    fn matching_posts(&self, filter: &PostFilter) -> Vec<&PostRecord> {
        let mut records: Vec<&PostRecord> = self
            .posts
            .values()
            .filter(|r| self.record_matches(r, filter))
            .collect();
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        records
    }

    fn delete_post_cascade(&mut self, id: i64) -> Option<usize> {
        let before = self.comments.len();
        self.comments.retain(|_, c| c.post_id != id);
        let removed_comments = before - self.comments.len();
        self.posts.remove(&id).map(|_| removed_comments)
    }

    fn check_references(&self, draft: &PostDraft) -> Result<(), DomainError> {
        if let Some(category_id) = draft.category_id {
            if !self.categories.contains_key(&category_id) {
                return Err(DomainError::Internal(format!(
                    "unknown category id {category_id}"
                )));
            }
        }
        if let Some(tag_id) = draft.tag_ids.iter().find(|id| !self.tags.contains_key(id)) {
            return Err(DomainError::Internal(format!("unknown tag id {tag_id}")));
        }
        Ok(())
    }
}

fn dedup_ids(ids: &[i64]) -> Vec<i64> {
    let mut out = Vec::with_capacity(ids.len());
    for id in ids {
        if !out.contains(id) {
            out.push(*id);
        }
    }
    out
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, username: &str, password_hash: &str) -> Result<User, DomainError> {
        let mut state = self.state.write().await;
        if state.users.values().any(|u| u.username == username) {
            return Err(DomainError::UserAlreadyExists(username.to_string()));
        }
        let user = User {
            id: state.user_seq.next(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        state.users.insert(user.id, user.clone());
        info!(user_id = user.id, username = %user.username, "user created");
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError> {
        Ok(self.state.read().await.users.get(&id).cloned())
    }

    async fn delete(&self, id: UserId) -> Result<bool, DomainError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&id) {
            return Ok(false);
        }
        let owned: Vec<i64> = state
            .posts
            .values()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        for post_id in &owned {
            state.delete_post_cascade(*post_id);
        }
        state.comments.retain(|_, c| c.author_id != id);
        state.users.remove(&id);
        info!(user_id = id, posts = owned.len(), "user deleted");
        Ok(true)
    }
}

#[async_trait]
impl PostRepository for MemoryStore {
    async fn create(
        &self,
        author_id: UserId,
        created_at: DateTime<Utc>,
        draft: PostDraft,
    ) -> Result<Post, DomainError> {
        let mut state = self.state.write().await;
        state.user_ref(author_id)?;
        state.check_references(&draft)?;
        let record = PostRecord {
            id: state.post_seq.next(),
            title: draft.title,
            content: draft.content,
            head_image: draft.head_image,
            created_at,
            updated_at: created_at,
            author_id,
            category_id: draft.category_id,
            tag_ids: dedup_ids(&draft.tag_ids),
        };
        let post = state.hydrate_post(&record)?;
        state.posts.insert(record.id, record);
        info!(post_id = post.id, author_id, "post created");
        Ok(post)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Post>, DomainError> {
        let state = self.state.read().await;
        state
            .posts
            .get(&id)
            .map(|r| state.hydrate_post(r))
            .transpose()
    }

    async fn update(&self, id: i64, draft: PostDraft) -> Result<Option<Post>, DomainError> {
        let mut state = self.state.write().await;
        state.check_references(&draft)?;
        let Some(record) = state.posts.get_mut(&id) else {
            return Ok(None);
        };
        record.title = draft.title;
        record.content = draft.content;
        record.head_image = draft.head_image;
        record.category_id = draft.category_id;
        record.tag_ids = dedup_ids(&draft.tag_ids);
        record.updated_at = Utc::now();
        let record = record.clone();
        info!(post_id = id, "post updated");
        state.hydrate_post(&record).map(Some)
    }

    async fn delete(&self, id: i64) -> Result<bool, DomainError> {
        let mut state = self.state.write().await;
        match state.delete_post_cascade(id) {
            Some(comments) => {
                info!(post_id = id, comments, "post deleted");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list(
        &self,
        filter: &PostFilter,
        limit: Option<u32>,
        offset: u32,
    ) -> Result<Vec<Post>, DomainError> {
        let state = self.state.read().await;
        let take = limit.map_or(usize::MAX, |l| l as usize);
        state
            .matching_posts(filter)
            .into_iter()
            .skip(offset as usize)
            .take(take)
            .map(|r| state.hydrate_post(r))
            .collect()
    }

    async fn count(&self, filter: &PostFilter) -> Result<u64, DomainError> {
        let state = self.state.read().await;
        Ok(state.matching_posts(filter).len() as u64)
    }

    async fn count_by_category(&self) -> Result<Vec<(Category, u64)>, DomainError> {
        let state = self.state.read().await;
        let mut counts: Vec<(Category, u64)> = state
            .categories
            .values()
            .map(|c| {
                let n = state
                    .posts
                    .values()
                    .filter(|p| p.category_id == Some(c.id))
                    .count();
                (c.clone(), n as u64)
            })
            .collect();
        counts.sort_by(|a, b| a.0.name.cmp(&b.0.name));
        Ok(counts)
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn create(
        &self,
        post_id: i64,
        author_id: UserId,
        text: &str,
    ) -> Result<Comment, DomainError> {
        let mut state = self.state.write().await;
        if !state.posts.contains_key(&post_id) {
            return Err(DomainError::PostNotFound(post_id));
        }
        state.user_ref(author_id)?;
        let record = CommentRecord {
            id: state.comment_seq.next(),
            post_id,
            author_id,
            text: text.to_string(),
            created_at: Utc::now(),
            modified_at: None,
        };
        let comment = state.hydrate_comment(&record)?;
        state.comments.insert(record.id, record);
        info!(comment_id = comment.id, post_id, author_id, "comment created");
        Ok(comment)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Comment>, DomainError> {
        let state = self.state.read().await;
        state
            .comments
            .get(&id)
            .map(|r| state.hydrate_comment(r))
            .transpose()
    }

    async fn update_text(&self, id: i64, text: &str) -> Result<Option<Comment>, DomainError> {
        let mut state = self.state.write().await;
        let Some(record) = state.comments.get_mut(&id) else {
            return Ok(None);
        };
        record.text = text.to_string();
        record.modified_at = Some(Utc::now());
        let record = record.clone();
        info!(comment_id = id, "comment updated");
        state.hydrate_comment(&record).map(Some)
    }

    async fn delete(&self, id: i64) -> Result<bool, DomainError> {
        let removed = self.state.write().await.comments.remove(&id).is_some();
        if removed {
            info!(comment_id = id, "comment deleted");
        }
        Ok(removed)
    }

    async fn list_for_post(&self, post_id: i64) -> Result<Vec<Comment>, DomainError> {
        let state = self.state.read().await;
        // ids are handed out in creation order
        state
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .map(|c| state.hydrate_comment(c))
            .collect()
    }

    async fn count_for_post(&self, post_id: i64) -> Result<u64, DomainError> {
        let state = self.state.read().await;
        Ok(state
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .count() as u64)
    }
}

#[async_trait]
impl TaxonomyRepository for MemoryStore {
    async fn upsert_category(
        &self,
        name: &str,
        description: &str,
    ) -> Result<Category, DomainError> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.categories.values().find(|c| c.name == name) {
            return Ok(existing.clone());
        }
        let slug = slugify(name);
        if state.categories.values().any(|c| c.slug == slug) {
            return Err(DomainError::Validation(format!(
                "category slug for {name:?} is already taken"
            )));
        }
        let category = Category {
            id: state.category_seq.next(),
            name: name.to_string(),
            slug,
            description: description.to_string(),
        };
        state.categories.insert(category.id, category.clone());
        info!(category_id = category.id, slug = %category.slug, "category upserted");
        Ok(category)
    }

    async fn find_category_by_slug(&self, slug: &str) -> Result<Option<Category>, DomainError> {
        let state = self.state.read().await;
        Ok(state.categories.values().find(|c| c.slug == slug).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>, DomainError> {
        let state = self.state.read().await;
        let mut categories: Vec<Category> = state.categories.values().cloned().collect();
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    async fn delete_category(&self, id: i64) -> Result<bool, DomainError> {
        let mut state = self.state.write().await;
        let mut detached = 0;
        for post in state.posts.values_mut() {
            if post.category_id == Some(id) {
                post.category_id = None;
                detached += 1;
            }
        }
        let removed = state.categories.remove(&id).is_some();
        if removed {
            info!(category_id = id, detached_posts = detached, "category deleted");
        }
        Ok(removed)
    }

    async fn upsert_tag(&self, name: &str) -> Result<Tag, DomainError> {
        let mut state = self.state.write().await;
        if let Some(existing) = state.tags.values().find(|t| t.name == name) {
            return Ok(existing.clone());
        }
        let slug = slugify(name);
        if state.tags.values().any(|t| t.slug == slug) {
            return Err(DomainError::Validation(format!(
                "tag slug for {name:?} is already taken"
            )));
        }
        let tag = Tag {
            id: state.tag_seq.next(),
            name: name.to_string(),
            slug,
        };
        state.tags.insert(tag.id, tag.clone());
        info!(tag_id = tag.id, slug = %tag.slug, "tag upserted");
        Ok(tag)
    }

    async fn find_tag_by_slug(&self, slug: &str) -> Result<Option<Tag>, DomainError> {
        let state = self.state.read().await;
        Ok(state.tags.values().find(|t| t.slug == slug).cloned())
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, DomainError> {
        let state = self.state.read().await;
        let mut tags: Vec<Tag> = state.tags.values().cloned().collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn store_with_author() -> (MemoryStore, UserId) {
        let store = MemoryStore::new();
        let user = UserRepository::create(&store, "smith", "hash").await.unwrap();
        (store, user.id)
    }

    fn draft(title: &str, category_id: Option<i64>, tag_ids: Vec<i64>) -> PostDraft {
        PostDraft {
            title: title.into(),
            content: format!("{title} content"),
            head_image: None,
            category_id,
            tag_ids,
        }
    }

    #[tokio::test]
    async fn listing_is_newest_first() {
        let (store, author) = store_with_author().await;
        let now = Utc::now();
        PostRepository::create(&store, author, now - Duration::hours(2), draft("old", None, vec![]))
            .await
            .unwrap();
        PostRepository::create(&store, author, now, draft("new", None, vec![]))
            .await
            .unwrap();
        PostRepository::create(&store, author, now - Duration::hours(1), draft("mid", None, vec![]))
            .await
            .unwrap();

        let titles: Vec<String> = store
            .list(&PostFilter::All, None, 0)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["new", "mid", "old"]);

        let page: Vec<String> = store
            .list(&PostFilter::All, Some(1), 1)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(page, vec!["mid"]);
    }

    #[tokio::test]
    async fn upserts_are_idempotent() {
        let store = MemoryStore::new();
        let first = store.upsert_category("정치/사회", "").await.unwrap();
        let second = store.upsert_category("정치/사회", "other").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.slug, "정치사회");

        let t1 = store.upsert_tag("some tag").await.unwrap();
        let t2 = store.upsert_tag("some tag").await.unwrap();
        assert_eq!(t1.id, t2.id);
        assert_eq!(t1.slug, "some-tag");
        assert_eq!(store.list_tags().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn slug_collisions_are_rejected() {
        let store = MemoryStore::new();
        store.upsert_tag("a b").await.unwrap();
        assert!(matches!(
            store.upsert_tag("a-b").await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn tag_display_order_follows_insertion() {
        let (store, author) = store_with_author().await;
        let badguy = store.upsert_tag("badguy").await.unwrap();
        let america = store.upsert_tag("america").await.unwrap();
        let post = PostRepository::create(
            &store,
            author,
            Utc::now(),
            draft("p", None, vec![badguy.id, america.id, badguy.id]),
        )
        .await
        .unwrap();
        let names: Vec<&str> = post.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["badguy", "america"]);
    }

    #[tokio::test]
    async fn deleting_a_category_keeps_its_posts() {
        let (store, author) = store_with_author().await;
        let life = store.upsert_category("Life", "").await.unwrap();
        let in_life = draft("p", Some(life.id), vec![]);
        let post = PostRepository::create(&store, author, Utc::now(), in_life)
            .await
            .unwrap();
        assert_eq!(store.count(&PostFilter::Category(Some(life.id))).await.unwrap(), 1);

        assert!(store.delete_category(life.id).await.unwrap());

        let post = PostRepository::find_by_id(&store, post.id).await.unwrap().unwrap();
        assert!(post.category.is_none());
        assert_eq!(store.count(&PostFilter::Category(None)).await.unwrap(), 1);
        assert!(store.list_categories().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deleting_an_author_removes_posts_and_comments() {
        let (store, smith) = store_with_author().await;
        let obama = UserRepository::create(&store, "obama", "hash").await.unwrap().id;
        let smiths = draft("smith's", None, vec![]);
        let smiths = PostRepository::create(&store, smith, Utc::now(), smiths)
            .await
            .unwrap();
        let obamas = draft("obama's", None, vec![]);
        let obamas = PostRepository::create(&store, obama, Utc::now(), obamas)
            .await
            .unwrap();
        CommentRepository::create(&store, smiths.id, obama, "on smith's").await.unwrap();
        CommentRepository::create(&store, obamas.id, smith, "smith on obama's").await.unwrap();
        CommentRepository::create(&store, obamas.id, obama, "obama on own").await.unwrap();

        assert!(UserRepository::delete(&store, smith).await.unwrap());

        assert!(PostRepository::find_by_id(&store, smiths.id).await.unwrap().is_none());
        assert_eq!(store.count_for_post(smiths.id).await.unwrap(), 0);
        let left = store.list_for_post(obamas.id).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].text, "obama on own");
        assert!(!UserRepository::delete(&store, smith).await.unwrap());
    }

    #[tokio::test]
    async fn deleting_a_post_removes_its_comments() {
        let (store, author) = store_with_author().await;
        let post = PostRepository::create(&store, author, Utc::now(), draft("p", None, vec![]))
            .await
            .unwrap();
        CommentRepository::create(&store, post.id, author, "a comment").await.unwrap();
        CommentRepository::create(&store, post.id, author, "second comment").await.unwrap();
        assert_eq!(store.count_for_post(post.id).await.unwrap(), 2);

        assert!(PostRepository::delete(&store, post.id).await.unwrap());
        assert_eq!(store.count_for_post(post.id).await.unwrap(), 0);
        assert!(!PostRepository::delete(&store, post.id).await.unwrap());
    }

    #[tokio::test]
    async fn comments_on_missing_posts_are_rejected() {
        let (store, author) = store_with_author().await;
        assert!(matches!(
            CommentRepository::create(&store, 99, author, "x").await,
            Err(DomainError::PostNotFound(99))
        ));
    }
}
