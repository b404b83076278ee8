use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::category::Category;
use crate::domain::error::DomainError;
use crate::domain::tag::Tag;
use crate::domain::user::UserRef;

pub const TITLE_MAX_CHARS: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub head_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author: UserRef,
    pub category: Option<Category>,
    pub tags: Vec<Tag>,
}

impl Post {
    pub fn url(&self) -> String {
        format!("/blog/{}/", self.id)
    }

    pub fn update_url(&self) -> String {
        format!("{}update/", self.url())
    }

    pub fn has_tag(&self, tag_id: i64) -> bool {
        self.tags.iter().any(|t| t.id == tag_id)
    }
}

/// Validated, fully resolved post fields ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct PostDraft {
    pub title: String,
    pub content: String,
    pub head_image: Option<String>,
    pub category_id: Option<i64>,
    pub tag_ids: Vec<i64>,
}

pub fn validate_post_fields(title: &str, content: &str) -> Result<(), DomainError> {
    let title_len = title.trim().chars().count();
    if title_len == 0 {
        return Err(DomainError::Validation("title is required".into()));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(DomainError::Validation(format!(
            "title must be at most {TITLE_MAX_CHARS} characters"
        )));
    }
    if content.trim().is_empty() {
        return Err(DomainError::Validation("content is required".into()));
    }
    Ok(())
}

/// Selection applied to post listings. Every listing is newest-first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    All,
    /// `None` selects uncategorized posts.
    Category(Option<i64>),
    Tag(i64),
    /// Case-sensitive substring of the title or the content.
    Search(String),
}

impl PostFilter {
    pub fn matches(&self, post: &Post) -> bool {
        match self {
            PostFilter::All => true,
            PostFilter::Category(id) => post.category.as_ref().map(|c| c.id) == *id,
            PostFilter::Tag(tag_id) => post.has_tag(*tag_id),
            PostFilter::Search(term) => post.title.contains(term) || post.content.contains(term),
        }
    }
}
