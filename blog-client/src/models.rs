use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
pub struct Author {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryCount {
    pub name: String,
    pub slug: String,
    pub post_count: u64,
    pub label: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub head_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub author: Author,
    pub category: Option<Category>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PageInfo {
    pub number: u32,
    pub num_pages: u32,
    pub total: u64,
    pub has_older: bool,
    pub has_newer: bool,
    pub is_paginated: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sidebar {
    pub categories: Vec<CategoryCount>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostList {
    pub heading: String,
    pub category: Option<CategoryCount>,
    pub tag: Option<Tag>,
    pub search_info: Option<String>,
    pub posts: Vec<Post>,
    pub page: PageInfo,
    pub sidebar: Sidebar,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentView {
    pub id: i64,
    pub post_id: i64,
    pub text: String,
    pub author: Author,
    pub created_at: DateTime<Utc>,
    pub modified_at: Option<DateTime<Utc>>,
    pub can_edit: bool,
    pub can_delete: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostDetail {
    pub post: Post,
    pub can_edit: bool,
    pub comments: Vec<CommentView>,
    pub sidebar: Sidebar,
}

/// Body of post create/update requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags_str: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PostFormContext {
    pub heading: String,
    pub action: String,
    pub form: PostForm,
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentForm {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentFormContext {
    pub heading: String,
    pub action: String,
    pub form: CommentForm,
    pub post_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_context_deserializes_flattened_fields() {
        let body = serde_json::json!({
            "post": {
                "id": 1,
                "title": "The first post",
                "content": "Hello World",
                "head_image": null,
                "created_at": "2024-01-01T00:00:00Z",
                "updated_at": "2024-01-01T00:00:00Z",
                "author": {"id": 1, "username": "smith"},
                "category": null,
                "tags": [{"id": 1, "name": "america", "slug": "america"}],
                "url": "/blog/1/"
            },
            "can_edit": false,
            "comments": [{
                "id": 3,
                "post_id": 1,
                "text": "a comment",
                "author": {"id": 2, "username": "obama"},
                "created_at": "2024-01-01T00:00:00Z",
                "modified_at": null,
                "url": "/blog/1/#comment-3",
                "can_edit": true,
                "can_delete": true
            }],
            "sidebar": {"categories": [], "no_category_post_count": 1}
        });
        let detail: PostDetail = serde_json::from_value(body).unwrap();
        assert_eq!(detail.post.tags[0].name, "america");
        assert!(detail.comments[0].can_delete);
    }
}
