use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::pagination::PageInfo;
use crate::domain::category::{Category, CategoryCount};
use crate::domain::comment::Comment;
use crate::domain::permissions::{can_delete_comment, can_edit_comment, can_edit_post};
use crate::domain::post::Post;
use crate::domain::tag::Tag;
use crate::domain::user::UserId;

// ======================= AUTH =======================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub token_type: String,
}

// ======================= FORMS =======================

/// Post create/update form. `category` is a category name and `tags_str`
/// a `,` or `;` separated list of tag names; both are upserted on submit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostForm {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub head_image: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags_str: Option<String>,
    /// Creation timestamp for new posts; the server clock when absent.
    /// Updates keep the stored value.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl PostForm {
    /// The form pre-filled with a post's current values.
    pub fn from_post(post: &Post) -> Self {
        let tags_str = if post.tags.is_empty() {
            None
        } else {
            Some(
                post.tags
                    .iter()
                    .map(|t| t.name.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        };
        Self {
            title: post.title.clone(),
            content: post.content.clone(),
            head_image: post.head_image.clone(),
            category: post.category.as_ref().map(|c| c.name.clone()),
            tags_str,
            created_at: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentForm {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "first_page")]
    pub page: u32,
}

fn first_page() -> u32 {
    1
}

// ======================= CONTEXTS =======================

#[derive(Debug, Serialize)]
pub struct Sidebar {
    pub categories: Vec<CategoryCount>,
    pub no_category_post_count: u64,
}

impl Sidebar {
    pub fn new(categories: Vec<CategoryCount>) -> Self {
        let no_category_post_count = categories
            .iter()
            .find(|c| c.slug == crate::domain::slug::UNCATEGORIZED_SLUG)
            .map(|c| c.post_count)
            .unwrap_or(0);
        Self {
            categories,
            no_category_post_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostCard {
    #[serde(flatten)]
    pub post: Post,
    pub url: String,
}

impl From<Post> for PostCard {
    fn from(post: Post) -> Self {
        let url = post.url();
        Self { post, url }
    }
}

/// Which listing a [`PostListContext`] shows.
#[derive(Debug, Default, Serialize)]
pub struct ListingSelection {
    /// Set on category pages; the Uncategorized page carries the
    /// uncategorized entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<Tag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_info: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PostListContext {
    pub heading: String,
    #[serde(flatten)]
    pub selection: ListingSelection,
    pub posts: Vec<PostCard>,
    pub page: PageInfo,
    pub sidebar: Sidebar,
}

#[derive(Debug, Serialize)]
pub struct CommentView {
    #[serde(flatten)]
    pub comment: Comment,
    pub url: String,
    pub can_edit: bool,
    pub can_delete: bool,
}

impl CommentView {
    pub fn new(comment: Comment, viewer: Option<UserId>) -> Self {
        Self {
            url: comment.url(),
            can_edit: can_edit_comment(viewer, &comment),
            can_delete: can_delete_comment(viewer, &comment),
            comment,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostDetailContext {
    pub post: PostCard,
    pub can_edit: bool,
    pub comments: Vec<CommentView>,
    pub sidebar: Sidebar,
}

impl PostDetailContext {
    pub fn new(
        post: Post,
        comments: Vec<Comment>,
        viewer: Option<UserId>,
        sidebar: Sidebar,
    ) -> Self {
        Self {
            can_edit: can_edit_post(viewer, &post),
            comments: comments
                .into_iter()
                .map(|c| CommentView::new(c, viewer))
                .collect(),
            post: post.into(),
            sidebar,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostFormContext {
    pub heading: String,
    /// Target of the form submission.
    pub action: String,
    pub form: PostForm,
    pub categories: Vec<Category>,
}

#[derive(Debug, Serialize)]
pub struct CommentFormContext {
    pub heading: String,
    pub action: String,
    pub form: CommentForm,
    pub post_id: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::UserRef;

    fn post() -> Post {
        let now = Utc::now();
        Post {
            id: 4,
            title: "The first post".into(),
            content: "Hello World".into(),
            head_image: None,
            created_at: now,
            updated_at: now,
            author: UserRef {
                id: 1,
                username: "smith".into(),
            },
            category: None,
            tags: vec![
                Tag {
                    id: 1,
                    name: "america".into(),
                    slug: "america".into(),
                },
                Tag {
                    id: 2,
                    name: "bad guy".into(),
                    slug: "bad-guy".into(),
                },
            ],
        }
    }

    #[test]
    fn update_form_joins_tags_with_semicolons() {
        let form = PostForm::from_post(&post());
        assert_eq!(form.tags_str.as_deref(), Some("america; bad guy"));
        assert_eq!(form.category, None);
    }

    #[test]
    fn detail_flags_follow_the_viewer() {
        let sidebar = || Sidebar::new(vec![CategoryCount::uncategorized(1)]);
        let owner = PostDetailContext::new(post(), Vec::new(), Some(1), sidebar());
        assert!(owner.can_edit);
        assert_eq!(owner.sidebar.no_category_post_count, 1);
        assert!(!PostDetailContext::new(post(), Vec::new(), Some(2), sidebar()).can_edit);
        assert!(!PostDetailContext::new(post(), Vec::new(), None, sidebar()).can_edit);
    }

    #[test]
    fn post_card_flattens_the_post() {
        let json = serde_json::to_value(PostCard::from(post())).unwrap();
        assert_eq!(json["title"], "The first post");
        assert_eq!(json["url"], "/blog/4/");
    }
}
