//! Ownership rules. A user may edit or delete exactly the posts and comments
//! they authored; anonymous viewers may do neither.

use crate::domain::comment::Comment;
use crate::domain::error::DomainError;
use crate::domain::post::Post;
use crate::domain::user::UserId;

pub fn is_owner(viewer: Option<UserId>, owner: UserId) -> bool {
    viewer == Some(owner)
}

pub fn can_edit_post(viewer: Option<UserId>, post: &Post) -> bool {
    is_owner(viewer, post.author.id)
}

pub fn can_edit_comment(viewer: Option<UserId>, comment: &Comment) -> bool {
    is_owner(viewer, comment.author.id)
}

pub fn can_delete_comment(viewer: Option<UserId>, comment: &Comment) -> bool {
    is_owner(viewer, comment.author.id)
}

/// Same decision as [`is_owner`], with the failure split into
/// `NotAuthenticated` and `PermissionDenied`.
pub fn ensure_owner(viewer: Option<UserId>, owner: UserId) -> Result<(), DomainError> {
    match viewer {
        None => Err(DomainError::NotAuthenticated),
        Some(id) if id == owner => Ok(()),
        Some(_) => Err(DomainError::PermissionDenied),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::UserRef;
    use chrono::Utc;

    const SMITH: UserId = 1;
    const OBAMA: UserId = 2;

    fn post_by(author: UserId) -> Post {
        Post {
            id: 10,
            title: "The first post".into(),
            content: "Hello World, We are the world.".into(),
            head_image: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            author: UserRef {
                id: author,
                username: "author".into(),
            },
            category: None,
            tags: Vec::new(),
        }
    }

    fn comment_by(author: UserId) -> Comment {
        Comment {
            id: 20,
            post_id: 10,
            text: "a test comment".into(),
            author: UserRef {
                id: author,
                username: "author".into(),
            },
            created_at: Utc::now(),
            modified_at: None,
        }
    }

    #[test]
    fn only_the_author_can_edit_a_post() {
        let post = post_by(SMITH);
        assert!(can_edit_post(Some(SMITH), &post));
        assert!(!can_edit_post(Some(OBAMA), &post));
        assert!(!can_edit_post(None, &post));
    }

    #[test]
    fn only_the_author_can_edit_or_delete_a_comment() {
        let comment = comment_by(OBAMA);
        assert!(can_edit_comment(Some(OBAMA), &comment));
        assert!(can_delete_comment(Some(OBAMA), &comment));
        assert!(!can_edit_comment(Some(SMITH), &comment));
        assert!(!can_delete_comment(Some(SMITH), &comment));
        assert!(!can_delete_comment(None, &comment));
    }

    #[test]
    fn ensure_owner_distinguishes_anonymous_from_non_owner() {
        assert!(ensure_owner(Some(SMITH), SMITH).is_ok());
        assert!(matches!(
            ensure_owner(None, SMITH),
            Err(DomainError::NotAuthenticated)
        ));
        assert!(matches!(
            ensure_owner(Some(OBAMA), SMITH),
            Err(DomainError::PermissionDenied)
        ));
    }
}
