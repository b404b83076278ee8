use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::domain::slug::{UNCATEGORIZED_SLUG, slugify};

pub const CATEGORY_NAME_MAX_CHARS: usize = 25;
pub const UNCATEGORIZED_NAME: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
}

pub fn validate_category_name(name: &str) -> Result<(), DomainError> {
    let len = name.chars().count();
    if len == 0 {
        return Err(DomainError::Validation("category name is empty".into()));
    }
    if len > CATEGORY_NAME_MAX_CHARS {
        return Err(DomainError::Validation(format!(
            "category name must be at most {CATEGORY_NAME_MAX_CHARS} characters"
        )));
    }
    match slugify(name).as_str() {
        "" => Err(DomainError::Validation(format!(
            "category name {name:?} has an empty slug"
        ))),
        UNCATEGORIZED_SLUG => Err(DomainError::Validation(format!(
            "category slug {UNCATEGORIZED_SLUG:?} is reserved"
        ))),
        _ => Ok(()),
    }
}

/// Sidebar entry: a category and how many posts reference it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub name: String,
    pub slug: String,
    pub post_count: u64,
    pub label: String,
}

impl CategoryCount {
    pub fn new(name: impl Into<String>, slug: impl Into<String>, post_count: u64) -> Self {
        let name = name.into();
        let label = format!("{name} ({post_count})");
        Self {
            name,
            slug: slug.into(),
            post_count,
            label,
        }
    }

    pub fn uncategorized(post_count: u64) -> Self {
        Self::new(UNCATEGORIZED_NAME, UNCATEGORIZED_SLUG, post_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_renders_name_and_count() {
        let count = CategoryCount::new("정치/사회", "정치사회", 1);
        assert_eq!(count.label, "정치/사회 (1)");
        assert_eq!(CategoryCount::uncategorized(3).label, "Uncategorized (3)");
        assert_eq!(CategoryCount::uncategorized(3).slug, "_none");
    }

    #[test]
    fn category_name_limit_counts_chars() {
        assert!(validate_category_name("정치/사회").is_ok());
        assert!(validate_category_name(&"a".repeat(25)).is_ok());
        assert!(matches!(
            validate_category_name(&"a".repeat(26)),
            Err(DomainError::Validation(_))
        ));
        assert!(validate_category_name("").is_err());
    }

    #[test]
    fn category_names_need_a_usable_slug() {
        for name in ["_none", "_no/ne", "/", "//"] {
            assert!(
                matches!(validate_category_name(name), Err(DomainError::Validation(_))),
                "{name:?} should be rejected"
            );
        }
        assert!(validate_category_name("none").is_ok());
    }
}
