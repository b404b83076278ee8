use serde::{Deserialize, Serialize};

use crate::domain::error::DomainError;
use crate::domain::slug::slugify;

pub const TAG_NAME_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

pub fn validate_tag_name(name: &str) -> Result<(), DomainError> {
    let len = name.chars().count();
    if len == 0 || len > TAG_NAME_MAX_CHARS {
        return Err(DomainError::Validation(format!(
            "tag name must be 1..={TAG_NAME_MAX_CHARS} characters"
        )));
    }
    if slugify(name).is_empty() {
        return Err(DomainError::Validation(format!(
            "tag name {name:?} has an empty slug"
        )));
    }
    Ok(())
}

/// Splits a form's tag string on `,` and `;`, keeping first occurrences in
/// the order given.
pub fn parse_tag_names(tags_str: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for piece in tags_str.split([',', ';']) {
        let name = piece.trim();
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_string_is_split_on_commas_and_semicolons() {
        assert_eq!(
            parse_tag_names("america, badguy; 한국어"),
            vec!["america", "badguy", "한국어"]
        );
    }

    #[test]
    fn blanks_and_duplicates_are_dropped() {
        assert_eq!(parse_tag_names(" ; a,, a ;b "), vec!["a", "b"]);
        assert!(parse_tag_names("").is_empty());
    }

    #[test]
    fn tag_names_need_a_non_empty_slug() {
        assert!(validate_tag_name("america").is_ok());
        assert!(matches!(
            validate_tag_name("//"),
            Err(DomainError::Validation(_))
        ));
        assert!(validate_tag_name(&"x".repeat(51)).is_err());
    }
}
