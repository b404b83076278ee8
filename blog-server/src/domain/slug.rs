/// Slug of the pseudo-category holding posts without a category.
pub const UNCATEGORIZED_SLUG: &str = "_none";

/// Derives the URL slug for a category or tag name.
///
/// Spaces become `-` and `/` is dropped; every other character, non-ASCII
/// included, is kept as is so `"정치/사회"` maps to `"정치사회"`.
pub fn slugify(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '/')
        .map(|c| if c == ' ' { '-' } else { c })
        .collect()
}
