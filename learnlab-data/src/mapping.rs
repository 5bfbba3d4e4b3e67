//! Identifier case mapping between the API surface and the database
//!
//! Entities serialize with camelCase keys while every backing store uses
//! snake_case column names. These helpers convert individual identifiers in
//! both directions so dynamic inputs (sort columns, filter keys) can be
//! translated at the query boundary. Struct fields are handled by serde
//! renames instead; this module only exists for identifiers that arrive as
//! strings at runtime.
//!
//! The conversion is shallow and ASCII-only on purpose: keys are produced by
//! application code, not end users, and never contain consecutive capitals.

/// Converts a camelCase identifier to snake_case.
///
/// Each ASCII uppercase letter is replaced by an underscore followed by its
/// lowercase form. Digits and existing underscores pass through untouched.
///
/// ```
/// use learnlab_data::mapping::to_snake_case;
///
/// assert_eq!(to_snake_case("categoryId"), "category_id");
/// assert_eq!(to_snake_case("isPublished"), "is_published");
/// assert_eq!(to_snake_case("title"), "title");
/// ```
pub fn to_snake_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            out.push('_');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Converts a snake_case identifier to camelCase.
///
/// An underscore is consumed only when a lowercase letter follows it, so
/// keys like `address_line_2` keep their digit grouping intact.
///
/// ```
/// use learnlab_data::mapping::to_camel_case;
///
/// assert_eq!(to_camel_case("category_id"), "categoryId");
/// assert_eq!(to_camel_case("view_count"), "viewCount");
/// ```
pub fn to_camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut chars = key.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '_' && matches!(chars.peek(), Some(next) if next.is_ascii_lowercase()) {
            if let Some(next) = chars.next() {
                out.push(next.to_ascii_uppercase());
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// Reports whether `s` is safe to splice into SQL as a column identifier.
///
/// Accepts only `[a-z_][a-z0-9_]*`. Dynamic sort columns and filter keys are
/// checked with this after snake_case conversion; anything else is rejected
/// before it reaches the query builder.
pub fn is_safe_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_case_splits_on_uppercase() {
        assert_eq!(to_snake_case("categoryId"), "category_id");
        assert_eq!(to_snake_case("totalQuestionsAttempted"), "total_questions_attempted");
        assert_eq!(to_snake_case("viewCount"), "view_count");
    }

    #[test]
    fn snake_case_leaves_lowercase_untouched() {
        assert_eq!(to_snake_case("title"), "title");
        assert_eq!(to_snake_case("already_snake"), "already_snake");
        assert_eq!(to_snake_case(""), "");
    }

    #[test]
    fn camel_case_joins_on_underscore() {
        assert_eq!(to_camel_case("category_id"), "categoryId");
        assert_eq!(to_camel_case("is_published"), "isPublished");
        assert_eq!(to_camel_case("last_activity_at"), "lastActivityAt");
    }

    #[test]
    fn camel_case_keeps_underscore_before_digits() {
        assert_eq!(to_camel_case("line_2"), "line_2");
        assert_eq!(to_camel_case("level_2_name"), "level_2Name");
    }

    #[test]
    fn round_trip_preserves_camel_case_keys() {
        let keys = [
            "id",
            "title",
            "categoryId",
            "topicId",
            "isPublished",
            "viewCount",
            "successRate",
            "authorId",
            "createdAt",
            "updatedAt",
            "lastAccessedAt",
            "emailNotifications",
        ];
        for key in keys {
            assert_eq!(to_camel_case(&to_snake_case(key)), key, "round trip broke {key}");
        }
    }

    #[test]
    fn safe_identifier_accepts_snake_case_columns() {
        assert!(is_safe_identifier("created_at"));
        assert!(is_safe_identifier("view_count"));
        assert!(is_safe_identifier("_private"));
        assert!(is_safe_identifier("line_2"));
    }

    #[test]
    fn safe_identifier_rejects_sql_metacharacters() {
        assert!(!is_safe_identifier(""));
        assert!(!is_safe_identifier("1leading_digit"));
        assert!(!is_safe_identifier("CreatedAt"));
        assert!(!is_safe_identifier("created-at"));
        assert!(!is_safe_identifier("id; DROP TABLE users"));
        assert!(!is_safe_identifier("\"quoted\""));
    }
}
