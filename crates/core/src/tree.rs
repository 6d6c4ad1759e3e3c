//! Materialized-path helpers for the document tree.
//!
//! Every live document stores its full slug path (`/guides/install`). The
//! database keeps paths denormalized so listing a subtree is a single prefix
//! query; these helpers keep the denormalization consistent on create, move,
//! and restore.

/// Derive a URL-safe slug from a document title.
///
/// Lowercases, collapses runs of non-alphanumerics into single hyphens, and
/// trims to 64 characters. Falls back to `untitled` for titles with no
/// usable characters.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_hyphen = true;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_hyphen = false;
        } else if !last_hyphen {
            slug.push('-');
            last_hyphen = true;
        }
        if slug.len() >= 64 {
            break;
        }
    }
    let slug = slug.trim_matches('-').to_string();
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

/// Path of a child directly under `parent_path` (`None` = space root).
pub fn child_path(parent_path: Option<&str>, slug: &str) -> String {
    match parent_path {
        Some(parent) => format!("{}/{slug}", parent.trim_end_matches('/')),
        None => format!("/{slug}"),
    }
}

/// Rebase a descendant's path when its ancestor moves from `old_prefix` to
/// `new_prefix`. Returns `None` when `path` is not inside the old subtree.
pub fn rebase_path(path: &str, old_prefix: &str, new_prefix: &str) -> Option<String> {
    if path == old_prefix {
        return Some(new_prefix.to_string());
    }
    path.strip_prefix(old_prefix)
        .filter(|rest| rest.starts_with('/'))
        .map(|rest| format!("{new_prefix}{rest}"))
}

/// Escape character expected by queries that bind [`descendant_like_pattern`].
pub const LIKE_ESCAPE: char = '\\';

/// SQL LIKE pattern matching every strict descendant of `path`.
pub fn descendant_like_pattern(path: &str) -> String {
    format!("{}/%", escape_like(path))
}

/// Escape `%`, `_`, and the escape character itself for a `LIKE ... ESCAPE '\'`
/// clause. Doc slugs cannot contain these, but titles predating slug
/// normalization could.
fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_basic() {
        assert_eq!(slugify("Getting Started"), "getting-started");
        assert_eq!(slugify("  API: v2!  "), "api-v2");
        assert_eq!(slugify("___"), "untitled");
        assert_eq!(slugify(""), "untitled");
    }

    #[test]
    fn slugify_caps_length() {
        let slug = slugify(&"a".repeat(200));
        assert!(slug.len() <= 64);
    }

    #[test]
    fn child_path_root_and_nested() {
        assert_eq!(child_path(None, "intro"), "/intro");
        assert_eq!(child_path(Some("/guides"), "install"), "/guides/install");
    }

    #[test]
    fn rebase_moves_subtree() {
        assert_eq!(
            rebase_path("/guides/install/linux", "/guides", "/manual").as_deref(),
            Some("/manual/install/linux")
        );
        assert_eq!(
            rebase_path("/guides", "/guides", "/manual").as_deref(),
            Some("/manual")
        );
    }

    #[test]
    fn rebase_rejects_sibling_prefix() {
        // "/guidestar" shares a string prefix with "/guides" but is a sibling.
        assert_eq!(rebase_path("/guidestar", "/guides", "/manual"), None);
    }

    #[test]
    fn like_pattern_escapes_metacharacters() {
        assert_eq!(descendant_like_pattern("/a_b"), "/a\\_b/%");
        assert_eq!(descendant_like_pattern("/pct%"), "/pct\\%/%");
    }
}
