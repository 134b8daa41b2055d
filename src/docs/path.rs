use once_cell::sync::Lazy;
use regex::Regex;

/// Bracket segments in file-system route dialects: `[id]`, `[...slug]`,
/// `[[...slug]]`.
static BRACKET_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[{1,2}(?:\.\.\.)?([A-Za-z0-9_-]+)\]{1,2}")
        .expect("bracket segment regex should be valid")
});

/// Brace parameters in canonical templates: `{id}`.
static BRACE_PARAM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([^{}/]+)\}").expect("brace parameter regex should be valid")
});

/// Rewrite a route path into the canonical `{name}` template form.
///
/// Paths already in canonical form pass through unchanged, so
/// `/users/[id]` and `/users/{id}` normalize to the same string.
///
/// ```rust
/// use brrtendpoint::docs::normalize_path;
///
/// assert_eq!(normalize_path("/users/[id]/posts/[postId]"), "/users/{id}/posts/{postId}");
/// assert_eq!(normalize_path("/files/[...path]"), "/files/{path}");
/// assert_eq!(normalize_path("/users/{id}"), "/users/{id}");
/// ```
#[must_use]
pub fn normalize_path(path: &str) -> String {
    BRACKET_SEGMENT.replace_all(path, "{${1}}").into_owned()
}

/// Parameter names of a canonical template, in order.
#[must_use]
pub fn path_param_names(template: &str) -> Vec<String> {
    BRACE_PARAM
        .captures_iter(template)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bracket_and_brace_forms_agree() {
        assert_eq!(normalize_path("/users/[id]"), normalize_path("/users/{id}"));
        assert_eq!(normalize_path("/users/[id]"), "/users/{id}");
    }

    #[test]
    fn test_catch_all_dialects() {
        assert_eq!(normalize_path("/docs/[...slug]"), "/docs/{slug}");
        assert_eq!(normalize_path("/docs/[[...slug]]"), "/docs/{slug}");
    }

    #[test]
    fn test_static_paths_untouched() {
        assert_eq!(normalize_path("/"), "/");
        assert_eq!(normalize_path("/health/live"), "/health/live");
    }

    #[test]
    fn test_param_names() {
        assert_eq!(
            path_param_names("/orgs/{org}/repos/{repo_name}"),
            vec!["org".to_string(), "repo_name".to_string()]
        );
        assert!(path_param_names("/pets").is_empty());
    }
}
