//! Base-path prefixing for sites served below the domain root.

/// Base path without its trailing slash, or `None` for the root base.
fn normalized(base: &str) -> Option<&str> {
    let trimmed = base.strip_suffix('/').unwrap_or(base);
    (!trimmed.is_empty()).then_some(trimmed)
}

/// Prefix an absolute `path` with `base`.
///
/// A base of `/` leaves the path unchanged.
#[must_use]
pub fn with_base_path(base: &str, path: &str) -> String {
    match normalized(base) {
        Some(base) => format!("{base}{path}"),
        None => path.to_owned(),
    }
}

/// Remove `base` from the start of a request path.
///
/// The result always starts with `/`. Paths outside the base are returned
/// unchanged.
#[must_use]
pub fn strip_base_path(base: &str, pathname: &str) -> String {
    let Some(base) = normalized(base) else {
        return pathname.to_owned();
    };
    match pathname.strip_prefix(base) {
        Some(rest) if rest.starts_with('/') => rest.to_owned(),
        Some(rest) if rest.is_empty() => "/".to_owned(),
        _ => pathname.to_owned(),
    }
}
