//! Request path to entry matching.

use shelf_build::{Entry, PAGE_EXTENSIONS};

/// Candidate entry file names for a URL path, most specific first.
///
/// - `/` → `["index.html", "index.htm"]`
/// - `/about` → `["about.html", "about.htm", "about/index.html", "about/index.htm"]`
#[must_use]
pub fn candidates_for(url_path: &str) -> Vec<String> {
    let stripped = url_path.trim_start_matches('/').trim_end_matches('/');
    if stripped.is_empty() {
        return PAGE_EXTENSIONS.iter().map(|ext| format!("index.{ext}")).collect();
    }
    let flat = PAGE_EXTENSIONS.iter().map(|ext| format!("{stripped}.{ext}"));
    let index = PAGE_EXTENSIONS
        .iter()
        .map(|ext| format!("{stripped}/index.{ext}"));
    flat.chain(index).collect()
}

/// Entry whose path is the first matching candidate for `url_path`.
pub fn match_entry<'a>(entries: &'a [Entry], url_path: &str) -> Option<&'a Entry> {
    candidates_for(url_path)
        .iter()
        .find_map(|candidate| entries.iter().find(|e| &e.path == candidate))
}

/// Entry served for `url_path`, falling back to the index entry.
pub fn resolve_entry<'a>(entries: &'a [Entry], url_path: &str) -> Option<&'a Entry> {
    match_entry(entries, url_path).or_else(|| match_entry(entries, "/"))
}
