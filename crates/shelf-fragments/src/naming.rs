//! Payload ids and their output paths.
//!
//! Ids carry a fixed prefix so they are distinguishable from any other string
//! that might appear inside a payload. Module paths place every payload under
//! one output directory:
//!
//! ```text
//! id:          shelf-payload/2cf24dba5fb0a30e
//! module path: /shelf__/shelf-payload/2cf24dba5fb0a30e.txt
//! ```

use uuid::Uuid;

/// Prefix of every payload id.
pub const PAYLOAD_ID_PREFIX: &str = "shelf-payload/";

/// Directory prefix of payload module paths.
pub const MODULE_PATH_PREFIX: &str = "/shelf__/";

/// File suffix of payload module paths.
pub const MODULE_PATH_SUFFIX: &str = ".txt";

/// Maximum length of a sanitized fragment name.
const MAX_NAME_LEN: usize = 50;

/// Add the payload prefix to a raw id.
#[must_use]
pub fn payload_id_for(raw_id: &str) -> String {
    format!("{PAYLOAD_ID_PREFIX}{raw_id}")
}

/// Output path (with leading slash) for a payload id.
#[must_use]
pub fn module_path_for(id: &str) -> String {
    format!("{MODULE_PATH_PREFIX}{id}{MODULE_PATH_SUFFIX}")
}

/// Inverse of [`module_path_for`].
///
/// Returns `None` if `module_path` lacks the prefix or suffix.
#[must_use]
pub fn extract_id_from_module_path(module_path: &str) -> Option<&str> {
    module_path
        .strip_prefix(MODULE_PATH_PREFIX)?
        .strip_suffix(MODULE_PATH_SUFFIX)
        .filter(|id| !id.is_empty())
}

/// Fresh temporary id, optionally prefixed with a readable name.
#[must_use]
pub fn temporary_id(name: Option<&str>) -> String {
    let uuid = Uuid::new_v4();
    match name.map(sanitize_name).filter(|n| !n.is_empty()) {
        Some(name) => payload_id_for(&format!("{name}-{uuid}")),
        None => payload_id_for(&uuid.to_string()),
    }
}

/// Make a name safe for use inside a file path.
///
/// Characters outside `[A-Za-z0-9_-]` become `_`, runs of `_` collapse,
/// leading and trailing `_` are dropped and the result is truncated.
#[must_use]
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            c
        } else {
            '_'
        };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    let trimmed = out.trim_matches('_');
    trimmed.chars().take(MAX_NAME_LEN).collect()
}
