//! `${VAR}` and `${VAR:-default}` expansion in config strings.

use std::borrow::Cow;
use std::env::{self, VarError};

use crate::ConfigError;

/// Expand `${VAR}` references in the value of `field`.
///
/// Only the braced form is recognised; `$VAR` is left alone.
pub(crate) fn expand_env(value: &str, field: &str) -> Result<String, ConfigError> {
    if !value.contains("${") {
        return Ok(value.to_owned());
    }
    let lookup = |var: &str| -> Result<Option<String>, VarError> { env::var(var).map(Some) };
    shellexpand::env_with_context(value, lookup)
        .map(Cow::into_owned)
        .map_err(|e| ConfigError::EnvVar {
            field: field.to_owned(),
            var: e.var_name,
        })
}

/// Expand an optional value in place.
pub(crate) fn expand_opt(value: &mut Option<String>, field: &str) -> Result<(), ConfigError> {
    if let Some(text) = value.as_deref() {
        *value = Some(expand_env(text, field)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_expands_set_variable() {
        // SAFETY: the variable name is unique to this test
        unsafe { env::set_var("SHELF_EXPAND_SET", "0.0.0.0") };
        assert_eq!(expand_env("${SHELF_EXPAND_SET}", "server.host").unwrap(), "0.0.0.0");
        unsafe { env::remove_var("SHELF_EXPAND_SET") };
    }

    #[test]
    fn test_default_used_when_unset() {
        let value = expand_env("/${SHELF_EXPAND_UNSET_DEFAULT:-preview}", "build.base_path").unwrap();
        assert_eq!(value, "/preview");
    }

    #[test]
    fn test_unset_variable_is_an_error() {
        let err = expand_env("${SHELF_EXPAND_UNSET}", "server.host").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot expand server.host: ${SHELF_EXPAND_UNSET} is not set"
        );
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(expand_env("/docs", "build.base_path").unwrap(), "/docs");
        assert_eq!(expand_env("$HOME", "server.host").unwrap(), "$HOME");
    }

    #[test]
    fn test_expand_opt() {
        let mut none = None;
        expand_opt(&mut none, "build.base_path").unwrap();
        assert_eq!(none, None);

        let mut some = Some("/${SHELF_EXPAND_OPT_UNSET:-x}".to_owned());
        expand_opt(&mut some, "build.base_path").unwrap();
        assert_eq!(some.as_deref(), Some("/x"));
    }
}
