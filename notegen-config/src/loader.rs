//! Configuration loader implementations.

use std::env;
use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::NotegenConfig;

/// Environment variable overriding the completion model.
pub const MODEL_ENV: &str = "OPENAI_MODEL";
/// Environment variable overriding the completion timeout, in seconds.
pub const TIMEOUT_ENV: &str = "NOTEGEN_TIMEOUT_SECS";

/// Parses a TOML document, fills vocabulary defaults, and validates it.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] for malformed TOML and any validation error
/// reported by [`NotegenConfig::validate`].
pub fn from_toml_str(input: &str) -> ConfigResult<NotegenConfig> {
    let mut config: NotegenConfig = toml::from_str(input)?;
    config.fill_vocabulary_defaults();
    config.validate()?;
    Ok(config)
}

/// Reads and parses the configuration file at `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when the file cannot be read, otherwise the
/// errors of [`from_toml_str`].
pub fn load_from_path(path: impl AsRef<Path>) -> ConfigResult<NotegenConfig> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = from_toml_str(&raw)?;
    debug!(path = %path.display(), "configuration loaded");
    Ok(config)
}

/// Loads `path` when supplied, otherwise the defaults, then applies
/// environment overrides.
///
/// # Errors
///
/// Propagates file, parse, and validation errors.
pub fn load(path: Option<&Path>) -> ConfigResult<NotegenConfig> {
    let mut config = match path {
        Some(path) => load_from_path(path)?,
        None => NotegenConfig::default(),
    };
    apply_env_overrides(&mut config, |key| env::var(key).ok())?;
    Ok(config)
}

/// Applies overrides read through `lookup` (normally the process environment).
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] when an override cannot be parsed or
/// produces an invalid configuration.
pub fn apply_env_overrides<F>(config: &mut NotegenConfig, lookup: F) -> ConfigResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(model) = lookup(MODEL_ENV).filter(|value| !value.trim().is_empty()) {
        config.completion.model = model.trim().to_owned();
    }

    if let Some(raw) = lookup(TIMEOUT_ENV) {
        let secs = raw.trim().parse::<u64>().map_err(|err| {
            warn!(value = %raw, "ignoring unparsable timeout override");
            ConfigError::invalid(format!("{TIMEOUT_ENV} must be an integer: {err}"))
        })?;
        config.completion.timeout_secs = secs;
    }

    config.validate()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use notegen_primitives::ConstraintKind;

    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = from_toml_str("").unwrap();
        assert_eq!(config, NotegenConfig::default());
    }

    #[test]
    fn partial_document_overrides_selected_values() {
        let config = from_toml_str(
            r#"
            [validation]
            tolerance_band = [90, 110]

            [completion]
            model = "gpt-4o"
            max_output_tokens = 1200

            [[vocabulary]]
            constraint = "todo_on_gap"
            patterns = ["leave\\s+a\\s+placeholder"]
            "#,
        )
        .unwrap();

        assert_eq!(config.validation.tolerance_band, [90, 110]);
        assert_eq!(config.validation.truncation_floor, 10);
        assert_eq!(config.completion.model, "gpt-4o");
        assert_eq!(config.completion.max_output_tokens, Some(1200));

        let todo: Vec<&str> = config.patterns_for(ConstraintKind::TodoOnGap).collect();
        assert_eq!(todo, [r"leave\s+a\s+placeholder"]);
        assert!(
            config
                .patterns_for(ConstraintKind::NoTopLevelHeading)
                .next()
                .is_some()
        );
    }

    #[test]
    fn rejects_unknown_constraint_names() {
        let err = from_toml_str(
            r#"
            [[vocabulary]]
            constraint = "be_nice"
            patterns = ["nice"]
            "#,
        )
        .expect_err("unknown kind");
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[retry]\nmax_attempts = 5").unwrap();

        let config = load_from_path(file.path()).unwrap();
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_from_path("/definitely/not/here.toml").expect_err("missing");
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = [(MODEL_ENV, "gpt-4.1"), (TIMEOUT_ENV, "15")]
            .into_iter()
            .collect();
        let mut config = NotegenConfig::default();
        apply_env_overrides(&mut config, |key| vars.get(key).map(|v| (*v).to_owned())).unwrap();

        assert_eq!(config.completion.model, "gpt-4.1");
        assert_eq!(config.completion.timeout_secs, 15);
    }

    #[test]
    fn zero_timeout_override_is_rejected() {
        let mut config = NotegenConfig::default();
        let err = apply_env_overrides(&mut config, |key| {
            (key == TIMEOUT_ENV).then(|| "0".to_owned())
        })
        .expect_err("zero timeout");
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }
}
