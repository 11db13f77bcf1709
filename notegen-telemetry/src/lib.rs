//! Logging bootstrap for notegen binaries.
//!
//! Libraries in the workspace only emit `tracing` events; a binary calls
//! [`init_tracing`] once to install a formatted subscriber filtered by
//! `RUST_LOG`.

#![warn(missing_docs, clippy::pedantic)]

use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Errors raised while installing the subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The fallback filter directive could not be parsed.
    #[error("invalid tracing directive `{directive}`: {reason}")]
    InvalidDirective {
        /// Directive as supplied.
        directive: String,
        /// Parser message.
        reason: String,
    },
    /// A global subscriber was already installed.
    #[error("tracing subscriber already initialised: {reason}")]
    AlreadyInitialised {
        /// Message from the subscriber registry.
        reason: String,
    },
}

/// Subscriber settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingConfig {
    default_directive: String,
    with_target: bool,
    ansi: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_directive: DEFAULT_DIRECTIVE.to_owned(),
            with_target: false,
            ansi: true,
        }
    }
}

impl TracingConfig {
    /// Sets the filter used when `RUST_LOG` is unset (e.g. `"debug"` or
    /// `"notegen_kernel=debug,info"`).
    #[must_use]
    pub fn with_default_directive(mut self, directive: impl Into<String>) -> Self {
        self.default_directive = directive.into();
        self
    }

    /// Includes event targets (module paths) in output.
    #[must_use]
    pub fn with_target(mut self, enabled: bool) -> Self {
        self.with_target = enabled;
        self
    }

    /// Enables or disables ANSI colours.
    #[must_use]
    pub fn with_ansi(mut self, enabled: bool) -> Self {
        self.ansi = enabled;
        self
    }

    /// Builds the filter: `RUST_LOG` when set and valid, otherwise the default directive.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidDirective`] if the default directive is malformed.
    pub fn filter(&self) -> Result<EnvFilter, TelemetryError> {
        EnvFilter::try_from_default_env().or_else(|_| {
            EnvFilter::try_new(&self.default_directive).map_err(|err| {
                TelemetryError::InvalidDirective {
                    directive: self.default_directive.clone(),
                    reason: err.to_string(),
                }
            })
        })
    }

    /// Installs the global subscriber.
    ///
    /// # Errors
    ///
    /// Returns [`TelemetryError::InvalidDirective`] for a bad default filter and
    /// [`TelemetryError::AlreadyInitialised`] if a subscriber is already set.
    pub fn init(&self) -> Result<(), TelemetryError> {
        tracing_subscriber::fmt()
            .with_env_filter(self.filter()?)
            .with_target(self.with_target)
            .with_ansi(self.ansi)
            .try_init()
            .map_err(|err| TelemetryError::AlreadyInitialised {
                reason: err.to_string(),
            })
    }
}

/// Installs a subscriber with the default settings.
///
/// # Errors
///
/// See [`TracingConfig::init`].
pub fn init_tracing() -> Result<(), TelemetryError> {
    TracingConfig::default().init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_default_directive_is_rejected() {
        let config = TracingConfig::default().with_default_directive("notegen=verbose");
        // RUST_LOG may be set in CI; only assert when the fallback is used.
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(matches!(
                config.filter(),
                Err(TelemetryError::InvalidDirective { .. })
            ));
        }
    }

    #[test]
    fn second_init_reports_existing_subscriber() {
        let config = TracingConfig::default().with_ansi(false);
        let _ = config.init();
        let second = config.init();
        assert!(matches!(second, Err(TelemetryError::AlreadyInitialised { .. })));
    }
}
