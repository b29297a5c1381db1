//! Error-handling code.
//!
//! Configuration failures fall into three very different buckets, and the
//! distinction matters to callers:
//!
//! 1. The operator wrote a bad document ([`ConfigError::Malformed`] and
//!    [`ConfigError::Validation`]). These abort the configuration load.
//! 2. A collaborator called a secret accessor without checking that the
//!    corresponding feature was enabled ([`ConfigError::Internal`]). This is
//!    a bug in the calling code, not in the document.
//! 3. A secret or configuration file could not be read
//!    ([`ConfigError::Io`]). Propagated as-is, with no retry and no default.

use std::io;
use std::path::PathBuf;
use std::{error, fmt};

use thiserror::Error;

/// Error type for this crate's functions.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The input document could not be deserialized at all: a missing
    /// required field, a wrong type, an unknown field or enum value.
    #[error("malformed configuration: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The document deserialized, but one or more semantic constraints
    /// failed. Carries every violation found, not just the first.
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// A programming-contract violation inside the hosting process, most
    /// commonly a secret accessor invoked while its backing file reference
    /// was never configured.
    #[error(transparent)]
    Internal(#[from] InternalError),

    /// A file could not be read.
    #[error("could not read {path:?}")]
    Io {
        /// The file we tried to read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Result type for this crate's functions.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// A single field-labeled constraint violation.
#[derive(Debug)]
pub struct ValidationError {
    /// The configuration field (or block) at fault.
    pub field: String,
    /// What went wrong with it.
    pub message: String,
}

/// An aggregated validation report.
///
/// Validation does not stop at the first violation: the whole semantic pass
/// runs, and every problem found ends up in here, so the operator can fix
/// the document in one round trip.
#[derive(Debug, Default)]
pub struct ValidationErrors {
    errors: Vec<ValidationError>,
}

impl ValidationErrors {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field: field.to_owned(),
            message: message.into(),
        });
    }

    /// Have any violations been recorded?
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// The individual violations.
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    /// `Ok(())` if empty, otherwise the full report as an error.
    pub(crate) fn into_result(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "configuration failed validation:")?;
        for error in &self.errors {
            write!(f, "\n  {}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

impl error::Error for ValidationErrors {}

/// A violated internal contract.
///
/// Never shown to operators as a configuration problem: it means a caller
/// asked for something (typically a secret) without first checking that the
/// corresponding feature was enabled.
#[derive(Debug, Error)]
#[error("internal error: {0}")]
pub struct InternalError(String);

impl InternalError {
    /// Create an internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        InternalError(message.into())
    }

    pub(crate) fn unset_secret(accessor: &str) -> Self {
        InternalError::new(format!(
            "secret accessor `{}` called, but no secret file was configured for it",
            accessor
        ))
    }
}

#[test]
fn validation_errors_display_lists_every_violation() {
    let mut errors = ValidationErrors::new();
    errors.push("github", "auth_backend is \"github\" but no `github` block is configured");
    errors.push("gitea", "oauth_id and oauth_secret_file must be configured together");
    let rendered = errors.to_string();
    assert!(rendered.contains("github: auth_backend"));
    assert!(rendered.contains("gitea: oauth_id"));
    assert_eq!(errors.errors().len(), 2);
}

#[test]
fn empty_report_is_ok() {
    assert!(ValidationErrors::new().into_result().is_ok());
}
