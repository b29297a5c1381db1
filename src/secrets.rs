//! Secrets read lazily from files on disk.
//!
//! Configuration fields never hold secret material, only paths. Reading
//! happens here, on demand, once per call: no caching, so rotating a secret
//! file takes effect on the next access without a reload.

use std::fs;
use tracing::trace;

use crate::prelude::*;

/// Read a secret from `path`, trimmed of surrounding whitespace.
///
/// Each call performs one fresh read of the file. The value is returned and
/// never logged.
pub fn read_secret_file(path: &Path) -> Result<String> {
    trace!("reading secret file {:?}", path);
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_owned(),
        source,
    })?;
    Ok(contents.trim().to_owned())
}

/// Read an optional secret file, or fail with an internal error if the
/// field was never configured. `accessor` names the accessor for the error
/// message.
pub(crate) fn read_optional_secret_file(
    accessor: &str,
    path: Option<&Path>,
) -> Result<String> {
    match path {
        Some(path) => read_secret_file(path),
        None => Err(InternalError::unset_secret(accessor).into()),
    }
}

/// An opaque reference to a secret, passed to the execution engine in place
/// of the resolved value.
///
/// Handles keep secret material out of environment maps and serialized
/// dumps. The engine resolves a handle only when it actually constructs the
/// worker environment, via [`SecretHandle::resolve`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SecretHandle {
    path: PathBuf,
}

impl SecretHandle {
    /// Wrap a secret file path in a handle.
    pub fn new(path: PathBuf) -> Self {
        SecretHandle { path }
    }

    /// The backing secret file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve the handle to the secret value. Engine-side, on demand.
    pub fn resolve(&self) -> Result<String> {
        read_secret_file(&self.path)
    }
}

impl fmt::Display for SecretHandle {
    /// Renders the engine's secret placeholder syntax, not the value.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "%(secret:{})s", self.path.display())
    }
}

/// Create a secret file under the system temp directory for tests.
#[cfg(test)]
pub(crate) fn temp_secret_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "buildbot-nix-config-{}-{}",
        std::process::id(),
        name
    ));
    fs::write(&path, contents).expect("could not write temp secret");
    path
}

#[test]
fn read_secret_file_trims_whitespace() {
    let path = temp_secret_file("trim", "s3kr1t\n");
    assert_eq!(read_secret_file(&path).expect("read error"), "s3kr1t");
    fs::remove_file(&path).expect("could not remove temp secret");
}

#[test]
fn read_secret_file_does_not_cache() {
    let path = temp_secret_file("rotate", "first\n");
    assert_eq!(read_secret_file(&path).expect("read error"), "first");
    fs::write(&path, "second\n").expect("could not rewrite temp secret");
    assert_eq!(read_secret_file(&path).expect("read error"), "second");
    fs::remove_file(&path).expect("could not remove temp secret");
}

#[test]
fn read_secret_file_propagates_io_errors() {
    let err = read_secret_file(Path::new("/nonexistent/buildbot-nix-secret"))
        .expect_err("expected an error");
    match err {
        ConfigError::Io { path, .. } => {
            assert_eq!(path, PathBuf::from("/nonexistent/buildbot-nix-secret"));
        }
        other => panic!("expected an I/O error, got {:?}", other),
    }
}

#[test]
fn unset_optional_secret_is_an_internal_error() {
    let err = read_optional_secret_file("oauth_secret", None).expect_err("expected an error");
    match err {
        ConfigError::Internal(_) => {}
        other => panic!("expected an internal error, got {:?}", other),
    }
}

#[test]
fn secret_handle_displays_a_placeholder_not_the_value() {
    let path = temp_secret_file("handle", "hunter2\n");
    let handle = SecretHandle::new(path.clone());
    assert!(!handle.to_string().contains("hunter2"));
    assert!(handle.to_string().starts_with("%(secret:"));
    assert_eq!(handle.resolve().expect("read error"), "hunter2");
    fs::remove_file(&path).expect("could not remove temp secret");
}
