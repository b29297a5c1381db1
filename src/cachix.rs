//! Cachix binary-cache settings.

use crate::secrets::read_optional_secret_file;
use crate::prelude::*;

/// Settings for pushing build results to a Cachix binary cache.
///
/// Both key files are optional at the schema level; the accessors fail with
/// an internal error when called on an unset field, so callers must check
/// which authentication method is configured before asking for it.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CachixConfig {
    /// Name of the cache to push to.
    pub name: String,

    /// File holding the cache's signing key.
    #[serde(default)]
    pub signing_key_file: Option<PathBuf>,

    /// File holding a Cachix auth token.
    #[serde(default)]
    pub auth_token_file: Option<PathBuf>,
}

impl CachixConfig {
    /// The signing key. Fails if `signing_key_file` is unset.
    pub fn signing_key(&self) -> Result<String> {
        read_optional_secret_file("signing_key", self.signing_key_file.as_deref())
    }

    /// The auth token. Fails if `auth_token_file` is unset.
    pub fn auth_token(&self) -> Result<String> {
        read_optional_secret_file("auth_token", self.auth_token_file.as_deref())
    }

    /// The environment variables to inject into push steps, as opaque
    /// secret handles. Only variables whose backing file is configured are
    /// emitted; the engine resolves the handles at execution time.
    pub fn environment(&self) -> HashMap<String, SecretHandle> {
        let mut environment = HashMap::new();
        if let Some(path) = &self.signing_key_file {
            environment.insert(
                "CACHIX_SIGNING_KEY".to_owned(),
                SecretHandle::new(path.clone()),
            );
        }
        if let Some(path) = &self.auth_token_file {
            environment.insert(
                "CACHIX_AUTH_TOKEN".to_owned(),
                SecretHandle::new(path.clone()),
            );
        }
        environment
    }
}

#[cfg(test)]
fn auth_token_only() -> CachixConfig {
    serde_json::from_str(
        r#"
{
  "name": "mycache",
  "signing_key_file": null,
  "auth_token_file": "/run/secrets/tok"
}"#,
    )
    .expect("parse error")
}

#[test]
fn environment_contains_only_configured_handles() {
    let cachix = auth_token_only();
    let environment = cachix.environment();
    assert_eq!(environment.len(), 1);
    assert_eq!(
        environment.get("CACHIX_AUTH_TOKEN"),
        Some(&SecretHandle::new(PathBuf::from("/run/secrets/tok")))
    );
    assert!(environment.get("CACHIX_SIGNING_KEY").is_none());
}

#[test]
fn unset_signing_key_accessor_fails() {
    let cachix = auth_token_only();
    match cachix.signing_key() {
        Err(ConfigError::Internal(_)) => {}
        other => panic!("expected an internal error, got {:?}", other),
    }
}

#[test]
fn configured_accessor_reads_the_file() {
    use crate::secrets::temp_secret_file;
    let path = temp_secret_file("cachix-signing-key", "sk-1\n");
    let cachix = CachixConfig {
        name: "mycache".to_owned(),
        signing_key_file: Some(path.clone()),
        auth_token_file: None,
    };
    assert_eq!(cachix.signing_key().expect("read error"), "sk-1");
    std::fs::remove_file(&path).expect("could not remove temp secret");
}
