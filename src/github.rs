//! GitHub connection settings.
//!
//! GitHub supports two authentication strategies: a classic personal access
//! token, or a GitHub App installation. The wire format carries no
//! discriminator for the choice; the two shapes are told apart by which
//! required fields are present. See [`GitHubAuthConfig`].

use serde::de::{self, Deserializer};
use serde_json::Value;
use std::result;

use crate::secrets::read_optional_secret_file;
use crate::prelude::*;

/// Authentication via a classic personal access token.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GitHubLegacyConfig {
    /// File holding the personal access token.
    pub token_file: PathBuf,
}

impl GitHubLegacyConfig {
    /// The personal access token.
    pub fn token(&self) -> Result<String> {
        read_secret_file(&self.token_file)
    }
}

/// Authentication as an installed GitHub App.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GitHubAppConfig {
    /// The numeric application id.
    pub id: u64,

    /// File holding the app's RSA private key.
    pub secret_key_file: PathBuf,

    /// Where to persist per-installation access tokens.
    #[serde(default = "default_installation_token_map_file")]
    pub installation_token_map_file: PathBuf,

    /// Where to persist the project-name-to-installation-id map.
    #[serde(default = "default_project_id_map_file")]
    pub project_id_map_file: PathBuf,

    /// Where to persist the app JWT.
    #[serde(default = "default_jwt_token_map")]
    pub jwt_token_map: PathBuf,
}

fn default_installation_token_map_file() -> PathBuf {
    PathBuf::from("github-app-installation-token-map.json")
}

fn default_project_id_map_file() -> PathBuf {
    PathBuf::from("github-app-project-id-map-name.json")
}

fn default_jwt_token_map() -> PathBuf {
    PathBuf::from("github-app-jwt-token")
}

impl GitHubAppConfig {
    /// The app's RSA private key.
    pub fn secret_key(&self) -> Result<String> {
        read_secret_file(&self.secret_key_file)
    }
}

/// Which GitHub authentication strategy to use.
///
/// A structural union: the wire format has no discriminator tag, so the
/// variant is chosen by which required fields the input carries. The legacy
/// shape is recognized by `token_file`, the app shape by `id` plus
/// `secret_key_file`. Shapes are checked in that fixed order, and input
/// matching both (or neither) is rejected outright rather than silently
/// resolved to the first match.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GitHubAuthConfig {
    /// Classic personal access token.
    Legacy(GitHubLegacyConfig),
    /// GitHub App installation.
    App(GitHubAppConfig),
}

impl<'de> Deserialize<'de> for GitHubAuthConfig {
    fn deserialize<D>(deserializer: D) -> result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let object = value
            .as_object()
            .ok_or_else(|| de::Error::custom("auth_type: expected an object"))?;

        let looks_legacy = object.contains_key("token_file");
        let looks_app = object.contains_key("id") && object.contains_key("secret_key_file");
        match (looks_legacy, looks_app) {
            (true, true) => Err(de::Error::custom(
                "auth_type: matches both the token shape and the app shape; \
                 configure exactly one",
            )),
            (true, false) => serde_json::from_value(value)
                .map(GitHubAuthConfig::Legacy)
                .map_err(de::Error::custom),
            (false, true) => serde_json::from_value(value)
                .map(GitHubAuthConfig::App)
                .map_err(de::Error::custom),
            (false, false) => Err(de::Error::custom(
                "auth_type: matches neither the token shape (token_file) nor \
                 the app shape (id, secret_key_file)",
            )),
        }
    }
}

/// Connection settings for GitHub.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GitHubConfig {
    /// How to authenticate against the GitHub API.
    pub auth_type: GitHubAuthConfig,

    /// Only build repositories carrying this topic.
    #[serde(default)]
    pub topic: Option<String>,

    /// Where to cache the repository list between reconfigurations.
    #[serde(default = "default_project_cache_file")]
    pub project_cache_file: PathBuf,

    /// File holding the shared webhook secret.
    #[serde(default = "default_webhook_secret_file")]
    pub webhook_secret_file: PathBuf,

    /// OAuth application id, for frontend login.
    #[serde(default)]
    pub oauth_id: Option<String>,

    /// File holding the OAuth application secret.
    #[serde(default)]
    pub oauth_secret_file: Option<PathBuf>,
}

fn default_project_cache_file() -> PathBuf {
    PathBuf::from("github-project-cache-v1.json")
}

fn default_webhook_secret_file() -> PathBuf {
    PathBuf::from("github-webhook-secret")
}

impl GitHubConfig {
    /// The shared webhook secret.
    pub fn webhook_secret(&self) -> Result<String> {
        read_secret_file(&self.webhook_secret_file)
    }

    /// The OAuth application secret. Fails if `oauth_secret_file` is unset.
    pub fn oauth_secret(&self) -> Result<String> {
        read_optional_secret_file("oauth_secret", self.oauth_secret_file.as_deref())
    }
}

#[test]
fn legacy_shape_resolves_to_legacy() {
    let json = r#"{ "token_file": "github-token" }"#;
    let auth: GitHubAuthConfig = serde_json::from_str(json).expect("parse error");
    assert_eq!(
        auth,
        GitHubAuthConfig::Legacy(GitHubLegacyConfig {
            token_file: PathBuf::from("github-token"),
        })
    );
}

#[test]
fn app_shape_resolves_to_app_with_defaults() {
    let json = r#"{ "id": 12345, "secret_key_file": "github-app-key.pem" }"#;
    let auth: GitHubAuthConfig = serde_json::from_str(json).expect("parse error");
    match auth {
        GitHubAuthConfig::App(app) => {
            assert_eq!(app.id, 12345);
            assert_eq!(
                app.installation_token_map_file,
                PathBuf::from("github-app-installation-token-map.json")
            );
            assert_eq!(
                app.project_id_map_file,
                PathBuf::from("github-app-project-id-map-name.json")
            );
            assert_eq!(app.jwt_token_map, PathBuf::from("github-app-jwt-token"));
        }
        other => panic!("expected the app variant, got {:?}", other),
    }
}

#[test]
fn ambiguous_shape_is_rejected() {
    let json = r#"{ "token_file": "t", "id": 1, "secret_key_file": "k" }"#;
    let err = serde_json::from_str::<GitHubAuthConfig>(json).expect_err("expected an error");
    assert!(err.to_string().contains("both"));
}

#[test]
fn unmatched_shape_is_rejected() {
    let json = r#"{ "id": 1 }"#;
    assert!(serde_json::from_str::<GitHubAuthConfig>(json).is_err());
}

#[test]
fn github_config_defaults() {
    let json = r#"{ "auth_type": { "token_file": "github-token" } }"#;
    let github: GitHubConfig = serde_json::from_str(json).expect("parse error");
    assert_eq!(
        github.project_cache_file,
        PathBuf::from("github-project-cache-v1.json")
    );
    assert_eq!(
        github.webhook_secret_file,
        PathBuf::from("github-webhook-secret")
    );
    match github.oauth_secret() {
        Err(ConfigError::Internal(_)) => {}
        other => panic!("expected an internal error, got {:?}", other),
    }
}
