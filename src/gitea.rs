//! Gitea connection settings.

use crate::secrets::read_optional_secret_file;
use crate::prelude::*;

/// Connection settings for a Gitea instance.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GiteaConfig {
    /// Base URL of the Gitea instance.
    pub instance_url: String,

    /// Only build repositories carrying this topic. `None` builds all
    /// repositories the token can see.
    #[serde(default)]
    pub topic: Option<String>,

    /// File holding the API token.
    #[serde(default = "default_token_file")]
    pub token_file: PathBuf,

    /// File holding the shared webhook secret.
    #[serde(default = "default_webhook_secret_file")]
    pub webhook_secret_file: PathBuf,

    /// Where to cache the repository list between reconfigurations.
    #[serde(default = "default_project_cache_file")]
    pub project_cache_file: PathBuf,

    /// OAuth application id, for frontend login.
    #[serde(default)]
    pub oauth_id: Option<String>,

    /// File holding the OAuth application secret.
    #[serde(default)]
    pub oauth_secret_file: Option<PathBuf>,
}

fn default_token_file() -> PathBuf {
    PathBuf::from("gitea-token")
}

fn default_webhook_secret_file() -> PathBuf {
    PathBuf::from("gitea-webhook-secret")
}

fn default_project_cache_file() -> PathBuf {
    PathBuf::from("gitea-project-cache.json")
}

impl GiteaConfig {
    /// The API token.
    pub fn token(&self) -> Result<String> {
        read_secret_file(&self.token_file)
    }

    /// The shared webhook secret.
    pub fn webhook_secret(&self) -> Result<String> {
        read_secret_file(&self.webhook_secret_file)
    }

    /// The OAuth application secret. Fails if `oauth_secret_file` is unset;
    /// callers must check that OAuth login is configured first.
    pub fn oauth_secret(&self) -> Result<String> {
        read_optional_secret_file("oauth_secret", self.oauth_secret_file.as_deref())
    }
}

#[test]
fn minimal_config_uses_documented_defaults() {
    let json = r#"{ "instance_url": "https://gitea.example.com" }"#;
    let gitea: GiteaConfig = serde_json::from_str(json).expect("parse error");
    assert_eq!(gitea.token_file, PathBuf::from("gitea-token"));
    assert_eq!(gitea.webhook_secret_file, PathBuf::from("gitea-webhook-secret"));
    assert_eq!(gitea.project_cache_file, PathBuf::from("gitea-project-cache.json"));
    assert_eq!(gitea.topic, None);
    assert_eq!(gitea.oauth_id, None);
}

#[test]
fn unset_oauth_secret_accessor_fails() {
    let json = r#"{ "instance_url": "https://gitea.example.com" }"#;
    let gitea: GiteaConfig = serde_json::from_str(json).expect("parse error");
    match gitea.oauth_secret() {
        Err(ConfigError::Internal(_)) => {}
        other => panic!("expected an internal error, got {:?}", other),
    }
}
