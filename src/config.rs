//! The root configuration object.

use std::fs;
use tracing::debug;
use url::Url;

use crate::prelude::*;

/// Which authentication backend the frontend should use.
///
/// A closed enumeration: anything outside these three values fails at
/// parse time.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthBackendConfig {
    /// Log in through the configured GitHub OAuth application.
    Github,
    /// Log in through the configured Gitea OAuth application.
    Gitea,
    /// No login; the frontend is read-only.
    None,
}

/// The full plugin configuration.
///
/// Constructed by [`BuildbotNixConfig::from_value`] (or its `str`/file
/// wrappers) and immutable afterwards. Construction performs no I/O:
/// every secret-bearing field is a path, read lazily by an accessor.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BuildbotNixConfig {
    /// Database DSN for the CI engine's state store.
    pub db_url: String,

    /// Which authentication backend the frontend uses.
    pub auth_backend: AuthBackendConfig,

    /// How many times a failed build is retried.
    pub build_retries: u32,

    /// Cachix push settings. Absent means pushing is disabled.
    #[serde(default)]
    pub cachix: Option<CachixConfig>,

    /// Gitea integration. Absent means disabled.
    #[serde(default)]
    pub gitea: Option<GiteaConfig>,

    /// GitHub integration. Absent means disabled.
    #[serde(default)]
    pub github: Option<GitHubConfig>,

    /// Users allowed to trigger and cancel any build.
    pub admins: Vec<String>,

    /// File describing the attached build workers.
    pub workers_file: PathBuf,

    /// Nix systems this instance can build, e.g. `x86_64-linux`.
    pub build_systems: Vec<String>,

    /// Memory limit for a single evaluation, in MiB.
    pub eval_max_memory_size: u64,

    /// How many evaluations may run in parallel. `None` lets the engine
    /// pick a value based on the machine.
    #[serde(default)]
    pub eval_worker_count: Option<u32>,

    /// File holding the password shared with remote build workers.
    #[serde(default = "default_nix_workers_secret_file")]
    pub nix_workers_secret_file: PathBuf,

    /// The domain the frontend is served under.
    pub domain: String,

    /// Base URL that forges deliver webhooks to.
    pub webhook_base_url: Url,

    /// Serve the frontend over HTTPS?
    pub use_https: bool,

    /// Where to symlink build outputs. Absent disables output links.
    #[serde(default)]
    pub outputs_path: Option<PathBuf>,

    /// The frontend's own base URL.
    pub url: Url,

    /// Shell steps to run after every successful build.
    #[serde(default)]
    pub post_build_steps: Vec<PostBuildStep>,

    /// Cap on per-job status reports posted to the forge. `None` means
    /// unlimited.
    #[serde(default)]
    pub job_report_limit: Option<u32>,
}

fn default_nix_workers_secret_file() -> PathBuf {
    PathBuf::from("buildbot-nix-workers")
}

impl BuildbotNixConfig {
    /// Parse and validate a configuration from a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value = serde_json::from_str(json)?;
        BuildbotNixConfig::from_value(value)
    }

    /// Parse and validate a configuration from a deserialized JSON value.
    ///
    /// Either returns a fully valid configuration or fails; there is no
    /// partially-valid result.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let config: BuildbotNixConfig = serde_json::from_value(value)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        debug!("loading configuration from {:?}", path);
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        BuildbotNixConfig::from_json_str(&json)
    }

    /// Check semantic constraints that the field types cannot express.
    ///
    /// Runs the whole pass and reports every violation found, so the
    /// operator gets one complete list instead of fixing errors one at a
    /// time.
    pub fn validate(&self) -> Result<()> {
        let mut errors = ValidationErrors::new();

        // The chosen auth backend must have its forge block configured.
        // The reverse is fine: a forge block without the matching
        // `auth_backend` still drives builds, it just isn't used for login.
        match self.auth_backend {
            AuthBackendConfig::Github if self.github.is_none() => errors.push(
                "github",
                "auth_backend is \"github\" but no `github` block is configured",
            ),
            AuthBackendConfig::Gitea if self.gitea.is_none() => errors.push(
                "gitea",
                "auth_backend is \"gitea\" but no `gitea` block is configured",
            ),
            _ => {}
        }

        if let Some(gitea) = &self.gitea {
            if gitea.oauth_id.is_some() != gitea.oauth_secret_file.is_some() {
                errors.push(
                    "gitea",
                    "oauth_id and oauth_secret_file must be configured together",
                );
            }
        }
        if let Some(github) = &self.github {
            if github.oauth_id.is_some() != github.oauth_secret_file.is_some() {
                errors.push(
                    "github",
                    "oauth_id and oauth_secret_file must be configured together",
                );
            }
        }

        if self.eval_worker_count == Some(0) {
            errors.push("eval_worker_count", "must be at least 1 when set");
        }

        errors.into_result()
    }

    /// The password shared with remote build workers.
    pub fn nix_workers_secret(&self) -> Result<String> {
        read_secret_file(&self.nix_workers_secret_file)
    }

    /// The configured post-build steps, translated for the execution
    /// engine.
    pub fn shell_steps(&self) -> Vec<ShellStep> {
        self.post_build_steps
            .iter()
            .map(PostBuildStep::to_shell_step)
            .collect()
    }
}

#[cfg(test)]
const MINIMAL_EXAMPLE: &str = r#"
{
  "db_url": "postgresql://buildbot@localhost/buildbot",
  "auth_backend": "none",
  "build_retries": 1,
  "admins": ["alice"],
  "workers_file": "/var/lib/buildbot/workers.json",
  "build_systems": ["x86_64-linux"],
  "eval_max_memory_size": 4096,
  "domain": "ci.example.com",
  "webhook_base_url": "https://ci.example.com/",
  "use_https": true,
  "url": "https://ci.example.com/"
}"#;

#[test]
fn minimal_document_parses_with_documented_defaults() {
    let config = BuildbotNixConfig::from_json_str(MINIMAL_EXAMPLE).expect("parse error");
    assert_eq!(
        config.nix_workers_secret_file,
        PathBuf::from("buildbot-nix-workers")
    );
    assert!(config.cachix.is_none());
    assert!(config.gitea.is_none());
    assert!(config.github.is_none());
    assert!(config.post_build_steps.is_empty());
    assert_eq!(config.eval_worker_count, None);
    assert_eq!(config.job_report_limit, None);
    assert_eq!(config.outputs_path, None);
}

#[test]
fn full_document_parses() {
    let json = r#"
{
  "db_url": "postgresql://buildbot@localhost/buildbot",
  "auth_backend": "gitea",
  "build_retries": 2,
  "cachix": {
    "name": "mycache",
    "auth_token_file": "/run/secrets/cachix-token"
  },
  "gitea": {
    "instance_url": "https://gitea.example.com",
    "topic": "buildbot",
    "oauth_id": "client-id",
    "oauth_secret_file": "/run/secrets/gitea-oauth"
  },
  "admins": ["alice", "bob"],
  "workers_file": "/var/lib/buildbot/workers.json",
  "build_systems": ["x86_64-linux", "aarch64-linux"],
  "eval_max_memory_size": 4096,
  "eval_worker_count": 8,
  "domain": "ci.example.com",
  "webhook_base_url": "https://ci.example.com/",
  "use_https": true,
  "outputs_path": "/var/www/outputs",
  "url": "https://ci.example.com/",
  "post_build_steps": [
    {
      "name": "notify",
      "environment": {},
      "command": ["echo", { "_type": "Interpolate", "value": "prop:revision" }]
    }
  ],
  "job_report_limit": 50
}"#;
    let config = BuildbotNixConfig::from_json_str(json).expect("parse error");
    assert_eq!(config.auth_backend, AuthBackendConfig::Gitea);
    assert_eq!(config.admins, vec!["alice".to_owned(), "bob".to_owned()]);

    let steps = config.shell_steps();
    assert_eq!(steps.len(), 1);
    assert_eq!(
        steps[0].command,
        vec![
            StepArgument::Literal("echo".to_owned()),
            StepArgument::Interpolate("prop:revision".to_owned()),
        ]
    );
}

#[test]
fn unknown_auth_backend_fails_to_parse() {
    let json = MINIMAL_EXAMPLE.replace("\"none\"", "\"bitbucket\"");
    match BuildbotNixConfig::from_json_str(&json) {
        Err(ConfigError::Malformed(_)) => {}
        other => panic!("expected a parse failure, got {:?}", other),
    }
}

#[test]
fn auth_backend_without_matching_block_fails_validation() {
    let json = MINIMAL_EXAMPLE.replace("\"none\"", "\"github\"");
    match BuildbotNixConfig::from_json_str(&json) {
        Err(ConfigError::Validation(errors)) => {
            assert_eq!(errors.errors().len(), 1);
            assert_eq!(errors.errors()[0].field, "github");
        }
        other => panic!("expected a validation failure, got {:?}", other),
    }
}

#[test]
fn validation_reports_every_violation() {
    // Two independent problems: the selected backend has no block, and the
    // gitea block configures only half of an OAuth application.
    let json = r#"
{
  "db_url": "postgresql://buildbot@localhost/buildbot",
  "auth_backend": "github",
  "build_retries": 1,
  "gitea": {
    "instance_url": "https://gitea.example.com",
    "oauth_id": "client-id"
  },
  "admins": [],
  "workers_file": "workers.json",
  "build_systems": ["x86_64-linux"],
  "eval_max_memory_size": 2048,
  "eval_worker_count": 0,
  "domain": "ci.example.com",
  "webhook_base_url": "https://ci.example.com/",
  "use_https": false,
  "url": "https://ci.example.com/"
}"#;
    match BuildbotNixConfig::from_json_str(json) {
        Err(ConfigError::Validation(errors)) => {
            assert_eq!(errors.errors().len(), 3);
        }
        other => panic!("expected a validation failure, got {:?}", other),
    }
}

#[test]
fn nix_workers_secret_reads_lazily() {
    use crate::secrets::temp_secret_file;
    let path = temp_secret_file("workers", "worker-password\n");
    let json = MINIMAL_EXAMPLE.replace(
        "\"use_https\": true,",
        &format!(
            "\"use_https\": true, \"nix_workers_secret_file\": {},",
            serde_json::to_string(&path).expect("serialize error")
        ),
    );
    let config = BuildbotNixConfig::from_json_str(&json).expect("parse error");
    assert_eq!(config.nix_workers_secret().expect("read error"), "worker-password");
    fs::remove_file(&path).expect("could not remove temp secret");
}
