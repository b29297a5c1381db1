//! Validated configuration for a Nix-centric CI plugin.
//!
//! This crate owns the configuration schema handed to us by the hosting CI
//! framework: connection settings for the supported forges, secret file
//! references, and post-build step templates. It deliberately does *not*
//! schedule builds, verify webhooks or talk to any forge — it only parses,
//! validates and holds configuration, and resolves secrets lazily when a
//! downstream consumer asks for them.
//!
//! Secret material never lives inside the configuration object. Fields hold
//! *paths* to secret files, and explicit accessor methods read them fresh on
//! every call. Serializing a configuration therefore never leaks a secret.

#![warn(missing_docs)]

pub mod cachix;
pub mod config;
pub mod errors;
pub mod gitea;
pub mod github;
pub mod interpolate;
pub mod secrets;
pub mod step;

/// Common imports used by many modules.
pub mod prelude {
    pub use serde::{Deserialize, Serialize};
    pub use std::{
        collections::HashMap,
        fmt,
        path::{Path, PathBuf},
    };

    pub use crate::cachix::CachixConfig;
    pub use crate::config::{AuthBackendConfig, BuildbotNixConfig};
    pub use crate::errors::{ConfigError, InternalError, Result, ValidationErrors};
    pub use crate::gitea::GiteaConfig;
    pub use crate::github::{
        GitHubAppConfig, GitHubAuthConfig, GitHubConfig, GitHubLegacyConfig,
    };
    pub use crate::interpolate::{Interpolate, SerializeMode, StepValue};
    pub use crate::secrets::{read_secret_file, SecretHandle};
    pub use crate::step::{PostBuildStep, ShellStep, StepArgument};
}
