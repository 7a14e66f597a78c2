// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the configuration file that feedsync reads before a
//! run. The configuration file tells feedsync which environment to activate,
//! where the feed repository lives, which feed generator to run inside it,
//! and how to publish the results. Everything has a default, so an empty file
//! (or no file at all) is a valid configuration.
//!
//! # General Layout
//!
//! ```toml
//! [environment]
//! virtualenv = "~/feeds/.venv"
//!
//! [environment.vars]
//! FEEDS_DIR = "feeds"
//!
//! [generator]
//! program = "python3"
//! args = ["generate_feed.py"]
//!
//! [repository]
//! path = "~/feeds"
//! remote = "origin"
//! branch = "main"
//! message_prefix = "Auto update"
//! ```
//!
//! File I/O is left to the caller to figure out.

use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
    str::FromStr,
};

/// Full configuration of a feedsync run.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Environment to activate for child processes.
    pub environment: EnvironmentSettings,

    /// External feed generator to invoke.
    pub generator: GeneratorSettings,

    /// Feed repository to synchronize.
    pub repository: RepositorySettings,
}

impl FromStr for Settings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut settings: Settings = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on every configured path.
        settings.repository.path = expand_path(&settings.repository.path)?;
        if let Some(virtualenv) = settings.environment.virtualenv.take() {
            settings.environment.virtualenv = Some(expand_path(&virtualenv)?);
        }

        Ok(settings)
    }
}

impl Display for Settings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Environment activation settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EnvironmentSettings {
    /// Python virtual environment to activate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub virtualenv: Option<PathBuf>,

    /// Extra variables to export.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub vars: BTreeMap<String, String>,
}

/// Feed generator settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneratorSettings {
    /// Program to execute.
    pub program: String,

    /// Arguments passed to program.
    pub args: Vec<String>,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            program: "python3".into(),
            args: vec!["generate_feed.py".into()],
        }
    }
}

/// Feed repository settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RepositorySettings {
    /// Path to checkout of feed repository.
    pub path: PathBuf,

    /// Remote to push to instead of the upstream of the current branch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote: Option<String>,

    /// Remote branch to push to instead of the upstream of the current branch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    /// Text placed in front of the timestamp of each commit message.
    pub message_prefix: String,
}

impl Default for RepositorySettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("."),
            remote: None,
            branch: None,
            message_prefix: "Auto update".into(),
        }
    }
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    let expanded = shellexpand::full(path.to_string_lossy().as_ref())
        .map_err(ConfigError::ShellExpansion)?
        .into_owned();

    Ok(PathBuf::from(expanded))
}

/// Configuration error types.
#[derive(Clone, Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
