// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Environment activation.
//!
//! The feed generator usually depends on packages installed into a Python
//! virtual environment. Sourcing `bin/activate` in a shell does three things:
//! exports `VIRTUAL_ENV`, puts the environment's script directory at the front
//! of `PATH`, and unsets `PYTHONHOME`. Feedsync performs the same changes, but
//! records them as an [`Activation`] that gets applied to each child process
//! instead of mutating the environment of feedsync itself.

use crate::config::EnvironmentSettings;

use std::{
    env,
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    process::Command,
};
use tracing::{debug, info, instrument};

#[cfg(windows)]
const SCRIPT_DIR: &str = "Scripts";
#[cfg(not(windows))]
const SCRIPT_DIR: &str = "bin";

/// Environment changes applied to every child process.
#[derive(Debug, Default, PartialEq, Eq, Clone)]
pub struct Activation {
    set: Vec<(OsString, OsString)>,
    unset: Vec<OsString>,
}

impl Activation {
    /// Activate environment described by settings.
    ///
    /// Variables listed in the settings are exported after the virtual
    /// environment is activated, so they can override `PATH` or `VIRTUAL_ENV`
    /// if the user really wants to.
    ///
    /// # Errors
    ///
    /// - Return [`ActivationError::MissingVirtualenv`] if virtual environment
    ///   directory does not exist.
    /// - Return [`ActivationError::MissingScriptDir`] if virtual environment
    ///   lacks a script directory.
    /// - Return [`ActivationError::JoinPaths`] if new `PATH` cannot be built.
    #[instrument(skip(settings), level = "debug")]
    pub fn activate(settings: &EnvironmentSettings) -> Result<Self> {
        let mut activation = Self::default();

        if let Some(virtualenv) = &settings.virtualenv {
            activation.activate_virtualenv(virtualenv)?;
        }

        for (key, value) in &settings.vars {
            debug!("export {key}={value}");
            activation.set.push((key.into(), value.into()));
        }

        Ok(activation)
    }

    /// Apply environment changes to target command.
    pub fn apply(&self, command: &mut Command) {
        for key in &self.unset {
            command.env_remove(key);
        }

        command.envs(self.set.iter().map(|(key, value)| (key, value)));
    }

    /// Lookup value this activation assigns to target variable.
    pub fn var(&self, key: impl AsRef<OsStr>) -> Option<&OsStr> {
        self.set
            .iter()
            .rev()
            .find(|(name, _)| name.as_os_str() == key.as_ref())
            .map(|(_, value)| value.as_os_str())
    }

    /// Check if this activation removes target variable.
    pub fn unsets(&self, key: impl AsRef<OsStr>) -> bool {
        self.unset.iter().any(|name| name.as_os_str() == key.as_ref())
    }

    fn activate_virtualenv(&mut self, virtualenv: &Path) -> Result<()> {
        info!("activate virtual environment {}", virtualenv.display());

        // INVARIANT: Children run elsewhere, so only export absolute paths.
        let virtualenv = virtualenv
            .canonicalize()
            .ok()
            .filter(|path| path.is_dir())
            .ok_or_else(|| ActivationError::MissingVirtualenv {
                path: virtualenv.to_path_buf(),
            })?;

        let script_dir = virtualenv.join(SCRIPT_DIR);
        if !script_dir.is_dir() {
            return Err(ActivationError::MissingScriptDir { path: script_dir });
        }

        // INVARIANT: Script directory always comes first in lookup order.
        let mut search_paths = vec![script_dir];
        if let Some(path) = env::var_os("PATH") {
            search_paths.extend(env::split_paths(&path));
        }
        let path = env::join_paths(search_paths)?;

        self.set.push(("VIRTUAL_ENV".into(), virtualenv.into_os_string()));
        self.set.push(("PATH".into(), path));
        self.unset.push("PYTHONHOME".into());

        Ok(())
    }
}

/// Environment activation error types.
#[derive(Debug, thiserror::Error)]
pub enum ActivationError {
    /// Virtual environment directory does not exist.
    #[error("virtual environment {path:?} does not exist")]
    MissingVirtualenv { path: PathBuf },

    /// Virtual environment has no script directory.
    #[error("virtual environment is missing script directory {path:?}")]
    MissingScriptDir { path: PathBuf },

    /// New search path contains invalid characters.
    #[error(transparent)]
    JoinPaths(#[from] env::JoinPathsError),
}

/// Friendly result alias :3
type Result<T, E = ActivationError> = std::result::Result<T, E>;
