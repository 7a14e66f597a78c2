// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Working directory selection.
//!
//! Every step after activation runs inside the checkout of the feed
//! repository. Feedsync never changes the working directory of its own
//! process. Instead, the selected directory is handed to each child process
//! and to the synchronizer explicitly.

use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};
use tracing::{debug, instrument};

/// Canonical path to an existing directory.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct WorkDir(PathBuf);

impl WorkDir {
    /// Select target directory as the working directory.
    ///
    /// Does not check whether the directory is a Git repository, that is left
    /// to the synchronizer.
    ///
    /// # Errors
    ///
    /// - Return [`WorkDirError::Missing`] if path cannot be resolved.
    /// - Return [`WorkDirError::NotADirectory`] if path is not a directory.
    #[instrument(skip(path), level = "debug")]
    pub fn select(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let canonical = path.canonicalize().map_err(|err| WorkDirError::Missing {
            source: err,
            path: path.to_path_buf(),
        })?;

        if !canonical.is_dir() {
            return Err(WorkDirError::NotADirectory { path: canonical });
        }

        debug!("selected working directory {}", canonical.display());
        Ok(Self(canonical))
    }

    /// Treat working directory as [`Path`] slice.
    pub fn as_path(&self) -> &Path {
        self.0.as_path()
    }
}

impl Display for WorkDir {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_path().to_string_lossy().as_ref())
    }
}

/// Working directory selection error types.
#[derive(Debug, thiserror::Error)]
pub enum WorkDirError {
    /// Path does not exist or cannot be accessed.
    #[error("cannot change into {path:?}")]
    Missing {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Path exists but is not a directory.
    #[error("{path:?} is not a directory")]
    NotADirectory { path: PathBuf },
}

/// Friendly result alias :3
type Result<T, E = WorkDirError> = std::result::Result<T, E>;
