// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Version control synchronization.
//!
//! Once the feed generator is done, everything it changed inside the working
//! directory gets staged, committed on top of `HEAD`, and pushed to a remote.
//! Staging picks up new, modified, and deleted files alike, but never files
//! matched by `.gitignore`.
//!
//! # Push Target
//!
//! Feedsync pushes the currently checked out branch. Unless the configuration
//! says otherwise, the remote is taken from `branch.<name>.remote` and the
//! destination ref from `branch.<name>.merge`, falling back to `origin` and a
//! branch of the same name. This mirrors a plain `git push` with the default
//! push configuration.
//!
//! # Credentials
//!
//! Credentials are never prompted for by feedsync itself. They are looked up
//! through Git's credential helpers, the SSH agent, and the default SSH keys
//! by way of [`auth_git2`].

use crate::{config::RepositorySettings, workdir::WorkDir};

use auth_git2::GitAuthenticator;
use git2::{
    Commit, ErrorCode, IndexAddOption, Oid, PushOptions, RemoteCallbacks, Repository,
};
use std::cell::RefCell;
use tracing::{debug, info, instrument};

/// Result of staging and committing.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum CommitOutcome {
    /// New commit was created on `HEAD`.
    Committed(Oid),

    /// Staged tree is identical to `HEAD`, so nothing was committed.
    NothingToCommit,
}

/// Layer of indirection for publishing changes in the working directory.
pub trait Synchronizer: Sized {
    /// Open synchronizer for repository checked out at working directory.
    fn open(workdir: &WorkDir, settings: &RepositorySettings) -> Result<Self>;

    /// Stage all changes and commit them with target message.
    fn stage_and_commit(&self, message: &str) -> Result<CommitOutcome>;

    /// Push current branch to its remote.
    fn push(&self) -> Result<()>;
}

/// Synchronization through libgit2.
pub struct Git2Synchronizer {
    repository: Repository,
    remote: Option<String>,
    branch: Option<String>,
}

impl std::fmt::Debug for Git2Synchronizer {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("Git2Synchronizer")
            .field("repository", &self.repository.path())
            .field("remote", &self.remote)
            .field("branch", &self.branch)
            .finish()
    }
}

impl Git2Synchronizer {
    fn head_commit(&self) -> Result<Option<Commit<'_>>> {
        match self.repository.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?)),
            Err(err) if matches!(err.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                Ok(None)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn current_branch(&self) -> Result<String> {
        let head = self.repository.head()?;
        if !head.is_branch() {
            return Err(SyncError::DetachedHead);
        }

        head.shorthand()
            .map(ToString::to_string)
            .ok_or(SyncError::DetachedHead)
    }

    /// Determine remote name and refspec that a push of target branch uses.
    fn push_target(&self, branch: &str) -> Result<(String, String)> {
        let config = self.repository.config()?.snapshot()?;

        let remote = match &self.remote {
            Some(remote) => remote.clone(),
            None => config
                .get_string(&format!("branch.{branch}.remote"))
                .unwrap_or_else(|_| "origin".into()),
        };

        let destination = match &self.branch {
            Some(target) => format!("refs/heads/{target}"),
            None => config
                .get_string(&format!("branch.{branch}.merge"))
                .unwrap_or_else(|_| format!("refs/heads/{branch}")),
        };

        Ok((remote, format!("refs/heads/{branch}:{destination}")))
    }
}

impl Synchronizer for Git2Synchronizer {
    #[instrument(skip(workdir, settings), level = "debug")]
    fn open(workdir: &WorkDir, settings: &RepositorySettings) -> Result<Self> {
        debug!("open repository {}", workdir);
        let repository = Repository::open(workdir.as_path())?;

        Ok(Self {
            repository,
            remote: settings.remote.clone(),
            branch: settings.branch.clone(),
        })
    }

    #[instrument(skip(self), level = "debug")]
    fn stage_and_commit(&self, message: &str) -> Result<CommitOutcome> {
        let mut index = self.repository.index()?;

        // INVARIANT: Stage additions and modifications, then deletions.
        index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"], None)?;
        index.write()?;
        let tree_oid = index.write_tree()?;

        let parent = self.head_commit()?;
        let unchanged = match &parent {
            Some(parent) => parent.tree_id() == tree_oid,
            None => index.is_empty(),
        };
        if unchanged {
            return Ok(CommitOutcome::NothingToCommit);
        }

        let tree = self.repository.find_tree(tree_oid)?;
        let signature = self.repository.signature()?;
        let parents = parent.iter().collect::<Vec<_>>();
        let oid = self.repository.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parents,
        )?;
        info!("committed {oid}: {message}");

        Ok(CommitOutcome::Committed(oid))
    }

    #[instrument(skip(self), level = "debug")]
    fn push(&self) -> Result<()> {
        let branch = self.current_branch()?;
        let (remote_name, refspec) = self.push_target(&branch)?;
        info!("push {refspec} to {remote_name}");

        let config = self.repository.config()?;
        let authenticator = GitAuthenticator::default();
        let rejected = RefCell::new(Vec::new());

        let mut rc = RemoteCallbacks::new();
        rc.credentials(authenticator.credentials(&config));
        rc.push_update_reference(|refname, status| {
            if let Some(status) = status {
                rejected.borrow_mut().push(format!("{refname}: {status}"));
            }
            Ok(())
        });

        let mut po = PushOptions::new();
        po.remote_callbacks(rc);

        let mut remote = self.repository.find_remote(&remote_name)?;
        remote.push(&[refspec.as_str()], Some(&mut po))?;

        let rejected = rejected.take();
        if !rejected.is_empty() {
            return Err(SyncError::Rejected { refs: rejected });
        }

        Ok(())
    }
}

/// Synchronization error types.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// `HEAD` does not point at a branch, so there is nothing to push.
    #[error("HEAD is detached, cannot determine branch to push")]
    DetachedHead,

    /// Remote refused to update one or more refs.
    #[error("remote rejected push: {}", .refs.join(", "))]
    Rejected { refs: Vec<String> },

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),
}

/// Friendly result alias :3
type Result<T, E = SyncError> = std::result::Result<T, E>;
