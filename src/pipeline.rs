// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Feed publishing pipeline.
//!
//! A run of feedsync is a strictly sequential pipeline of four steps:
//!
//! 1. Activate the environment for child processes.
//! 2. Select the working directory holding the feed repository.
//! 3. Run the feed generator inside of it.
//! 4. Stage and commit whatever changed, then push the new commit.
//!
//! Any failing step ends the run with an exit status that describes the
//! failure. The one exception is the commit step. Failing to commit (usually
//! because the generator produced no changes) ends the run successfully, and
//! nothing is pushed.

use crate::{
    config::Settings,
    environment::{Activation, ActivationError},
    generator::{FeedGenerator, GeneratorError},
    sync::{CommitOutcome, Git2Synchronizer, SyncError, Synchronizer},
    workdir::{WorkDir, WorkDirError},
};

use chrono::{DateTime, Utc};
use git2::Oid;
use std::marker::PhantomData;
use tracing::{info, instrument, warn};

/// Timestamp layout used in commit messages.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

/// Build commit message from prefix and time of commit.
pub fn commit_message(prefix: &str, time: DateTime<Utc>) -> String {
    format!("{prefix} {}", time.format(TIMESTAMP_FORMAT))
}

/// Successful end of a run.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Outcome {
    /// Changes were committed and pushed.
    Pushed { commit: Oid, message: String },

    /// Commit step did not produce a commit, so push was skipped.
    NothingToCommit,
}

/// Sequential feed publishing pipeline.
#[derive(Debug)]
pub struct Pipeline<S = Git2Synchronizer>
where
    S: Synchronizer,
{
    settings: Settings,
    synchronizer: PhantomData<S>,
}

impl Pipeline<Git2Synchronizer> {
    /// Construct new pipeline backed by libgit2.
    pub fn new(settings: Settings) -> Self {
        Self::with_synchronizer(settings)
    }
}

impl<S> Pipeline<S>
where
    S: Synchronizer,
{
    /// Construct new pipeline with custom synchronizer.
    pub fn with_synchronizer(settings: Settings) -> Self {
        Self {
            settings,
            synchronizer: PhantomData,
        }
    }

    /// Run every step of the pipeline in order.
    ///
    /// # Errors
    ///
    /// - Return [`PipelineError::Activation`] if environment activation fails.
    /// - Return [`PipelineError::WorkDir`] if working directory is unusable.
    /// - Return [`PipelineError::Generator`] if feed generator fails.
    /// - Return [`PipelineError::Push`] if push fails.
    #[instrument(skip(self), level = "debug")]
    pub fn run(&self) -> Result<Outcome> {
        let activation = Activation::activate(&self.settings.environment)?;
        let workdir = WorkDir::select(&self.settings.repository.path)?;

        FeedGenerator::from(&self.settings.generator).run(&workdir, &activation)?;

        let message = commit_message(&self.settings.repository.message_prefix, Utc::now());
        let (synchronizer, commit) = match self.commit(&workdir, &message) {
            Ok((synchronizer, CommitOutcome::Committed(commit))) => (synchronizer, commit),
            Ok((_, CommitOutcome::NothingToCommit)) => {
                info!("nothing to commit, skip push");
                return Ok(Outcome::NothingToCommit);
            }
            Err(error) => {
                warn!("commit failed, skip push: {error}");
                return Ok(Outcome::NothingToCommit);
            }
        };

        synchronizer.push().map_err(PipelineError::Push)?;
        info!("published {commit}");

        Ok(Outcome::Pushed { commit, message })
    }

    fn commit(
        &self,
        workdir: &WorkDir,
        message: &str,
    ) -> std::result::Result<(S, CommitOutcome), SyncError> {
        let synchronizer = S::open(workdir, &self.settings.repository)?;
        let outcome = synchronizer.stage_and_commit(message)?;
        Ok((synchronizer, outcome))
    }
}

/// Pipeline error types.
///
/// Commit failures never show up here, because they end a run successfully.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Environment could not be activated.
    #[error(transparent)]
    Activation(#[from] ActivationError),

    /// Working directory could not be selected.
    #[error(transparent)]
    WorkDir(#[from] WorkDirError),

    /// Feed generator failed.
    #[error(transparent)]
    Generator(#[from] GeneratorError),

    /// New commit could not be pushed.
    #[error("failed to push feed updates")]
    Push(#[source] SyncError),
}

impl PipelineError {
    /// Exit status to report for this failure.
    ///
    /// Feed generator failures pass through the generator's own status.
    /// Everything else reports a general failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Generator(error) => error.exit_code(),
            Self::Activation(_) | Self::WorkDir(_) | Self::Push(_) => 1,
        }
    }
}

/// Friendly result alias :3
type Result<T, E = PipelineError> = std::result::Result<T, E>;
