// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Feed generator invocation.
//!
//! The feed generator is an external program that scrapes its sources and
//! rewrites feed files inside the working directory. Feedsync treats it as a
//! black box. Only its exit status is inspected, and its standard streams are
//! handed straight through to the user.

use crate::{config::GeneratorSettings, environment::Activation, workdir::WorkDir};

use std::{
    io::ErrorKind,
    process::{Command, ExitStatus},
};
use tracing::{info, instrument};

/// External feed generator.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct FeedGenerator {
    program: String,
    args: Vec<String>,
}

impl FeedGenerator {
    /// Construct new feed generator.
    pub fn new(
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Run feed generator inside working directory.
    ///
    /// Blocks until the generator exits. There is no timeout.
    ///
    /// # Errors
    ///
    /// - Return [`GeneratorError::Spawn`] if program cannot be started.
    /// - Return [`GeneratorError::Wait`] if program cannot be waited on.
    /// - Return [`GeneratorError::Failed`] if program exits unsuccessfully.
    #[instrument(skip(self, workdir, activation), level = "debug")]
    pub fn run(&self, workdir: &WorkDir, activation: &Activation) -> Result<()> {
        info!("run feed generator {:?} in {}", self.command_line(), workdir);
        let mut command = Command::new(&self.program);
        command.args(&self.args).current_dir(workdir.as_path());
        activation.apply(&mut command);

        let mut child = command.spawn().map_err(|err| GeneratorError::Spawn {
            source: err,
            program: self.program.clone(),
        })?;
        let status = child.wait().map_err(|err| GeneratorError::Wait {
            source: err,
            program: self.program.clone(),
        })?;

        if !status.success() {
            return Err(GeneratorError::Failed {
                program: self.program.clone(),
                code: exit_code(status),
            });
        }

        Ok(())
    }

    fn command_line(&self) -> String {
        format!("{} {}", self.program, self.args.join(" "))
    }
}

impl From<&GeneratorSettings> for FeedGenerator {
    fn from(settings: &GeneratorSettings) -> Self {
        Self::new(settings.program.as_str(), settings.args.iter().map(String::as_str))
    }
}

/// Convert exit status into the code a POSIX shell would report for it.
///
/// Processes terminated by a signal yield `128 + signal`.
pub fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}

/// Feed generator error types.
#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    /// Program could not be started.
    #[error("cannot run feed generator {program:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        program: String,
    },

    /// Program started, but its exit status could not be collected.
    #[error("lost track of feed generator {program:?}")]
    Wait {
        #[source]
        source: std::io::Error,
        program: String,
    },

    /// Program ran but exited unsuccessfully.
    #[error("feed generator {program:?} failed with exit status {code}")]
    Failed { program: String, code: i32 },
}

impl GeneratorError {
    /// Exit status to report for this failure.
    ///
    /// Follows shell conventions: 127 for a missing program, and 126 for a
    /// program that cannot be executed. Losing track of a running program is
    /// a general failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Spawn { source, .. } if source.kind() == ErrorKind::NotFound => 127,
            Self::Spawn { .. } => 126,
            Self::Wait { .. } => 1,
            Self::Failed { code, .. } => *code,
        }
    }
}

/// Friendly result alias :3
type Result<T, E = GeneratorError> = std::result::Result<T, E>;
