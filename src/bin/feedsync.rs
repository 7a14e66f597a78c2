// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use feedsync::{
    config::Settings,
    path::default_config_path,
    pipeline::{Outcome, Pipeline, PipelineError},
};

use anyhow::{Context, Result};
use clap::Parser;
use std::{fs::read_to_string, path::PathBuf, process::exit};
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Regenerate feeds, then commit and push any changes.
#[derive(Debug, Clone, Parser)]
#[command(about, override_usage = "feedsync [options]", version)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, value_name = "path")]
    pub config: Option<PathBuf>,
}

impl Cli {
    fn run(self) -> Result<()> {
        let settings = load_settings(self.config)?;
        match Pipeline::new(settings).run()? {
            Outcome::Pushed { commit, message } => info!("pushed {commit} \"{message}\""),
            Outcome::NothingToCommit => info!("feeds already up to date"),
        }

        Ok(())
    }
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(
            error
                .downcast_ref::<PipelineError>()
                .map(PipelineError::exit_code)
                .unwrap_or(1),
        );
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

/// Load settings from explicit path, or from default path if it exists.
fn load_settings(path: Option<PathBuf>) -> Result<Settings> {
    let path = match path {
        Some(path) => path,
        None => {
            let path = default_config_path()?;
            if !path.exists() {
                debug!("no configuration at {}, using defaults", path.display());
                return Ok(Settings::default());
            }
            path
        }
    };

    debug!("load configuration from {}", path.display());
    let data = read_to_string(&path)
        .with_context(|| format!("failed to read configuration {}", path.display()))?;
    let settings = data
        .parse::<Settings>()
        .with_context(|| format!("failed to parse configuration {}", path.display()))?;

    Ok(settings)
}
