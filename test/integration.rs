// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::FeedRepoFixture;

use anyhow::Result;
use chrono::{NaiveDateTime, Utc};
use feedsync::pipeline::{Outcome, Pipeline, PipelineError, TIMESTAMP_FORMAT};
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use std::{env::current_dir, fs, path::Path, process::Command};

#[sealed_test]
fn changed_feeds_are_committed_and_pushed() -> Result<()> {
    let fixture = FeedRepoFixture::new(current_dir()?)?;
    let before = Utc::now().timestamp();

    let outcome = Pipeline::new(fixture.settings("echo '<rss/>' > news.xml")).run()?;
    let after = Utc::now().timestamp();

    let (commit, message) = match outcome {
        Outcome::Pushed { commit, message } => (commit, message),
        other => panic!("expected push, got {other:?}"),
    };
    assert_eq!(fixture.work_head()?, commit);
    assert_eq!(fixture.remote_head()?, commit);

    let stamp = message
        .strip_prefix("Auto update ")
        .expect("commit message carries prefix");
    let stamp = NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT)?
        .and_utc()
        .timestamp();
    assert!(before <= stamp && stamp <= after);

    let tree = fixture.work.head()?.peel_to_tree()?;
    assert!(tree.get_name("news.xml").is_some());

    Ok(())
}

#[sealed_test]
fn unchanged_feeds_exit_cleanly_without_push() -> Result<()> {
    let fixture = FeedRepoFixture::new(current_dir()?)?;
    let head = fixture.work_head()?;

    let outcome = Pipeline::new(fixture.settings("true")).run()?;

    assert_eq!(outcome, Outcome::NothingToCommit);
    assert_eq!(fixture.work_head()?, head);
    assert_eq!(fixture.remote_head()?, head);

    Ok(())
}

#[sealed_test]
fn generator_failure_propagates_status() -> Result<()> {
    let fixture = FeedRepoFixture::new(current_dir()?)?;
    let head = fixture.work_head()?;

    let result = Pipeline::new(fixture.settings("echo '<rss/>' > news.xml; exit 5")).run();

    match result {
        Err(error @ PipelineError::Generator(_)) => assert_eq!(error.exit_code(), 5),
        other => panic!("expected generator failure, got {other:?}"),
    }
    assert_eq!(fixture.work_head()?, head);
    assert_eq!(fixture.remote_head()?, head);
    assert!(fixture.work.index()?.get_path(Path::new("news.xml"), 0).is_none());

    Ok(())
}

#[sealed_test]
fn missing_workdir_short_circuits() -> Result<()> {
    let fixture = FeedRepoFixture::new(current_dir()?)?;
    let head = fixture.work_head()?;
    let marker = current_dir()?.join("generator-ran");

    let mut settings = fixture.settings(&format!("touch {}", marker.display()));
    settings.repository.path = current_dir()?.join("no-such-checkout");
    let result = Pipeline::new(settings).run();

    match result {
        Err(error @ PipelineError::WorkDir(_)) => assert_eq!(error.exit_code(), 1),
        other => panic!("expected working directory failure, got {other:?}"),
    }
    assert!(!marker.exists());
    assert_eq!(fixture.remote_head()?, head);

    Ok(())
}

#[sealed_test]
fn second_run_is_idempotent() -> Result<()> {
    let fixture = FeedRepoFixture::new(current_dir()?)?;
    let settings = fixture.settings("echo '<rss/>' > news.xml");

    let commit = match Pipeline::new(settings.clone()).run()? {
        Outcome::Pushed { commit, .. } => commit,
        other => panic!("expected push, got {other:?}"),
    };

    let second = Pipeline::new(settings).run()?;

    assert_eq!(second, Outcome::NothingToCommit);
    assert_eq!(fixture.work_head()?, commit);
    assert_eq!(fixture.remote_head()?, commit);

    Ok(())
}

#[sealed_test]
fn commit_outside_repository_is_benign() -> Result<()> {
    fs::create_dir("plain")?;
    let mut settings = feedsync::config::Settings::default();
    settings.repository.path = current_dir()?.join("plain");
    settings.generator.program = "sh".into();
    settings.generator.args = vec!["-c".into(), "echo '<rss/>' > news.xml".into()];

    let outcome = Pipeline::new(settings).run()?;

    assert_eq!(outcome, Outcome::NothingToCommit);
    assert!(current_dir()?.join("plain/news.xml").exists());

    Ok(())
}

#[sealed_test]
fn unreachable_remote_fails_push() -> Result<()> {
    let fixture = FeedRepoFixture::new(current_dir()?)?;
    let head = fixture.remote_head()?;
    let missing = current_dir()?.join("gone.git");
    fixture
        .work
        .remote_set_url("origin", missing.to_string_lossy().as_ref())?;

    let result = Pipeline::new(fixture.settings("echo '<rss/>' > news.xml")).run();

    match result {
        Err(error @ PipelineError::Push(_)) => assert_eq!(error.exit_code(), 1),
        other => panic!("expected push failure, got {other:?}"),
    }
    assert_ne!(fixture.work_head()?, head);
    assert_eq!(fixture.remote_head()?, head);

    Ok(())
}

#[sealed_test]
fn diverged_remote_rejects_push() -> Result<()> {
    let fixture = FeedRepoFixture::new(current_dir()?)?;
    let remote_head = fixture.advance_remote()?;

    let result = Pipeline::new(fixture.settings("echo '<rss/>' > news.xml")).run();

    match result {
        Err(error @ PipelineError::Push(_)) => assert_eq!(error.exit_code(), 1),
        other => panic!("expected push failure, got {other:?}"),
    }
    assert_ne!(fixture.work_head()?, remote_head);
    assert_eq!(fixture.remote_head()?, remote_head);

    Ok(())
}

#[sealed_test]
fn binary_exits_with_generator_status() -> Result<()> {
    let fixture = FeedRepoFixture::new(current_dir()?)?;
    let head = fixture.work_head()?;
    fs::write("config.toml", fixture.settings("exit 5").to_string())?;

    let status = Command::new(env!("CARGO_BIN_EXE_feedsync"))
        .args(["--config", "config.toml"])
        .status()?;

    assert_eq!(status.code(), Some(5));
    assert_eq!(fixture.work_head()?, head);

    Ok(())
}

#[sealed_test]
fn binary_exits_cleanly_without_changes() -> Result<()> {
    let fixture = FeedRepoFixture::new(current_dir()?)?;
    fs::write("config.toml", fixture.settings("true").to_string())?;

    let status = Command::new(env!("CARGO_BIN_EXE_feedsync"))
        .args(["--config", "config.toml"])
        .status()?;

    assert_eq!(status.code(), Some(0));

    Ok(())
}
