// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Regenerate syndication feeds and publish them through Git.
//!
//! Feedsync activates an environment, runs an external feed generator inside
//! the checkout of a feed repository, and then commits and pushes whatever the
//! generator changed. See [`pipeline`] for how the steps fit together.

pub mod config;
pub mod environment;
pub mod generator;
pub mod path;
pub mod pipeline;
pub mod sync;
pub mod workdir;
