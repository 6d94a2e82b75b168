// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Git client for codebase synchronization.
//!
//! Wraps the system `git` executable. Every command runs with a hard
//! timeout and credential-redacted logging; remote authentication is
//! embedded into the URL (`oauth2:<token>@host`) and never logged.

pub mod auth;
pub mod client;
pub mod command_client;
pub mod error;
pub mod types;

pub use auth::{authenticated_url, redact_url};
pub use client::GitClient;
pub use command_client::CommandGitClient;
pub use error::{GitError, Result};
pub use types::{CloneOptions, CommitInfo, DiffEntry, FileOperation, GitAuth};
