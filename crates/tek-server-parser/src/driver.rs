// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Parser container lifecycle.
//!
//! One container per (language, job) run: source tree bind-mounted
//! read-only at /workspace, options passed through the language's env var,
//! JSON output copied out of the stopped container and removed together
//! with the container itself.

use std::path::{Path, PathBuf};
use std::process::Output;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{ParserError, Result};
use crate::raw::RawParserOutput;

const CONTAINER_OUTPUT_PATH: &str = "/tmp/parser-output.json";

#[derive(Debug, Clone)]
pub struct ParserRequest {
	pub docker_image: String,
	pub source_path: PathBuf,
	pub output_path: PathBuf,
	pub codebase_name: String,
	pub options: Vec<String>,
	/// Env var the options are passed through (JAVA_OPTS, NODE_OPTIONS, ...).
	pub options_env_var: String,
	pub timeout: Duration,
}

#[derive(Debug)]
pub struct ParserOutcome {
	pub raw: RawParserOutput,
	pub duration: Duration,
}

#[async_trait]
pub trait ParserDriver: Send + Sync {
	async fn execute(&self, request: &ParserRequest) -> Result<ParserOutcome>;
}

/// Drives parsers through the docker CLI.
pub struct DockerParserDriver {
	docker_bin: String,
}

impl DockerParserDriver {
	pub fn new() -> Self {
		Self {
			docker_bin: "docker".to_string(),
		}
	}

	/// Use a different executable; tests point this at a stub.
	pub fn with_binary(docker_bin: impl Into<String>) -> Self {
		Self {
			docker_bin: docker_bin.into(),
		}
	}

	/// Image availability ladder: inspect, then list, then pull, then a
	/// minimal probe run.
	async fn ensure_image(&self, image: &str) -> Result<()> {
		if run_docker(&self.docker_bin, &["image", "inspect", image])
			.await
			.is_ok_and(|o| o.status.success())
		{
			return Ok(());
		}

		if let Ok(output) = run_docker(&self.docker_bin, &["images", "-q", image]).await {
			if output.status.success() && !output.stdout.is_empty() {
				return Ok(());
			}
		}

		debug!(image, "image not present locally, pulling");
		if run_docker(&self.docker_bin, &["pull", image])
			.await
			.is_ok_and(|o| o.status.success())
		{
			return Ok(());
		}

		warn!(image, "pull failed, probing with a minimal run");
		if run_docker(
			&self.docker_bin,
			&["run", "--rm", "--entrypoint", "echo", image, "test"],
		)
		.await
		.is_ok_and(|o| o.status.success())
		{
			return Ok(());
		}

		Err(ParserError::ImageUnavailable(image.to_string()))
	}

	async fn remove_container(&self, name: &str) {
		if let Err(e) = run_docker(&self.docker_bin, &["rm", "-f", name]).await {
			warn!(container = name, error = %e, "failed to remove parser container");
		}
	}
}

impl Default for DockerParserDriver {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl ParserDriver for DockerParserDriver {
	async fn execute(&self, request: &ParserRequest) -> Result<ParserOutcome> {
		let started = Instant::now();

		prepare_output_dir(&request.output_path).await?;
		self.ensure_image(&request.docker_image).await?;

		let container = format!(
			"parser-{}-{}",
			chrono::Utc::now().timestamp_millis(),
			fastrand::u32(..)
		);

		let source = request
			.source_path
			.canonicalize()
			.unwrap_or_else(|_| request.source_path.clone());
		let mount = format!("{}:/workspace:ro", source.display());
		let env = format!("{}={}", request.options_env_var, request.options.join(" "));

		let mut args: Vec<&str> = vec!["run", "--name", &container, "-v", &mount];
		if !request.options.is_empty() {
			args.push("-e");
			args.push(&env);
		}
		args.extend([
			request.docker_image.as_str(),
			request.codebase_name.as_str(),
			"/workspace",
			CONTAINER_OUTPUT_PATH,
		]);

		debug!(image = %request.docker_image, container = %container, "running parser container");

		let run_result =
			tokio::time::timeout(request.timeout, run_docker(&self.docker_bin, &args)).await;

		let output = match run_result {
			Ok(Ok(output)) => output,
			Ok(Err(e)) => {
				self.remove_container(&container).await;
				return Err(e);
			}
			Err(_) => {
				// SIGKILL the stuck parser, then clean up the container.
				let _ = run_docker(&self.docker_bin, &["kill", &container]).await;
				self.remove_container(&container).await;
				return Err(ParserError::Timeout {
					image: request.docker_image.clone(),
					timeout_secs: request.timeout.as_secs(),
				});
			}
		};

		if !output.status.success() {
			let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
			self.remove_container(&container).await;
			return Err(ParserError::ContainerFailed { stderr });
		}

		let copy = run_docker(
			&self.docker_bin,
			&[
				"cp",
				&format!("{container}:{CONTAINER_OUTPUT_PATH}"),
				&request.output_path.display().to_string(),
			],
		)
		.await;
		self.remove_container(&container).await;

		let copy = copy?;
		if !copy.status.success() || !request.output_path.exists() {
			return Err(ParserError::OutputMissing(
				request.output_path.display().to_string(),
			));
		}

		let content = tokio::fs::read_to_string(&request.output_path).await?;
		let raw: RawParserOutput = serde_json::from_str(&content)?;
		let _ = tokio::fs::remove_file(&request.output_path).await;

		Ok(ParserOutcome {
			raw,
			duration: started.elapsed(),
		})
	}
}

/// The parser may run as a different user inside the container, so the
/// output directory is opened up before the run.
async fn prepare_output_dir(output_path: &Path) -> Result<()> {
	let Some(dir) = output_path.parent() else {
		return Ok(());
	};
	tokio::fs::create_dir_all(dir).await?;

	#[cfg(unix)]
	{
		use std::os::unix::fs::PermissionsExt;
		let _ = std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o777));
	}

	Ok(())
}

async fn run_docker(bin: &str, args: &[&str]) -> Result<Output> {
	let mut cmd = Command::new(bin);
	cmd.args(args);
	cmd.kill_on_drop(true);

	Ok(cmd.output().await?)
}
