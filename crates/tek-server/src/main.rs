// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! TekContext engine server binary.

use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tek_server::{create_router, AppState};
use tek_server_db::{CodebaseRepository, IndexJobRepository, ProjectRepository};
use tek_server_git::CommandGitClient;
use tek_server_graph::HttpGraphSession;
use tek_server_jobs::JobOrchestrator;
use tek_server_parser::DockerParserDriver;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// TekContext engine - code knowledge-base indexing server.
#[derive(Parser, Debug)]
#[command(name = "tek-server", about = "TekContext engine server", version)]
struct Args {
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version information
	Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("tek-server {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	// Load .env file if present
	dotenvy::dotenv().ok();

	let config = tek_server_config::load_config()?;

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		database = %config.database.url,
		"starting tek-server"
	);

	let pool = tek_server_db::create_pool(&config.database.url).await?;
	tek_server_db::run_migrations(&pool).await?;

	let projects = ProjectRepository::new(pool.clone());
	let codebases = CodebaseRepository::new(pool.clone());
	let jobs = IndexJobRepository::new(pool);

	let git = Arc::new(CommandGitClient::new());
	let parser = Arc::new(DockerParserDriver::new());
	// Lazy: connectivity is verified on first use by the graph task.
	let graph = Arc::new(HttpGraphSession::new(&tek_server_graph::GraphConfig {
		url: config.graph.url.clone(),
		username: config.graph.username.clone(),
		password: config.graph.password.clone(),
		database: config.graph.database.clone(),
		batch_size: config.graph.batch_size,
	})?);

	let orchestrator = JobOrchestrator::new(
		projects.clone(),
		codebases.clone(),
		jobs,
		&config,
		git,
		parser,
		graph,
	)?;

	let state = AppState {
		orchestrator: Arc::clone(&orchestrator),
		projects,
		codebases,
	};
	let app = create_router(state);

	let listener = tokio::net::TcpListener::bind(config.socket_addr()).await?;
	tracing::info!(addr = %config.socket_addr(), "listening");

	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown_signal())
		.await?;

	tracing::info!("draining worker pool");
	orchestrator.shutdown(SHUTDOWN_GRACE).await;

	Ok(())
}

async fn shutdown_signal() {
	let _ = tokio::signal::ctrl_c().await;
	tracing::info!("shutdown signal received");
}
