// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bastion server binary.

use std::path::PathBuf;
use std::time::Duration;

use bastion_server::{create_app_state, create_router, version};
use bastion_server_config::LogFormat;
use clap::{Parser, Subcommand};
use tower_http::{
	cors::{Any, CorsLayer},
	trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SESSION_CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Bastion server - security-operations workspace backend.
#[derive(Parser, Debug)]
#[command(name = "bastion-server", about = "Bastion security-operations server", version)]
struct Args {
	/// TOML configuration file, read instead of /etc/bastion/server.toml
	#[arg(long, env = "BASTION_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Show version and build information
	Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("{}", version::format_version_info());
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => bastion_server_config::load_config_with_file(path)?,
		None => bastion_server_config::load_config()?,
	};

	let (pretty, json) = match config.logging.format {
		LogFormat::Pretty => (Some(tracing_subscriber::fmt::layer()), None),
		LogFormat::Json => (None, Some(tracing_subscriber::fmt::layer().json())),
	};
	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(pretty)
		.with(json)
		.init();

	tracing::info!(
		host = %config.http.host,
		port = config.http.port,
		database = %config.database.url,
		"starting bastion-server"
	);

	let pool = bastion_server_db::create_pool(&config.database.url).await?;
	bastion_server_db::run_migrations(&pool).await?;

	let state = create_app_state(pool, &config).await?;

	let cleanup_state = state.clone();
	let cleanup = tokio::spawn(async move {
		let mut interval = tokio::time::interval(SESSION_CLEANUP_INTERVAL);
		loop {
			interval.tick().await;
			match cleanup_state.purge_expired_sessions().await {
				Ok(0) => {}
				Ok(removed) => tracing::info!(removed, "deleted expired sign-in sessions"),
				Err(e) => tracing::warn!(error = %e, "failed to delete expired sessions"),
			}
		}
	});

	let app = create_router(state.clone())
		.layer(TraceLayer::new_for_http())
		.layer(
			CorsLayer::new()
				.allow_origin(Any)
				.allow_methods(Any)
				.allow_headers(Any),
		);

	let addr = config.socket_addr();
	tracing::info!("listening on {}", addr);

	let listener = tokio::net::TcpListener::bind(&addr).await?;

	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "Server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Received shutdown signal");
		}
	}

	cleanup.abort();
	tracing::info!("draining reconciliation and audit queues");
	state.shutdown().await;

	tracing::info!("Server shutdown complete");
	Ok(())
}
