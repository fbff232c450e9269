// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Learn Together API Server
//!
//! Resolves hosted-auth sessions, bootstraps profiles and connects users'
//! Google Calendars.

use learn_together::{
    config::{BackendKind, Config},
    db::{Backend, MemoryDb, SupabaseDb},
    server::Server,
    AppState,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, backend = ?config.backend, "Starting Learn Together API");

    let backend: Arc<dyn Backend> = match config.backend {
        BackendKind::Supabase => Arc::new(SupabaseDb::new(
            &config.supabase_url,
            &config.supabase_anon_key,
            &config.supabase_service_role_key,
        )?),
        BackendKind::Memory => {
            tracing::warn!("Using in-memory backend; data is lost on restart");
            Arc::new(MemoryDb::new(&config.session_jwt_secret))
        }
    };

    if config.migration_token.is_none() {
        tracing::warn!("MIGRATION_TOKEN not set, /api/migrate is unprotected");
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = Arc::new(AppState::new(config, backend)?);
    let server = Server::new(state, addr);
    let handle = server.start().await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    handle.stop().await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("learn_together=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
