//! # Recirca Server
//!
//! Realtime dispatch server for doorstep recyclable collection.
//!
//! ## Overview
//!
//! Recirca Server connects citizens who want recyclables picked up with
//! the field collectors who haul them:
//!
//! - **Request Lifecycle**: Submit, claim, cancel, and complete pickup
//!   requests with server-side arbitration - exactly one collector wins a
//!   claim, however many race for it
//! - **Live Dispatch**: New and changed requests are pushed to connected
//!   collectors over WebSocket; snapshots on (re)connect cover anything a
//!   push missed
//! - **Location Relay**: A claimant's position stream is forwarded to the
//!   requester while the pickup is underway
//!
//! ## Architecture
//!
//! The server is built on Axum and uses:
//! - PostgreSQL for persistent request storage (the source of truth)
//! - Bounded per-connection channels for best-effort event push
//! - An opaque bearer credential resolver for authentication

mod auth;
mod errors;
mod handlers;
mod infra;
mod routes;
mod ws;

#[cfg(test)]
mod tests;

pub use infra::app_state::AppState;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recirca_core::store::{
    MemoryRequestStore, PostgresRequestStore, RequestStore,
};
use recirca_core::{LifecycleEngine, LocationRelay};

use crate::auth::resolver::{
    CredentialResolver, MemoryCredentialResolver, PgCredentialResolver,
};
use crate::infra::config::{Config, StoreBackend};
use crate::ws::SessionRegistry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    // Quieter defaults. Override via RUST_LOG.
                    "info,tower_http=warn".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let registry = Arc::new(SessionRegistry::new());

    let (store, auth): (Arc<dyn RequestStore>, Arc<dyn CredentialResolver>) =
        match config.store {
            StoreBackend::Postgres => {
                let store = PostgresRequestStore::connect(
                    &config.database_url,
                    config.db_connect_attempts,
                )
                .await
                .context("connecting to the request store")?;
                store
                    .ensure_schema()
                    .await
                    .context("creating request tables")?;

                let resolver =
                    PgCredentialResolver::new(store.pool().clone());
                resolver
                    .ensure_schema()
                    .await
                    .context("creating token tables")?;

                (Arc::new(store), Arc::new(resolver))
            }
            StoreBackend::Memory => {
                tracing::warn!(
                    "running on the in-memory store; all requests are lost on restart"
                );
                (
                    Arc::new(MemoryRequestStore::new()),
                    Arc::new(MemoryCredentialResolver::new()),
                )
            }
        };

    let engine =
        Arc::new(LifecycleEngine::new(store.clone(), registry.clone()));
    let relay = Arc::new(LocationRelay::new(store, registry.clone()));

    let state = AppState {
        engine,
        relay,
        registry,
        auth,
        config: Arc::new(config.clone()),
    };

    let app = routes::create_api_router(state.clone())
        .layer(config.cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = config.bind_addr();
    info!("Starting Recirca dispatch server on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
