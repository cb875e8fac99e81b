//! Axum router and server.

use crate::handlers;
use crate::{RpcError, StreamHub};

use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tally_attest::IngestService;
use tally_signer::EligibilitySigner;
use tally_store::{AggregateStore, PersonStore};
use tower_http::cors::CorsLayer;
use tracing::info;

/// Shared state behind every handler.
pub struct AppState<S> {
    pub ingest: IngestService<S>,
    pub signer: EligibilitySigner,
    pub hub: StreamHub,
    /// Minimum row size for disaggregated display, advertised to
    /// downstream consumers via `/gates`.
    pub k_anonymity: u32,
}

impl<S: PersonStore + AggregateStore> AppState<S> {
    pub fn new(store: Arc<S>, signer: EligibilitySigner, k_anonymity: u32) -> Self {
        Self {
            ingest: IngestService::new(store),
            signer,
            hub: StreamHub::new(),
            k_anonymity,
        }
    }
}

/// Build the service router.
pub fn router<S>(state: Arc<AppState<S>>) -> Router
where
    S: PersonStore + AggregateStore + Send + Sync + 'static,
{
    Router::new()
        .route("/attestation/submit", post(handlers::submit_attestation))
        .route("/eligibility/sign", post(handlers::sign_eligibility))
        .route("/aggregate/:survey", get(handlers::get_aggregate))
        .route("/gates", get(handlers::get_gates))
        .route("/stream/:survey", get(handlers::stream_deltas))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// The HTTP server, configured with a port.
pub struct RpcServer {
    pub port: u16,
}

impl RpcServer {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    /// Serve until shutdown. In-flight requests are allowed to complete;
    /// stream connections persist until their clients disconnect.
    pub async fn start<S>(&self, state: Arc<AppState<S>>) -> Result<(), RpcError>
    where
        S: PersonStore + AggregateStore + Send + Sync + 'static,
    {
        let app = router(state);
        let addr = format!("0.0.0.0:{}", self.port);
        info!("attestation service listening on {}", addr);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| RpcError::Server(e.to_string()))?;
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| RpcError::Server(e.to_string()))
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler; run until the task is dropped.
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
