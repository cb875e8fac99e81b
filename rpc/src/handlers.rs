//! Request handlers and their DTOs.

use crate::server::AppState;
use crate::RpcError;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tally_attest::{AggregateSnapshot, AppliedDelta, SubmitOutcome};
use tally_signer::{SignRequest, SignedAssertion};
use tally_store::{AggregateStore, PersonStore};
use tally_types::{Address, Timestamp};
use tokio::sync::broadcast;
use tracing::{debug, warn};

// ── Attestation submit ───────────────────────────────────────────────

#[derive(Deserialize)]
pub struct SubmitRequest {
    pub survey: String,
    #[serde(rename = "schemaKind")]
    pub schema_kind: String,
    pub fields: serde_json::Value,
}

#[derive(Serialize)]
pub struct SubmitResponse {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deduped: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied: Option<AppliedDelta>,
}

pub async fn submit_attestation<S>(
    State(state): State<Arc<AppState<S>>>,
    Json(request): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, RpcError>
where
    S: PersonStore + AggregateStore + Send + Sync + 'static,
{
    let outcome = state
        .ingest
        .submit(&request.survey, &request.schema_kind, &request.fields)
        .await?;

    match outcome {
        SubmitOutcome::Deduplicated => Ok(Json(SubmitResponse {
            ok: true,
            deduped: Some(true),
            applied: None,
        })),
        SubmitOutcome::Applied(delta) => {
            state.hub.broadcast(&delta);
            Ok(Json(SubmitResponse {
                ok: true,
                deduped: None,
                applied: Some(delta),
            }))
        }
    }
}

// ── Eligibility signing ──────────────────────────────────────────────

pub async fn sign_eligibility<S>(
    State(state): State<Arc<AppState<S>>>,
    Json(request): Json<SignRequest>,
) -> Result<Json<SignedAssertion>, RpcError>
where
    S: PersonStore + AggregateStore + Send + Sync + 'static,
{
    let assertion = state.signer.sign(&request, Timestamp::now())?;
    Ok(Json(assertion))
}

// ── Aggregate snapshot ───────────────────────────────────────────────

pub async fn get_aggregate<S>(
    State(state): State<Arc<AppState<S>>>,
    Path(survey): Path<String>,
) -> Result<Json<AggregateSnapshot>, RpcError>
where
    S: PersonStore + AggregateStore + Send + Sync + 'static,
{
    Ok(Json(state.ingest.aggregate(&survey)?))
}

// ── Gates descriptor ─────────────────────────────────────────────────

#[derive(Serialize)]
pub struct GatesResponse {
    pub domain: tally_types::SigningDomain,
    pub types: serde_json::Value,
    pub signer_public_key: String,
    pub k_anonymity: u32,
}

pub async fn get_gates<S>(State(state): State<Arc<AppState<S>>>) -> Json<GatesResponse>
where
    S: PersonStore + AggregateStore + Send + Sync + 'static,
{
    Json(GatesResponse {
        domain: state.signer.domain().clone(),
        types: tally_signer::type_schema(),
        signer_public_key: format!("0x{}", hex::encode(state.signer.public_key().as_bytes())),
        k_anonymity: state.k_anonymity,
    })
}

// ── Delta stream ─────────────────────────────────────────────────────

pub async fn stream_deltas<S>(
    State(state): State<Arc<AppState<S>>>,
    Path(survey): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, RpcError>
where
    S: PersonStore + AggregateStore + Send + Sync + 'static,
{
    let survey = Address::parse(&survey)
        .map_err(|e| RpcError::Ingest(tally_attest::IngestError::InvalidSurvey(e.to_string())))?;
    let receiver = state.hub.subscribe(&survey);
    Ok(ws.on_upgrade(move |socket| forward_deltas(socket, survey, receiver)))
}

/// Forward broadcast deltas to one WebSocket client until it disconnects.
async fn forward_deltas(
    socket: WebSocket,
    survey: Address,
    mut receiver: broadcast::Receiver<String>,
) {
    debug!(survey = %survey, "stream client connected");
    let (mut sender, mut client) = socket.split();

    loop {
        tokio::select! {
            delta = receiver.recv() => match delta {
                Ok(payload) => {
                    if sender.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    // At-most-once: the client resynchronizes by
                    // re-fetching the aggregate snapshot.
                    warn!(survey = %survey, skipped = n, "stream client lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = client.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(Message::Ping(data))) => {
                    if sender.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(_)) => {}
            },
        }
    }
    debug!(survey = %survey, "stream client disconnected");
}
