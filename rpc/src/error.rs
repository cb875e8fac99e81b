//! RPC error type and HTTP mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use tally_attest::IngestError;
use tally_signer::SignError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Sign(#[from] SignError),

    #[error("server error: {0}")]
    Server(String),
}

impl RpcError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Ingest(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Ingest(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Sign(_) => StatusCode::BAD_REQUEST,
            Self::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(serde_json::json!({
            "ok": false,
            "error": self.to_string(),
        }));
        (status, body).into_response()
    }
}
