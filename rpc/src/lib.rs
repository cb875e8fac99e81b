//! HTTP surface for the attestation side of Tally.
//!
//! Endpoints:
//! - `POST /attestation/submit` — proof-derived fields in, applied delta out
//! - `POST /eligibility/sign` — deterministic gate attestation
//! - `GET /aggregate/{survey}` — aggregate row snapshot
//! - `GET /gates` — signing-domain descriptor + k-anonymity threshold
//! - `GET /stream/{survey}` — WebSocket delta stream

pub mod error;
pub mod handlers;
pub mod server;
pub mod stream;

pub use error::RpcError;
pub use server::{router, AppState, RpcServer};
pub use stream::StreamHub;
