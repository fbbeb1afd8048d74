/// Hashing and registration-preparation endpoints
use crate::{
    content::content_digest,
    context::AppContext,
    error::RegistryResult,
    registration::{prepare_registration, PreparedRegistration, RegistrationRequest},
};
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/hash", post(hash_content))
        .route("/api/prepare-registration", post(prepare))
}

#[derive(Debug, Deserialize)]
pub struct HashRequest {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct HashResponse {
    pub hash: String,
}

/// Digest a body exactly as given
pub async fn hash_content(Json(req): Json<HashRequest>) -> Json<HashResponse> {
    Json(HashResponse {
        hash: content_digest(&req.content),
    })
}

/// Encode an unsigned `registerProof` call for the caller's wallet
pub async fn prepare(
    State(ctx): State<AppContext>,
    Json(req): Json<RegistrationRequest>,
) -> RegistryResult<Json<PreparedRegistration>> {
    let prepared = prepare_registration(&req, ctx.contract.config())?;
    tracing::debug!("Prepared registration for {}", prepared.hash);
    Ok(Json(prepared))
}
