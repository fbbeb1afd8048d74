/// Lookup endpoints
///
/// All three run through the resolver or the contract client; none of them
/// write anything.
use crate::{
    context::AppContext,
    error::{RegistryError, RegistryResult},
    lookup::{Query, Record, ResolveResult, SourceError},
    sources::contract,
};
use axum::{
    extract::{Query as QueryParams, State},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/search", post(search))
        .route("/api/verify-hash", get(verify_hash))
        .route("/api/get-address-content", get(get_address_content))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub search_type: String,
    pub search_value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub query: Query,
    pub records: Vec<Record>,
    pub errors: Vec<SourceError>,
}

impl SearchResponse {
    fn new(query: Query, result: ResolveResult) -> Self {
        Self {
            query,
            records: result.records,
            errors: result.errors,
        }
    }
}

/// Search by hash, creator address, or handle across every enabled source
pub async fn search(
    State(ctx): State<AppContext>,
    Json(req): Json<SearchRequest>,
) -> RegistryResult<Json<SearchResponse>> {
    let query = Query::parse(&req.search_type, &req.search_value)?;
    let cancel = ctx.shutdown.child_token();

    let result = ctx.resolver.resolve(&query, &ctx.sources, &cancel).await;
    info!(
        "Search {} found {} record(s)",
        query,
        result.records.len()
    );

    Ok(Json(SearchResponse::new(query, result)))
}

#[derive(Debug, Deserialize)]
pub struct VerifyHashParams {
    pub hash: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyHashResponse {
    pub hash: String,
    pub is_registered: bool,
    pub record: Option<Record>,
}

/// Check a hash directly against contract storage
pub async fn verify_hash(
    State(ctx): State<AppContext>,
    QueryParams(params): QueryParams<VerifyHashParams>,
) -> RegistryResult<Json<VerifyHashResponse>> {
    let hash = Query::by_hash(params.hash.trim())?.value().to_string();

    let timeout = ctx.config.source_timeout();
    let cancel = ctx.shutdown.child_token();

    let proof = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            return Err(RegistryError::SourceTransport("Hash check cancelled".to_string()))
        }
        result = tokio::time::timeout(timeout, ctx.contract.lookup(&hash)) => result.map_err(|_| {
            warn!("Contract did not answer hash check within {}ms", timeout.as_millis());
            RegistryError::SourceTransport(format!(
                "Contract did not respond within {}ms",
                timeout.as_millis()
            ))
        })??,
    };
    let record = proof.map(contract::normalize);

    Ok(Json(VerifyHashResponse {
        hash,
        is_registered: record.is_some(),
        record,
    }))
}

#[derive(Debug, Deserialize)]
pub struct AddressParams {
    pub address: String,
}

/// Everything registered by one creator address
pub async fn get_address_content(
    State(ctx): State<AppContext>,
    QueryParams(params): QueryParams<AddressParams>,
) -> RegistryResult<Json<SearchResponse>> {
    let query = Query::by_address(params.address.trim())?;
    let cancel = ctx.shutdown.child_token();

    let result = ctx.resolver.resolve(&query, &ctx.sources, &cancel).await;

    Ok(Json(SearchResponse::new(query, result)))
}
