/// Lookup Resolver - consults data sources and reconciles their answers
use crate::{
    error::RegistryResult,
    lookup::{
        query::{is_unknown_address, normalize_handle},
        record::merge_records,
        Query, Record, SourceId,
    },
    metrics,
    sources::DataSource,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Resolver settings supplied by the caller
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Budget for each source, applied independently
    pub source_timeout: Duration,
}

impl ResolveOptions {
    pub fn new(source_timeout: Duration) -> Self {
        Self { source_timeout }
    }
}

/// Why a source did not contribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceErrorKind {
    Failed,
    Timeout,
    Cancelled,
}

/// Per-source failure, reported alongside any gathered records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceError {
    pub source_id: SourceId,
    pub kind: SourceErrorKind,
    pub message: String,
}

impl SourceError {
    fn failed(source_id: SourceId, message: String) -> Self {
        Self {
            source_id,
            kind: SourceErrorKind::Failed,
            message,
        }
    }

    fn timeout(source_id: SourceId, after: Duration) -> Self {
        Self {
            source_id,
            kind: SourceErrorKind::Timeout,
            message: format!("no response within {}ms", after.as_millis()),
        }
    }

    fn cancelled(source_id: SourceId) -> Self {
        Self {
            source_id,
            kind: SourceErrorKind::Cancelled,
            message: "resolution cancelled".to_string(),
        }
    }
}

/// Outcome of one resolution
///
/// An empty `records` list means "not found"; `errors` is diagnostic only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolveResult {
    pub records: Vec<Record>,
    pub errors: Vec<SourceError>,
}

impl ResolveResult {
    pub fn is_cancelled(&self) -> bool {
        self.errors
            .iter()
            .any(|e| e.kind == SourceErrorKind::Cancelled)
    }
}

/// Stateless multi-source resolver
///
/// Sources are queried concurrently but merged in the order the caller
/// lists them: that order is the field precedence order, so callers put
/// their most trusted source first.
#[derive(Debug, Clone)]
pub struct LookupResolver {
    options: ResolveOptions,
}

impl LookupResolver {
    pub fn new(options: ResolveOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Validate raw input, then resolve it
    ///
    /// Validation failures are the only errors this returns.
    pub async fn resolve_input(
        &self,
        search_type: &str,
        value: &str,
        sources: &[Arc<dyn DataSource>],
        cancel: &CancellationToken,
    ) -> RegistryResult<ResolveResult> {
        let query = Query::parse(search_type, value)?;
        Ok(self.resolve(&query, sources, cancel).await)
    }

    /// Resolve a validated query against `sources`
    pub async fn resolve(
        &self,
        query: &Query,
        sources: &[Arc<dyn DataSource>],
        cancel: &CancellationToken,
    ) -> ResolveResult {
        metrics::RESOLVE_REQUESTS_TOTAL
            .with_label_values(&[query.kind()])
            .inc();

        if let Query::ByAddress(address) = query {
            if is_unknown_address(address) {
                debug!("Query for the unknown-creator address never matches");
                return ResolveResult::default();
            }
        }

        debug!("Resolving {} against {} source(s)", query, sources.len());

        // join_all keeps caller order regardless of completion order
        let outcomes = join_all(
            sources
                .iter()
                .map(|source| self.run_source(source.as_ref(), query, cancel)),
        )
        .await;

        let mut candidates = Vec::new();
        let mut errors = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(records) => candidates.extend(records),
                Err(error) => errors.push(error),
            }
        }

        let mut records = merge_records(retain_matches(query, candidates));

        for record in &mut records {
            if record.content.is_some() {
                let expected = match query {
                    Query::ByHash(hash) => Some(hash.clone()),
                    _ => record.hash.clone(),
                };
                record.verify_against(expected.as_deref());
            }
        }

        debug!(
            "Resolved {}: {} record(s), {} source error(s)",
            query,
            records.len(),
            errors.len()
        );

        ResolveResult { records, errors }
    }

    /// Query one source under the timeout, racing the cancellation token
    async fn run_source(
        &self,
        source: &dyn DataSource,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<Vec<Record>, SourceError> {
        let id = source.id();
        let timeout = self.options.source_timeout;
        let started = Instant::now();

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SourceError::cancelled(id)),
            result = tokio::time::timeout(timeout, source.query_by_source(query)) => match result {
                Ok(Ok(rows)) => Ok(rows.into_iter().map(|raw| raw.normalize()).collect::<Vec<_>>()),
                Ok(Err(e)) => Err(SourceError::failed(id, e.to_string())),
                Err(_) => Err(SourceError::timeout(id, timeout)),
            },
        };

        let label = match &outcome {
            Ok(_) => "ok",
            Err(e) => match e.kind {
                SourceErrorKind::Failed => "error",
                SourceErrorKind::Timeout => "timeout",
                SourceErrorKind::Cancelled => "cancelled",
            },
        };
        metrics::SOURCE_QUERIES_TOTAL
            .with_label_values(&[id.as_str(), label])
            .inc();
        metrics::SOURCE_QUERY_DURATION_SECONDS
            .with_label_values(&[id.as_str()])
            .observe(started.elapsed().as_secs_f64());

        match &outcome {
            Ok(records) => debug!("Source {} returned {} record(s)", id, records.len()),
            Err(e) => warn!("Source {} did not contribute: {}", id, e.message),
        }

        outcome
    }
}

/// Whether a single record answers `query`
fn matches(query: &Query, record: &Record) -> bool {
    match query {
        Query::ByHash(hash) => record.hash.as_deref() == Some(hash.as_str()),
        Query::ByAddress(address) => {
            !is_unknown_address(&record.creator_address)
                && record.creator_address.eq_ignore_ascii_case(address)
        }
        Query::ByHandle(handle) => normalize_handle(&record.handle) == *handle,
    }
}

/// Drop candidates unrelated to the query
///
/// A hashed record survives when any record with the same hash matches, so
/// a lower-precedence source can still fill fields for a match found
/// elsewhere. Hashless records must match on their own.
fn retain_matches(query: &Query, candidates: Vec<Record>) -> Vec<Record> {
    let matched: HashSet<String> = candidates
        .iter()
        .filter(|r| matches(query, r))
        .filter_map(|r| r.hash.clone())
        .collect();

    candidates
        .into_iter()
        .filter(|r| match &r.hash {
            Some(hash) => matched.contains(hash),
            None => matches(query, r),
        })
        .collect()
}
