/// Data source adapters
///
/// Each backing source answers a `Query` with raw rows in its own shape.
/// The resolver turns those rows into `Record`s through the per-source
/// normalization rules on `RawSourceRecord`.

pub mod abi;
pub mod contract;
pub mod indexer;
pub mod sdk;

pub use contract::{ContractClient, ContractConfig, ContractProof};
pub use indexer::{IndexerClient, IndexerConfig, ProofEntity};
pub use sdk::{SdkClient, SdkConfig, SdkItem, Upload};

use crate::error::RegistryResult;
use crate::lookup::{Query, Record, SourceId};
use async_trait::async_trait;
use std::time::Duration;

/// Upper bound on any single outbound HTTP request
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Digest used for health pings
pub const PING_HASH: &str = "0x0000000000000000000000000000000000000000000000000000000000000000";

/// A backing data source the resolver can consult
///
/// Implementations must not filter out legitimate matches; the resolver
/// re-checks every normalized record against the query.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Provenance tag for records from this source
    fn id(&self) -> SourceId;

    /// Fetch raw rows matching `query`
    ///
    /// Return an empty list when the source cannot answer this kind of
    /// query, and an error only for operational failures.
    async fn query_by_source(&self, query: &Query) -> RegistryResult<Vec<RawSourceRecord>>;

    /// Reachability check for the detailed health endpoint
    ///
    /// Defaults to a lookup of the all-zero digest, which exercises the
    /// full request path without depending on any real record.
    async fn ping(&self) -> RegistryResult<()> {
        self.query_by_source(&Query::ByHash(PING_HASH.to_string()))
            .await
            .map(|_| ())
    }
}

/// A row as delivered by one of the backing sources
#[derive(Debug, Clone)]
pub enum RawSourceRecord {
    Indexer(ProofEntity),
    Contract(ContractProof),
    Sdk(SdkItem),
}

impl RawSourceRecord {
    /// Apply the owning source's mapping rules
    pub fn normalize(self) -> Record {
        match self {
            RawSourceRecord::Indexer(entity) => indexer::normalize(entity),
            RawSourceRecord::Contract(proof) => contract::normalize(proof),
            RawSourceRecord::Sdk(item) => sdk::normalize(item),
        }
    }
}
