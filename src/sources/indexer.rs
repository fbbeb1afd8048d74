/// Subgraph indexer adapter
///
/// Queries the registry subgraph over GraphQL. Proofs are keyed by their
/// content hash and creators by lowercase address.
use crate::{
    error::{RegistryError, RegistryResult},
    lookup::{Query, Record, SourceId},
    sources::{DataSource, RawSourceRecord, HTTP_TIMEOUT},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use tracing::debug;

const PROOF_FIELDS: &str = r#"
      id
      hash
      title
      license
      twitterHandle
      timestamp
      creator {
        id
        address
      }
      blockNumber
      transactionHash
"#;

/// Indexer adapter configuration
#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// GraphQL endpoint of the deployed subgraph
    pub url: String,
    /// User-Agent header for HTTP requests
    pub user_agent: String,
    /// Maximum entities requested per query
    pub page_size: u32,
}

impl IndexerConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user_agent: format!("writing-registry/{}", env!("CARGO_PKG_VERSION")),
            page_size: 100,
        }
    }
}

/// A `Proof` entity as stored by the subgraph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofEntity {
    pub id: String,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub license: Option<String>,
    #[serde(default)]
    pub twitter_handle: Option<String>,
    #[serde(default, deserialize_with = "deserialize_bigint")]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub creator: Option<CreatorRef>,
    #[serde(default, deserialize_with = "deserialize_bigint")]
    pub block_number: Option<i64>,
    #[serde(default)]
    pub transaction_hash: Option<String>,
}

/// Reference from a proof to its `Creator` entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreatorRef {
    pub id: String,
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ProofByHashData {
    proof: Option<ProofEntity>,
}

#[derive(Debug, Deserialize)]
struct ProofsByCreatorData {
    creator: Option<CreatorWithProofs>,
}

#[derive(Debug, Deserialize)]
struct CreatorWithProofs {
    id: String,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    proofs: Vec<ProofEntity>,
}

#[derive(Debug, Deserialize)]
struct ProofsByHandleData {
    #[serde(default)]
    proofs: Vec<ProofEntity>,
}

/// GraphQL client for the registry subgraph
pub struct IndexerClient {
    http_client: Client,
    config: IndexerConfig,
}

impl IndexerClient {
    /// Create a new indexer client
    pub fn new(config: IndexerConfig) -> RegistryResult<Self> {
        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| RegistryError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Look up a single proof by content hash
    pub async fn proof_by_hash(&self, hash: &str) -> RegistryResult<Vec<ProofEntity>> {
        let query = format!(
            "query ProofByHash($hash: ID!) {{\n  proof(id: $hash) {{{}  }}\n}}",
            PROOF_FIELDS
        );
        let data: ProofByHashData = self.execute(&query, json!({ "hash": hash })).await?;
        Ok(data.proof.into_iter().collect())
    }

    /// List proofs registered by a creator address, newest first
    pub async fn proofs_by_creator(&self, address: &str) -> RegistryResult<Vec<ProofEntity>> {
        let query = format!(
            "query ProofsByCreator($creator: ID!, $first: Int!) {{\n  creator(id: $creator) {{\n    id\n    address\n    proofs(first: $first, orderBy: timestamp, orderDirection: desc) {{{}    }}\n  }}\n}}",
            PROOF_FIELDS
        );
        let data: ProofsByCreatorData = self
            .execute(
                &query,
                json!({ "creator": address, "first": self.config.page_size }),
            )
            .await?;

        let Some(creator) = data.creator else {
            return Ok(Vec::new());
        };

        // Nested proofs may omit the back-reference to their creator
        let creator_ref = CreatorRef {
            id: creator.id,
            address: creator.address,
        };
        Ok(creator
            .proofs
            .into_iter()
            .map(|mut proof| {
                if proof.creator.is_none() {
                    proof.creator = Some(creator_ref.clone());
                }
                proof
            })
            .collect())
    }

    /// List proofs whose handle contains `handle`, newest first
    ///
    /// The match is loose; exact filtering happens after normalization.
    pub async fn proofs_by_handle(&self, handle: &str) -> RegistryResult<Vec<ProofEntity>> {
        let query = format!(
            "query ProofsByHandle($handle: String!, $first: Int!) {{\n  proofs(where: {{ twitterHandle_contains_nocase: $handle }}, first: $first, orderBy: timestamp, orderDirection: desc) {{{}  }}\n}}",
            PROOF_FIELDS
        );
        let data: ProofsByHandleData = self
            .execute(
                &query,
                json!({ "handle": handle, "first": self.config.page_size }),
            )
            .await?;
        Ok(data.proofs)
    }

    /// POST a GraphQL document and decode its `data` member
    async fn execute<T: serde::de::DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> RegistryResult<T> {
        debug!("Indexer query to {}: {}", self.config.url, variables);

        let response = self
            .http_client
            .post(&self.config.url)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| RegistryError::SourceTransport(format!("Failed to reach indexer: {}", e)))?;

        if !response.status().is_success() {
            return Err(RegistryError::SourceTransport(format!(
                "Indexer returned error: {}",
                response.status()
            )));
        }

        let body: GraphQlResponse<T> = response.json().await.map_err(|e| {
            RegistryError::MalformedResponse(format!("Invalid indexer response: {}", e))
        })?;

        if let Some(errors) = body.errors.filter(|errors| !errors.is_empty()) {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(RegistryError::MalformedResponse(format!(
                "Indexer query failed: {}",
                messages.join("; ")
            )));
        }

        body.data
            .ok_or_else(|| RegistryError::MalformedResponse("Indexer response has no data".to_string()))
    }
}

#[async_trait]
impl DataSource for IndexerClient {
    fn id(&self) -> SourceId {
        SourceId::Indexer
    }

    async fn query_by_source(&self, query: &Query) -> RegistryResult<Vec<RawSourceRecord>> {
        let proofs = match query {
            Query::ByHash(hash) => self.proof_by_hash(hash).await?,
            Query::ByAddress(address) => self.proofs_by_creator(address).await?,
            Query::ByHandle(handle) => self.proofs_by_handle(handle).await?,
        };
        Ok(proofs.into_iter().map(RawSourceRecord::Indexer).collect())
    }
}

/// Map a subgraph proof onto a record
pub fn normalize(entity: ProofEntity) -> Record {
    let hash = entity.hash.as_deref().unwrap_or(&entity.id);
    let creator = entity
        .creator
        .as_ref()
        .map(|c| c.address.as_deref().unwrap_or(&c.id));

    let mut record = Record::new(SourceId::Indexer)
        .with_hash(Some(hash))
        .with_title(entity.title.as_deref())
        .with_license(entity.license.as_deref())
        .with_handle(entity.twitter_handle.as_deref())
        .with_creator(creator)
        .with_timestamp(entity.timestamp);
    record.block_number = entity.block_number.and_then(|b| u64::try_from(b).ok());
    record.transaction_hash = entity.transaction_hash;
    record
}

/// Accept GraphQL BigInt values delivered either as strings or numbers
fn deserialize_bigint<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("BigInt out of range: {}", n))),
        Some(Value::String(s)) => s.trim().parse().map(Some).map_err(de::Error::custom),
        Some(other) => Err(de::Error::custom(format!("expected BigInt, got {}", other))),
    }
}
