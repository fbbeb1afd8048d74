/// Direct contract read adapter
///
/// Reads registry state through JSON-RPC `eth_call`. Only exact-hash
/// lookups are possible; searching by creator or handle would need a full
/// event scan, so those queries answer with nothing.
use crate::{
    error::{RegistryError, RegistryResult},
    lookup::{Query, Record, SourceId},
    sources::{abi, DataSource, RawSourceRecord, HTTP_TIMEOUT},
};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

pub const IS_HASH_REGISTERED: &str = "isHashRegistered(string)";
pub const GET_PROOF: &str = "getProof(string)";

/// Contract adapter configuration
#[derive(Debug, Clone)]
pub struct ContractConfig {
    /// JSON-RPC endpoint of the chain
    pub rpc_url: String,
    /// Deployed registry contract
    pub contract_address: String,
    pub chain_id: u64,
    /// User-Agent header for HTTP requests
    pub user_agent: String,
}

/// A registration read straight from contract storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractProof {
    pub hash: String,
    pub title: String,
    pub license: String,
    pub twitter_handle: String,
    pub timestamp: u64,
    pub creator: String,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// Read-only client for the registry contract
pub struct ContractClient {
    http_client: Client,
    config: ContractConfig,
    next_id: AtomicU64,
}

impl ContractClient {
    /// Create a new contract client
    pub fn new(config: ContractConfig) -> RegistryResult<Self> {
        let http_client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| RegistryError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn config(&self) -> &ContractConfig {
        &self.config
    }

    /// `isHashRegistered(hash)`
    pub async fn is_hash_registered(&self, hash: &str) -> RegistryResult<bool> {
        let data = self
            .eth_call(&abi::encode_string_call(IS_HASH_REGISTERED, &[hash]))
            .await?;
        abi::decode_bool(&data)
    }

    /// `getProof(hash)`
    pub async fn get_proof(&self, hash: &str) -> RegistryResult<ContractProof> {
        let data = self
            .eth_call(&abi::encode_string_call(GET_PROOF, &[hash]))
            .await?;
        let tuple = abi::decode_proof(&data)?;

        Ok(ContractProof {
            hash: hash.to_string(),
            title: tuple.title,
            license: tuple.license,
            twitter_handle: tuple.twitter_handle,
            timestamp: tuple.timestamp,
            creator: tuple.creator,
        })
    }

    /// Registered proof for `hash`, or `None` when the hash is unknown
    pub async fn lookup(&self, hash: &str) -> RegistryResult<Option<ContractProof>> {
        if !self.is_hash_registered(hash).await? {
            debug!("Hash {} not registered on chain", hash);
            return Ok(None);
        }
        self.get_proof(hash).await.map(Some)
    }

    async fn eth_call(&self, calldata: &[u8]) -> RegistryResult<Vec<u8>> {
        let payload = json!({
            "jsonrpc": "2.0",
            "method": "eth_call",
            "params": [{
                "to": self.config.contract_address,
                "data": format!("0x{}", hex::encode(calldata)),
            }, "latest"],
            "id": self.next_id.fetch_add(1, Ordering::Relaxed),
        });

        let response = self
            .http_client
            .post(&self.config.rpc_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| RegistryError::SourceTransport(format!("RPC call failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RegistryError::SourceTransport(format!(
                "RPC endpoint returned error: {}",
                response.status()
            )));
        }

        let body: RpcResponse = response.json().await.map_err(|e| {
            RegistryError::MalformedResponse(format!("Failed to parse RPC response: {}", e))
        })?;

        if let Some(err) = body.error {
            return Err(RegistryError::MalformedResponse(format!(
                "RPC error {}: {}",
                err.code, err.message
            )));
        }

        let result = body
            .result
            .ok_or_else(|| RegistryError::MalformedResponse("No result in RPC response".to_string()))?;
        abi::decode_hex(&result)
    }
}

#[async_trait]
impl DataSource for ContractClient {
    fn id(&self) -> SourceId {
        SourceId::Contract
    }

    async fn query_by_source(&self, query: &Query) -> RegistryResult<Vec<RawSourceRecord>> {
        let Query::ByHash(hash) = query else {
            return Ok(Vec::new());
        };
        Ok(self
            .lookup(hash)
            .await?
            .map(RawSourceRecord::Contract)
            .into_iter()
            .collect())
    }
}

/// Map a contract proof onto a record
pub fn normalize(proof: ContractProof) -> Record {
    Record::new(SourceId::Contract)
        .with_hash(Some(&proof.hash))
        .with_title(Some(&proof.title))
        .with_license(Some(&proof.license))
        .with_handle(Some(&proof.twitter_handle))
        .with_creator(Some(&proof.creator))
        .with_timestamp(i64::try_from(proof.timestamp).ok())
}
