use crate::sources::indexer::{CreatorRef, ProofEntity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `ProofRegistered(hash, title, license, twitterHandle, timestamp, creator)`
/// plus the block context it was emitted in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRegistered {
    pub hash: String,
    pub title: String,
    pub license: String,
    pub twitter_handle: String,
    pub timestamp: u64,
    pub creator: String,
    pub block_number: u64,
    pub transaction_hash: String,
}

/// Aggregate per wallet address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatorEntity {
    pub id: String,
    pub address: String,
    pub proof_count: u64,
}

/// Entity tables keyed by entity id
#[derive(Debug, Clone, Default)]
pub struct EntityStore {
    proofs: HashMap<String, ProofEntity>,
    creators: HashMap<String, CreatorEntity>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one registration event
    ///
    /// The creator is created on first sight and its proof count bumped on
    /// every event. The proof id is the content hash as emitted.
    pub fn handle_proof_registered(&mut self, event: &ProofRegistered) {
        let creator_id = event.creator.to_ascii_lowercase();
        let creator = self
            .creators
            .entry(creator_id.clone())
            .or_insert_with(|| CreatorEntity {
                id: creator_id.clone(),
                address: creator_id.clone(),
                proof_count: 0,
            });
        creator.proof_count += 1;

        let proof = ProofEntity {
            id: event.hash.clone(),
            hash: Some(event.hash.clone()),
            title: Some(event.title.clone()),
            license: Some(event.license.clone()),
            twitter_handle: Some(event.twitter_handle.clone()),
            timestamp: i64::try_from(event.timestamp).ok(),
            creator: Some(CreatorRef {
                id: creator_id.clone(),
                address: Some(creator_id),
            }),
            block_number: i64::try_from(event.block_number).ok(),
            transaction_hash: Some(event.transaction_hash.to_ascii_lowercase()),
        };
        self.proofs.insert(proof.id.clone(), proof);
    }

    pub fn proof(&self, id: &str) -> Option<&ProofEntity> {
        self.proofs.get(id)
    }

    pub fn creator(&self, id: &str) -> Option<&CreatorEntity> {
        self.creators.get(id)
    }

    pub fn proofs(&self) -> impl Iterator<Item = &ProofEntity> {
        self.proofs.values()
    }

    pub fn len(&self) -> usize {
        self.proofs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.proofs.is_empty()
    }
}
