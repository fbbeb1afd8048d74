/// In-process indexer backed by the subgraph mapping
use crate::{
    error::RegistryResult,
    lookup::{query::normalize_handle, Query, SourceId},
    sources::{DataSource, ProofEntity, RawSourceRecord},
    subgraph::mapping::{EntityStore, ProofRegistered},
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Indexer source that applies registration events locally
///
/// Answers the same three queries as the hosted subgraph, newest first.
#[derive(Clone)]
pub struct InMemoryIndex {
    store: Arc<RwLock<EntityStore>>,
    page_size: usize,
}

impl InMemoryIndex {
    pub fn new(page_size: usize) -> Self {
        Self {
            store: Arc::new(RwLock::new(EntityStore::new())),
            page_size,
        }
    }

    /// Build an index from a batch of events, applied in order
    pub async fn from_events(events: &[ProofRegistered], page_size: usize) -> Self {
        let index = Self::new(page_size);
        for event in events {
            index.apply(event).await;
        }
        index
    }

    pub async fn apply(&self, event: &ProofRegistered) {
        self.store.write().await.handle_proof_registered(event);
    }

    /// Proof count recorded for a creator
    pub async fn proof_count(&self, address: &str) -> u64 {
        self.store
            .read()
            .await
            .creator(&address.to_ascii_lowercase())
            .map(|c| c.proof_count)
            .unwrap_or(0)
    }

    async fn find(&self, query: &Query) -> Vec<ProofEntity> {
        let store = self.store.read().await;

        let mut proofs: Vec<ProofEntity> = match query {
            Query::ByHash(hash) => {
                return store
                    .proofs()
                    .filter(|p| p.id.eq_ignore_ascii_case(hash))
                    .cloned()
                    .collect();
            }
            Query::ByAddress(address) => store
                .proofs()
                .filter(|p| p.creator.as_ref().is_some_and(|c| c.id == *address))
                .cloned()
                .collect(),
            Query::ByHandle(handle) => store
                .proofs()
                .filter(|p| {
                    p.twitter_handle
                        .as_deref()
                        .is_some_and(|h| normalize_handle(h) == *handle)
                })
                .cloned()
                .collect(),
        };

        proofs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then_with(|| a.id.cmp(&b.id)));
        proofs.truncate(self.page_size);
        proofs
    }
}

#[async_trait]
impl DataSource for InMemoryIndex {
    fn id(&self) -> SourceId {
        SourceId::Indexer
    }

    async fn query_by_source(&self, query: &Query) -> RegistryResult<Vec<RawSourceRecord>> {
        Ok(self
            .find(query)
            .await
            .into_iter()
            .map(RawSourceRecord::Indexer)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: &str = "0xabcdef0000000000000000000000000000000001";

    fn event(byte: &str, creator: &str, handle: &str, ts: u64) -> ProofRegistered {
        ProofRegistered {
            hash: format!("0x{}", byte.repeat(32)),
            title: format!("Story {}", byte),
            license: "CC0".to_string(),
            twitter_handle: handle.to_string(),
            timestamp: ts,
            creator: creator.to_string(),
            block_number: ts,
            transaction_hash: format!("0x{}", byte.repeat(32)),
        }
    }

    #[tokio::test]
    async fn test_by_creator_newest_first() {
        let index = InMemoryIndex::from_events(
            &[
                event("01", ALICE, "alice", 10),
                event("02", ALICE, "alice", 30),
                event("03", "0x0000000000000000000000000000000000000002", "bob", 20),
            ],
            100,
        )
        .await;

        let proofs = index.find(&Query::ByAddress(ALICE.to_string())).await;
        let titles: Vec<_> = proofs.iter().map(|p| p.title.clone().unwrap()).collect();
        assert_eq!(titles, vec!["Story 02", "Story 01"]);
        assert_eq!(index.proof_count(&ALICE.to_uppercase().replacen("0X", "0x", 1)).await, 2);
    }

    #[tokio::test]
    async fn test_by_handle_is_case_insensitive() {
        let index = InMemoryIndex::from_events(&[event("01", ALICE, "@Alice", 10)], 100).await;

        let rows = index
            .query_by_source(&Query::ByHandle("alice".to_string()))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_page_size_limits_results() {
        let events: Vec<_> = (1..=5)
            .map(|i| event(&format!("{:02}", i), ALICE, "alice", i))
            .collect();
        let index = InMemoryIndex::from_events(&events, 3).await;

        let proofs = index.find(&Query::ByAddress(ALICE.to_string())).await;
        assert_eq!(proofs.len(), 3);
        assert_eq!(proofs[0].timestamp, Some(5));
    }
}
