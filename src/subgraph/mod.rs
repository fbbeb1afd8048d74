/// Subgraph entity mapping
///
/// Flattens `ProofRegistered` contract events into `Proof` and `Creator`
/// entities, the same shape the hosted indexer serves over GraphQL.

pub mod mapping;
pub mod store;

pub use mapping::{CreatorEntity, EntityStore, ProofRegistered};
pub use store::InMemoryIndex;
