/// Writing Registry - content lookup and reconciliation
///
/// Resolves registered writings by content hash, creator address, or social
/// handle across an indexer, the registry contract itself, and a
/// content-storage API, merging what each knows into one record per hash.

pub mod api;
pub mod config;
pub mod content;
pub mod context;
pub mod error;
pub mod lookup;
pub mod metrics;
pub mod rate_limit;
pub mod registration;
pub mod server;
pub mod sources;
pub mod subgraph;

pub use context::AppContext;
pub use error::{RegistryError, RegistryResult};
pub use lookup::{LookupResolver, Query, Record, ResolveOptions, ResolveResult, SourceId};
