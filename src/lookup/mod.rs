/// Lookup queries, normalized records and the multi-source resolver

pub mod query;
pub mod record;
pub mod resolver;

pub use query::{normalize_handle, Query, UNKNOWN_ADDRESS};
pub use record::{merge_records, Record, SourceId, DEFAULT_LICENSE, DEFAULT_TITLE};
pub use resolver::{LookupResolver, ResolveOptions, ResolveResult, SourceError, SourceErrorKind};
