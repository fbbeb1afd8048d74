/// Normalized registry records and same-hash merging
use crate::content::{is_digest, verify_content};
use crate::lookup::query::{is_unknown_address, UNKNOWN_ADDRESS};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Title used when a source has none
pub const DEFAULT_TITLE: &str = "Untitled";

/// License used when a source has none
pub const DEFAULT_LICENSE: &str = "Unknown";

/// Backing source that produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceId {
    Indexer,
    Contract,
    Sdk,
}

impl SourceId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceId::Indexer => "indexer",
            SourceId::Contract => "contract",
            SourceId::Sdk => "sdk",
        }
    }

    /// Parse a configured source name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "indexer" | "subgraph" => Some(SourceId::Indexer),
            "contract" | "chain" => Some(SourceId::Contract),
            "sdk" | "origin" => Some(SourceId::Sdk),
            _ => None,
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registration, normalized from any source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Canonical lowercase digest, absent when the source could not derive one
    pub hash: Option<String>,
    pub title: String,
    pub license: String,
    pub handle: String,
    pub creator_address: String,
    /// Seconds since epoch
    pub timestamp: i64,
    /// Set when `timestamp` is a "now" fallback rather than a source value
    pub timestamp_estimated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<String>,
    /// Highest-precedence contributing source
    pub source_id: SourceId,
    /// Every contributing source, in precedence order
    pub sources: Vec<SourceId>,
    pub verified: bool,
}

impl Record {
    /// Start a record for `source` with every field at its default
    pub fn new(source: SourceId) -> Self {
        Self {
            hash: None,
            title: DEFAULT_TITLE.to_string(),
            license: DEFAULT_LICENSE.to_string(),
            handle: String::new(),
            creator_address: UNKNOWN_ADDRESS.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
            timestamp_estimated: true,
            content: None,
            block_number: None,
            transaction_hash: None,
            source_id: source,
            sources: vec![source],
            verified: false,
        }
    }

    /// Set the hash, dropping anything that is not a well-formed digest
    pub fn with_hash(mut self, hash: Option<&str>) -> Self {
        self.hash = hash
            .map(str::trim)
            .filter(|h| is_digest(h))
            .map(|h| h.to_ascii_lowercase());
        self
    }

    pub fn with_title(mut self, title: Option<&str>) -> Self {
        if let Some(title) = non_blank(title) {
            self.title = title.to_string();
        }
        self
    }

    pub fn with_license(mut self, license: Option<&str>) -> Self {
        if let Some(license) = non_blank(license) {
            self.license = license.to_string();
        }
        self
    }

    pub fn with_handle(mut self, handle: Option<&str>) -> Self {
        if let Some(handle) = non_blank(handle) {
            self.handle = handle.to_string();
        }
        self
    }

    pub fn with_creator(mut self, creator: Option<&str>) -> Self {
        if let Some(creator) = non_blank(creator) {
            self.creator_address = creator.to_ascii_lowercase();
        }
        self
    }

    /// Set the timestamp; `None` or zero keeps the flagged "now" fallback
    pub fn with_timestamp(mut self, timestamp: Option<i64>) -> Self {
        if let Some(ts) = timestamp.filter(|ts| *ts > 0) {
            self.timestamp = ts;
            self.timestamp_estimated = false;
        }
        self
    }

    pub fn with_content(mut self, content: Option<String>) -> Self {
        self.content = content;
        self
    }

    /// Recompute the digest of `content` and compare against `expected`
    ///
    /// Without content the record is never verified.
    pub fn verify_against(&mut self, expected: Option<&str>) {
        self.verified = match (&self.content, expected) {
            (Some(content), Some(expected)) => verify_content(content, expected),
            _ => false,
        };
    }

    /// Fill every empty field of `self` from `other`
    ///
    /// `self` has precedence. Defaulted values (placeholder title/license,
    /// the unknown address, an estimated timestamp) count as empty.
    pub fn merge_from(&mut self, other: &Record) {
        if self.hash.is_none() {
            self.hash = other.hash.clone();
        }
        if is_placeholder(&self.title, DEFAULT_TITLE) && !is_placeholder(&other.title, DEFAULT_TITLE) {
            self.title = other.title.clone();
        }
        if is_placeholder(&self.license, DEFAULT_LICENSE)
            && !is_placeholder(&other.license, DEFAULT_LICENSE)
        {
            self.license = other.license.clone();
        }
        if self.handle.is_empty() && !other.handle.is_empty() {
            self.handle = other.handle.clone();
        }
        if is_unknown_address(&self.creator_address) && !is_unknown_address(&other.creator_address) {
            self.creator_address = other.creator_address.clone();
        }
        if self.timestamp_estimated && !other.timestamp_estimated {
            self.timestamp = other.timestamp;
            self.timestamp_estimated = false;
        }
        if self.content.is_none() {
            self.content = other.content.clone();
        }
        if self.block_number.is_none() {
            self.block_number = other.block_number;
        }
        if self.transaction_hash.is_none() {
            self.transaction_hash = other.transaction_hash.clone();
        }
        for source in &other.sources {
            if !self.sources.contains(source) {
                self.sources.push(*source);
            }
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn is_placeholder(value: &str, default: &str) -> bool {
    value.trim().is_empty() || value == default
}

/// Merge records listed in precedence order
///
/// Records sharing a hash collapse into the first one seen; records without
/// a hash are always kept apart. Output keeps first-appearance order.
pub fn merge_records(records: impl IntoIterator<Item = Record>) -> Vec<Record> {
    let mut merged: Vec<Record> = Vec::new();

    for record in records {
        let existing = record.hash.as_ref().and_then(|hash| {
            merged
                .iter()
                .position(|m| m.hash.as_deref() == Some(hash.as_str()))
        });

        match existing {
            Some(idx) => merged[idx].merge_from(&record),
            None => merged.push(record),
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(byte: &str) -> String {
        format!("0x{}", byte.repeat(32))
    }

    #[test]
    fn test_defaults() {
        let record = Record::new(SourceId::Sdk);
        assert_eq!(record.title, DEFAULT_TITLE);
        assert_eq!(record.license, DEFAULT_LICENSE);
        assert_eq!(record.creator_address, UNKNOWN_ADDRESS);
        assert!(record.timestamp_estimated);
        assert!(!record.verified);
    }

    #[test]
    fn test_malformed_hash_is_dropped() {
        let record = Record::new(SourceId::Indexer).with_hash(Some("0x1234"));
        assert_eq!(record.hash, None);

        let record = Record::new(SourceId::Indexer).with_hash(Some(&hash("AB")));
        assert_eq!(record.hash, Some(hash("ab")));
    }

    #[test]
    fn test_first_title_wins() {
        let first = Record::new(SourceId::Indexer)
            .with_hash(Some(&hash("11")))
            .with_title(Some("First"));
        let second = Record::new(SourceId::Contract)
            .with_hash(Some(&hash("11")))
            .with_title(Some("Second"))
            .with_handle(Some("writer"));

        let merged = merge_records(vec![first, second]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "First");
        assert_eq!(merged[0].handle, "writer");
        assert_eq!(merged[0].source_id, SourceId::Indexer);
        assert_eq!(merged[0].sources, vec![SourceId::Indexer, SourceId::Contract]);
    }

    #[test]
    fn test_placeholders_yield_to_real_values() {
        let first = Record::new(SourceId::Sdk).with_hash(Some(&hash("22")));
        let second = Record::new(SourceId::Contract)
            .with_hash(Some(&hash("22")))
            .with_title(Some("Real Title"))
            .with_license(Some("CC0"))
            .with_creator(Some("0xABCDEF0000000000000000000000000000000001"))
            .with_timestamp(Some(1_700_000_000));

        let merged = merge_records(vec![first, second]);
        assert_eq!(merged[0].title, "Real Title");
        assert_eq!(merged[0].license, "CC0");
        assert_eq!(merged[0].creator_address, "0xabcdef0000000000000000000000000000000001");
        assert_eq!(merged[0].timestamp, 1_700_000_000);
        assert!(!merged[0].timestamp_estimated);
    }

    #[test]
    fn test_hashless_records_never_merge() {
        let a = Record::new(SourceId::Sdk).with_title(Some("A"));
        let b = Record::new(SourceId::Sdk).with_title(Some("A"));
        assert_eq!(merge_records(vec![a, b]).len(), 2);
    }

    #[test]
    fn test_distinct_hashes_stay_distinct() {
        let a = Record::new(SourceId::Indexer).with_hash(Some(&hash("01")));
        let b = Record::new(SourceId::Indexer).with_hash(Some(&hash("02")));
        let merged = merge_records(vec![a, b]);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].hash, Some(hash("01")));
    }

    #[test]
    fn test_verify_requires_content() {
        let content = "some words".to_string();
        let digest = crate::content::content_digest(&content);

        let mut record = Record::new(SourceId::Sdk).with_hash(Some(&digest));
        record.verify_against(Some(&digest));
        assert!(!record.verified);

        let mut record = record.with_content(Some(content));
        record.verify_against(Some(&digest));
        assert!(record.verified);

        let mut tampered = record.clone().with_content(Some("some wordz".to_string()));
        tampered.verify_against(Some(&digest));
        assert!(!tampered.verified);
    }

    #[test]
    fn test_source_id_names() {
        assert_eq!(SourceId::from_name("Indexer"), Some(SourceId::Indexer));
        assert_eq!(SourceId::from_name("origin"), Some(SourceId::Sdk));
        assert_eq!(SourceId::from_name("ipfs"), None);
        assert_eq!(
            serde_json::to_string(&SourceId::Contract).unwrap(),
            "\"contract\""
        );
    }
}
