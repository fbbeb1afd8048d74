/// Lookup queries and their validation
use crate::content::digest::{is_prefixed_hex, DIGEST_HEX_LEN};
use crate::error::{RegistryError, RegistryResult};
use serde::Serialize;
use std::fmt;

/// Total length of a rendered wallet address, including the `0x` prefix
pub const ADDRESS_HEX_LEN: usize = 42;

/// Creator address used when the real creator is unknown
pub const UNKNOWN_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// A validated lookup query
///
/// Hashes and addresses are stored lowercased, handles lowercased with any
/// leading `@` removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Query {
    ByHash(String),
    ByAddress(String),
    ByHandle(String),
}

impl Query {
    /// Validate a content hash query
    pub fn by_hash(input: &str) -> RegistryResult<Self> {
        if !is_prefixed_hex(input, DIGEST_HEX_LEN) {
            return Err(RegistryError::InvalidFormat(format!(
                "hash must be {} characters starting with 0x followed by hex digits",
                DIGEST_HEX_LEN
            )));
        }
        Ok(Query::ByHash(input.to_ascii_lowercase()))
    }

    /// Validate a creator address query
    pub fn by_address(input: &str) -> RegistryResult<Self> {
        if !is_prefixed_hex(input, ADDRESS_HEX_LEN) {
            return Err(RegistryError::InvalidFormat(format!(
                "address must be {} characters starting with 0x followed by hex digits",
                ADDRESS_HEX_LEN
            )));
        }
        Ok(Query::ByAddress(input.to_ascii_lowercase()))
    }

    /// Validate a social handle query
    pub fn by_handle(input: &str) -> RegistryResult<Self> {
        let handle = normalize_handle(input);
        if handle.is_empty() {
            return Err(RegistryError::EmptyInput("handle cannot be blank".to_string()));
        }
        Ok(Query::ByHandle(handle))
    }

    /// Build a query from a search type name and raw value
    ///
    /// Accepts `hash`, `address`, and `handle` (or its older alias `twitter`).
    pub fn parse(search_type: &str, value: &str) -> RegistryResult<Self> {
        match search_type.trim().to_ascii_lowercase().as_str() {
            "hash" => Self::by_hash(value.trim()),
            "address" | "creator" => Self::by_address(value.trim()),
            "handle" | "twitter" => Self::by_handle(value),
            other => Err(RegistryError::Validation(format!(
                "Invalid search type: {}",
                other
            ))),
        }
    }

    /// Short name of the query kind, used for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Query::ByHash(_) => "hash",
            Query::ByAddress(_) => "address",
            Query::ByHandle(_) => "handle",
        }
    }

    /// The normalized query value
    pub fn value(&self) -> &str {
        match self {
            Query::ByHash(v) | Query::ByAddress(v) | Query::ByHandle(v) => v,
        }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.value())
    }
}

/// Normalize a social handle for comparison
///
/// Trims whitespace, strips a single leading `@` and lowercases.
pub fn normalize_handle(input: &str) -> String {
    let trimmed = input.trim();
    let stripped = trimmed.strip_prefix('@').unwrap_or(trimmed);
    stripped.trim().to_lowercase()
}

/// Whether an address is the unknown-creator sentinel
pub fn is_unknown_address(address: &str) -> bool {
    address.is_empty() || address.eq_ignore_ascii_case(UNKNOWN_ADDRESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_hash() {
        let input = format!("0x{}", "ab".repeat(32));
        assert_eq!(Query::by_hash(&input).unwrap(), Query::ByHash(input.clone()));

        let upper = format!("0x{}", "AB".repeat(32));
        assert_eq!(Query::by_hash(&upper).unwrap(), Query::ByHash(input));
    }

    #[test]
    fn test_invalid_hashes() {
        let cases = [
            String::new(),
            "0x".to_string(),
            format!("0x{}", "a".repeat(63)),
            format!("0x{}", "a".repeat(65)),
            format!("0x{}z", "a".repeat(63)),
            format!("0X{}", "a".repeat(64)),
            format!("00{}", "a".repeat(64)),
            format!("0x{}é", "a".repeat(62)),
        ];
        for case in cases {
            assert!(
                matches!(Query::by_hash(&case), Err(RegistryError::InvalidFormat(_))),
                "accepted {:?}",
                case
            );
        }
    }

    #[test]
    fn test_address_validation() {
        assert!(Query::by_address("0xABCDEF0000000000000000000000000000000001").is_ok());
        assert_eq!(
            Query::by_address("0xABCDEF0000000000000000000000000000000001").unwrap(),
            Query::ByAddress("0xabcdef0000000000000000000000000000000001".to_string())
        );
        assert!(matches!(
            Query::by_address("0xABCDEF"),
            Err(RegistryError::InvalidFormat(_))
        ));
        assert!(matches!(
            Query::by_address("0xGBCDEF0000000000000000000000000000000001"),
            Err(RegistryError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_handle_validation() {
        assert_eq!(Query::by_handle("@Writer").unwrap(), Query::ByHandle("writer".to_string()));
        assert_eq!(Query::by_handle("  writer ").unwrap(), Query::ByHandle("writer".to_string()));
        assert!(matches!(Query::by_handle("   "), Err(RegistryError::EmptyInput(_))));
        assert!(matches!(Query::by_handle("@"), Err(RegistryError::EmptyInput(_))));
        // Only one leading @ is stripped
        assert_eq!(Query::by_handle("@@odd").unwrap(), Query::ByHandle("@odd".to_string()));
    }

    #[test]
    fn test_parse_search_type() {
        assert_eq!(Query::parse("twitter", "@a").unwrap(), Query::ByHandle("a".to_string()));
        assert!(matches!(Query::parse("title", "x"), Err(RegistryError::Validation(_))));
    }

    #[test]
    fn test_unknown_address() {
        assert!(is_unknown_address(UNKNOWN_ADDRESS));
        assert!(is_unknown_address(""));
        assert!(!is_unknown_address("0xabcdef0000000000000000000000000000000001"));
    }
}
