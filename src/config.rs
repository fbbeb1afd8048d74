/// Configuration management for the registry lookup service
use crate::error::{RegistryError, RegistryResult};
use crate::lookup::{query::ADDRESS_HEX_LEN, SourceId};
use crate::content::digest::is_prefixed_hex;
use crate::rate_limit::RateLimitConfig as LimiterConfig;
use crate::sources::{ContractConfig, IndexerConfig, SdkConfig};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Default chain the registry contract lives on
pub const DEFAULT_CHAIN_ID: u64 = 123420001114;
pub const DEFAULT_RPC_URL: &str = "https://rpc.campnetwork.xyz";
pub const DEFAULT_CONTRACT_ADDRESS: &str = "0xb9C7cd7158805B03A8ADc999F6C08933E51BD97d";

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub chain: ChainConfig,
    pub indexer: Option<IndexerSettings>,
    pub sdk: Option<SdkSettings>,
    pub resolver: ResolverConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    pub version: String,
}

/// Registry contract location
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub rpc_url: String,
    pub contract_address: String,
}

/// Hosted subgraph endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerSettings {
    pub url: String,
}

/// Content-storage API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkSettings {
    pub api_url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub max_concurrent_fetches: usize,
}

/// Resolver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    pub source_timeout_ms: u64,
    /// Source names in precedence order
    pub sources: Vec<String>,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst_size: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> RegistryResult<Self> {
        dotenv::dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_vars<F>(var: F) -> RegistryResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let optional = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let hostname = var("REGISTRY_HOSTNAME").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = var("REGISTRY_PORT")
            .unwrap_or_else(|| "3001".to_string())
            .parse()
            .map_err(|_| RegistryError::Config("Invalid port number".to_string()))?;
        let version = env!("CARGO_PKG_VERSION").to_string();

        let chain_id = var("REGISTRY_CHAIN_ID")
            .map(|v| v.parse())
            .transpose()
            .map_err(|_| RegistryError::Config("Invalid chain id".to_string()))?
            .unwrap_or(DEFAULT_CHAIN_ID);
        let rpc_url = var("REGISTRY_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string());
        let contract_address = var("REGISTRY_CONTRACT_ADDRESS")
            .unwrap_or_else(|| DEFAULT_CONTRACT_ADDRESS.to_string())
            .trim()
            .to_string();

        let indexer = optional("REGISTRY_SUBGRAPH_URL").map(|url| IndexerSettings { url });

        let sdk = optional("REGISTRY_SDK_API_URL").map(|api_url| SdkSettings {
            api_url,
            api_key: optional("REGISTRY_SDK_API_KEY"),
            max_concurrent_fetches: var("REGISTRY_SDK_MAX_CONCURRENT_FETCHES")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .unwrap_or(5),
        });

        let source_timeout_ms = var("REGISTRY_SOURCE_TIMEOUT_MS")
            .unwrap_or_else(|| "8000".to_string())
            .parse()
            .unwrap_or(8000);
        let sources = var("REGISTRY_SOURCES")
            .unwrap_or_else(|| "indexer,contract,sdk".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let requests_per_second = var("REGISTRY_RATE_LIMIT_RPS")
            .unwrap_or_else(|| "20".to_string())
            .parse()
            .unwrap_or(20);
        let burst_size = var("REGISTRY_RATE_LIMIT_BURST")
            .unwrap_or_else(|| "40".to_string())
            .parse()
            .unwrap_or(40);

        let log_level = var("RUST_LOG")
            .unwrap_or_else(|| "writing_registry=debug,tower_http=debug".to_string());
        let log_json = var("REGISTRY_LOG_FORMAT")
            .map(|v| v.trim().eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                version,
            },
            chain: ChainConfig {
                chain_id,
                rpc_url,
                contract_address,
            },
            indexer,
            sdk,
            resolver: ResolverConfig {
                source_timeout_ms,
                sources,
            },
            rate_limit: RateLimitConfig {
                requests_per_second,
                burst_size,
            },
            logging: LoggingConfig {
                level: log_level,
                json: log_json,
            },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> RegistryResult<()> {
        if self.service.hostname.is_empty() {
            return Err(RegistryError::Config("Hostname cannot be empty".to_string()));
        }

        if !is_prefixed_hex(&self.chain.contract_address, ADDRESS_HEX_LEN) {
            return Err(RegistryError::Config(format!(
                "Invalid contract address: {}",
                self.chain.contract_address
            )));
        }

        if self.resolver.source_timeout_ms == 0 {
            return Err(RegistryError::Config(
                "Source timeout must be greater than zero".to_string(),
            ));
        }

        if let Some(sdk) = &self.sdk {
            if sdk.max_concurrent_fetches == 0 {
                return Err(RegistryError::Config(
                    "SDK fetch concurrency must be at least 1".to_string(),
                ));
            }
        }

        if self.rate_limit.requests_per_second == 0 || self.rate_limit.burst_size == 0 {
            return Err(RegistryError::Config(
                "Rate limit values must be greater than zero".to_string(),
            ));
        }

        self.source_order()?;

        Ok(())
    }

    /// Configured sources in precedence order, duplicates dropped
    pub fn source_order(&self) -> RegistryResult<Vec<SourceId>> {
        let mut order = Vec::new();
        for name in &self.resolver.sources {
            let id = SourceId::from_name(name)
                .ok_or_else(|| RegistryError::Config(format!("Unknown source: {}", name)))?;
            if !order.contains(&id) {
                order.push(id);
            }
        }
        Ok(order)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_millis(self.resolver.source_timeout_ms)
    }

    /// User-Agent sent to every backing service
    pub fn user_agent(&self) -> String {
        format!("writing-registry/{}", self.service.version)
    }

    pub fn contract_config(&self) -> ContractConfig {
        ContractConfig {
            rpc_url: self.chain.rpc_url.clone(),
            contract_address: self.chain.contract_address.to_ascii_lowercase(),
            chain_id: self.chain.chain_id,
            user_agent: self.user_agent(),
        }
    }

    pub fn indexer_config(&self) -> Option<IndexerConfig> {
        self.indexer.as_ref().map(|settings| {
            let mut config = IndexerConfig::new(settings.url.clone());
            config.user_agent = self.user_agent();
            config
        })
    }

    pub fn sdk_config(&self) -> Option<SdkConfig> {
        self.sdk.as_ref().map(|settings| SdkConfig {
            api_url: settings.api_url.clone(),
            api_key: settings.api_key.clone(),
            max_concurrent_fetches: settings.max_concurrent_fetches,
            user_agent: self.user_agent(),
        })
    }

    pub fn limiter_config(&self) -> LimiterConfig {
        LimiterConfig {
            requests_per_second: self.rate_limit.requests_per_second,
            burst_size: self.rate_limit.burst_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> RegistryResult<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_vars(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.service.port, 3001);
        assert_eq!(config.chain.chain_id, DEFAULT_CHAIN_ID);
        assert!(config.indexer.is_none());
        assert!(config.sdk.is_none());
        assert_eq!(config.source_timeout(), Duration::from_millis(8000));
        assert_eq!(
            config.source_order().unwrap(),
            vec![SourceId::Indexer, SourceId::Contract, SourceId::Sdk]
        );
        assert!(config.validate().is_ok());
        assert!(!config.logging.json);
        assert_eq!(
            config.contract_config().contract_address,
            DEFAULT_CONTRACT_ADDRESS.to_ascii_lowercase()
        );
    }

    #[test]
    fn test_optional_sources() {
        let config = load(&[
            ("REGISTRY_SUBGRAPH_URL", "https://graph.example/subgraphs/registry"),
            ("REGISTRY_SDK_API_URL", "https://sdk.example"),
            ("REGISTRY_SDK_API_KEY", "key"),
            ("REGISTRY_SDK_MAX_CONCURRENT_FETCHES", "2"),
            ("REGISTRY_SOURCES", "contract, subgraph"),
        ])
        .unwrap();

        assert_eq!(config.indexer_config().unwrap().page_size, 100);
        let sdk = config.sdk_config().unwrap();
        assert_eq!(sdk.max_concurrent_fetches, 2);
        assert_eq!(sdk.api_key.as_deref(), Some("key"));
        assert_eq!(
            config.source_order().unwrap(),
            vec![SourceId::Contract, SourceId::Indexer]
        );
    }

    #[test]
    fn test_blank_optional_is_unset() {
        let config = load(&[("REGISTRY_SUBGRAPH_URL", "  ")]).unwrap();
        assert!(config.indexer.is_none());
    }

    #[test]
    fn test_invalid_port() {
        assert!(matches!(
            load(&[("REGISTRY_PORT", "not-a-port")]),
            Err(RegistryError::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_address = load(&[("REGISTRY_CONTRACT_ADDRESS", "0x1234")]).unwrap();
        assert!(bad_address.validate().is_err());

        let zero_timeout = load(&[("REGISTRY_SOURCE_TIMEOUT_MS", "0")]).unwrap();
        assert!(zero_timeout.validate().is_err());

        let zero_fetches = load(&[
            ("REGISTRY_SDK_API_URL", "https://sdk.example"),
            ("REGISTRY_SDK_MAX_CONCURRENT_FETCHES", "0"),
        ])
        .unwrap();
        assert!(zero_fetches.validate().is_err());

        let unknown_source = load(&[("REGISTRY_SOURCES", "indexer,ipfs")]).unwrap();
        assert!(matches!(
            unknown_source.validate(),
            Err(RegistryError::Config(_))
        ));
    }
}
