/// Application context and dependency injection
use crate::{
    config::ServerConfig,
    error::RegistryResult,
    lookup::{LookupResolver, ResolveOptions, SourceId},
    rate_limit::RateLimiter,
    sources::{ContractClient, DataSource, IndexerClient, SdkClient},
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub resolver: Arc<LookupResolver>,
    /// Enabled sources in precedence order
    pub sources: Arc<Vec<Arc<dyn DataSource>>>,
    /// Contract client, also backing the direct hash check
    pub contract: Arc<ContractClient>,
    pub rate_limiter: Arc<RateLimiter>,
    /// Fired on shutdown; in-flight resolutions derive child tokens
    pub shutdown: CancellationToken,
}

impl AppContext {
    /// Create a new application context from configuration
    pub fn new(config: ServerConfig) -> RegistryResult<Self> {
        // Validate configuration
        config.validate()?;

        let contract = Arc::new(ContractClient::new(config.contract_config())?);

        let mut sources: Vec<Arc<dyn DataSource>> = Vec::new();
        for id in config.source_order()? {
            match id {
                SourceId::Indexer => match config.indexer_config() {
                    Some(indexer) => sources.push(Arc::new(IndexerClient::new(indexer)?)),
                    None => warn!("Indexer source listed but REGISTRY_SUBGRAPH_URL is not set"),
                },
                SourceId::Contract => sources.push(contract.clone()),
                SourceId::Sdk => match config.sdk_config() {
                    Some(sdk) => sources.push(Arc::new(SdkClient::new(sdk)?)),
                    None => warn!("SDK source listed but REGISTRY_SDK_API_URL is not set"),
                },
            }
        }

        info!(
            "Enabled sources: {}",
            sources
                .iter()
                .map(|s| s.id().as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self::with_sources(config, contract, sources))
    }

    /// Assemble a context around prebuilt sources
    pub fn with_sources(
        config: ServerConfig,
        contract: Arc<ContractClient>,
        sources: Vec<Arc<dyn DataSource>>,
    ) -> Self {
        let resolver = Arc::new(LookupResolver::new(ResolveOptions::new(config.source_timeout())));
        let rate_limiter = Arc::new(RateLimiter::new(&config.limiter_config()));

        Self {
            config: Arc::new(config),
            resolver,
            sources: Arc::new(sources),
            contract,
            rate_limiter,
            shutdown: CancellationToken::new(),
        }
    }
}
