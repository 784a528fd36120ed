//! Configuration for the cost engine

use serde::{Deserialize, Serialize};

/// Cost engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Backend endpoints
    pub backend: BackendConfig,

    /// Lookup table RPCs
    pub lookups: LookupConfig,

    /// Classification handling
    pub classification: ClassificationConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "cost-engine".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            backend: BackendConfig::default(),
            lookups: LookupConfig::default(),
            classification: ClassificationConfig::default(),
        }
    }
}

/// Backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Project base URL, without trailing slash
    pub base_url: String,

    /// API key sent as `apikey` and bearer token
    pub api_key: String,

    /// Pricing function name
    pub pricing_function: String,

    /// Persistence function name
    pub persist_function: String,

    /// Function returning the current schedule
    pub load_function: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:54321".to_string(),
            api_key: String::new(),
            pricing_function: "calculate-costs".to_string(),
            persist_function: "save-cost-schedule".to_string(),
            load_function: "load-cost-schedule".to_string(),
        }
    }
}

/// Lookup RPC names
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Category table RPC
    pub category_rpc: String,

    /// Vehicle table RPC
    pub vehicle_rpc: String,

    /// Backing type table RPC
    pub backing_type_rpc: String,

    /// Offer type table RPC
    pub offer_type_rpc: String,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            category_rpc: "get_cost_categories".to_string(),
            vehicle_rpc: "get_cost_vehicles".to_string(),
            backing_type_rpc: "get_cost_backing_types".to_string(),
            offer_type_rpc: "get_cost_offer_types".to_string(),
        }
    }
}

/// Classification configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationConfig {
    /// Word every offer type phrase must start with
    pub offer_type_prefix: String,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            offer_type_prefix: "Oferta".to_string(),
        }
    }
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(url) = std::env::var("COST_ENGINE_BASE_URL") {
            config.backend.base_url = url;
        }

        if let Ok(key) = std::env::var("COST_ENGINE_API_KEY") {
            config.backend.api_key = key;
        }

        if let Ok(name) = std::env::var("COST_ENGINE_PRICING_FUNCTION") {
            config.backend.pricing_function = name;
        }

        if let Ok(name) = std::env::var("COST_ENGINE_PERSIST_FUNCTION") {
            config.backend.persist_function = name;
        }

        if let Ok(name) = std::env::var("COST_ENGINE_LOAD_FUNCTION") {
            config.backend.load_function = name;
        }

        if let Ok(name) = std::env::var("COST_ENGINE_CATEGORY_RPC") {
            config.lookups.category_rpc = name;
        }

        if let Ok(name) = std::env::var("COST_ENGINE_VEHICLE_RPC") {
            config.lookups.vehicle_rpc = name;
        }

        if let Ok(name) = std::env::var("COST_ENGINE_BACKING_TYPE_RPC") {
            config.lookups.backing_type_rpc = name;
        }

        if let Ok(name) = std::env::var("COST_ENGINE_OFFER_TYPE_RPC") {
            config.lookups.offer_type_rpc = name;
        }

        if let Ok(prefix) = std::env::var("COST_ENGINE_OFFER_TYPE_PREFIX") {
            config.classification.offer_type_prefix = prefix;
        }

        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Check required fields
    pub fn validate(&self) -> crate::Result<()> {
        if self.backend.base_url.is_empty() {
            return Err(crate::Error::Config("backend.base_url is empty".to_string()));
        }
        if self.backend.pricing_function.is_empty()
            || self.backend.persist_function.is_empty()
            || self.backend.load_function.is_empty()
        {
            return Err(crate::Error::Config("backend function names must be set".to_string()));
        }
        let lookups = &self.lookups;
        if [
            &lookups.category_rpc,
            &lookups.vehicle_rpc,
            &lookups.backing_type_rpc,
            &lookups.offer_type_rpc,
        ]
        .iter()
        .any(|name| name.is_empty())
        {
            return Err(crate::Error::Config("lookup RPC names must be set".to_string()));
        }
        Ok(())
    }

    fn normalize(&mut self) {
        let trimmed = self.backend.base_url.trim_end_matches('/').len();
        self.backend.base_url.truncate(trimmed);
    }
}
