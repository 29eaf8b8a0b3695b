//! Configuration management for the Feedlot Purchase Management Platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with FLM_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Financial mirror configuration
    pub finance: FinanceConfig,

    /// Livestock defaults
    pub livestock: LivestockConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

/// Names of the reference data rows the financial mirror writes against.
/// Resolved to ids once at startup; business logic never carries literal
/// ids.
#[derive(Debug, Deserialize, Clone)]
pub struct FinanceConfig {
    /// Expense category for the purchase principal
    pub purchase_category: String,

    /// Expense category for broker commission
    pub commission_category: String,

    /// Expense category for freight
    pub freight_category: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LivestockConfig {
    /// Fallback average live weight per head (kg) for loss estimation when
    /// a lot carries no usable weighing
    pub default_average_weight_kg: rust_decimal::Decimal,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = std::env::var("FLM_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("finance.purchase_category", "Compra de gado")?
            .set_default("finance.commission_category", "Comissao")?
            .set_default("finance.freight_category", "Frete")?
            .set_default("livestock.default_average_weight_kg", "390")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (FLM_ prefix)
            .add_source(
                Environment::with_prefix("FLM")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}
