//! Application configuration management.
//!
//! This module handles loading and merging configuration from multiple
//! sources with a clear precedence order. Configuration can come from
//! default values, configuration files, and environment variables.

use crate::Cli;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settlement behavior of the mock deposit provider.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct MockProviderConfig {
    /// How long after creation an order reports verified. Omit to keep
    /// orders pending forever, which exercises clients' polling-timeout
    /// handling.
    #[serde(default, with = "humantime_serde")]
    pub verify_after: Option<Duration>,
}

/// The main application configuration that composes all component configs
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct AppConfig {
    /// Web server and room configuration (bind address, queue depths,
    /// stream backlogs, deposit polling)
    #[serde(default)]
    pub server: rostrum_server::ServerConfig,

    /// Mock deposit provider configuration
    #[serde(default)]
    pub deposits: MockProviderConfig,
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence:
    /// 1. Environment variables (highest priority)
    /// 2. Config file given by the CLI
    /// 3. Default values (lowest priority)
    ///
    /// Environment variables are mapped using the pattern:
    /// `APP_<SECTION>__<KEY>` maps to `<section>.<key>`
    ///
    /// # Examples
    ///
    /// ```bash
    /// # Set server bind address
    /// export APP_SERVER__BIND_ADDRESS="0.0.0.0:3000"
    ///
    /// # Settle mock deposits after five seconds
    /// export APP_DEPOSITS__VERIFY_AFTER="5s"
    /// ```
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = config::Config::builder();

        // Start with default values
        config = config.add_source(config::Config::try_from(&Self::default())?);

        // Layer on config file if it is specified and exists
        if let Some(path) = &cli.config {
            if path.exists() {
                config = config.add_source(config::File::from(path.as_path()))
            } else {
                return Err(anyhow::anyhow!(
                    "Config file {} does not exist",
                    path.display()
                ));
            }
        }

        // Override with environment variables
        // This maps APP_SERVER__BIND_ADDRESS to server.bind_address
        config = config.add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let built_config = config.build()?;
        built_config.try_deserialize().map_err(Into::into)
    }
}
