//! Configuration module for the demlik order system.
//!
//! This module provides structures and utilities for managing service
//! configuration. It supports loading configuration from TOML files and
//! provides validation to ensure all required values are properly set.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the demlik service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Configuration specific to this shop instance.
	pub shop: ShopConfig,
	/// Configuration for the identity gateway.
	pub identity: IdentityConfig,
	/// Configuration for the order store.
	pub store: StoreConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Configuration specific to the shop instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShopConfig {
	/// Unique identifier for this shop instance, used in log context.
	pub id: String,
}

/// Configuration for the identity gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentityConfig {
	/// Which implementation to use.
	pub primary: String,
	/// Map of identity implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the order store.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
	/// Which implementation to use.
	pub primary: String,
	/// Map of store implementation names to their configurations.
	pub implementations: HashMap<String, toml::Value>,
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	/// Whether the API server should be started.
	#[serde(default = "default_api_enabled")]
	pub enabled: bool,
	/// Host address to bind to.
	#[serde(default = "default_api_host")]
	pub host: String,
	/// Port to bind to.
	#[serde(default = "default_api_port")]
	pub port: u16,
}

fn default_api_enabled() -> bool {
	true
}

fn default_api_host() -> String {
	"127.0.0.1".to_string()
}

fn default_api_port() -> u16 {
	3000
}

impl Config {
	/// Loads configuration from a TOML file and validates it.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = std::fs::read_to_string(path)?;
		content.parse()
	}

	/// Validates the configuration for internal consistency.
	///
	/// Each pluggable section's `primary` must name one of its configured
	/// implementations; the implementations themselves validate their own
	/// sections through their config schemas at wiring time.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.shop.id.is_empty() {
			return Err(ConfigError::Validation("shop.id must not be empty".into()));
		}

		if !self
			.identity
			.implementations
			.contains_key(&self.identity.primary)
		{
			return Err(ConfigError::Validation(format!(
				"identity.primary '{}' has no matching implementation section",
				self.identity.primary
			)));
		}

		if !self.store.implementations.contains_key(&self.store.primary) {
			return Err(ConfigError::Validation(format!(
				"store.primary '{}' has no matching implementation section",
				self.store.primary
			)));
		}

		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let config: Config = toml::from_str(s)?;
		config.validate()?;
		Ok(config)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	const SAMPLE: &str = r#"
		[shop]
		id = "corner-teahouse"

		[identity]
		primary = "memory"
		[identity.implementations.memory]

		[store]
		primary = "memory"
		[store.implementations.memory]

		[api]
		host = "0.0.0.0"
		port = 8080
	"#;

	#[test]
	fn parses_and_validates_sample() {
		let config: Config = SAMPLE.parse().unwrap();
		assert_eq!(config.shop.id, "corner-teahouse");
		assert_eq!(config.identity.primary, "memory");
		assert_eq!(config.store.primary, "memory");
		let api = config.api.unwrap();
		assert!(api.enabled);
		assert_eq!(api.port, 8080);
	}

	#[test]
	fn rejects_primary_without_section() {
		let bad = SAMPLE.replace("primary = \"memory\"", "primary = \"postgrest\"");
		let err = bad.parse::<Config>().unwrap_err();
		assert!(matches!(err, ConfigError::Validation(_)));
	}

	#[test]
	fn api_section_is_optional() {
		let without_api = SAMPLE.split("[api]").next().unwrap();
		let config: Config = without_api.parse().unwrap();
		assert!(config.api.is_none());
	}
}
