//! Identity gateway module for the demlik order system.
//!
//! This module provides abstractions over the hosted identity provider.
//! The core only ever asks two things of it: "who does this bearer token
//! belong to?" and, for registration, "create an identity". Role lookup
//! goes through the order store's profile records, not through here.

use async_trait::async_trait;
use demlik_types::{ConfigSchema, ImplementationRegistry};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod memory;
}

/// Errors that can occur during identity operations.
#[derive(Debug, Error)]
pub enum IdentityError {
	/// Error that occurs when a credential does not resolve to an identity.
	#[error("Invalid token: {0}")]
	InvalidToken(String),
	/// Error that occurs when creating an identity that already exists.
	#[error("Identity already registered: {0}")]
	Duplicate(String),
	/// Error that occurs in the identity backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for identity gateway implementations.
///
/// This trait must be implemented by any identity backend that wants to
/// integrate with the order system. Implementations are expected to treat
/// tokens as opaque bearer credentials.
#[async_trait]
pub trait IdentityInterface: Send + Sync {
	/// Returns the configuration schema for this identity implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Resolves a bearer token to the user id it was issued for.
	///
	/// Returns `IdentityError::InvalidToken` when the token is unknown,
	/// expired, or otherwise unusable.
	async fn verify_token(&self, token: &str) -> Result<String, IdentityError>;

	/// Creates a new identity with the given login name and password and
	/// returns its user id.
	///
	/// Returns `IdentityError::Duplicate` when the login name is taken.
	async fn create_user(&self, login: &str, password: &str) -> Result<String, IdentityError>;
}

/// Type alias for identity factory functions.
///
/// This is the function signature that all identity implementations must
/// provide to create instances of their identity interface.
pub type IdentityFactory = fn(&toml::Value) -> Result<Box<dyn IdentityInterface>, IdentityError>;

/// Registry trait for identity implementations.
pub trait IdentityRegistry: ImplementationRegistry<Factory = IdentityFactory> {}

/// Get all registered identity implementations.
///
/// Returns a vector of (name, factory) tuples for all available identity
/// implementations, used by the service to wire from configuration.
pub fn get_all_implementations() -> Vec<(&'static str, IdentityFactory)> {
	use implementations::{http, memory};

	vec![
		(http::Registry::NAME, http::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// High-level identity service.
///
/// Wraps an identity backend and provides the calls the core consumes.
pub struct IdentityService {
	/// The underlying identity gateway implementation.
	backend: Box<dyn IdentityInterface>,
}

impl IdentityService {
	/// Creates a new IdentityService with the specified backend.
	pub fn new(backend: Box<dyn IdentityInterface>) -> Self {
		Self { backend }
	}

	/// Resolves a bearer token to a user id.
	pub async fn verify_token(&self, token: &str) -> Result<String, IdentityError> {
		self.backend.verify_token(token).await
	}

	/// Creates a new identity and returns its user id.
	pub async fn create_user(&self, login: &str, password: &str) -> Result<String, IdentityError> {
		self.backend.create_user(login, password).await
	}
}
