//! In-memory identity gateway implementation.
//!
//! Holds tokens and logins in a HashMap, useful for tests and local
//! development where no hosted identity provider is available. Tokens can
//! be seeded from configuration or issued directly.

use crate::{IdentityError, IdentityInterface};
use async_trait::async_trait;
use demlik_types::{ConfigSchema, ImplementationRegistry, Schema, ValidationError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
	/// token -> user id
	tokens: HashMap<String, String>,
	/// login -> user id
	logins: HashMap<String, String>,
}

/// In-memory identity implementation.
pub struct MemoryIdentity {
	state: Arc<RwLock<Inner>>,
}

impl MemoryIdentity {
	/// Creates a new MemoryIdentity with no known tokens or logins.
	pub fn new() -> Self {
		Self {
			state: Arc::new(RwLock::new(Inner::default())),
		}
	}

	/// Registers a token for an existing user id.
	///
	/// This stands in for the hosted provider's session issuance.
	pub async fn issue_token(&self, token: impl Into<String>, user_id: impl Into<String>) {
		let mut state = self.state.write().await;
		state.tokens.insert(token.into(), user_id.into());
	}
}

impl Default for MemoryIdentity {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl IdentityInterface for MemoryIdentity {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryIdentitySchema)
	}

	async fn verify_token(&self, token: &str) -> Result<String, IdentityError> {
		let state = self.state.read().await;
		state
			.tokens
			.get(token)
			.cloned()
			.ok_or_else(|| IdentityError::InvalidToken("unknown token".to_string()))
	}

	async fn create_user(&self, login: &str, _password: &str) -> Result<String, IdentityError> {
		let mut state = self.state.write().await;
		if state.logins.contains_key(login) {
			return Err(IdentityError::Duplicate(login.to_string()));
		}
		let user_id = Uuid::new_v4().to_string();
		state.logins.insert(login.to_string(), user_id.clone());
		Ok(user_id)
	}
}

/// Configuration schema for MemoryIdentity.
pub struct MemoryIdentitySchema;

impl ConfigSchema for MemoryIdentitySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		// The optional [tokens] table maps arbitrary token strings to user
		// ids, so there are no fixed fields to declare.
		let schema = Schema::new(vec![], vec![]);
		schema.validate(config)
	}
}

/// Factory function to create a memory identity backend from configuration.
///
/// Configuration parameters:
/// - `tokens` (optional table): seeded token -> user id pairs
pub fn create_identity(config: &toml::Value) -> Result<Box<dyn IdentityInterface>, IdentityError> {
	let identity = MemoryIdentity::new();

	if let Some(tokens) = config.get("tokens").and_then(|v| v.as_table()) {
		let mut state = identity
			.state
			.try_write()
			.map_err(|e| IdentityError::Configuration(e.to_string()))?;
		for (token, user) in tokens {
			let user_id = user.as_str().ok_or_else(|| {
				IdentityError::Configuration(format!("token '{}' must map to a string", token))
			})?;
			state.tokens.insert(token.clone(), user_id.to_string());
		}
	}

	Ok(Box::new(identity))
}

/// Registry for the memory identity implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = crate::IdentityFactory;

	fn factory() -> Self::Factory {
		create_identity
	}
}

impl crate::IdentityRegistry for Registry {}
