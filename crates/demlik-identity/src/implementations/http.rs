//! HTTP identity gateway implementation.
//!
//! Talks to a hosted authentication service with the common two-key layout:
//! an anon key that may only verify sessions, and a service key that may
//! administer users. Token verification calls the service's `/auth/v1/user`
//! endpoint with the bearer token; user creation goes through the admin
//! endpoint with the service key.

use crate::{IdentityError, IdentityInterface};
use async_trait::async_trait;
use demlik_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use serde::Deserialize;

/// Identity backend against a hosted auth service.
pub struct HttpIdentity {
	client: reqwest::Client,
	base_url: String,
	anon_key: String,
	service_key: String,
}

/// Minimal shape of the auth service's user object.
#[derive(Debug, Deserialize)]
struct AuthUser {
	id: String,
}

impl HttpIdentity {
	pub fn new(base_url: String, anon_key: String, service_key: String) -> Self {
		let client = reqwest::Client::builder()
			.pool_idle_timeout(std::time::Duration::from_secs(90))
			.timeout(std::time::Duration::from_secs(30))
			.build()
			.unwrap_or_default();
		Self {
			client,
			base_url,
			anon_key,
			service_key,
		}
	}
}

#[async_trait]
impl IdentityInterface for HttpIdentity {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpIdentitySchema)
	}

	async fn verify_token(&self, token: &str) -> Result<String, IdentityError> {
		let url = format!("{}/auth/v1/user", self.base_url);
		let response = self
			.client
			.get(&url)
			.header("apikey", &self.anon_key)
			.bearer_auth(token)
			.send()
			.await
			.map_err(|e| IdentityError::Backend(e.to_string()))?;

		if response.status() == reqwest::StatusCode::UNAUTHORIZED
			|| response.status() == reqwest::StatusCode::FORBIDDEN
		{
			return Err(IdentityError::InvalidToken(
				"session rejected by auth service".to_string(),
			));
		}
		if !response.status().is_success() {
			return Err(IdentityError::Backend(format!(
				"auth service returned {}",
				response.status()
			)));
		}

		let user: AuthUser = response
			.json()
			.await
			.map_err(|e| IdentityError::Backend(e.to_string()))?;
		Ok(user.id)
	}

	async fn create_user(&self, login: &str, password: &str) -> Result<String, IdentityError> {
		let url = format!("{}/auth/v1/admin/users", self.base_url);
		let response = self
			.client
			.post(&url)
			.header("apikey", &self.service_key)
			.bearer_auth(&self.service_key)
			.json(&serde_json::json!({
				"email": login,
				"password": password,
				"email_confirm": true,
			}))
			.send()
			.await
			.map_err(|e| IdentityError::Backend(e.to_string()))?;

		// The hosted service answers 422 for an already-registered login.
		if response.status() == reqwest::StatusCode::UNPROCESSABLE_ENTITY
			|| response.status() == reqwest::StatusCode::CONFLICT
		{
			return Err(IdentityError::Duplicate(login.to_string()));
		}
		if !response.status().is_success() {
			return Err(IdentityError::Backend(format!(
				"auth service returned {}",
				response.status()
			)));
		}

		let user: AuthUser = response
			.json()
			.await
			.map_err(|e| IdentityError::Backend(e.to_string()))?;
		tracing::debug!(user_id = %user.id, "created identity");
		Ok(user.id)
	}
}

/// Configuration schema for HttpIdentity.
pub struct HttpIdentitySchema;

impl ConfigSchema for HttpIdentitySchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("url", FieldType::String),
				Field::new("anon_key", FieldType::String),
				Field::new("service_key", FieldType::String),
			],
			vec![],
		);
		schema.validate(config)
	}
}

/// Factory function to create an HTTP identity backend from configuration.
///
/// Configuration parameters:
/// - `url`: base URL of the hosted auth service
/// - `anon_key`: key used for session verification
/// - `service_key`: key used for user administration
pub fn create_identity(config: &toml::Value) -> Result<Box<dyn IdentityInterface>, IdentityError> {
	HttpIdentitySchema
		.validate(config)
		.map_err(|e| IdentityError::Configuration(e.to_string()))?;

	let get = |key: &str| -> Result<String, IdentityError> {
		config
			.get(key)
			.and_then(|v| v.as_str())
			.map(str::to_string)
			.ok_or_else(|| IdentityError::Configuration(format!("missing '{}'", key)))
	};

	Ok(Box::new(HttpIdentity::new(
		get("url")?.trim_end_matches('/').to_string(),
		get("anon_key")?,
		get("service_key")?,
	)))
}

/// Registry for the HTTP identity implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = crate::IdentityFactory;

	fn factory() -> Self::Factory {
		create_identity
	}
}

impl crate::IdentityRegistry for Registry {}
