//! Order store module for the demlik order system.
//!
//! This module provides abstractions over the hosted relational store that
//! holds orders, line items, products, profiles, and the single-row system
//! settings record. The core issues set-based reads and writes against it
//! and owns no storage logic itself.
//!
//! The one semantic every backend must honor is the conditional status
//! update: `update_order_status` matches on both the order id and a set of
//! expected source statuses in a single write, so that two racing callers
//! can never both advance the same order.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use demlik_types::{
	ConfigSchema, ImplementationRegistry, NewOrderItem, Order, OrderFilter, OrderItem,
	OrderStatus, OrderView, Product, Profile, SystemSettings,
};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod memory;
}

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
	/// Error that occurs when a requested row is not found, or a
	/// conditional update matched zero rows.
	#[error("Not found")]
	NotFound,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the store backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for order store backends.
#[async_trait]
pub trait StoreInterface: Send + Sync {
	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Inserts a new order header and returns the stored row.
	async fn insert_order(
		&self,
		owner_id: Option<&str>,
		status: OrderStatus,
	) -> Result<Order, StoreError>;

	/// Inserts the given line items and returns the stored rows.
	async fn insert_order_items(
		&self,
		items: &[NewOrderItem],
	) -> Result<Vec<OrderItem>, StoreError>;

	/// Deletes an order header and its line items. Compensation path only.
	async fn delete_order(&self, id: &str) -> Result<(), StoreError>;

	/// Conditionally moves an order into `new_status`.
	///
	/// The write matches on the order id AND the current status being one
	/// of `allowed_from`, as a single atomic operation. When zero rows
	/// match, either because the order does not exist or because a
	/// concurrent writer already moved it, the backend returns
	/// `StoreError::NotFound` and must not have written anything.
	async fn update_order_status(
		&self,
		id: &str,
		allowed_from: &[OrderStatus],
		new_status: OrderStatus,
		updated_at: DateTime<Utc>,
	) -> Result<Order, StoreError>;

	/// Fetches one order with its line items, product names, and the
	/// submitting profile.
	async fn get_order(&self, id: &str) -> Result<OrderView, StoreError>;

	/// Lists orders matching the filter, with nested items and products.
	async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<OrderView>, StoreError>;

	/// Fetches one product.
	async fn get_product(&self, id: &str) -> Result<Product, StoreError>;

	/// Fetches the profile for a user id.
	async fn get_profile(&self, user_id: &str) -> Result<Profile, StoreError>;

	/// Inserts a profile row.
	async fn insert_profile(&self, profile: &Profile) -> Result<(), StoreError>;

	/// Reads the single-row system settings record.
	async fn get_settings(&self) -> Result<SystemSettings, StoreError>;

	/// Writes the ordering switch and returns the stored record.
	async fn update_settings(
		&self,
		is_ordering_active: bool,
		updated_at: DateTime<Utc>,
	) -> Result<SystemSettings, StoreError>;
}

/// Type alias for store factory functions.
///
/// This is the function signature that all store implementations must
/// provide to create instances of their store interface.
pub type StoreFactory = fn(&toml::Value) -> Result<Box<dyn StoreInterface>, StoreError>;

/// Registry trait for store implementations.
pub trait StoreRegistry: ImplementationRegistry<Factory = StoreFactory> {}

/// Get all registered store implementations.
///
/// Returns a vector of (name, factory) tuples for all available store
/// implementations, used by the service to wire from configuration.
pub fn get_all_implementations() -> Vec<(&'static str, StoreFactory)> {
	use implementations::{http, memory};

	vec![
		(http::Registry::NAME, http::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// High-level store service that the core operates against.
pub struct StoreService {
	/// The underlying store backend implementation.
	backend: Box<dyn StoreInterface>,
}

impl StoreService {
	/// Creates a new StoreService with the specified backend.
	pub fn new(backend: Box<dyn StoreInterface>) -> Self {
		Self { backend }
	}

	pub async fn insert_order(
		&self,
		owner_id: Option<&str>,
		status: OrderStatus,
	) -> Result<Order, StoreError> {
		self.backend.insert_order(owner_id, status).await
	}

	pub async fn insert_order_items(
		&self,
		items: &[NewOrderItem],
	) -> Result<Vec<OrderItem>, StoreError> {
		self.backend.insert_order_items(items).await
	}

	pub async fn delete_order(&self, id: &str) -> Result<(), StoreError> {
		self.backend.delete_order(id).await
	}

	/// Conditional status update; see [`StoreInterface::update_order_status`].
	pub async fn update_order_status(
		&self,
		id: &str,
		allowed_from: &[OrderStatus],
		new_status: OrderStatus,
		updated_at: DateTime<Utc>,
	) -> Result<Order, StoreError> {
		self.backend
			.update_order_status(id, allowed_from, new_status, updated_at)
			.await
	}

	pub async fn get_order(&self, id: &str) -> Result<OrderView, StoreError> {
		self.backend.get_order(id).await
	}

	pub async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<OrderView>, StoreError> {
		self.backend.list_orders(filter).await
	}

	pub async fn get_product(&self, id: &str) -> Result<Product, StoreError> {
		self.backend.get_product(id).await
	}

	pub async fn get_profile(&self, user_id: &str) -> Result<Profile, StoreError> {
		self.backend.get_profile(user_id).await
	}

	pub async fn insert_profile(&self, profile: &Profile) -> Result<(), StoreError> {
		self.backend.insert_profile(profile).await
	}

	pub async fn get_settings(&self) -> Result<SystemSettings, StoreError> {
		self.backend.get_settings().await
	}

	pub async fn update_settings(
		&self,
		is_ordering_active: bool,
		updated_at: DateTime<Utc>,
	) -> Result<SystemSettings, StoreError> {
		self.backend
			.update_settings(is_ordering_active, updated_at)
			.await
	}
}
