//! In-memory order store implementation.
//!
//! Keeps all tables in HashMaps behind a single read-write lock, which is
//! what makes the conditional status update atomic here: match and write
//! happen under one write-lock acquisition. Used by tests and local
//! development.

use crate::{StoreError, StoreInterface};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use demlik_types::{
	ConfigSchema, ImplementationRegistry, NewOrderItem, Order, OrderFilter, OrderItem,
	OrderItemView, OrderStatus, OrderView, Product, ProductSummary, Profile, ProfileSummary,
	Schema, SortOrder, SystemSettings, ValidationError,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
	orders: HashMap<String, Order>,
	items: Vec<OrderItem>,
	products: HashMap<String, Product>,
	profiles: HashMap<String, Profile>,
	settings: Option<SystemSettings>,
}

/// In-memory store implementation.
#[derive(Clone)]
pub struct MemoryStore {
	tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
	/// Creates a new MemoryStore with empty tables.
	pub fn new() -> Self {
		Self {
			tables: Arc::new(RwLock::new(Tables::default())),
		}
	}

	/// Inserts or replaces a product row. Products are otherwise read-only
	/// through the store interface.
	pub async fn upsert_product(&self, product: Product) {
		let mut tables = self.tables.write().await;
		tables.products.insert(product.id.clone(), product);
	}

	/// Inserts or replaces the settings row.
	pub async fn seed_settings(&self, is_ordering_active: bool) {
		let mut tables = self.tables.write().await;
		tables.settings = Some(SystemSettings {
			is_ordering_active,
			updated_at: Utc::now(),
		});
	}

	fn build_view(tables: &Tables, order: &Order) -> OrderView {
		let items = tables
			.items
			.iter()
			.filter(|item| item.order_id == order.id)
			.map(|item| OrderItemView {
				item: item.clone(),
				product: tables.products.get(&item.product_id).map(|p| ProductSummary {
					id: p.id.clone(),
					name: p.name.clone(),
				}),
			})
			.collect();

		let customer = order
			.owner_id
			.as_ref()
			.and_then(|owner| tables.profiles.get(owner))
			.map(ProfileSummary::from);

		OrderView {
			order: order.clone(),
			customer,
			items,
		}
	}
}

impl Default for MemoryStore {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl StoreInterface for MemoryStore {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryStoreSchema)
	}

	async fn insert_order(
		&self,
		owner_id: Option<&str>,
		status: OrderStatus,
	) -> Result<Order, StoreError> {
		let now = Utc::now();
		let order = Order {
			id: Uuid::new_v4().to_string(),
			owner_id: owner_id.map(str::to_string),
			status,
			created_at: now,
			updated_at: now,
		};

		let mut tables = self.tables.write().await;
		tables.orders.insert(order.id.clone(), order.clone());
		Ok(order)
	}

	async fn insert_order_items(
		&self,
		items: &[NewOrderItem],
	) -> Result<Vec<OrderItem>, StoreError> {
		let now = Utc::now();
		let mut tables = self.tables.write().await;

		let rows: Vec<OrderItem> = items
			.iter()
			.map(|item| OrderItem {
				id: Uuid::new_v4().to_string(),
				order_id: item.order_id.clone(),
				product_id: item.product_id.clone(),
				quantity: item.quantity,
				size: item.size,
				sugar_level: item.sugar_level,
				notes: item.notes.clone(),
				created_at: now,
			})
			.collect();

		tables.items.extend(rows.iter().cloned());
		Ok(rows)
	}

	async fn delete_order(&self, id: &str) -> Result<(), StoreError> {
		let mut tables = self.tables.write().await;
		tables.orders.remove(id);
		tables.items.retain(|item| item.order_id != id);
		Ok(())
	}

	async fn update_order_status(
		&self,
		id: &str,
		allowed_from: &[OrderStatus],
		new_status: OrderStatus,
		updated_at: DateTime<Utc>,
	) -> Result<Order, StoreError> {
		// Match and write under one lock acquisition; this is the
		// compare-and-swap the lifecycle engine relies on.
		let mut tables = self.tables.write().await;
		let order = tables.orders.get_mut(id).ok_or(StoreError::NotFound)?;
		if !allowed_from.contains(&order.status) {
			return Err(StoreError::NotFound);
		}
		order.status = new_status;
		order.updated_at = updated_at;
		Ok(order.clone())
	}

	async fn get_order(&self, id: &str) -> Result<OrderView, StoreError> {
		let tables = self.tables.read().await;
		let order = tables.orders.get(id).ok_or(StoreError::NotFound)?;
		Ok(Self::build_view(&tables, order))
	}

	async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<OrderView>, StoreError> {
		let tables = self.tables.read().await;

		let mut orders: Vec<&Order> = tables
			.orders
			.values()
			.filter(|order| filter.statuses.is_empty() || filter.statuses.contains(&order.status))
			.filter(|order| match &filter.owner_id {
				Some(owner) => order.owner_id.as_deref() == Some(owner.as_str()),
				None => true,
			})
			.collect();

		match filter.sort {
			SortOrder::OldestFirst => orders.sort_by_key(|order| order.created_at),
			SortOrder::NewestFirst => {
				orders.sort_by_key(|order| std::cmp::Reverse(order.created_at))
			}
		}

		Ok(orders
			.into_iter()
			.map(|order| Self::build_view(&tables, order))
			.collect())
	}

	async fn get_product(&self, id: &str) -> Result<Product, StoreError> {
		let tables = self.tables.read().await;
		tables.products.get(id).cloned().ok_or(StoreError::NotFound)
	}

	async fn get_profile(&self, user_id: &str) -> Result<Profile, StoreError> {
		let tables = self.tables.read().await;
		tables
			.profiles
			.get(user_id)
			.cloned()
			.ok_or(StoreError::NotFound)
	}

	async fn insert_profile(&self, profile: &Profile) -> Result<(), StoreError> {
		let mut tables = self.tables.write().await;
		if tables.profiles.contains_key(&profile.id) {
			return Err(StoreError::Backend(format!(
				"profile {} already exists",
				profile.id
			)));
		}
		tables.profiles.insert(profile.id.clone(), profile.clone());
		Ok(())
	}

	async fn get_settings(&self) -> Result<SystemSettings, StoreError> {
		let tables = self.tables.read().await;
		tables.settings.clone().ok_or(StoreError::NotFound)
	}

	async fn update_settings(
		&self,
		is_ordering_active: bool,
		updated_at: DateTime<Utc>,
	) -> Result<SystemSettings, StoreError> {
		let mut tables = self.tables.write().await;
		let settings = tables.settings.as_mut().ok_or(StoreError::NotFound)?;
		settings.is_ordering_active = is_ordering_active;
		settings.updated_at = updated_at;
		Ok(settings.clone())
	}
}

/// Configuration schema for MemoryStore.
pub struct MemoryStoreSchema;

impl ConfigSchema for MemoryStoreSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		// Seed data is free-form; the factory checks shapes itself.
		let schema = Schema::new(vec![], vec![]);
		schema.validate(config)
	}
}

/// Factory function to create a memory store backend from configuration.
///
/// Configuration parameters:
/// - `products` (optional array of tables): seeded `{ id, name }` rows
/// - `profiles` (optional array of tables): seeded `{ id, username, role }` rows
/// - `ordering_active` (optional boolean): seeded settings row
pub fn create_store(config: &toml::Value) -> Result<Box<dyn StoreInterface>, StoreError> {
	let store = MemoryStore::new();
	let mut tables = store
		.tables
		.try_write()
		.map_err(|e| StoreError::Configuration(e.to_string()))?;

	if let Some(products) = config.get("products").and_then(|v| v.as_array()) {
		for product in products {
			let id = product.get("id").and_then(|v| v.as_str());
			let name = product.get("name").and_then(|v| v.as_str());
			let (Some(id), Some(name)) = (id, name) else {
				return Err(StoreError::Configuration(
					"each product needs string 'id' and 'name'".to_string(),
				));
			};
			tables.products.insert(
				id.to_string(),
				Product {
					id: id.to_string(),
					name: name.to_string(),
					created_at: Utc::now(),
				},
			);
		}
	}

	if let Some(profiles) = config.get("profiles").and_then(|v| v.as_array()) {
		for profile in profiles {
			let id = profile.get("id").and_then(|v| v.as_str());
			let username = profile.get("username").and_then(|v| v.as_str());
			let role = profile
				.get("role")
				.and_then(|v| v.as_str())
				.and_then(|s| s.parse().ok());
			let (Some(id), Some(username), Some(role)) = (id, username, role) else {
				return Err(StoreError::Configuration(
					"each profile needs string 'id', 'username', and a valid 'role'".to_string(),
				));
			};
			let now = Utc::now();
			tables.profiles.insert(
				id.to_string(),
				Profile {
					id: id.to_string(),
					username: username.to_string(),
					shop_name: profile
						.get("shop_name")
						.and_then(|v| v.as_str())
						.map(str::to_string),
					role,
					created_at: now,
					updated_at: now,
				},
			);
		}
	}

	if let Some(active) = config.get("ordering_active").and_then(|v| v.as_bool()) {
		tables.settings = Some(SystemSettings {
			is_ordering_active: active,
			updated_at: Utc::now(),
		});
	}

	drop(tables);
	Ok(Box::new(store))
}

/// Registry for the memory store implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = crate::StoreFactory;

	fn factory() -> Self::Factory {
		create_store
	}
}

impl crate::StoreRegistry for Registry {}
