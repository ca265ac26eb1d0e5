//! HTTP order store implementation.
//!
//! Talks to a hosted relational store exposing row-filtered REST endpoints
//! (PostgREST conventions): exact-match and set filters in the query
//! string, `Prefer: return=representation` to get written rows back, and
//! embedded resources for join-like nested fetches.
//!
//! The conditional status update maps to a filtered PATCH
//! (`id=eq.{id}&status=in.(...)`); an empty representation means zero rows
//! matched and is reported as `StoreError::NotFound`.

use crate::{StoreError, StoreInterface};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use demlik_types::{
	ConfigSchema, CupSize, Field, FieldType, ImplementationRegistry, NewOrderItem, Order,
	OrderFilter, OrderItem, OrderItemView, OrderStatus, OrderView, Product, ProductSummary,
	Profile, ProfileSummary, Schema, SortOrder, SugarLevel, SystemSettings, ValidationError,
};
use serde::{Deserialize, Serialize};

/// Embedded-resource select used for order fetches and listings.
const ORDER_SELECT: &str =
	"*,customer:profiles(id,username),items:order_items(*,product:products(id,name))";

/// Order store backend against a hosted row-filtered REST service.
pub struct HttpStore {
	client: reqwest::Client,
	base_url: String,
	service_key: String,
}

#[derive(Debug, Deserialize)]
struct OrderRow {
	id: String,
	user_id: Option<String>,
	status: OrderStatus,
	created_at: DateTime<Utc>,
	updated_at: DateTime<Utc>,
}

impl From<OrderRow> for Order {
	fn from(row: OrderRow) -> Self {
		Order {
			id: row.id,
			owner_id: row.user_id,
			status: row.status,
			created_at: row.created_at,
			updated_at: row.updated_at,
		}
	}
}

#[derive(Debug, Serialize)]
struct OrderInsertRow<'a> {
	user_id: Option<&'a str>,
	status: OrderStatus,
}

#[derive(Debug, Deserialize)]
struct ItemRow {
	id: String,
	order_id: String,
	product_id: String,
	quantity: u32,
	size: Option<CupSize>,
	sugar_level: Option<SugarLevel>,
	notes: Option<String>,
	created_at: DateTime<Utc>,
}

impl From<ItemRow> for OrderItem {
	fn from(row: ItemRow) -> Self {
		OrderItem {
			id: row.id,
			order_id: row.order_id,
			product_id: row.product_id,
			quantity: row.quantity,
			size: row.size,
			sugar_level: row.sugar_level,
			notes: row.notes,
			created_at: row.created_at,
		}
	}
}

#[derive(Debug, Serialize)]
struct ItemInsertRow<'a> {
	order_id: &'a str,
	product_id: &'a str,
	quantity: u32,
	#[serde(skip_serializing_if = "Option::is_none")]
	size: Option<CupSize>,
	#[serde(skip_serializing_if = "Option::is_none")]
	sugar_level: Option<SugarLevel>,
	#[serde(skip_serializing_if = "Option::is_none")]
	notes: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ItemViewRow {
	#[serde(flatten)]
	item: ItemRow,
	product: Option<ProductSummary>,
}

#[derive(Debug, Deserialize)]
struct OrderViewRow {
	#[serde(flatten)]
	order: OrderRow,
	customer: Option<ProfileSummary>,
	#[serde(default)]
	items: Vec<ItemViewRow>,
}

impl From<OrderViewRow> for OrderView {
	fn from(row: OrderViewRow) -> Self {
		OrderView {
			order: row.order.into(),
			customer: row.customer,
			items: row
				.items
				.into_iter()
				.map(|item| OrderItemView {
					item: item.item.into(),
					product: item.product,
				})
				.collect(),
		}
	}
}

impl HttpStore {
	pub fn new(base_url: String, service_key: String) -> Self {
		let client = reqwest::Client::builder()
			.pool_idle_timeout(std::time::Duration::from_secs(90))
			.timeout(std::time::Duration::from_secs(30))
			.build()
			.unwrap_or_default();
		Self {
			client,
			base_url,
			service_key,
		}
	}

	fn table_url(&self, table: &str) -> String {
		format!("{}/rest/v1/{}", self.base_url, table)
	}

	fn request(&self, method: reqwest::Method, url: String) -> reqwest::RequestBuilder {
		self.client
			.request(method, url)
			.header("apikey", &self.service_key)
			.bearer_auth(&self.service_key)
	}

	/// Sends the request and deserializes a successful JSON body.
	async fn fetch_rows<T: serde::de::DeserializeOwned>(
		&self,
		request: reqwest::RequestBuilder,
	) -> Result<Vec<T>, StoreError> {
		let response = request
			.send()
			.await
			.map_err(|e| StoreError::Backend(e.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(StoreError::Backend(format!(
				"store returned {}: {}",
				status, body
			)));
		}

		response
			.json()
			.await
			.map_err(|e| StoreError::Serialization(e.to_string()))
	}

	fn status_set(statuses: &[OrderStatus]) -> String {
		let names: Vec<&str> = statuses.iter().map(OrderStatus::as_str).collect();
		format!("in.({})", names.join(","))
	}
}

#[async_trait]
impl StoreInterface for HttpStore {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpStoreSchema)
	}

	async fn insert_order(
		&self,
		owner_id: Option<&str>,
		status: OrderStatus,
	) -> Result<Order, StoreError> {
		let request = self
			.request(reqwest::Method::POST, self.table_url("orders"))
			.header("Prefer", "return=representation")
			.json(&[OrderInsertRow {
				user_id: owner_id,
				status,
			}]);

		let mut rows: Vec<OrderRow> = self.fetch_rows(request).await?;
		rows.pop()
			.map(Order::from)
			.ok_or_else(|| StoreError::Backend("insert returned no row".to_string()))
	}

	async fn insert_order_items(
		&self,
		items: &[NewOrderItem],
	) -> Result<Vec<OrderItem>, StoreError> {
		let payload: Vec<ItemInsertRow<'_>> = items
			.iter()
			.map(|item| ItemInsertRow {
				order_id: &item.order_id,
				product_id: &item.product_id,
				quantity: item.quantity,
				size: item.size,
				sugar_level: item.sugar_level,
				notes: item.notes.as_deref(),
			})
			.collect();

		let request = self
			.request(reqwest::Method::POST, self.table_url("order_items"))
			.header("Prefer", "return=representation")
			.json(&payload);

		let rows: Vec<ItemRow> = self.fetch_rows(request).await?;
		Ok(rows.into_iter().map(OrderItem::from).collect())
	}

	async fn delete_order(&self, id: &str) -> Result<(), StoreError> {
		let request = self
			.request(reqwest::Method::DELETE, self.table_url("orders"))
			.query(&[("id", format!("eq.{}", id))]);

		let response = request
			.send()
			.await
			.map_err(|e| StoreError::Backend(e.to_string()))?;
		if !response.status().is_success() {
			return Err(StoreError::Backend(format!(
				"delete returned {}",
				response.status()
			)));
		}
		Ok(())
	}

	async fn update_order_status(
		&self,
		id: &str,
		allowed_from: &[OrderStatus],
		new_status: OrderStatus,
		updated_at: DateTime<Utc>,
	) -> Result<Order, StoreError> {
		// Single filtered PATCH: the row filter carries the expected source
		// statuses, so the store applies match and write atomically.
		let request = self
			.request(reqwest::Method::PATCH, self.table_url("orders"))
			.query(&[
				("id", format!("eq.{}", id)),
				("status", Self::status_set(allowed_from)),
			])
			.header("Prefer", "return=representation")
			.json(&serde_json::json!({
				"status": new_status,
				"updated_at": updated_at,
			}));

		let mut rows: Vec<OrderRow> = self.fetch_rows(request).await?;
		// Zero rows matched: unknown id, or a concurrent writer got there first.
		rows.pop().map(Order::from).ok_or(StoreError::NotFound)
	}

	async fn get_order(&self, id: &str) -> Result<OrderView, StoreError> {
		let request = self
			.request(reqwest::Method::GET, self.table_url("orders"))
			.query(&[("id", format!("eq.{}", id)), ("select", ORDER_SELECT.into())]);

		let mut rows: Vec<OrderViewRow> = self.fetch_rows(request).await?;
		rows.pop().map(OrderView::from).ok_or(StoreError::NotFound)
	}

	async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<OrderView>, StoreError> {
		let mut query: Vec<(&str, String)> = vec![("select", ORDER_SELECT.to_string())];
		if !filter.statuses.is_empty() {
			query.push(("status", Self::status_set(&filter.statuses)));
		}
		if let Some(owner) = &filter.owner_id {
			query.push(("user_id", format!("eq.{}", owner)));
		}
		query.push((
			"order",
			match filter.sort {
				SortOrder::OldestFirst => "created_at.asc".to_string(),
				SortOrder::NewestFirst => "created_at.desc".to_string(),
			},
		));

		let request = self
			.request(reqwest::Method::GET, self.table_url("orders"))
			.query(&query);

		let rows: Vec<OrderViewRow> = self.fetch_rows(request).await?;
		Ok(rows.into_iter().map(OrderView::from).collect())
	}

	async fn get_product(&self, id: &str) -> Result<Product, StoreError> {
		let request = self
			.request(reqwest::Method::GET, self.table_url("products"))
			.query(&[("id", format!("eq.{}", id))]);

		let mut rows: Vec<Product> = self.fetch_rows(request).await?;
		rows.pop().ok_or(StoreError::NotFound)
	}

	async fn get_profile(&self, user_id: &str) -> Result<Profile, StoreError> {
		let request = self
			.request(reqwest::Method::GET, self.table_url("profiles"))
			.query(&[("id", format!("eq.{}", user_id))]);

		let mut rows: Vec<Profile> = self.fetch_rows(request).await?;
		rows.pop().ok_or(StoreError::NotFound)
	}

	async fn insert_profile(&self, profile: &Profile) -> Result<(), StoreError> {
		let request = self
			.request(reqwest::Method::POST, self.table_url("profiles"))
			.json(&[profile]);

		let response = request
			.send()
			.await
			.map_err(|e| StoreError::Backend(e.to_string()))?;
		if !response.status().is_success() {
			let status = response.status();
			let body = response.text().await.unwrap_or_default();
			return Err(StoreError::Backend(format!(
				"profile insert returned {}: {}",
				status, body
			)));
		}
		Ok(())
	}

	async fn get_settings(&self) -> Result<SystemSettings, StoreError> {
		// Single-row table, fixed id 1.
		let request = self
			.request(reqwest::Method::GET, self.table_url("system_settings"))
			.query(&[("id", "eq.1")]);

		let mut rows: Vec<SystemSettings> = self.fetch_rows(request).await?;
		rows.pop().ok_or(StoreError::NotFound)
	}

	async fn update_settings(
		&self,
		is_ordering_active: bool,
		updated_at: DateTime<Utc>,
	) -> Result<SystemSettings, StoreError> {
		let request = self
			.request(reqwest::Method::PATCH, self.table_url("system_settings"))
			.query(&[("id", "eq.1")])
			.header("Prefer", "return=representation")
			.json(&serde_json::json!({
				"is_ordering_active": is_ordering_active,
				"updated_at": updated_at,
			}));

		let mut rows: Vec<SystemSettings> = self.fetch_rows(request).await?;
		rows.pop().ok_or(StoreError::NotFound)
	}
}

/// Configuration schema for HttpStore.
pub struct HttpStoreSchema;

impl ConfigSchema for HttpStoreSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![
				Field::new("url", FieldType::String),
				Field::new("service_key", FieldType::String),
			],
			vec![],
		);
		schema.validate(config)
	}
}

/// Factory function to create an HTTP store backend from configuration.
///
/// Configuration parameters:
/// - `url`: base URL of the hosted store
/// - `service_key`: key with row-level-security bypass for server-side writes
pub fn create_store(config: &toml::Value) -> Result<Box<dyn StoreInterface>, StoreError> {
	HttpStoreSchema
		.validate(config)
		.map_err(|e| StoreError::Configuration(e.to_string()))?;

	let get = |key: &str| -> Result<String, StoreError> {
		config
			.get(key)
			.and_then(|v| v.as_str())
			.map(str::to_string)
			.ok_or_else(|| StoreError::Configuration(format!("missing '{}'", key)))
	};

	Ok(Box::new(HttpStore::new(
		get("url")?.trim_end_matches('/').to_string(),
		get("service_key")?,
	)))
}

/// Registry for the HTTP store implementation.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = crate::StoreFactory;

	fn factory() -> Self::Factory {
		create_store
	}
}

impl crate::StoreRegistry for Registry {}
