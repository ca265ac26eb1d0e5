//! The shop engine: role-gated order lifecycle transitions and atomic
//! order submission.
//!
//! Every operation takes the caller's bearer credential explicitly; there
//! is no ambient session. Authorization resolves the credential through
//! the identity gateway and the role through the store's profile records.

use crate::CoreError;
use chrono::Utc;
use demlik_identity::{IdentityError, IdentityService};
use demlik_notify::ChangeFeed;
use demlik_store::{StoreError, StoreService};
use demlik_types::{
	CartItem, ChangeKind, ChangeTable, NewOrderItem, OrderFilter, OrderStatus, OrderView,
	Profile, Role, SystemSettings,
};
use std::sync::Arc;

/// Registration input: creates an identity plus its profile record.
#[derive(Debug, Clone)]
pub struct RegisterRequest {
	/// Login name, also used as the profile's display name.
	pub username: String,
	/// Password for the new identity.
	pub password: String,
	/// Role for the new profile.
	pub role: Role,
	/// Shop name; only stored for owners.
	pub shop_name: Option<String>,
}

/// Core engine coordinating identity, store, and change feed.
///
/// All shared mutable state lives in the external store; the engine itself
/// holds no locks and every operation is safe to run concurrently.
pub struct ShopEngine {
	identity: Arc<IdentityService>,
	store: Arc<StoreService>,
	feed: ChangeFeed,
}

impl ShopEngine {
	/// Creates a new engine over the given collaborators.
	pub fn new(identity: Arc<IdentityService>, store: Arc<StoreService>, feed: ChangeFeed) -> Self {
		Self {
			identity,
			store,
			feed,
		}
	}

	/// The change feed this engine publishes to.
	pub fn feed(&self) -> &ChangeFeed {
		&self.feed
	}

	/// Resolves a credential to a user id.
	async fn authenticate(&self, token: &str) -> Result<String, CoreError> {
		self.identity.verify_token(token).await.map_err(|e| match e {
			IdentityError::InvalidToken(msg) => CoreError::Unauthorized(msg),
			other => CoreError::Persistence(other.to_string()),
		})
	}

	/// Resolves a credential to its profile.
	///
	/// An identity without a profile record cannot act at all.
	async fn authenticated_profile(&self, token: &str) -> Result<Profile, CoreError> {
		let user_id = self.authenticate(token).await?;
		match self.store.get_profile(&user_id).await {
			Ok(profile) => Ok(profile),
			Err(StoreError::NotFound) => {
				Err(CoreError::Forbidden("no profile for this identity".into()))
			}
			Err(e) => Err(CoreError::Persistence(e.to_string())),
		}
	}

	/// Resolves a credential and requires a role that may manage orders.
	async fn require_staff(&self, token: &str) -> Result<Profile, CoreError> {
		let profile = self.authenticated_profile(token).await?;
		if !profile.role.can_manage_orders() {
			return Err(CoreError::Forbidden(
				"this operation requires an owner or admin role".into(),
			));
		}
		Ok(profile)
	}

	/// Moves an order into `target`, enforcing the transition table, the
	/// caller's role, and concurrency safety.
	///
	/// The write is a single conditional update matching the order id AND
	/// the expected source statuses for `target`. When two callers race to
	/// advance the same order, exactly one conditional update matches; the
	/// loser observes zero rows and gets `NotFound`, never a silent
	/// double-apply.
	pub async fn transition(
		&self,
		order_id: &str,
		token: &str,
		target: OrderStatus,
	) -> Result<OrderStatus, CoreError> {
		let profile = self.require_staff(token).await?;

		// Read only to shape the error: distinguishes a missing order from
		// an illegal transition. The write below never trusts this status.
		let current = match self.store.get_order(order_id).await {
			Ok(view) => view.order.status,
			Err(StoreError::NotFound) => {
				return Err(CoreError::NotFound(format!("order {} not found", order_id)))
			}
			Err(e) => return Err(CoreError::Persistence(e.to_string())),
		};
		if !current.can_transition_to(target) {
			return Err(CoreError::InvalidTransition {
				from: current,
				to: target,
			});
		}

		let allowed_from = OrderStatus::allowed_sources(target);
		let updated = match self
			.store
			.update_order_status(order_id, &allowed_from, target, Utc::now())
			.await
		{
			Ok(order) => order,
			Err(StoreError::NotFound) => {
				// Zero rows matched: a concurrent caller moved the order
				// between our read and the conditional write.
				return Err(CoreError::NotFound(
					"order not found or already processed".into(),
				));
			}
			Err(e) => return Err(CoreError::Persistence(e.to_string())),
		};

		tracing::info!(
			order_id,
			from = %current,
			to = %updated.status,
			role = %profile.role,
			"order transitioned"
		);
		self.feed.publish(ChangeTable::Orders, ChangeKind::Update);
		Ok(updated.status)
	}

	/// Validates a cart and atomically creates one order with its items.
	///
	/// On success exactly one `pending` header and `items.len()` line items
	/// exist. When item insertion fails the just-created header is deleted
	/// best-effort; a failed delete leaves an orphaned empty header behind
	/// and is logged, never hidden.
	pub async fn submit(&self, token: &str, items: &[CartItem]) -> Result<String, CoreError> {
		let user_id = self.authenticate(token).await?;

		if items.is_empty() {
			return Err(CoreError::InvalidRequest("cart is empty".into()));
		}
		for item in items {
			if item.quantity == 0 {
				return Err(CoreError::InvalidRequest(format!(
					"quantity for product {} must be positive",
					item.product_id
				)));
			}
			// Referential integrity at submission time: reject carts that
			// point at products the store does not know.
			match self.store.get_product(&item.product_id).await {
				Ok(_) => {}
				Err(StoreError::NotFound) => {
					return Err(CoreError::InvalidRequest(format!(
						"unknown product {}",
						item.product_id
					)))
				}
				Err(e) => return Err(CoreError::Persistence(e.to_string())),
			}
		}

		let order = self
			.store
			.insert_order(Some(&user_id), OrderStatus::Pending)
			.await
			.map_err(|e| CoreError::Persistence(format!("could not create order: {}", e)))?;

		let rows: Vec<NewOrderItem> = items
			.iter()
			.map(|item| NewOrderItem {
				order_id: order.id.clone(),
				product_id: item.product_id.clone(),
				quantity: item.quantity,
				size: item.size,
				sugar_level: item.sugar_level,
				notes: item.notes.clone(),
			})
			.collect();

		if let Err(items_err) = self.store.insert_order_items(&rows).await {
			// Best-effort rollback of the header; not a true transaction.
			if let Err(delete_err) = self.store.delete_order(&order.id).await {
				tracing::warn!(
					order_id = %order.id,
					%items_err,
					%delete_err,
					"item insert failed and header rollback also failed; orphaned header remains"
				);
			}
			return Err(CoreError::Persistence(format!(
				"could not create order items: {}",
				items_err
			)));
		}

		tracing::info!(order_id = %order.id, owner = %user_id, items = rows.len(), "order submitted");
		self.feed.publish(ChangeTable::Orders, ChangeKind::Insert);
		Ok(order.id)
	}

	/// The shop dashboard feed: orders still in flight, oldest first, with
	/// nested items, product names, and the submitting profile.
	pub async fn list_active_orders(&self, token: &str) -> Result<Vec<OrderView>, CoreError> {
		self.require_staff(token).await?;
		self.store
			.list_orders(&OrderFilter::active())
			.await
			.map_err(|e| CoreError::Persistence(e.to_string()))
	}

	/// A customer's own orders, newest first.
	pub async fn my_orders(&self, token: &str) -> Result<Vec<OrderView>, CoreError> {
		let user_id = self.authenticate(token).await?;
		self.store
			.list_orders(&OrderFilter::for_owner(user_id))
			.await
			.map_err(|e| CoreError::Persistence(e.to_string()))
	}

	/// Fetches one order. Staff may fetch any order; customers only their
	/// own.
	pub async fn get_order(&self, token: &str, order_id: &str) -> Result<OrderView, CoreError> {
		let profile = self.authenticated_profile(token).await?;

		let view = match self.store.get_order(order_id).await {
			Ok(view) => view,
			Err(StoreError::NotFound) => {
				return Err(CoreError::NotFound(format!("order {} not found", order_id)))
			}
			Err(e) => return Err(CoreError::Persistence(e.to_string())),
		};

		if !profile.role.can_manage_orders()
			&& view.order.owner_id.as_deref() != Some(profile.id.as_str())
		{
			return Err(CoreError::Forbidden("not your order".into()));
		}
		Ok(view)
	}

	/// Whether ordering is currently open. A missing settings row counts
	/// as open.
	pub async fn ordering_active(&self) -> Result<bool, CoreError> {
		match self.store.get_settings().await {
			Ok(settings) => Ok(settings.is_ordering_active),
			Err(StoreError::NotFound) => Ok(true),
			Err(e) => Err(CoreError::Persistence(e.to_string())),
		}
	}

	/// Flips the ordering switch. Admin only.
	pub async fn set_ordering_active(&self, token: &str) -> Result<SystemSettings, CoreError> {
		let profile = self.authenticated_profile(token).await?;
		if !profile.role.is_admin() {
			return Err(CoreError::Forbidden(
				"only admins may toggle ordering".into(),
			));
		}

		let current = match self.store.get_settings().await {
			Ok(settings) => settings,
			Err(StoreError::NotFound) => {
				return Err(CoreError::NotFound("system settings not found".into()))
			}
			Err(e) => return Err(CoreError::Persistence(e.to_string())),
		};

		let updated = self
			.store
			.update_settings(!current.is_ordering_active, Utc::now())
			.await
			.map_err(|e| CoreError::Persistence(e.to_string()))?;

		tracing::info!(active = updated.is_ordering_active, admin = %profile.id, "ordering switch toggled");
		self.feed
			.publish(ChangeTable::SystemSettings, ChangeKind::Update);
		Ok(updated)
	}

	/// Creates an identity plus its profile record and returns the new
	/// user id.
	///
	/// A profile-insert failure after the identity was created leaves an
	/// identity without a profile; such identities cannot act (see
	/// [`ShopEngine::authenticated_profile`]) and the failure is logged.
	pub async fn register(&self, request: RegisterRequest) -> Result<String, CoreError> {
		if request.username.is_empty() || request.password.is_empty() {
			return Err(CoreError::InvalidRequest(
				"username and password are required".into(),
			));
		}

		let user_id = match self
			.identity
			.create_user(&request.username, &request.password)
			.await
		{
			Ok(id) => id,
			Err(IdentityError::Duplicate(login)) => {
				return Err(CoreError::InvalidRequest(format!(
					"{} is already registered",
					login
				)))
			}
			Err(e) => return Err(CoreError::Persistence(e.to_string())),
		};

		let now = Utc::now();
		let profile = Profile {
			id: user_id.clone(),
			username: request.username,
			shop_name: match request.role {
				Role::Owner => request.shop_name,
				_ => None,
			},
			role: request.role,
			created_at: now,
			updated_at: now,
		};

		if let Err(e) = self.store.insert_profile(&profile).await {
			tracing::warn!(user_id = %user_id, %e, "profile insert failed after identity creation");
			return Err(CoreError::Persistence(format!(
				"could not create profile: {}",
				e
			)));
		}

		tracing::info!(user_id = %user_id, role = %profile.role, "registered");
		Ok(user_id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use async_trait::async_trait;
	use demlik_identity::implementations::memory::MemoryIdentity;
	use demlik_store::implementations::memory::MemoryStore;
	use demlik_store::StoreInterface;
	use demlik_types::{
		ConfigSchema, NewOrderItem, Order, OrderItem, Product, SortOrder, SystemSettings,
	};
	use chrono::{DateTime, Utc};

	const TOK_CUSTOMER: &str = "tok-customer";
	const TOK_OWNER: &str = "tok-owner";
	const TOK_ADMIN: &str = "tok-admin";

	fn profile(id: &str, username: &str, role: Role) -> Profile {
		let now = Utc::now();
		Profile {
			id: id.to_string(),
			username: username.to_string(),
			shop_name: None,
			role,
			created_at: now,
			updated_at: now,
		}
	}

	fn cart(product_id: &str, quantity: u32) -> CartItem {
		CartItem {
			product_id: product_id.to_string(),
			quantity,
			size: None,
			sugar_level: None,
			notes: None,
		}
	}

	async fn seeded_store() -> MemoryStore {
		let store = MemoryStore::new();
		store
			.upsert_product(Product {
				id: "p-tea".into(),
				name: "Tea".into(),
				created_at: Utc::now(),
			})
			.await;
		store
			.insert_profile(&profile("u-customer", "ayse", Role::Customer))
			.await
			.unwrap();
		store
			.insert_profile(&profile("u-owner", "mehmet", Role::Owner))
			.await
			.unwrap();
		store
			.insert_profile(&profile("u-admin", "deniz", Role::Admin))
			.await
			.unwrap();
		store.seed_settings(true).await;
		store
	}

	async fn seeded_identity() -> MemoryIdentity {
		let identity = MemoryIdentity::new();
		identity.issue_token(TOK_CUSTOMER, "u-customer").await;
		identity.issue_token(TOK_OWNER, "u-owner").await;
		identity.issue_token(TOK_ADMIN, "u-admin").await;
		identity
	}

	/// Engine over memory backends; the returned store shares state with
	/// the engine's, so tests can assert on stored rows directly.
	async fn engine() -> (ShopEngine, MemoryStore) {
		let store = seeded_store().await;
		let identity = seeded_identity().await;
		let engine = ShopEngine::new(
			Arc::new(IdentityService::new(Box::new(identity))),
			Arc::new(StoreService::new(Box::new(store.clone()))),
			ChangeFeed::new(),
		);
		(engine, store)
	}

	async fn order_in(store: &MemoryStore, status: OrderStatus) -> Order {
		store
			.insert_order(Some("u-customer"), status)
			.await
			.unwrap()
	}

	#[tokio::test]
	async fn valid_transitions_succeed_for_staff() {
		let (engine, store) = engine().await;

		for (from, to, token) in [
			(OrderStatus::Pending, OrderStatus::Preparing, TOK_OWNER),
			(OrderStatus::Preparing, OrderStatus::Ready, TOK_OWNER),
			(OrderStatus::Ready, OrderStatus::Delivered, TOK_ADMIN),
			(OrderStatus::Preparing, OrderStatus::Delivered, TOK_ADMIN),
			(OrderStatus::Pending, OrderStatus::Cancelled, TOK_OWNER),
			(OrderStatus::Ready, OrderStatus::Cancelled, TOK_ADMIN),
		] {
			let order = order_in(&store, from).await;
			let new_status = engine.transition(&order.id, token, to).await.unwrap();
			assert_eq!(new_status, to, "{from} -> {to}");
			let stored = store.get_order(&order.id).await.unwrap();
			assert_eq!(stored.order.status, to);
			assert!(stored.order.updated_at >= order.updated_at);
		}
	}

	#[tokio::test]
	async fn every_pair_outside_the_table_is_rejected() {
		let (engine, store) = engine().await;

		for from in OrderStatus::all() {
			for to in OrderStatus::all() {
				if from.can_transition_to(to) {
					continue;
				}
				for token in [TOK_OWNER, TOK_ADMIN] {
					let order = order_in(&store, from).await;
					let err = engine.transition(&order.id, token, to).await.unwrap_err();
					assert!(
						matches!(err, CoreError::InvalidTransition { .. }),
						"{from} -> {to} returned {err:?}"
					);
					// The stored status never moved.
					let stored = store.get_order(&order.id).await.unwrap();
					assert_eq!(stored.order.status, from);
				}
			}
		}
	}

	#[tokio::test]
	async fn customers_are_forbidden_for_every_pair() {
		let (engine, store) = engine().await;

		for from in OrderStatus::all() {
			for to in OrderStatus::all() {
				let order = order_in(&store, from).await;
				let err = engine
					.transition(&order.id, TOK_CUSTOMER, to)
					.await
					.unwrap_err();
				assert!(
					matches!(err, CoreError::Forbidden(_)),
					"{from} -> {to} returned {err:?}"
				);
			}
		}
	}

	#[tokio::test]
	async fn unknown_credentials_are_unauthorized() {
		let (engine, store) = engine().await;
		let order = order_in(&store, OrderStatus::Pending).await;

		let err = engine
			.transition(&order.id, "tok-nobody", OrderStatus::Preparing)
			.await
			.unwrap_err();
		assert!(matches!(err, CoreError::Unauthorized(_)));
	}

	#[tokio::test]
	async fn identity_without_profile_is_forbidden() {
		let store = seeded_store().await;
		let identity = seeded_identity().await;
		identity.issue_token("tok-ghost", "u-ghost").await;
		let engine = ShopEngine::new(
			Arc::new(IdentityService::new(Box::new(identity))),
			Arc::new(StoreService::new(Box::new(store.clone()))),
			ChangeFeed::new(),
		);

		let order = order_in(&store, OrderStatus::Pending).await;
		let err = engine
			.transition(&order.id, "tok-ghost", OrderStatus::Preparing)
			.await
			.unwrap_err();
		assert!(matches!(err, CoreError::Forbidden(_)));
	}

	#[tokio::test]
	async fn missing_order_is_not_found() {
		let (engine, _store) = engine().await;
		let err = engine
			.transition("no-such-order", TOK_OWNER, OrderStatus::Preparing)
			.await
			.unwrap_err();
		assert!(matches!(err, CoreError::NotFound(_)));
	}

	#[tokio::test]
	async fn racing_transitions_advance_exactly_once() {
		let (engine, store) = engine().await;
		let order = order_in(&store, OrderStatus::Pending).await;
		let engine = Arc::new(engine);

		let a = tokio::spawn({
			let engine = Arc::clone(&engine);
			let id = order.id.clone();
			async move { engine.transition(&id, TOK_OWNER, OrderStatus::Preparing).await }
		});
		let b = tokio::spawn({
			let engine = Arc::clone(&engine);
			let id = order.id.clone();
			async move { engine.transition(&id, TOK_OWNER, OrderStatus::Preparing).await }
		});

		let results = [a.await.unwrap(), b.await.unwrap()];
		let wins = results.iter().filter(|r| r.is_ok()).count();
		assert_eq!(wins, 1, "exactly one racer must win: {results:?}");
		let loser = results.iter().find(|r| r.is_err()).unwrap();
		assert!(matches!(
			loser.as_ref().unwrap_err(),
			CoreError::NotFound(_) | CoreError::InvalidTransition { .. }
		));

		let stored = store.get_order(&order.id).await.unwrap();
		assert_eq!(stored.order.status, OrderStatus::Preparing);
	}

	#[tokio::test]
	async fn terminal_orders_never_move_again() {
		let (engine, store) = engine().await;

		for terminal in [OrderStatus::Delivered, OrderStatus::Cancelled] {
			let order = order_in(&store, terminal).await;
			for to in OrderStatus::all() {
				let err = engine.transition(&order.id, TOK_ADMIN, to).await.unwrap_err();
				assert!(
					matches!(err, CoreError::InvalidTransition { .. }),
					"{terminal} -> {to} returned {err:?}"
				);
			}
			let stored = store.get_order(&order.id).await.unwrap();
			assert_eq!(stored.order.status, terminal);
		}
	}

	#[tokio::test]
	async fn empty_cart_is_rejected_without_writes() {
		let (engine, store) = engine().await;

		let err = engine.submit(TOK_CUSTOMER, &[]).await.unwrap_err();
		assert!(matches!(err, CoreError::InvalidRequest(_)));

		let all = store
			.list_orders(&OrderFilter {
				statuses: Vec::new(),
				owner_id: None,
				sort: SortOrder::NewestFirst,
			})
			.await
			.unwrap();
		assert!(all.is_empty());
	}

	#[tokio::test]
	async fn zero_quantity_is_rejected() {
		let (engine, _store) = engine().await;
		let err = engine
			.submit(TOK_CUSTOMER, &[cart("p-tea", 0)])
			.await
			.unwrap_err();
		assert!(matches!(err, CoreError::InvalidRequest(_)));
	}

	#[tokio::test]
	async fn unknown_product_is_rejected() {
		let (engine, _store) = engine().await;
		let err = engine
			.submit(TOK_CUSTOMER, &[cart("p-raki", 1)])
			.await
			.unwrap_err();
		assert!(matches!(err, CoreError::InvalidRequest(_)));
	}

	#[tokio::test]
	async fn submit_creates_one_pending_header_and_its_items() {
		let (engine, store) = engine().await;

		let order_id = engine
			.submit(TOK_CUSTOMER, &[cart("p-tea", 2)])
			.await
			.unwrap();

		let view = store.get_order(&order_id).await.unwrap();
		assert_eq!(view.order.status, OrderStatus::Pending);
		assert_eq!(view.order.owner_id.as_deref(), Some("u-customer"));
		assert_eq!(view.items.len(), 1);
		assert_eq!(view.items[0].item.quantity, 2);
		assert_eq!(view.items[0].product.as_ref().unwrap().name, "Tea");
	}

	#[tokio::test]
	async fn submit_without_credential_writes_nothing() {
		let (engine, store) = engine().await;
		let err = engine
			.submit("tok-nobody", &[cart("p-tea", 1)])
			.await
			.unwrap_err();
		assert!(matches!(err, CoreError::Unauthorized(_)));

		let active = store.list_orders(&OrderFilter::active()).await.unwrap();
		assert!(active.is_empty());
	}

	/// Store wrapper that fails every line-item insert, to force the
	/// compensation path.
	struct FailingItemsStore {
		inner: MemoryStore,
	}

	#[async_trait]
	impl StoreInterface for FailingItemsStore {
		fn config_schema(&self) -> Box<dyn ConfigSchema> {
			self.inner.config_schema()
		}

		async fn insert_order(
			&self,
			owner_id: Option<&str>,
			status: OrderStatus,
		) -> Result<Order, StoreError> {
			self.inner.insert_order(owner_id, status).await
		}

		async fn insert_order_items(
			&self,
			_items: &[NewOrderItem],
		) -> Result<Vec<OrderItem>, StoreError> {
			Err(StoreError::Backend("simulated item-insert failure".into()))
		}

		async fn delete_order(&self, id: &str) -> Result<(), StoreError> {
			self.inner.delete_order(id).await
		}

		async fn update_order_status(
			&self,
			id: &str,
			allowed_from: &[OrderStatus],
			new_status: OrderStatus,
			updated_at: DateTime<Utc>,
		) -> Result<Order, StoreError> {
			self.inner
				.update_order_status(id, allowed_from, new_status, updated_at)
				.await
		}

		async fn get_order(&self, id: &str) -> Result<demlik_types::OrderView, StoreError> {
			self.inner.get_order(id).await
		}

		async fn list_orders(
			&self,
			filter: &OrderFilter,
		) -> Result<Vec<demlik_types::OrderView>, StoreError> {
			self.inner.list_orders(filter).await
		}

		async fn get_product(&self, id: &str) -> Result<Product, StoreError> {
			self.inner.get_product(id).await
		}

		async fn get_profile(&self, user_id: &str) -> Result<Profile, StoreError> {
			self.inner.get_profile(user_id).await
		}

		async fn insert_profile(&self, profile: &Profile) -> Result<(), StoreError> {
			self.inner.insert_profile(profile).await
		}

		async fn get_settings(&self) -> Result<SystemSettings, StoreError> {
			self.inner.get_settings().await
		}

		async fn update_settings(
			&self,
			is_ordering_active: bool,
			updated_at: DateTime<Utc>,
		) -> Result<SystemSettings, StoreError> {
			self.inner.update_settings(is_ordering_active, updated_at).await
		}
	}

	#[tokio::test]
	async fn failed_item_insert_rolls_back_the_header() {
		let inner = seeded_store().await;
		let identity = seeded_identity().await;
		let engine = ShopEngine::new(
			Arc::new(IdentityService::new(Box::new(identity))),
			Arc::new(StoreService::new(Box::new(FailingItemsStore {
				inner: inner.clone(),
			}))),
			ChangeFeed::new(),
		);

		let err = engine
			.submit(TOK_CUSTOMER, &[cart("p-tea", 1)])
			.await
			.unwrap_err();
		assert!(matches!(err, CoreError::Persistence(_)));

		// The header created in that call no longer exists.
		let all = inner
			.list_orders(&OrderFilter {
				statuses: Vec::new(),
				owner_id: None,
				sort: SortOrder::NewestFirst,
			})
			.await
			.unwrap();
		assert!(all.is_empty());
	}

	#[tokio::test]
	async fn active_listing_excludes_terminal_orders() {
		let (engine, store) = engine().await;

		let kept = order_in(&store, OrderStatus::Pending).await;
		let delivered = order_in(&store, OrderStatus::Ready).await;
		let cancelled = order_in(&store, OrderStatus::Preparing).await;
		engine
			.transition(&delivered.id, TOK_OWNER, OrderStatus::Delivered)
			.await
			.unwrap();
		engine
			.transition(&cancelled.id, TOK_OWNER, OrderStatus::Cancelled)
			.await
			.unwrap();

		let active = engine.list_active_orders(TOK_OWNER).await.unwrap();
		assert_eq!(active.len(), 1);
		assert_eq!(active[0].order.id, kept.id);
		assert_eq!(active[0].customer.as_ref().unwrap().username, "ayse");
	}

	#[tokio::test]
	async fn dashboard_feed_requires_staff() {
		let (engine, _store) = engine().await;
		let err = engine.list_active_orders(TOK_CUSTOMER).await.unwrap_err();
		assert!(matches!(err, CoreError::Forbidden(_)));
	}

	#[tokio::test]
	async fn customers_see_only_their_own_orders() {
		let (engine, store) = engine().await;
		order_in(&store, OrderStatus::Pending).await; // owned by u-customer
		store.insert_order(Some("u-owner"), OrderStatus::Pending).await.unwrap();

		let mine = engine.my_orders(TOK_CUSTOMER).await.unwrap();
		assert_eq!(mine.len(), 1);
		assert_eq!(mine[0].order.owner_id.as_deref(), Some("u-customer"));
	}

	#[tokio::test]
	async fn customers_cannot_fetch_foreign_orders() {
		let (engine, store) = engine().await;
		let foreign = store
			.insert_order(Some("u-owner"), OrderStatus::Pending)
			.await
			.unwrap();

		let err = engine.get_order(TOK_CUSTOMER, &foreign.id).await.unwrap_err();
		assert!(matches!(err, CoreError::Forbidden(_)));

		// Staff can.
		assert!(engine.get_order(TOK_ADMIN, &foreign.id).await.is_ok());
	}

	#[tokio::test]
	async fn ordering_switch_defaults_to_open_and_toggles_for_admins() {
		let store = seeded_store().await;
		let bare = MemoryStore::new();
		bare.insert_profile(&profile("u-admin", "deniz", Role::Admin))
			.await
			.unwrap();
		let identity = seeded_identity().await;
		let engine_without_settings = ShopEngine::new(
			Arc::new(IdentityService::new(Box::new(seeded_identity().await))),
			Arc::new(StoreService::new(Box::new(bare))),
			ChangeFeed::new(),
		);
		// No settings row: reads fall back to open, toggling fails.
		assert!(engine_without_settings.ordering_active().await.unwrap());
		assert!(matches!(
			engine_without_settings.set_ordering_active(TOK_ADMIN).await,
			Err(CoreError::NotFound(_))
		));

		let engine = ShopEngine::new(
			Arc::new(IdentityService::new(Box::new(identity))),
			Arc::new(StoreService::new(Box::new(store))),
			ChangeFeed::new(),
		);
		assert!(engine.ordering_active().await.unwrap());

		let err = engine.set_ordering_active(TOK_OWNER).await.unwrap_err();
		assert!(matches!(err, CoreError::Forbidden(_)));

		let updated = engine.set_ordering_active(TOK_ADMIN).await.unwrap();
		assert!(!updated.is_ordering_active);
		assert!(!engine.ordering_active().await.unwrap());
	}

	#[tokio::test]
	async fn register_creates_identity_and_profile() {
		let (engine, store) = engine().await;

		let user_id = engine
			.register(RegisterRequest {
				username: "fatma".into(),
				password: "s3cret".into(),
				role: Role::Owner,
				shop_name: Some("Corner Teahouse".into()),
			})
			.await
			.unwrap();

		let stored = store.get_profile(&user_id).await.unwrap();
		assert_eq!(stored.username, "fatma");
		assert_eq!(stored.role, Role::Owner);
		assert_eq!(stored.shop_name.as_deref(), Some("Corner Teahouse"));

		// Shop name is dropped for non-owners.
		let customer_id = engine
			.register(RegisterRequest {
				username: "ali".into(),
				password: "s3cret".into(),
				role: Role::Customer,
				shop_name: Some("ignored".into()),
			})
			.await
			.unwrap();
		assert!(store.get_profile(&customer_id).await.unwrap().shop_name.is_none());
	}

	#[tokio::test]
	async fn register_rejects_duplicates_and_blank_input() {
		let (engine, _store) = engine().await;

		let request = RegisterRequest {
			username: "fatma".into(),
			password: "s3cret".into(),
			role: Role::Customer,
			shop_name: None,
		};
		engine.register(request.clone()).await.unwrap();
		let err = engine.register(request).await.unwrap_err();
		assert!(matches!(err, CoreError::InvalidRequest(_)));

		let err = engine
			.register(RegisterRequest {
				username: String::new(),
				password: "x".into(),
				role: Role::Customer,
				shop_name: None,
			})
			.await
			.unwrap_err();
		assert!(matches!(err, CoreError::InvalidRequest(_)));
	}

	#[tokio::test]
	async fn successful_writes_publish_change_signals() {
		let (engine, store) = engine().await;
		let mut rx = engine.feed().subscribe();

		engine.submit(TOK_CUSTOMER, &[cart("p-tea", 1)]).await.unwrap();
		assert_eq!(rx.recv().await.unwrap().kind, ChangeKind::Insert);

		let order = order_in(&store, OrderStatus::Pending).await;
		engine
			.transition(&order.id, TOK_OWNER, OrderStatus::Preparing)
			.await
			.unwrap();
		assert_eq!(rx.recv().await.unwrap().kind, ChangeKind::Update);
	}
}
