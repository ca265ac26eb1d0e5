//! Order types for the demlik system.
//!
//! This module defines the order record, its line items, cart input from
//! customers, and the order status state machine. The transition table here
//! is the single source of truth for which status changes are legal; the
//! store's conditional update enforces it against concurrent writers.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::shop::ProfileSummary;

/// Status of an order in the demlik system.
///
/// Orders start in `Pending` and only ever move forward through the
/// transition table, or sideways into `Cancelled`. `Delivered` and
/// `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
	/// Order has been submitted and is waiting to be picked up by the shop.
	Pending,
	/// Order has been accepted and is being prepared.
	Preparing,
	/// Order is prepared and waiting for handoff.
	Ready,
	/// Order has been handed to the customer. Terminal.
	Delivered,
	/// Order has been cancelled by the shop. Terminal.
	Cancelled,
}

// Each state maps to the set of states it may move into. Cancellation is
// allowed from every non-terminal state; preparing may skip ready.
static TRANSITIONS: Lazy<HashMap<OrderStatus, HashSet<OrderStatus>>> = Lazy::new(|| {
	let mut m = HashMap::new();
	m.insert(
		OrderStatus::Pending,
		HashSet::from([OrderStatus::Preparing, OrderStatus::Cancelled]),
	);
	m.insert(
		OrderStatus::Preparing,
		HashSet::from([
			OrderStatus::Ready,
			OrderStatus::Delivered,
			OrderStatus::Cancelled,
		]),
	);
	m.insert(
		OrderStatus::Ready,
		HashSet::from([OrderStatus::Delivered, OrderStatus::Cancelled]),
	);
	m.insert(OrderStatus::Delivered, HashSet::new()); // terminal
	m.insert(OrderStatus::Cancelled, HashSet::new()); // terminal
	m
});

impl OrderStatus {
	/// Statuses shown on the shop dashboard: everything still in flight.
	pub const ACTIVE: [OrderStatus; 3] = [
		OrderStatus::Pending,
		OrderStatus::Preparing,
		OrderStatus::Ready,
	];

	/// Checks whether moving from `self` into `to` is legal.
	pub fn can_transition_to(&self, to: OrderStatus) -> bool {
		TRANSITIONS
			.get(self)
			.is_some_and(|targets| targets.contains(&to))
	}

	/// Returns the statuses an order must currently be in for a transition
	/// into `target` to apply.
	///
	/// This is the match set for the store's conditional update: the write
	/// only succeeds while the stored status is still one of these, which is
	/// what makes the transition a compare-and-swap.
	pub fn allowed_sources(target: OrderStatus) -> Vec<OrderStatus> {
		TRANSITIONS
			.iter()
			.filter(|(_, targets)| targets.contains(&target))
			.map(|(from, _)| *from)
			.collect()
	}

	/// Returns true if no transition leaves this status.
	pub fn is_terminal(&self) -> bool {
		TRANSITIONS.get(self).is_none_or(|targets| targets.is_empty())
	}

	/// Returns an iterator over all status variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[
			Self::Pending,
			Self::Preparing,
			Self::Ready,
			Self::Delivered,
			Self::Cancelled,
		]
		.into_iter()
	}

	/// Returns the string representation used in storage and on the wire.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::Pending => "pending",
			OrderStatus::Preparing => "preparing",
			OrderStatus::Ready => "ready",
			OrderStatus::Delivered => "delivered",
			OrderStatus::Cancelled => "cancelled",
		}
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderStatus {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"pending" => Ok(Self::Pending),
			"preparing" => Ok(Self::Preparing),
			"ready" => Ok(Self::Ready),
			"delivered" => Ok(Self::Delivered),
			"cancelled" => Ok(Self::Cancelled),
			_ => Err(()),
		}
	}
}

/// Cup size for a drink line item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CupSize {
	Small,
	Large,
}

/// Sugar level for a drink line item.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SugarLevel {
	None,
	Low,
	Medium,
	High,
}

/// One customer transaction.
///
/// Orders are created by the submission pipeline in `Pending` and mutated
/// only through the lifecycle engine. They are never physically deleted
/// except as rollback of a failed submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
	/// Unique identifier for this order.
	pub id: String,
	/// Identity that submitted the order. Nullable: an order may outlive
	/// its submitting identity.
	pub owner_id: Option<String>,
	/// Current status of the order.
	pub status: OrderStatus,
	/// Timestamp when this order was created.
	pub created_at: DateTime<Utc>,
	/// Timestamp of the last status transition.
	pub updated_at: DateTime<Utc>,
}

/// One line within an order. Created once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
	/// Unique identifier for this line item.
	pub id: String,
	/// The owning order.
	pub order_id: String,
	/// The ordered product.
	pub product_id: String,
	/// Positive quantity.
	pub quantity: u32,
	/// Optional cup size.
	pub size: Option<CupSize>,
	/// Optional sugar level.
	pub sugar_level: Option<SugarLevel>,
	/// Optional free-text note for the shop.
	pub notes: Option<String>,
	/// Timestamp when this line was created.
	pub created_at: DateTime<Utc>,
}

/// One entry of a customer's cart, as submitted from the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
	/// The product being ordered.
	pub product_id: String,
	/// Positive quantity.
	pub quantity: u32,
	/// Optional cup size.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub size: Option<CupSize>,
	/// Optional sugar level.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub sugar_level: Option<SugarLevel>,
	/// Optional free-text note.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub notes: Option<String>,
}

/// Line-item insert payload for the order store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrderItem {
	pub order_id: String,
	pub product_id: String,
	pub quantity: u32,
	pub size: Option<CupSize>,
	pub sugar_level: Option<SugarLevel>,
	pub notes: Option<String>,
}

/// Sort direction for order listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
	/// Oldest first: the dashboard works the queue front to back.
	OldestFirst,
	/// Newest first: a customer's own history.
	NewestFirst,
}

/// Filter for order listings.
#[derive(Debug, Clone)]
pub struct OrderFilter {
	/// Only orders whose status is in this set. Empty means all statuses.
	pub statuses: Vec<OrderStatus>,
	/// Only orders owned by this identity.
	pub owner_id: Option<String>,
	/// Sort direction over `created_at`.
	pub sort: SortOrder,
}

impl OrderFilter {
	/// Orders still in flight, oldest first; the shop dashboard feed.
	pub fn active() -> Self {
		Self {
			statuses: OrderStatus::ACTIVE.to_vec(),
			owner_id: None,
			sort: SortOrder::OldestFirst,
		}
	}

	/// Every order owned by `owner_id`, newest first.
	pub fn for_owner(owner_id: impl Into<String>) -> Self {
		Self {
			statuses: Vec::new(),
			owner_id: Some(owner_id.into()),
			sort: SortOrder::NewestFirst,
		}
	}
}

/// A line item joined with its product's display data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItemView {
	#[serde(flatten)]
	pub item: OrderItem,
	/// Product summary, absent if the product row is gone.
	pub product: Option<ProductSummary>,
}

/// An order joined with its line items and the submitting profile,
/// as fetched for dashboards and customer history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderView {
	#[serde(flatten)]
	pub order: Order,
	/// Submitting profile summary, absent for unlinked orders.
	pub customer: Option<ProfileSummary>,
	/// The order's line items.
	pub items: Vec<OrderItemView>,
}

/// Product display data nested in order views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSummary {
	pub id: String,
	pub name: String,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn forward_transitions_are_legal() {
		use OrderStatus::*;
		assert!(Pending.can_transition_to(Preparing));
		assert!(Preparing.can_transition_to(Ready));
		assert!(Ready.can_transition_to(Delivered));
		// Direct skip of ready is permitted.
		assert!(Preparing.can_transition_to(Delivered));
	}

	#[test]
	fn cancellation_from_any_non_terminal_state() {
		use OrderStatus::*;
		for from in [Pending, Preparing, Ready] {
			assert!(from.can_transition_to(Cancelled), "{from} -> cancelled");
		}
		assert!(!Delivered.can_transition_to(Cancelled));
		assert!(!Cancelled.can_transition_to(Cancelled));
	}

	#[test]
	fn terminal_states_have_no_exits() {
		use OrderStatus::*;
		for to in OrderStatus::all() {
			assert!(!Delivered.can_transition_to(to), "delivered -> {to}");
			assert!(!Cancelled.can_transition_to(to), "cancelled -> {to}");
		}
		assert!(Delivered.is_terminal());
		assert!(Cancelled.is_terminal());
		assert!(!Pending.is_terminal());
	}

	#[test]
	fn no_backward_motion() {
		use OrderStatus::*;
		assert!(!Preparing.can_transition_to(Pending));
		assert!(!Ready.can_transition_to(Preparing));
		assert!(!Ready.can_transition_to(Pending));
		// Pending is never a target.
		assert!(OrderStatus::allowed_sources(Pending).is_empty());
	}

	#[test]
	fn allowed_sources_match_the_table() {
		use OrderStatus::*;
		let mut sources = OrderStatus::allowed_sources(Delivered);
		sources.sort_by_key(|s| s.as_str());
		assert_eq!(sources, vec![Preparing, Ready]);

		assert_eq!(OrderStatus::allowed_sources(Preparing), vec![Pending]);

		let mut sources = OrderStatus::allowed_sources(Cancelled);
		sources.sort_by_key(|s| s.as_str());
		assert_eq!(sources, vec![Pending, Preparing, Ready]);
	}

	#[test]
	fn status_round_trips_through_strings() {
		for status in OrderStatus::all() {
			assert_eq!(status.as_str().parse::<OrderStatus>(), Ok(status));
		}
		assert!("shipped".parse::<OrderStatus>().is_err());
	}
}
