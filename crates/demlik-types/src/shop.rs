//! Shop-level types: products, profiles, roles, and the system switch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of an authenticated identity.
///
/// Roles are a closed set with explicit predicates; there is no hierarchy
/// between them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	/// Places orders, sees only their own.
	Customer,
	/// Runs a shop: works the dashboard and advances orders.
	Owner,
	/// Everything an owner can, plus the system switch and registration.
	Admin,
}

impl Role {
	/// Whether this role may advance or cancel orders and read the
	/// full dashboard feed.
	pub fn can_manage_orders(&self) -> bool {
		matches!(self, Role::Owner | Role::Admin)
	}

	/// Whether this role may toggle the ordering switch.
	pub fn is_admin(&self) -> bool {
		matches!(self, Role::Admin)
	}
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Role::Customer => write!(f, "customer"),
			Role::Owner => write!(f, "owner"),
			Role::Admin => write!(f, "admin"),
		}
	}
}

impl FromStr for Role {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"customer" => Ok(Self::Customer),
			"owner" => Ok(Self::Owner),
			"admin" => Ok(Self::Admin),
			_ => Err(()),
		}
	}
}

/// Maps an authenticated identity to its role and display data.
///
/// The profile id equals the identity provider's user id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
	/// Identity provider user id.
	pub id: String,
	/// Display name.
	pub username: String,
	/// Shop name, only meaningful for owners.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub shop_name: Option<String>,
	/// Role of this identity.
	pub role: Role,
	/// Timestamp when this profile was created.
	pub created_at: DateTime<Utc>,
	/// Timestamp when this profile was last updated.
	pub updated_at: DateTime<Utc>,
}

/// Profile display data nested in order views.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSummary {
	pub id: String,
	pub username: String,
}

impl From<&Profile> for ProfileSummary {
	fn from(profile: &Profile) -> Self {
		Self {
			id: profile.id.clone(),
			username: profile.username.clone(),
		}
	}
}

/// A sellable item. Read-only from the core's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
	/// Unique identifier for this product.
	pub id: String,
	/// Display name, e.g. "Tea" or "Turkish Coffee".
	pub name: String,
	/// Timestamp when this product was created.
	pub created_at: DateTime<Utc>,
}

/// Single-row process-wide switch: whether ordering is currently open.
///
/// The switch has no transactional interaction with orders; it is read
/// and toggled independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSettings {
	/// Whether customers may currently place orders.
	pub is_ordering_active: bool,
	/// Timestamp of the last toggle.
	pub updated_at: DateTime<Utc>,
}
