//! Change-feed event types.
//!
//! The change notifier pushes table-level signals to subscribed listeners.
//! An event carries only which table changed and how; it never carries row
//! data. Consumers treat every event purely as a prompt to re-fetch
//! authoritative state through the store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Tables for which change signals are emitted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChangeTable {
	/// The orders table: submissions and status transitions.
	Orders,
	/// The single-row system settings record.
	SystemSettings,
}

impl fmt::Display for ChangeTable {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ChangeTable::Orders => write!(f, "orders"),
			ChangeTable::SystemSettings => write!(f, "system_settings"),
		}
	}
}

/// Kind of row-level change behind a signal.
///
/// Informational only; consumers must not branch on it to reconstruct
/// state, since delivery is at-least-once and may reorder.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
	Insert,
	Update,
	Delete,
}

/// A "something changed" signal for one table.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeEvent {
	/// The table that changed.
	pub table: ChangeTable,
	/// What kind of change occurred.
	pub kind: ChangeKind,
}

impl ChangeEvent {
	pub fn new(table: ChangeTable, kind: ChangeKind) -> Self {
		Self { table, kind }
	}
}
