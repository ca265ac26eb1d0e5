//! Change notifier module for the demlik order system.
//!
//! Pushes table-level "something changed" signals to subscribed listeners.
//! Delivery is at-least-once and unordered relative to the writer, so
//! consumers must treat every signal purely as a prompt to re-fetch
//! authoritative state through the store, never as state itself. A lagged
//! subscriber that drops signals loses nothing it cannot recover with one
//! re-fetch.

use demlik_types::{ChangeEvent, ChangeKind, ChangeTable};
use tokio::sync::broadcast;

/// Default buffer size for the change feed channel.
const DEFAULT_CAPACITY: usize = 64;

/// In-process change feed.
///
/// Cheap to clone; all clones share one underlying channel. The core
/// publishes after every successful write, UI-facing consumers subscribe
/// and re-fetch.
#[derive(Clone)]
pub struct ChangeFeed {
	sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
	/// Creates a new change feed with the default buffer capacity.
	pub fn new() -> Self {
		Self::with_capacity(DEFAULT_CAPACITY)
	}

	/// Creates a new change feed buffering up to `capacity` undelivered
	/// signals per subscriber before older ones are dropped.
	pub fn with_capacity(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Publishes a change signal for one table.
	///
	/// Having no subscribers is not an error; the signal is simply dropped.
	pub fn publish(&self, table: ChangeTable, kind: ChangeKind) {
		let event = ChangeEvent::new(table, kind);
		match self.sender.send(event) {
			Ok(subscribers) => {
				tracing::debug!(%table, ?kind, subscribers, "published change signal");
			}
			Err(_) => {
				tracing::trace!(%table, ?kind, "no subscribers for change signal");
			}
		}
	}

	/// Subscribes to change signals.
	///
	/// The receiver reports lag instead of blocking the publisher when a
	/// subscriber falls behind.
	pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
		self.sender.subscribe()
	}
}

impl Default for ChangeFeed {
	fn default() -> Self {
		Self::new()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn subscribers_receive_published_signals() {
		let feed = ChangeFeed::new();
		let mut rx = feed.subscribe();

		feed.publish(ChangeTable::Orders, ChangeKind::Insert);
		feed.publish(ChangeTable::Orders, ChangeKind::Update);

		assert_eq!(
			rx.recv().await.unwrap(),
			ChangeEvent::new(ChangeTable::Orders, ChangeKind::Insert)
		);
		assert_eq!(
			rx.recv().await.unwrap(),
			ChangeEvent::new(ChangeTable::Orders, ChangeKind::Update)
		);
	}

	#[tokio::test]
	async fn publish_without_subscribers_is_silent() {
		let feed = ChangeFeed::new();
		// Must not panic or error.
		feed.publish(ChangeTable::SystemSettings, ChangeKind::Update);
	}

	#[tokio::test]
	async fn clones_share_one_channel() {
		let feed = ChangeFeed::new();
		let clone = feed.clone();
		let mut rx = feed.subscribe();

		clone.publish(ChangeTable::Orders, ChangeKind::Delete);
		assert_eq!(
			rx.recv().await.unwrap().kind,
			ChangeKind::Delete
		);
	}
}
