//! Core engine for the demlik order system.
//!
//! This crate owns the order lifecycle state machine and the order
//! submission pipeline. It validates every requested status transition
//! against the transition table and the caller's role, and performs the
//! transition as a single conditional write against the order store; it
//! validates carts and creates order headers with their line items,
//! compensating with a best-effort header delete when item insertion
//! fails. Authentication, persistence, and change push are delegated to
//! the identity, store, and notify crates.

pub mod engine;

use demlik_types::{ApiError, OrderStatus};
use thiserror::Error;

pub use engine::{RegisterRequest, ShopEngine};

/// Errors returned by the core operations.
///
/// Every failure is surfaced as one of these; the core never retries
/// internally, and only the compensation path in `submit` performs a side
/// effect after an error.
#[derive(Debug, Error)]
pub enum CoreError {
	/// The credential did not resolve to an identity.
	#[error("Unauthorized: {0}")]
	Unauthorized(String),
	/// The identity exists but may not perform this operation.
	#[error("Forbidden: {0}")]
	Forbidden(String),
	/// A referenced record is absent, or a conditional update matched
	/// zero rows because a concurrent caller got there first.
	#[error("Not found: {0}")]
	NotFound(String),
	/// The requested status is not reachable from the current status.
	#[error("Invalid transition from {from} to {to}")]
	InvalidTransition { from: OrderStatus, to: OrderStatus },
	/// Malformed input, e.g. an empty cart.
	#[error("Invalid request: {0}")]
	InvalidRequest(String),
	/// An external store or identity call failed.
	#[error("Persistence error: {0}")]
	Persistence(String),
}

impl From<CoreError> for ApiError {
	fn from(err: CoreError) -> Self {
		match err {
			CoreError::Unauthorized(message) => ApiError::Unauthorized { message },
			CoreError::Forbidden(message) => ApiError::Forbidden { message },
			CoreError::NotFound(message) => ApiError::NotFound { message },
			CoreError::InvalidTransition { .. } => ApiError::Conflict {
				error_type: "invalid_transition".to_string(),
				message: err.to_string(),
			},
			CoreError::InvalidRequest(message) => ApiError::BadRequest {
				error_type: "invalid_request".to_string(),
				message,
				details: None,
			},
			CoreError::Persistence(message) => ApiError::InternalServerError {
				error_type: "persistence".to_string(),
				message,
			},
		}
	}
}
