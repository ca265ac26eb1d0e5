//! API types for the demlik HTTP API.
//!
//! This module defines the error envelope shared by all HTTP endpoints,
//! with status-code mapping for the error taxonomy of the core.

use serde::{Deserialize, Serialize};
use std::fmt;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	/// Error type/code
	pub error: String,
	/// Human-readable description
	pub message: String,
	/// Additional error context
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<serde_json::Value>,
}

/// Structured API error type with appropriate HTTP status mapping.
#[derive(Debug)]
pub enum ApiError {
	/// Malformed input, e.g. an empty cart (400)
	BadRequest {
		error_type: String,
		message: String,
		details: Option<serde_json::Value>,
	},
	/// No or invalid credential (401)
	Unauthorized { message: String },
	/// Valid identity, insufficient role (403)
	Forbidden { message: String },
	/// Referenced record absent, or a conditional update matched zero rows (404)
	NotFound { message: String },
	/// Requested status not reachable from the current status (409)
	Conflict {
		error_type: String,
		message: String,
	},
	/// Internal server error (500)
	InternalServerError {
		error_type: String,
		message: String,
	},
}

impl ApiError {
	/// Get the HTTP status code for this error.
	pub fn status_code(&self) -> u16 {
		match self {
			ApiError::BadRequest { .. } => 400,
			ApiError::Unauthorized { .. } => 401,
			ApiError::Forbidden { .. } => 403,
			ApiError::NotFound { .. } => 404,
			ApiError::Conflict { .. } => 409,
			ApiError::InternalServerError { .. } => 500,
		}
	}

	/// Convert to ErrorResponse for JSON serialization.
	pub fn to_error_response(&self) -> ErrorResponse {
		match self {
			ApiError::BadRequest {
				error_type,
				message,
				details,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				details: details.clone(),
			},
			ApiError::Unauthorized { message } => ErrorResponse {
				error: "unauthorized".to_string(),
				message: message.clone(),
				details: None,
			},
			ApiError::Forbidden { message } => ErrorResponse {
				error: "forbidden".to_string(),
				message: message.clone(),
				details: None,
			},
			ApiError::NotFound { message } => ErrorResponse {
				error: "not_found".to_string(),
				message: message.clone(),
				details: None,
			},
			ApiError::Conflict {
				error_type,
				message,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				details: None,
			},
			ApiError::InternalServerError {
				error_type,
				message,
			} => ErrorResponse {
				error: error_type.clone(),
				message: message.clone(),
				details: None,
			},
		}
	}
}

impl fmt::Display for ApiError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ApiError::BadRequest { message, .. } => write!(f, "Bad Request: {}", message),
			ApiError::Unauthorized { message } => write!(f, "Unauthorized: {}", message),
			ApiError::Forbidden { message } => write!(f, "Forbidden: {}", message),
			ApiError::NotFound { message } => write!(f, "Not Found: {}", message),
			ApiError::Conflict { message, .. } => write!(f, "Conflict: {}", message),
			ApiError::InternalServerError { message, .. } => {
				write!(f, "Internal Server Error: {}", message)
			}
		}
	}
}

impl std::error::Error for ApiError {}

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ApiError {
	fn into_response(self) -> axum::response::Response {
		use axum::{http::StatusCode, response::Json};

		let status = StatusCode::from_u16(self.status_code())
			.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

		let error_response = self.to_error_response();
		(status, Json(error_response)).into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn status_codes_follow_the_taxonomy() {
		assert_eq!(
			ApiError::BadRequest {
				error_type: "invalid_request".into(),
				message: "empty cart".into(),
				details: None,
			}
			.status_code(),
			400
		);
		assert_eq!(
			ApiError::Unauthorized {
				message: "bad token".into()
			}
			.status_code(),
			401
		);
		assert_eq!(
			ApiError::Forbidden {
				message: "customers cannot do that".into()
			}
			.status_code(),
			403
		);
		assert_eq!(
			ApiError::NotFound {
				message: "no such order".into()
			}
			.status_code(),
			404
		);
	}

	#[test]
	fn error_response_keeps_the_message() {
		let err = ApiError::Conflict {
			error_type: "invalid_transition".into(),
			message: "delivered orders cannot change".into(),
		};
		let body = err.to_error_response();
		assert_eq!(body.error, "invalid_transition");
		assert_eq!(body.message, "delivered orders cannot change");
	}
}
