//! HTTP server for the demlik order API.
//!
//! Thin layer over the shop engine: handlers extract the bearer credential
//! and the request body, call one engine operation, and map `CoreError`
//! onto the shared error envelope. No authorization decisions live here.

use axum::{
	extract::{Path, State},
	http::{header, HeaderMap, StatusCode},
	response::Json,
	routing::{get, post},
	Router,
};
use demlik_config::ApiConfig;
use demlik_core::{RegisterRequest, ShopEngine};
use demlik_types::{ApiError, CartItem, OrderStatus, OrderView, Role, SystemSettings};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Reference to the shop engine for processing requests.
	pub engine: Arc<ShopEngine>,
}

/// Starts the HTTP server for the API.
pub async fn start_server(
	api_config: ApiConfig,
	engine: Arc<ShopEngine>,
) -> Result<(), Box<dyn std::error::Error>> {
	let app_state = AppState { engine };

	let app = router(app_state);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("demlik API server starting on {}", bind_address);

	axum::serve(listener, app).await?;

	Ok(())
}

/// Builds the application router under the /api base path.
fn router(app_state: AppState) -> Router {
	Router::new()
		.nest(
			"/api",
			Router::new()
				.route("/orders", post(handle_submit).get(handle_active_orders))
				.route("/orders/me", get(handle_my_orders))
				.route("/orders/{id}", get(handle_get_order))
				.route("/orders/{id}/status", post(handle_transition))
				.route("/system", get(handle_system_status))
				.route("/admin/system", post(handle_toggle_ordering))
				.route("/auth/register", post(handle_register)),
		)
		.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
		.with_state(app_state)
}

/// Extracts the bearer credential from the Authorization header.
fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
	let value = headers
		.get(header::AUTHORIZATION)
		.and_then(|v| v.to_str().ok())
		.ok_or_else(|| ApiError::Unauthorized {
			message: "missing Authorization header".to_string(),
		})?;
	value
		.strip_prefix("Bearer ")
		.filter(|token| !token.is_empty())
		.ok_or_else(|| ApiError::Unauthorized {
			message: "Authorization header must carry a bearer token".to_string(),
		})
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitOrderRequest {
	items: Vec<CartItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitOrderResponse {
	order_id: String,
}

/// Handles POST /api/orders requests: cart submission.
async fn handle_submit(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(request): Json<SubmitOrderRequest>,
) -> Result<(StatusCode, Json<SubmitOrderResponse>), ApiError> {
	let token = bearer_token(&headers)?;
	match state.engine.submit(token, &request.items).await {
		Ok(order_id) => Ok((StatusCode::CREATED, Json(SubmitOrderResponse { order_id }))),
		Err(e) => {
			tracing::warn!("Order submission failed: {}", e);
			Err(ApiError::from(e))
		}
	}
}

/// Handles GET /api/orders requests: the shop dashboard feed.
async fn handle_active_orders(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<Vec<OrderView>>, ApiError> {
	let token = bearer_token(&headers)?;
	state
		.engine
		.list_active_orders(token)
		.await
		.map(Json)
		.map_err(ApiError::from)
}

/// Handles GET /api/orders/me requests: the caller's own order history.
async fn handle_my_orders(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<Vec<OrderView>>, ApiError> {
	let token = bearer_token(&headers)?;
	state
		.engine
		.my_orders(token)
		.await
		.map(Json)
		.map_err(ApiError::from)
}

/// Handles GET /api/orders/{id} requests.
async fn handle_get_order(
	Path(id): Path<String>,
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<OrderView>, ApiError> {
	let token = bearer_token(&headers)?;
	state
		.engine
		.get_order(token, &id)
		.await
		.map(Json)
		.map_err(ApiError::from)
}

#[derive(Debug, Deserialize)]
struct TransitionRequest {
	status: OrderStatus,
}

#[derive(Debug, Serialize)]
struct TransitionResponse {
	status: OrderStatus,
}

/// Handles POST /api/orders/{id}/status requests: lifecycle transitions.
async fn handle_transition(
	Path(id): Path<String>,
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(request): Json<TransitionRequest>,
) -> Result<Json<TransitionResponse>, ApiError> {
	let token = bearer_token(&headers)?;
	match state.engine.transition(&id, token, request.status).await {
		Ok(status) => Ok(Json(TransitionResponse { status })),
		Err(e) => {
			tracing::warn!(order_id = %id, "Transition failed: {}", e);
			Err(ApiError::from(e))
		}
	}
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SystemStatusResponse {
	is_ordering_active: bool,
}

/// Handles GET /api/system requests: whether ordering is open.
async fn handle_system_status(
	State(state): State<AppState>,
) -> Result<Json<SystemStatusResponse>, ApiError> {
	state
		.engine
		.ordering_active()
		.await
		.map(|is_ordering_active| Json(SystemStatusResponse { is_ordering_active }))
		.map_err(ApiError::from)
}

/// Handles POST /api/admin/system requests: toggles the ordering switch.
async fn handle_toggle_ordering(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<SystemSettings>, ApiError> {
	let token = bearer_token(&headers)?;
	state
		.engine
		.set_ordering_active(token)
		.await
		.map(Json)
		.map_err(ApiError::from)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody {
	username: String,
	password: String,
	role: Role,
	shop_name: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterResponse {
	user_id: String,
}

/// Handles POST /api/auth/register requests.
async fn handle_register(
	State(state): State<AppState>,
	Json(body): Json<RegisterBody>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
	let request = RegisterRequest {
		username: body.username,
		password: body.password,
		role: body.role,
		shop_name: body.shop_name,
	};
	match state.engine.register(request).await {
		Ok(user_id) => Ok((StatusCode::CREATED, Json(RegisterResponse { user_id }))),
		Err(e) => {
			tracing::warn!("Registration failed: {}", e);
			Err(ApiError::from(e))
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn headers_with(value: &str) -> HeaderMap {
		let mut headers = HeaderMap::new();
		headers.insert(header::AUTHORIZATION, value.parse().unwrap());
		headers
	}

	#[test]
	fn bearer_token_strips_the_scheme() {
		let headers = headers_with("Bearer tok-1");
		assert_eq!(bearer_token(&headers).unwrap(), "tok-1");
	}

	#[test]
	fn bearer_token_rejects_missing_and_malformed_headers() {
		assert!(bearer_token(&HeaderMap::new()).is_err());
		assert!(bearer_token(&headers_with("Basic dXNlcjpwdw==")).is_err());
		assert!(bearer_token(&headers_with("Bearer ")).is_err());
	}
}
