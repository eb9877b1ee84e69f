use axum::{
	Json, Router,
	extract::{Request, State},
	http::{StatusCode, header::AUTHORIZATION},
	middleware::{self, Next},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::Serialize;

use atlas_service::{
	AnswerRequest, AnswerResponse, AskRequest, AskResponse, MetricsResponse, SearchRequest,
	SearchResponse, ServiceError,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	let protected = Router::new()
		.route("/v1/answer", post(answer))
		.route("/v1/ask", post(ask))
		.route("/v1/search", post(search))
		.route("/v1/metrics", get(metrics))
		.route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

	Router::new().route("/health", get(health)).merge(protected).with_state(state)
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn answer(
	State(state): State<AppState>,
	Json(payload): Json<AnswerRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
	let response = state.service.answer(payload).await?;
	Ok(Json(response))
}

async fn ask(
	State(state): State<AppState>,
	Json(payload): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
	let response = state.service.ask(payload).await?;
	Ok(Json(response))
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
	let response = state.service.search(payload).await?;
	Ok(Json(response))
}

async fn metrics(State(state): State<AppState>) -> Result<Json<MetricsResponse>, ApiError> {
	let response = state.service.metrics().await?;
	Ok(Json(response))
}

/// Static bearer-token check, applied to every `/v1` route when a token is
/// configured. `/health` stays open for probes.
async fn require_auth(
	State(state): State<AppState>,
	req: Request,
	next: Next,
) -> Result<Response, ApiError> {
	if let Some(expected) = state.service.cfg.security.api_auth_token.as_deref() {
		let provided = req
			.headers()
			.get(AUTHORIZATION)
			.and_then(|value| value.to_str().ok())
			.and_then(|value| value.strip_prefix("Bearer "));

		if provided != Some(expected) {
			return Err(json_error(
				StatusCode::UNAUTHORIZED,
				"unauthorized",
				"Missing or invalid bearer token.",
			));
		}
	}

	Ok(next.run(req).await)
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}

pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError { status, error_code: code.to_string(), message: message.into() }
}

impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		match &err {
			ServiceError::InvalidRequest { .. } =>
				json_error(StatusCode::UNPROCESSABLE_ENTITY, "invalid_request", err.to_string()),
			ServiceError::Provider { .. } =>
				json_error(StatusCode::BAD_GATEWAY, "provider_error", err.to_string()),
			ServiceError::Storage { .. } =>
				json_error(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", err.to_string()),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
