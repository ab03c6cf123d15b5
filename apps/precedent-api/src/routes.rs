use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use precedent_service::{
	AddTagRequest, CacheStats, Cancellation, CreateRecordRequest, Error, FindSimilarRequest,
	FindSimilarResponse, Record, UpdateTextRequest,
};

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/records", post(create_record))
		.route("/v1/records/similar", post(find_similar))
		.route(
			"/v1/records/{record_id}",
			get(get_record).delete(delete_record).patch(update_record_text),
		)
		.route("/v1/records/{record_id}/tags", post(add_tag))
		.route("/v1/cache/stats", get(cache_stats))
		.route("/v1/cache/clear", post(clear_cache))
		.with_state(state)
}

#[derive(Debug, Deserialize)]
struct TenantQuery {
	tenant_id: String,
}

#[derive(Debug, Deserialize)]
struct AddTagBody {
	tenant_id: String,
	tag: String,
}

#[derive(Debug, Deserialize)]
struct UpdateTextBody {
	tenant_id: String,
	title: Option<String>,
	body: Option<String>,
	#[serde(default)]
	reembed: bool,
}

/// Cancels the token when the handler future is dropped, which is what axum does once the client
/// goes away.
struct CancelOnDrop(Cancellation);
impl Drop for CancelOnDrop {
	fn drop(&mut self) {
		self.0.cancel();
	}
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn create_record(
	State(state): State<AppState>,
	Json(payload): Json<CreateRecordRequest>,
) -> Result<(StatusCode, Json<Record>), ApiError> {
	let record = state.service.create(payload).await?;

	Ok((StatusCode::CREATED, Json(record)))
}

async fn get_record(
	State(state): State<AppState>,
	Path(record_id): Path<Uuid>,
	Query(query): Query<TenantQuery>,
) -> Result<Json<Record>, ApiError> {
	let record = state.service.get_by_id(&query.tenant_id, record_id).await?;

	Ok(Json(record))
}

async fn delete_record(
	State(state): State<AppState>,
	Path(record_id): Path<Uuid>,
	Query(query): Query<TenantQuery>,
) -> Result<StatusCode, ApiError> {
	state.service.delete(&query.tenant_id, record_id).await?;

	Ok(StatusCode::NO_CONTENT)
}

async fn update_record_text(
	State(state): State<AppState>,
	Path(record_id): Path<Uuid>,
	Json(payload): Json<UpdateTextBody>,
) -> Result<Json<Record>, ApiError> {
	let record = state
		.service
		.update_text(UpdateTextRequest {
			tenant_id: payload.tenant_id,
			record_id,
			title: payload.title,
			body: payload.body,
			reembed: payload.reembed,
		})
		.await?;

	Ok(Json(record))
}

async fn add_tag(
	State(state): State<AppState>,
	Path(record_id): Path<Uuid>,
	Json(payload): Json<AddTagBody>,
) -> Result<Json<Record>, ApiError> {
	let record = state
		.service
		.add_tag(AddTagRequest { tenant_id: payload.tenant_id, record_id, tag: payload.tag })
		.await?;

	Ok(Json(record))
}

async fn find_similar(
	State(state): State<AppState>,
	Json(payload): Json<FindSimilarRequest>,
) -> Result<Json<FindSimilarResponse>, ApiError> {
	let guard = CancelOnDrop(Cancellation::new());
	let response = state.service.find_similar(payload, &guard.0).await?;

	Ok(Json(response))
}

async fn cache_stats(State(state): State<AppState>) -> Json<Option<CacheStats>> {
	Json(state.service.engine.query_cache().map(|cache| cache.stats()))
}

async fn clear_cache(State(state): State<AppState>) -> StatusCode {
	if let Some(cache) = state.service.engine.query_cache() {
		cache.clear();
	}

	StatusCode::NO_CONTENT
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: &'static str,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: &'static str,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: &'static str, message: impl Into<String>) -> Self {
		Self { status, error_code, message: message.into() }
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::Validation { message } =>
				Self::new(StatusCode::BAD_REQUEST, "INVALID_REQUEST", message),
			Error::NotFound { message } => Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message),
			Error::RateLimitExceeded { message, .. } =>
				Self::new(StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED", message),
			Error::Provider { message } => {
				tracing::warn!(error = %message, "Embedding provider failed.");

				Self::new(StatusCode::BAD_GATEWAY, "PROVIDER_ERROR", message)
			},
			Error::IndexUnavailable { message } => {
				tracing::warn!(error = %message, "Vector index unavailable.");

				Self::new(StatusCode::BAD_GATEWAY, "INDEX_UNAVAILABLE", message)
			},
			Error::Storage { message } => {
				tracing::error!(error = %message, "Storage request failed.");

				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR", "Storage error.")
			},
			Error::Cancelled =>
				Self::new(StatusCode::SERVICE_UNAVAILABLE, "CANCELLED", "Request was cancelled."),
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
