use axum::{
	Json, Router,
	extract::{Path, State},
	http::{HeaderMap, StatusCode},
	response::{IntoResponse, Response},
	routing::{delete, get, post},
};
use serde::Serialize;

use crate::state::AppState;
use sift_access::AccessContext;
use sift_domain::OwnedDocument;
use sift_service::{
	AskRequest, AskResponse, Error, IndexDocumentRequest, IndexDocumentResponse, MetricsSnapshot,
	SearchRequest, SearchResponse, UpdateAccessRequest,
};

pub const HEADER_USER_ID: &str = "x-user-id";
pub const HEADER_AGENT_ID: &str = "x-agent-id";
pub const HEADER_ROLE: &str = "x-role";
pub const HEADER_TEAM_IDS: &str = "x-team-ids";
pub const HEADER_DEPARTMENT: &str = "x-department";
pub const HEADER_SPACE_ID: &str = "x-space-id";
pub const HEADER_CHANNEL_ID: &str = "x-channel-id";

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/v1/search", post(search))
		.route("/v1/ask", post(ask))
		.route("/v1/metrics", get(metrics))
		.route("/v1/documents", post(index_document))
		.route("/v1/documents/mine", get(my_documents))
		.route("/v1/documents/access", post(update_document_access))
		.route("/v1/documents/{doc_id}", delete(delete_document))
		.with_state(state)
}

pub fn admin_router(state: AppState) -> Router {
	Router::new().route("/v1/admin/roles/reload", post(reload_roles)).with_state(state)
}

#[derive(Debug, Serialize)]
pub struct MyDocumentsResponse {
	pub space_id: Option<String>,
	pub documents: Vec<OwnedDocument>,
}

#[derive(Debug, Serialize)]
pub struct DocumentChangeResponse {
	pub doc_id: String,
	pub chunks: usize,
}

#[derive(Debug, Serialize)]
pub struct ReloadRolesResponse {
	pub roles: usize,
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn search(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
	let ctx = access_context(&state, &headers)?;
	let response = state.service.search(&ctx, payload).await?;

	Ok(Json(response))
}

async fn ask(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
	let ctx = access_context(&state, &headers)?;
	let response = state.service.ask(&ctx, payload).await?;

	Ok(Json(response))
}

async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
	Json(state.service.metrics.snapshot())
}

async fn index_document(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<IndexDocumentRequest>,
) -> Result<Json<IndexDocumentResponse>, ApiError> {
	let ctx = access_context(&state, &headers)?;
	let response = state.service.index_document(&ctx, payload).await?;

	Ok(Json(response))
}

async fn my_documents(
	State(state): State<AppState>,
	headers: HeaderMap,
) -> Result<Json<MyDocumentsResponse>, ApiError> {
	let ctx = access_context(&state, &headers)?;
	let documents = state.service.my_documents(&ctx).await?;

	Ok(Json(MyDocumentsResponse { space_id: ctx.space_id, documents }))
}

async fn update_document_access(
	State(state): State<AppState>,
	headers: HeaderMap,
	Json(payload): Json<UpdateAccessRequest>,
) -> Result<Json<DocumentChangeResponse>, ApiError> {
	let ctx = access_context(&state, &headers)?;
	let doc_id = payload.doc_id.clone();
	let chunks = state.service.update_document_access(&ctx, payload).await?;

	Ok(Json(DocumentChangeResponse { doc_id, chunks }))
}

async fn delete_document(
	State(state): State<AppState>,
	headers: HeaderMap,
	Path(doc_id): Path<String>,
) -> Result<Json<DocumentChangeResponse>, ApiError> {
	let ctx = access_context(&state, &headers)?;
	let chunks = state.service.delete_document(&ctx, &doc_id).await?;

	Ok(Json(DocumentChangeResponse { doc_id, chunks }))
}

async fn reload_roles(
	State(state): State<AppState>,
) -> Result<Json<ReloadRolesResponse>, ApiError> {
	let roles = state.service.reload_roles()?;

	Ok(Json(ReloadRolesResponse { roles }))
}

/// Builds the caller context from gateway headers. The role must match the identity kind.
fn access_context(state: &AppState, headers: &HeaderMap) -> Result<AccessContext, ApiError> {
	let Some(role) = read_header(headers, HEADER_ROLE) else {
		return Err(ApiError::invalid_request(format!("{HEADER_ROLE} header is required.")));
	};
	let Some(space_id) = read_header(headers, HEADER_SPACE_ID) else {
		return Err(ApiError::invalid_request(format!("{HEADER_SPACE_ID} header is required.")));
	};
	let registry = state.service.access.roles().snapshot();
	let ctx = if let Some(user_id) = read_header(headers, HEADER_USER_ID) {
		let teams = read_header(headers, HEADER_TEAM_IDS)
			.map(|raw| {
				raw.split(',')
					.map(str::trim)
					.filter(|team| !team.is_empty())
					.map(str::to_string)
					.collect::<Vec<_>>()
			})
			.unwrap_or_default();

		AccessContext::for_user(&registry, user_id, role, space_id)
			.map_err(Error::from)?
			.with_teams(teams)
	} else if let Some(agent_id) = read_header(headers, HEADER_AGENT_ID) {
		AccessContext::for_agent(&registry, agent_id, role, space_id).map_err(Error::from)?
	} else {
		return Err(ApiError::invalid_request(format!(
			"{HEADER_USER_ID} or {HEADER_AGENT_ID} header is required."
		)));
	};
	let mut ctx = match read_header(headers, HEADER_CHANNEL_ID) {
		Some(channel_id) => ctx.with_channel(channel_id),
		None => ctx,
	};

	if let Some(department) = read_header(headers, HEADER_DEPARTMENT) {
		ctx = ctx.with_department(department);
	}

	Ok(ctx)
}

fn read_header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
	let value = headers.get(name)?.to_str().ok()?.trim();

	if value.is_empty() { None } else { Some(value) }
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

	fn invalid_request(message: impl Into<String>) -> Self {
		Self::new(StatusCode::BAD_REQUEST, "invalid_request", message)
	}
}
impl From<Error> for ApiError {
	fn from(err: Error) -> Self {
		match err {
			Error::InvalidRequest { message } => Self::invalid_request(message),
			Error::Forbidden { message } => Self::new(StatusCode::FORBIDDEN, "forbidden", message),
			Error::NotFound { message } => Self::new(StatusCode::NOT_FOUND, "not_found", message),
			Error::Provider { message } => {
				tracing::error!(error = %message, "Provider call failed.");

				Self::new(StatusCode::BAD_GATEWAY, "provider_error", message)
			},
			Error::Storage { message } => {
				tracing::error!(error = %message, "Storage call failed.");

				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "storage_error", message)
			},
			Error::Config { message } =>
				Self::new(StatusCode::INTERNAL_SERVER_ERROR, "config_error", message),
		}
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}
