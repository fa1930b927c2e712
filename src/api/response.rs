//! JSend response envelopes and the handler error type.

use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::object_store::ObjectStoreError;
use crate::storage::DatabaseError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JSendStatus {
    Error,
    Fail,
    Success,
}

/// `{"status": "success", "data": ...}`
#[derive(Debug, Serialize, Deserialize)]
pub struct JSend<T: Serialize> {
    pub data: T,
    pub status: JSendStatus,
}

impl<T: Serialize> JSend<T> {
    pub fn success(data: T) -> Json<JSend<T>> {
        Json(JSend {
            data,
            status: JSendStatus::Success,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedData<T: Serialize> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
    pub total: u64,
}

pub type JSendPaginated<T> = JSend<PaginatedData<T>>;

impl<T: Serialize> JSend<PaginatedData<T>> {
    pub fn paginated(items: Vec<T>, pagination: Pagination) -> Json<JSendPaginated<T>> {
        JSend::success(PaginatedData { items, pagination })
    }
}

/// Client errors (4xx): `{"status": "fail", "data": {"message": ...}}`
#[derive(Debug, Serialize, Deserialize)]
pub struct JSendFail {
    pub data: FailData,
    pub status: JSendStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FailData {
    pub message: String,
}

/// Server errors (5xx): `{"status": "error", "message": ...}`
#[derive(Debug, Serialize, Deserialize)]
pub struct JSendError {
    pub message: String,
    pub status: JSendStatus,
}

/// A JSend-compatible error that can be either a fail (4xx) or error (5xx).
#[derive(Debug)]
pub enum ApiError {
    Fail(StatusCode, String),
    Error(StatusCode, String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Fail(code, message) => (
                code,
                Json(JSendFail {
                    data: FailData { message },
                    status: JSendStatus::Fail,
                }),
            )
                .into_response(),
            ApiError::Error(code, message) => (
                code,
                Json(JSendError {
                    message,
                    status: JSendStatus::Error,
                }),
            )
                .into_response(),
        }
    }
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::BAD_REQUEST, message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::FORBIDDEN, message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::NOT_FOUND, message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::CONFLICT, message.into())
    }

    pub fn payload_too_large(message: impl Into<String>) -> Self {
        ApiError::Fail(StatusCode::PAYLOAD_TOO_LARGE, message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::Error(StatusCode::INTERNAL_SERVER_ERROR, message.into())
    }
}

impl From<DatabaseError> for ApiError {
    fn from(e: DatabaseError) -> Self {
        tracing::error!(error = %e, "Metadata store failure");
        ApiError::internal(e.to_string())
    }
}

impl From<ObjectStoreError> for ApiError {
    fn from(e: ObjectStoreError) -> Self {
        match e {
            ObjectStoreError::NotFound(_) => ApiError::not_found("File content not found"),
            ObjectStoreError::InvalidKey(_) => ApiError::forbidden("Access denied"),
            ObjectStoreError::Unsupported(msg) => ApiError::bad_request(msg),
            other => {
                tracing::error!(error = %other, "Storage provider failure");
                ApiError::internal(format!("Storage error: {other}"))
            }
        }
    }
}

// ============================================================================
// Custom extractors (reject with JSend-formatted ApiError)
// ============================================================================

/// Drop-in replacement for `axum::Json` that rejects with JSend errors.
pub struct AppJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, ApiError> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => {
                let message = match rejection {
                    JsonRejection::JsonDataError(err) => {
                        format!("Invalid request body: {}", err.body_text())
                    }
                    JsonRejection::JsonSyntaxError(_) => "Malformed JSON in request body".into(),
                    JsonRejection::MissingJsonContentType(_) => {
                        "Missing Content-Type: application/json header".into()
                    }
                    _ => "Failed to read request body".into(),
                };
                Err(ApiError::bad_request(message))
            }
        }
    }
}

/// Drop-in replacement for `axum::extract::Query` that rejects with JSend errors.
pub struct AppQuery<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, ApiError> {
        let query = parts.uri.query().unwrap_or_default();
        serde_qs::from_str(query)
            .map(AppQuery)
            .map_err(|e| ApiError::bad_request(friendly_query_error(&e.to_string())))
    }
}

/// Translate serde/serde_qs error messages into human-friendly descriptions.
fn friendly_query_error(raw: &str) -> String {
    let cleaned = raw
        .replace("u32", "non-negative integer")
        .replace("u64", "non-negative integer")
        .replace("i32", "integer")
        .replace("i64", "integer");

    format!("Invalid query parameter: {cleaned}")
}
