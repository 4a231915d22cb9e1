//! HTTP routes.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;

use slotcast_domain::{AvailableSlot, BookingRequest};

use crate::app::App;
use crate::infrastructure::ports::StoreError;
use crate::use_cases::BookingError;

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/", get(health))
        .route("/api/health", get(health))
        .route("/available-slots", get(get_available_slots))
        .route("/book", post(book_slot))
        .route("/broadcast", post(broadcast_slots))
}

async fn health() -> &'static str {
    "OK"
}

async fn get_available_slots(
    State(app): State<Arc<App>>,
) -> Result<Json<Vec<AvailableSlot>>, ApiError> {
    // The cache serves stale on store failure; an error here means there is
    // no snapshot at all, so the endpoint is genuinely unavailable.
    let snapshot = app
        .use_cases
        .availability
        .execute()
        .await
        .map_err(|e| ApiError::ServiceUnavailable(e.to_string()))?;
    Ok(Json((*snapshot).clone()))
}

async fn book_slot(
    State(app): State<Arc<App>>,
    Json(request): Json<BookingRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    app.use_cases.book.execute(request).await?;
    Ok(Json(json!({ "message": "Slot booked successfully!" })))
}

/// Manual fan-out trigger: pushes the posted slot rows to every subscriber
/// verbatim, for callers that pre-mutated store state themselves.
async fn broadcast_slots(
    State(app): State<Arc<App>>,
    Json(payload): Json<Vec<AvailableSlot>>,
) -> Json<serde_json::Value> {
    app.broadcast.publish_snapshot(&payload).await;
    Json(json!({ "message": "Slots broadcasted successfully" }))
}

/// HTTP-facing error with a distinguishable status per taxonomy entry.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Conflict(String),
    Timeout(String),
    StoreUnavailable(String),
    ServiceUnavailable(String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (axum::http::StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (axum::http::StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (axum::http::StatusCode::CONFLICT, msg),
            ApiError::Timeout(msg) => (axum::http::StatusCode::GATEWAY_TIMEOUT, msg),
            ApiError::StoreUnavailable(msg) => (axum::http::StatusCode::BAD_GATEWAY, msg),
            ApiError::ServiceUnavailable(msg) => {
                (axum::http::StatusCode::SERVICE_UNAVAILABLE, msg)
            }
        };
        (status, Json(json!({ "message": message }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Timeout => ApiError::Timeout(e.to_string()),
            StoreError::Database(_) => ApiError::StoreUnavailable(e.to_string()),
        }
    }
}

impl From<BookingError> for ApiError {
    fn from(e: BookingError) -> Self {
        match e {
            BookingError::Validation(msg) => ApiError::BadRequest(msg),
            BookingError::NotFound => ApiError::NotFound("Slot not found".to_string()),
            BookingError::AlreadyBooked => ApiError::Conflict("Slot already booked".to_string()),
            BookingError::Unknown => ApiError::Timeout(e.to_string()),
            BookingError::Store(store) => store.into(),
        }
    }
}
