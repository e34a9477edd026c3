//! HTTP request handlers

use super::types::{
    ActionRequest, ConversationResponse, DistrictEntry, DistrictsResponse, ErrorResponse,
    RegionsResponse,
};
use super::AppState;
use crate::runtime::{ActionOutcome, AvailabilityClient, PincodeValidator};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router<V, Q>(state: AppState<V, Q>) -> Router
where
    V: PincodeValidator + 'static,
    Q: AvailabilityClient + 'static,
{
    Router::new()
        // Chat actions
        .route("/api/conversations/:id/actions", post(post_action::<V, Q>))
        .route("/api/conversations/:id", get(get_conversation::<V, Q>))
        // Reference data
        .route("/api/regions", get(list_regions::<V, Q>))
        .route("/api/regions/:region", get(get_region::<V, Q>))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Conversations
// ============================================================

async fn post_action<V, Q>(
    State(state): State<AppState<V, Q>>,
    Path(conversation_id): Path<String>,
    Json(req): Json<ActionRequest>,
) -> Result<Json<ActionOutcome>, AppError>
where
    V: PincodeValidator + 'static,
    Q: AvailabilityClient + 'static,
{
    if req.text.trim().is_empty() {
        return Err(AppError::BadRequest("Message text is empty".to_string()));
    }

    let outcome = state
        .runtime
        .handle_input(&conversation_id, req.user_name, &req.text)
        .await;
    Ok(Json(outcome))
}

async fn get_conversation<V, Q>(
    State(state): State<AppState<V, Q>>,
    Path(conversation_id): Path<String>,
) -> Json<ConversationResponse>
where
    V: PincodeValidator + 'static,
    Q: AvailabilityClient + 'static,
{
    // No session means nothing in progress
    let session = state
        .runtime
        .sessions()
        .snapshot(&conversation_id)
        .await
        .unwrap_or_default();

    Json(ConversationResponse {
        conversation_id,
        state: session.state,
        session: session.data,
    })
}

// ============================================================
// Reference Data
// ============================================================

async fn list_regions<V, Q>(State(state): State<AppState<V, Q>>) -> Json<RegionsResponse>
where
    V: PincodeValidator + 'static,
    Q: AvailabilityClient + 'static,
{
    Json(RegionsResponse {
        regions: state.runtime.reference().region_names(),
    })
}

async fn get_region<V, Q>(
    State(state): State<AppState<V, Q>>,
    Path(region): Path<String>,
) -> Result<Json<DistrictsResponse>, AppError>
where
    V: PincodeValidator + 'static,
    Q: AvailabilityClient + 'static,
{
    let districts = state
        .runtime
        .reference()
        .districts(&region)
        .ok_or_else(|| AppError::NotFound(format!("Unknown region: {region}")))?
        .iter()
        .map(|(name, id)| DistrictEntry {
            name: name.clone(),
            id: *id,
        })
        .collect();

    Ok(Json(DistrictsResponse { region, districts }))
}

async fn get_version() -> &'static str {
    concat!("vaccine-slot-bot ", env!("CARGO_PKG_VERSION"))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    BadRequest(String),
    NotFound(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
