use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use recirca_model::{
    CompleteRequestPayload, CreateRequestPayload, Identity, PickupRequest,
    RequestId,
};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::AppState;

/// `POST /requests` - submit a new pickup request.
pub async fn create_request_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<CreateRequestPayload>,
) -> AppResult<impl IntoResponse> {
    let request = state.engine.submit(identity, payload).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// `GET /requests/pending` - the collector snapshot, fetched on every
/// (re)connect to resynchronize the candidate list.
pub async fn pending_requests_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<Vec<PickupRequest>>> {
    if !identity.is_collector() {
        return Err(AppError::forbidden(
            "the pending snapshot is for collectors",
        ));
    }
    Ok(Json(state.engine.pending_snapshot().await?))
}

/// `GET /requests/active` - the requester's own non-terminal request.
pub async fn active_request_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<Option<PickupRequest>>> {
    Ok(Json(
        state.engine.active_for_requester(identity.user_id).await?,
    ))
}

/// `GET /requests/{id}`
pub async fn get_request_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PickupRequest>> {
    let request = state.engine.fetch(identity, RequestId(id)).await?;
    Ok(Json(request))
}

/// `POST /requests/{id}/claim` - 200 with the claimed request on win,
/// 409 on a lost race or wrong state.
pub async fn claim_request_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PickupRequest>> {
    let request = state.engine.claim(identity, RequestId(id)).await?;
    Ok(Json(request))
}

/// `POST /requests/{id}/cancel`
pub async fn cancel_request_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PickupRequest>> {
    let request = state.engine.cancel(identity, RequestId(id)).await?;
    Ok(Json(request))
}

/// `POST /requests/{id}/complete` - the body may be `{}` when no weighing
/// happened at handover.
pub async fn complete_request_handler(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CompleteRequestPayload>,
) -> AppResult<Json<PickupRequest>> {
    let collected_kg = payload.collected_kg;
    let request = state
        .engine
        .complete(identity, RequestId(id), collected_kg)
        .await?;
    Ok(Json(request))
}

/// `GET /healthcheck` - liveness probe for the deployment platform.
pub async fn healthcheck_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
