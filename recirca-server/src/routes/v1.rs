use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{
    auth,
    handlers::request_handlers::{
        active_request_handler, cancel_request_handler,
        claim_request_handler, complete_request_handler,
        create_request_handler, get_request_handler, healthcheck_handler,
        pending_requests_handler,
    },
    ws, AppState,
};

/// Create all v1 API routes
pub fn create_v1_router(state: AppState) -> Router<AppState> {
    Router::new()
        // Public liveness endpoint
        .route("/healthcheck", get(healthcheck_handler))
        // Merge protected routes
        .merge(create_protected_routes(state))
}

/// Create protected routes that require authentication
fn create_protected_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Request lifecycle endpoints
        .route("/requests", post(create_request_handler))
        .route("/requests/pending", get(pending_requests_handler))
        .route("/requests/active", get(active_request_handler))
        .route("/requests/{id}", get(get_request_handler))
        .route("/requests/{id}/claim", post(claim_request_handler))
        .route("/requests/{id}/cancel", post(cancel_request_handler))
        .route("/requests/{id}/complete", post(complete_request_handler))
        // Dispatch channel
        .route(
            "/ws",
            axum::routing::any(ws::handler::websocket_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::auth_middleware,
        ))
}
