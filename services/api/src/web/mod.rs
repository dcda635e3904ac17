pub mod auth;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

// Re-export the handlers the binary and the tests wire into routers.
pub use middleware::require_auth;
pub use rest::{get_messages_handler, list_personas_handler, send_message_handler};
pub use ws_handler::ws_handler;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use state::AppState;

/// Builds the API router: public auth/navigation routes plus the
/// cookie-protected chat routes.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(rest::health_handler))
        .route("/navigation", get(rest::navigation_handler))
        .route("/auth/google/start", get(auth::start_sign_in_handler))
        .route("/auth/google/callback", get(auth::sign_in_callback_handler))
        .route("/auth/logout", post(auth::logout_handler))
        // The socket resolves identity itself so it can route signed-out clients.
        .route("/ws", get(ws_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/personas", get(list_personas_handler))
        .route(
            "/personas/{persona}/messages",
            get(get_messages_handler).post(send_message_handler),
        )
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
}
